//! User repository: the identity resolver behind performer and assignee lookups.

use vigil_core::clock::format_timestamp;
use vigil_core::entities::UserProfile;
use vigil_core::ids::PREFIX_USER;

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::service::VigilService;

const SELECT_COLS: &str = "id, display_name, contact, created_at";

fn row_to_user(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    Ok(UserProfile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        contact: row.get(2)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

impl VigilService {
    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for a blank name or contact.
    pub async fn create_user(
        &self,
        display_name: &str,
        contact: &str,
    ) -> Result<UserProfile, DatabaseError> {
        if display_name.trim().is_empty() || contact.trim().is_empty() {
            return Err(DatabaseError::Validation(
                "display name and contact are required".into(),
            ));
        }
        let id = self.db().generate_id(PREFIX_USER).await?;
        let now = self.clock().now();

        self.db()
            .conn()
            .execute(
                "INSERT INTO users (id, display_name, contact, created_at) VALUES (?1, ?2, ?3, ?4)",
                libsql::params![id.as_str(), display_name, contact, format_timestamp(&now)],
            )
            .await?;

        tracing::debug!(user = %id, "user created");
        Ok(UserProfile {
            id,
            display_name: display_name.to_string(),
            contact: contact.to_string(),
            created_at: now,
        })
    }

    /// Resolve a user id to its profile.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no user has this id.
    pub async fn get_user(&self, id: &str) -> Result<UserProfile, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("user", id))?;
        row_to_user(&row)
    }

    /// Change a user's display name.
    ///
    /// Not audited. Assignment entries keep the contact captured when they
    /// were recorded.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no user has this id.
    pub async fn rename_user(
        &self,
        id: &str,
        display_name: &str,
    ) -> Result<UserProfile, DatabaseError> {
        if display_name.trim().is_empty() {
            return Err(DatabaseError::Validation("display name is required".into()));
        }
        let changed = self
            .db()
            .conn()
            .execute(
                "UPDATE users SET display_name = ?1 WHERE id = ?2",
                libsql::params![display_name, id],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("user", id));
        }
        self.get_user(id).await
    }

    /// All users, by display name.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM users ORDER BY display_name, id"),
                (),
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }
}
