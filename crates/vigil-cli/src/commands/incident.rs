use anyhow::{Context, bail};
use vigil_core::enums::{IncidentStatus, Priority};
use vigil_db::repos::incident::NewIncident;
use vigil_db::updates::incident::{IncidentUpdate, IncidentUpdateBuilder, Reference};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::{IncidentCommands, IncidentUpdateArgs};
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `vigil incident`.
pub async fn handle(
    action: &IncidentCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        IncidentCommands::Create {
            title,
            description,
            priority,
            assign,
            responders,
            team,
        } => {
            let request = ctx.request_context(flags).await?;
            let new = NewIncident {
                title: title.clone(),
                description: description.clone(),
                priority: parse_enum::<Priority>(priority, "priority")?,
                assigned_to: assign.clone(),
                responders: responders.clone(),
                team: team.clone(),
            };
            output(&ctx.service.create_incident(&request, new).await?, flags.format)
        }
        IncidentCommands::Update(args) => {
            let update = build_update(args)?;
            if update.is_empty() {
                bail!("incident update requires at least one field");
            }
            let request = ctx.request_context(flags).await?;
            let updated = ctx.service.update_incident(&request, &args.id, &update).await?;
            if updated.entries.is_empty() {
                tracing::info!(id = %args.id, "nothing changed; no audit entries recorded");
            }
            output(&updated, flags.format)
        }
        IncidentCommands::Show { id } => {
            output(&ctx.service.get_incident(id).await?, flags.format)
        }
        IncidentCommands::List { status, limit } => {
            let status = status
                .as_deref()
                .map(|s| parse_enum::<IncidentStatus>(s, "status"))
                .transpose()?;
            output(&ctx.service.list_incidents(status, *limit).await?, flags.format)
        }
        IncidentCommands::Delete { id } => {
            let request = ctx.request_context(flags).await?;
            output(&ctx.service.delete_incident(&request, id).await?, flags.format)
        }
    }
}

fn build_update(args: &IncidentUpdateArgs) -> anyhow::Result<IncidentUpdate> {
    if let Some(raw) = &args.json {
        let payload: serde_json::Value =
            serde_json::from_str(raw).context("--json is not valid JSON")?;
        return Ok(IncidentUpdate::from_json(&payload)?);
    }

    let mut builder = IncidentUpdateBuilder::new();
    if let Some(title) = &args.title {
        builder = builder.title(title.clone());
    }
    if let Some(description) = &args.description {
        builder = builder.description(Some(description.clone()));
    } else if args.clear_description {
        builder = builder.description(None);
    }
    if let Some(status) = &args.status {
        builder = builder.status(parse_enum(status, "status")?);
    }
    if let Some(priority) = &args.priority {
        builder = builder.priority(parse_enum(priority, "priority")?);
    }
    if let Some(assignee) = &args.assign {
        builder = builder.assigned_to(Some(Reference::from(assignee.as_str())));
    } else if args.unassign {
        builder = builder.assigned_to(None);
    }
    if let Some(responders) = &args.responders {
        let responders: Vec<Reference> = responders
            .iter()
            .filter(|id| !id.trim().is_empty())
            .map(|id| Reference::from(id.as_str()))
            .collect();
        builder = builder.responders(Some(responders));
    }
    if let Some(team) = &args.team {
        builder = builder.team(Some(Reference::from(team.as_str())));
    } else if args.clear_team {
        builder = builder.team(None);
    }
    Ok(builder.build())
}
