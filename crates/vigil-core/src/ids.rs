//! ID prefix constants.
//!
//! Every persisted row gets a `{prefix}-{8 hex chars}` identifier generated by
//! the database layer. The prefix makes ids self-describing in logs and exports.

pub const PREFIX_AUDIT: &str = "aud";
pub const PREFIX_INCIDENT: &str = "inc";
pub const PREFIX_USER: &str = "usr";
pub const PREFIX_COMMENT: &str = "cmt";
pub const PREFIX_ATTACHMENT: &str = "att";
pub const PREFIX_REQUEST: &str = "req";

/// All known prefixes, for exhaustive tests.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_AUDIT,
    PREFIX_INCIDENT,
    PREFIX_USER,
    PREFIX_COMMENT,
    PREFIX_ATTACHMENT,
    PREFIX_REQUEST,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefixes_are_unique_and_three_chars() {
        let unique: HashSet<_> = ALL_PREFIXES.iter().collect();
        assert_eq!(unique.len(), ALL_PREFIXES.len());
        assert!(ALL_PREFIXES.iter().all(|p| p.len() == 3));
    }
}
