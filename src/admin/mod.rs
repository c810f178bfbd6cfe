/// Administration
///
/// Bootstrapping the first admin account, operator recovery helpers, and the
/// moderation actions admins take against other users. Every moderation
/// action is recorded in the `user_logs` audit trail.
mod manager;

pub use manager::{AdminManager, CREDENTIALS_PASSWORD_LENGTH};

use crate::error::{WikiError, WikiResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Moderation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminAction {
    Blacklist,
    Unblacklist,
    Promote,
    Demote,
    Delete,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Blacklist => "blacklist",
            AdminAction::Unblacklist => "unblacklist",
            AdminAction::Promote => "promote",
            AdminAction::Demote => "demote",
            AdminAction::Delete => "delete",
        }
    }
}

impl FromStr for AdminAction {
    type Err = WikiError;

    fn from_str(s: &str) -> WikiResult<Self> {
        match s.to_lowercase().as_str() {
            "blacklist" => Ok(AdminAction::Blacklist),
            "unblacklist" => Ok(AdminAction::Unblacklist),
            "promote" => Ok(AdminAction::Promote),
            "demote" => Ok(AdminAction::Demote),
            "delete" => Ok(AdminAction::Delete),
            _ => Err(WikiError::Validation(format!("Invalid admin action: {}", s))),
        }
    }
}

/// Outcome of admin bootstrapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AdminStatus {
    /// At least one admin was already present
    Existing { admins: Vec<String> },
    /// A matching user was promoted
    Promoted { username: String },
    /// A new admin account was created
    Created {
        username: String,
        /// Set when a temporary password was generated and written out
        credentials_file: Option<PathBuf>,
    },
}

/// Admin account health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminReport {
    pub admin_count: i64,
    pub admins: Vec<String>,
}

impl AdminReport {
    pub fn is_healthy(&self) -> bool {
        self.admin_count > 0
    }
}

/// Body for moderation endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in [
            AdminAction::Blacklist,
            AdminAction::Unblacklist,
            AdminAction::Promote,
            AdminAction::Demote,
            AdminAction::Delete,
        ] {
            assert_eq!(action.as_str().parse::<AdminAction>().unwrap(), action);
        }
        assert!("ban".parse::<AdminAction>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(AdminStatus::Promoted {
            username: "admin".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "promoted");
        assert_eq!(json["username"], "admin");
    }
}
