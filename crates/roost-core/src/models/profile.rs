use serde::Deserialize;

use crate::constants::UNKNOWN_ACTOR_NAME;

/// Profile row as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Display data for the user who caused a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorProfile {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl ActorProfile {
    /// Placeholder used when the profile lookup misses or fails, so a
    /// failed enrichment never blocks the notification from appearing.
    pub fn unknown(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: UNKNOWN_ACTOR_NAME.to_string(),
            avatar_url: None,
        }
    }
}

impl From<ProfileRow> for ActorProfile {
    fn from(row: ProfileRow) -> Self {
        let display_name = match row.display_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNKNOWN_ACTOR_NAME.to_string(),
        };
        Self {
            user_id: row.user_id,
            display_name,
            avatar_url: row.avatar_url,
        }
    }
}
