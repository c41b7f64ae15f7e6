use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::constants::PRESENCE_LIVENESS_SECS;

/// Last-seen row as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceRow {
    pub user_id: String,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Online/offline state for one user, rebuilt on every poll cycle.
/// Never persisted across reloads.
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Seconds since UNIX epoch of the user's last activity, if any.
    pub last_seen_at: Option<u64>,
}

impl PresenceRecord {
    /// A user is online iff they were seen strictly less than the
    /// liveness threshold ago.
    pub fn is_online(&self, now: u64) -> bool {
        match self.last_seen_at {
            Some(seen) => now.saturating_sub(seen) < PRESENCE_LIVENESS_SECS,
            None => false,
        }
    }
}
