//! Application-wide constants
//!
//! Centralized location for magic values that are used across
//! multiple modules.

/// Maximum number of notifications kept in the client-local window.
pub const NOTIFICATION_WINDOW: usize = 20;

/// Liveness threshold in seconds - a user whose last activity is older
/// than this is considered offline.
pub const PRESENCE_LIVENESS_SECS: u64 = 60;

/// Interval between presence refresh cycles.
pub const PRESENCE_POLL_INTERVAL_SECS: u64 = 30;

/// How many recent conversations to scan when the user follows no one.
pub const RECENT_CONVERSATIONS_LIMIT: usize = 10;

/// Cap on the number of users the presence sidebar will track.
pub const PRESENCE_CANDIDATE_CAP: usize = 20;

/// Any single backend call that has not resolved within this window is
/// treated as failed, through the same path as an explicit error.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Placeholder shown when an actor profile lookup misses or fails.
pub const UNKNOWN_ACTOR_NAME: &str = "Unknown user";

// REST resource paths on the hosted backend
pub mod resources {
    pub const NOTIFICATIONS: &str = "rest/v1/notifications";
    pub const PROFILES: &str = "rest/v1/profiles";
    pub const FOLLOWS: &str = "rest/v1/follows";
    pub const BLOCKS: &str = "rest/v1/blocks";
    pub const CONVERSATIONS: &str = "rest/v1/conversations";
    pub const PRESENCE: &str = "rest/v1/presence";
}

/// Websocket path of the backend change feed.
pub const REALTIME_PATH: &str = "realtime/v1/changes";
