pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpBackend;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{ActorProfile, NotificationRow, PresenceRow, ProfileRow};

/// Request/response surface of the hosted backend.
///
/// This is the complete set of operations the client core consumes; the
/// backend's internals (row-level security, schema, storage) are out of
/// scope and arbitrated entirely on its side.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Most recent notifications for a user, newest first, bounded.
    async fn recent_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRow>, CoreError>;

    /// Display data for one user. `None` on miss, not an error.
    async fn actor_profile(&self, user_id: &str) -> Result<Option<ActorProfile>, CoreError>;

    /// Flip the read flag of a single notification.
    async fn set_notification_read(&self, id: &str, is_read: bool) -> Result<(), CoreError>;

    /// Flip every unread notification of a user to read.
    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), CoreError>;

    /// Ids of the users this user follows.
    async fn followee_ids(&self, user_id: &str) -> Result<Vec<String>, CoreError>;

    /// Distinct counterpart ids across the user's most recent
    /// conversations, newest conversation first.
    async fn recent_conversation_partner_ids(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, CoreError>;

    /// Ids of users this user has blocked.
    async fn blocked_ids(&self, user_id: &str) -> Result<Vec<String>, CoreError>;

    /// Last-seen rows for a set of users, one batched call.
    async fn presence_records(&self, user_ids: &[String]) -> Result<Vec<PresenceRow>, CoreError>;

    /// Profile rows for a set of users, one batched call.
    async fn profiles(&self, user_ids: &[String]) -> Result<Vec<ProfileRow>, CoreError>;

    /// Insert a block row (privileged half of follower removal).
    async fn insert_block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), CoreError>;

    /// Delete a follow row. Denied by the backend unless the caller owns
    /// the row.
    async fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<(), CoreError>;
}
