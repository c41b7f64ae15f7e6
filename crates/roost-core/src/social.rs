use std::sync::Arc;

use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{CoreError, RemoveFollowerOutcome};

/// Follow-graph writes that need more than one backend call.
pub struct SocialGraph {
    backend: Arc<dyn BackendClient>,
    user_id: String,
}

impl SocialGraph {
    pub fn new(backend: Arc<dyn BackendClient>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
        }
    }

    /// Remove a follower: insert a block row, then attempt to delete the
    /// other party's follow row. The delete is expected to be denied by
    /// the backend's authorization layer for non-privileged users; that
    /// denial is a named success path (defense-in-depth), while any
    /// other failure of the second step propagates.
    pub async fn remove_follower(
        &self,
        follower_id: &str,
    ) -> Result<RemoveFollowerOutcome, CoreError> {
        self.backend.insert_block(&self.user_id, follower_id).await?;

        match self.backend.delete_follow(follower_id, &self.user_id).await {
            Ok(()) => Ok(RemoveFollowerOutcome::FullyRemoved),
            Err(CoreError::Denied(reason)) => {
                debug!(follower_id, reason, "follow-row delete denied as expected");
                Ok(RemoveFollowerOutcome::SecondStepDenied)
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_remove_follower_full_path() {
        let backend = Arc::new(MockBackend::new());
        let graph = SocialGraph::new(backend.clone(), "me");

        let outcome = graph.remove_follower("u2").await.unwrap();
        assert_eq!(outcome, RemoveFollowerOutcome::FullyRemoved);
        assert_eq!(
            backend.blocks_inserted.lock().as_slice(),
            &[("me".to_string(), "u2".to_string())]
        );
        assert_eq!(
            backend.follows_deleted.lock().as_slice(),
            &[("u2".to_string(), "me".to_string())]
        );
    }

    #[tokio::test]
    async fn test_expected_denial_of_second_step_is_success() {
        let backend = Arc::new(MockBackend::new());
        backend.deny_delete_follow.store(true, Ordering::SeqCst);
        let graph = SocialGraph::new(backend.clone(), "me");

        let outcome = graph.remove_follower("u2").await.unwrap();
        assert_eq!(outcome, RemoveFollowerOutcome::SecondStepDenied);
        // The block row still landed.
        assert_eq!(backend.blocks_inserted.lock().len(), 1);
    }
}
