use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::backend::BackendClient;
use crate::error::CoreError;
use crate::models::{ActorProfile, NotificationEvent, NotificationPatch, NotificationRow};
use crate::optimistic::commit_or_compensate;
use crate::store::NotificationStore;

/// Presents a single, deduplicated, correctly ordered view of the
/// notification window, regardless of whether events arrive via the
/// initial bulk fetch, a re-fetch, or the realtime push feed.
pub struct NotificationReconciler {
    backend: Arc<dyn BackendClient>,
    user_id: String,
    window: usize,
    store: Mutex<NotificationStore>,
}

impl NotificationReconciler {
    pub fn new(backend: Arc<dyn BackendClient>, user_id: impl Into<String>, window: usize) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            window,
            store: Mutex::new(NotificationStore::new(window)),
        }
    }

    pub fn notifications(&self) -> Vec<NotificationEvent> {
        self.store.lock().items().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.store.lock().unread_count()
    }

    /// Fetch the most recent window from the backend and replace local
    /// state with it. On failure the prior state is left untouched:
    /// stale-but-consistent beats empty-but-broken.
    pub async fn load_initial(&self) -> Result<(), CoreError> {
        let rows = self
            .backend
            .recent_notifications(&self.user_id, self.window)
            .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_event() {
                Ok(event) => events.push(event),
                Err(err) => warn!(error = %err, "discarding malformed notification row"),
            }
        }

        let profiles = self.bulk_profiles(&events).await;
        for event in &mut events {
            if let Some(actor_id) = &event.actor_id {
                event.actor = Some(
                    profiles
                        .get(actor_id)
                        .cloned()
                        .unwrap_or_else(|| ActorProfile::unknown(actor_id)),
                );
            }
        }

        self.store.lock().replace(events);
        Ok(())
    }

    /// One batched profile lookup for the distinct actors of a bulk
    /// load. A failed batch degrades every actor to the placeholder
    /// rather than blocking the load.
    async fn bulk_profiles(&self, events: &[NotificationEvent]) -> HashMap<String, ActorProfile> {
        let actor_ids: Vec<String> = events
            .iter()
            .filter_map(|e| e.actor_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if actor_ids.is_empty() {
            return HashMap::new();
        }
        match self.backend.profiles(&actor_ids).await {
            Ok(rows) => rows
                .into_iter()
                .map(|row| (row.user_id.clone(), ActorProfile::from(row)))
                .collect(),
            Err(err) => {
                warn!(error = %err, "actor profile batch failed, using placeholders");
                HashMap::new()
            }
        }
    }

    /// Handle a push-delivered insert. Enrichment happens before the
    /// store is touched so an unenriched entry is never visible, and the
    /// insert is skipped when the id is already present (the push and a
    /// concurrent bulk reload may both deliver the same event).
    ///
    /// Returns the inserted event, or `None` when the row was malformed
    /// or a duplicate.
    pub async fn on_push_insert(&self, row: NotificationRow) -> Option<NotificationEvent> {
        let mut event = match row.into_event() {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "discarding malformed push insert");
                return None;
            }
        };

        if self.store.lock().contains(&event.id) {
            return None;
        }

        if let Some(actor_id) = event.actor_id.clone() {
            event.actor = Some(match self.backend.actor_profile(&actor_id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => ActorProfile::unknown(&actor_id),
                Err(err) => {
                    warn!(error = %err, actor_id, "actor enrichment failed");
                    ActorProfile::unknown(&actor_id)
                }
            });
        }

        if self.store.lock().insert(event.clone()) {
            Some(event)
        } else {
            None
        }
    }

    /// Handle a push-delivered update. An id we have never seen is a
    /// no-op; a partial record never fabricates an entry.
    pub fn on_push_update(&self, patch: &NotificationPatch) -> bool {
        self.store.lock().apply_patch(patch)
    }

    /// Drop the local window, e.g. when the session ends. The next
    /// sign-in starts from a fresh `load_initial`.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Optimistically mark one notification read, then confirm with the
    /// backend; a failed write reverts the local flip.
    pub async fn mark_read(&self, id: &str) -> Result<(), CoreError> {
        let prior = {
            let mut store = self.store.lock();
            match store.set_read(id, true) {
                // Unknown id or already read: nothing to write.
                None => return Ok(()),
                Some(true) => return Ok(()),
                Some(false) => false,
            }
        };

        commit_or_compensate(
            prior,
            self.backend.set_notification_read(id, true),
            |prior| async move {
                self.store.lock().set_read(id, prior);
            },
        )
        .await
    }

    /// Optimistically mark everything read, then confirm with one bulk
    /// write. On failure we reload from the source of truth instead of
    /// attempting per-item rollback; the brief inconsistency window is
    /// accepted by design.
    pub async fn mark_all_read(&self) -> Result<(), CoreError> {
        let flipped = self.store.lock().mark_all_read();
        if flipped.is_empty() {
            return Ok(());
        }

        commit_or_compensate(
            (),
            self.backend.mark_all_notifications_read(&self.user_id),
            |_| async {
                if let Err(err) = self.load_initial().await {
                    warn!(error = %err, "reload after failed bulk write also failed");
                }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{follow_row, profile_row, MockBackend};
    use crate::constants::UNKNOWN_ACTOR_NAME;
    use std::sync::atomic::Ordering;

    fn reconciler(backend: Arc<MockBackend>) -> NotificationReconciler {
        NotificationReconciler::new(backend, "me", 20)
    }

    fn ids(r: &NotificationReconciler) -> Vec<String> {
        r.notifications().into_iter().map(|e| e.id).collect()
    }

    #[tokio::test]
    async fn test_load_initial_enriches_actors() {
        let backend = Arc::new(MockBackend::new());
        backend.notifications.lock().push(follow_row("a", "u2", 100, false));
        backend
            .profiles
            .lock()
            .insert("u2".to_string(), profile_row("u2", "Dana"));

        let r = reconciler(backend);
        r.load_initial().await.unwrap();

        let items = r.notifications();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].actor.as_ref().unwrap().display_name, "Dana");
    }

    #[tokio::test]
    async fn test_load_initial_failure_leaves_state_untouched() {
        let backend = Arc::new(MockBackend::new());
        backend.notifications.lock().push(follow_row("a", "u2", 100, false));

        let r = reconciler(backend.clone());
        r.load_initial().await.unwrap();
        assert_eq!(ids(&r), vec!["a"]);

        backend.fail_loads.store(true, Ordering::SeqCst);
        backend.notifications.lock().push(follow_row("b", "u3", 200, false));
        assert!(r.load_initial().await.is_err());

        // Prior window survives the failed reload.
        assert_eq!(ids(&r), vec!["a"]);
    }

    #[tokio::test]
    async fn test_push_insert_is_idempotent() {
        let backend = Arc::new(MockBackend::new());
        let r = reconciler(backend);

        assert!(r.on_push_insert(follow_row("a", "u2", 100, false)).await.is_some());
        assert!(r.on_push_insert(follow_row("a", "u2", 100, false)).await.is_none());
        assert_eq!(r.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_push_insert_unknown_actor_gets_placeholder() {
        let backend = Arc::new(MockBackend::new());
        let r = reconciler(backend);

        let event = r
            .on_push_insert(follow_row("a", "stranger", 100, false))
            .await
            .unwrap();
        assert_eq!(
            event.actor.unwrap().display_name,
            UNKNOWN_ACTOR_NAME
        );
    }

    #[tokio::test]
    async fn test_push_update_before_insert_is_noop() {
        let backend = Arc::new(MockBackend::new());
        let r = reconciler(backend);

        let patch = NotificationPatch {
            id: "ghost".to_string(),
            is_read: Some(true),
            title: None,
            body: None,
        };
        assert!(!r.on_push_update(&patch));
        assert!(r.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_rolls_back_on_failed_write() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_set_read.store(true, Ordering::SeqCst);
        let r = reconciler(backend);
        r.on_push_insert(follow_row("a", "u2", 100, false)).await;

        assert!(r.mark_read("a").await.is_err());
        assert!(!r.notifications()[0].is_read);
        assert_eq!(r.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_already_read_skips_backend_write() {
        let backend = Arc::new(MockBackend::new());
        let r = reconciler(backend.clone());
        r.on_push_insert(follow_row("a", "u2", 100, true)).await;

        r.mark_read("a").await.unwrap();
        assert!(backend.set_read_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_mark_all_read_failure_reloads_from_source_of_truth() {
        let backend = Arc::new(MockBackend::new());
        backend.notifications.lock().push(follow_row("a", "u2", 200, false));
        backend.notifications.lock().push(follow_row("b", "u2", 100, true));
        backend.fail_bulk_read.store(true, Ordering::SeqCst);

        let r = reconciler(backend.clone());
        r.load_initial().await.unwrap();
        assert_eq!(r.unread_count(), 1);

        assert!(r.mark_all_read().await.is_err());

        // Fallback reloaded the backend's view: "a" is still unread there.
        assert_eq!(r.unread_count(), 1);
        assert!(!r.notifications().iter().find(|e| e.id == "a").unwrap().is_read);
    }

    #[tokio::test]
    async fn test_clear_drops_local_window() {
        let backend = Arc::new(MockBackend::new());
        let r = reconciler(backend);
        r.on_push_insert(follow_row("a", "u2", 100, false)).await;
        r.on_push_insert(follow_row("b", "u3", 200, false)).await;
        assert_eq!(r.unread_count(), 2);

        r.clear();
        assert!(r.notifications().is_empty());
        assert_eq!(r.unread_count(), 0);
    }

    /// Full bell flow: three unread loaded, one pushed, then mark-all-read.
    #[tokio::test]
    async fn test_bell_scenario_end_to_end() {
        let backend = Arc::new(MockBackend::new());
        backend.notifications.lock().extend([
            follow_row("A", "u2", 300, false),
            follow_row("B", "u3", 200, false),
            follow_row("C", "u4", 100, false),
        ]);

        let r = reconciler(backend.clone());
        r.load_initial().await.unwrap();
        assert_eq!(r.unread_count(), 3);

        r.on_push_insert(follow_row("D", "u5", 400, false)).await;
        assert_eq!(ids(&r), vec!["D", "A", "B", "C"]);
        assert_eq!(r.unread_count(), 4);

        r.mark_all_read().await.unwrap();
        assert_eq!(r.unread_count(), 0);
        assert_eq!(ids(&r), vec!["D", "A", "B", "C"]);
        assert!(r.notifications().iter().all(|e| e.is_read));
        assert_eq!(backend.bulk_read_calls.load(Ordering::SeqCst), 1);
    }
}
