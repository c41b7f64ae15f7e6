use crate::models::{NotificationEvent, NotificationPatch};

/// Client-local window of notification events.
///
/// Pure state, no I/O: the reconciler feeds it from bulk loads and push
/// events, and every invariant (dedupe by id, newest-first order, bounded
/// window, derived unread count) lives here.
pub struct NotificationStore {
    items: Vec<NotificationEvent>,
    cap: usize,
}

impl NotificationStore {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap,
        }
    }

    pub fn items(&self) -> &[NotificationEvent] {
        &self.items
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    /// Unread count is always derived by counting; there is no second
    /// counter to drift from.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|i| !i.is_read).count()
    }

    /// Replace the whole window with a fresh bulk load.
    pub fn replace(&mut self, mut events: Vec<NotificationEvent>) {
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen = std::collections::HashSet::new();
        events.retain(|e| seen.insert(e.id.clone()));
        events.truncate(self.cap);
        self.items = events;
    }

    /// Insert one event, keeping order and the window bound. Duplicate
    /// ids leave the list untouched. Returns whether the list changed.
    pub fn insert(&mut self, event: NotificationEvent) -> bool {
        if self.contains(&event.id) {
            return false;
        }
        let pos = self
            .items
            .partition_point(|i| i.created_at > event.created_at);
        if pos >= self.cap {
            // Older than everything the window retains.
            return false;
        }
        self.items.insert(pos, event);
        self.items.truncate(self.cap);
        true
    }

    /// Patch an existing entry in place. An id we have never seen is
    /// discarded; a partial update record never fabricates an entry.
    pub fn apply_patch(&mut self, patch: &NotificationPatch) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == patch.id) else {
            return false;
        };
        if let Some(is_read) = patch.is_read {
            item.is_read = is_read;
        }
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        if let Some(body) = &patch.body {
            item.body = body.clone();
        }
        true
    }

    /// Flip one read flag, returning the prior value so a failed backend
    /// write can revert it.
    pub fn set_read(&mut self, id: &str, is_read: bool) -> Option<bool> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        let prior = item.is_read;
        item.is_read = is_read;
        Some(prior)
    }

    /// Flip every unread entry, returning the flipped ids for the
    /// commit/compensate steps.
    pub fn mark_all_read(&mut self) -> Vec<String> {
        let mut flipped = Vec::new();
        for item in self.items.iter_mut().filter(|i| !i.is_read) {
            item.is_read = true;
            flipped.push(item.id.clone());
        }
        flipped
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationKind, SubjectRef};

    fn event(id: &str, created_at: u64, is_read: bool) -> NotificationEvent {
        NotificationEvent {
            id: id.to_string(),
            actor_id: None,
            kind: NotificationKind::Follow,
            subject: SubjectRef::None,
            title: String::new(),
            body: String::new(),
            is_read,
            created_at,
            actor: None,
        }
    }

    fn ids(store: &NotificationStore) -> Vec<&str> {
        store.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_insert_keeps_newest_first() {
        let mut store = NotificationStore::new(20);
        store.insert(event("b", 200, false));
        store.insert(event("a", 300, false));
        store.insert(event("c", 100, false));
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_insert_is_idempotent_by_id() {
        let mut store = NotificationStore::new(20);
        assert!(store.insert(event("a", 300, false)));
        assert!(store.insert(event("b", 200, false)));
        // Same id again, even with a different timestamp, is a no-op.
        assert!(!store.insert(event("a", 999, true)));
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.items()[0].created_at, 300);
    }

    #[test]
    fn test_window_capping_retains_most_recent() {
        let mut store = NotificationStore::new(3);
        for i in 0..10u64 {
            store.insert(event(&format!("n{i}"), i, false));
        }
        assert_eq!(store.items().len(), 3);
        assert_eq!(ids(&store), vec!["n9", "n8", "n7"]);

        // A late-arriving event older than everything retained is dropped
        // by the cap, not kept at the tail.
        assert!(!store.insert(event("old", 1, false)));
        assert_eq!(ids(&store), vec!["n9", "n8", "n7"]);
    }

    #[test]
    fn test_patch_for_unknown_id_never_fabricates() {
        let mut store = NotificationStore::new(20);
        let patch = NotificationPatch {
            id: "ghost".to_string(),
            is_read: Some(true),
            title: None,
            body: None,
        };
        assert!(!store.apply_patch(&patch));
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_patch_flips_read_state() {
        let mut store = NotificationStore::new(20);
        store.insert(event("a", 100, false));
        let patch = NotificationPatch {
            id: "a".to_string(),
            is_read: Some(true),
            title: None,
            body: None,
        };
        assert!(store.apply_patch(&patch));
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_unread_count_is_derived() {
        let mut store = NotificationStore::new(20);
        store.insert(event("a", 300, false));
        store.insert(event("b", 200, true));
        store.insert(event("c", 100, false));
        assert_eq!(store.unread_count(), 2);

        store.set_read("a", true);
        assert_eq!(store.unread_count(), 1);
        store.set_read("a", false);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn test_set_read_returns_prior_value() {
        let mut store = NotificationStore::new(20);
        store.insert(event("a", 100, false));
        assert_eq!(store.set_read("a", true), Some(false));
        assert_eq!(store.set_read("a", true), Some(true));
        assert_eq!(store.set_read("missing", true), None);
    }

    #[test]
    fn test_mark_all_read_reports_flipped_ids() {
        let mut store = NotificationStore::new(20);
        store.insert(event("a", 300, false));
        store.insert(event("b", 200, true));
        store.insert(event("c", 100, false));

        let mut flipped = store.mark_all_read();
        flipped.sort();
        assert_eq!(flipped, vec!["a", "c"]);
        assert_eq!(store.unread_count(), 0);
        assert!(store.mark_all_read().is_empty());
    }

    #[test]
    fn test_replace_sorts_dedupes_and_caps() {
        let mut store = NotificationStore::new(2);
        store.replace(vec![
            event("a", 100, false),
            event("b", 300, false),
            event("b", 300, false),
            event("c", 200, false),
        ]);
        assert_eq!(ids(&store), vec!["b", "c"]);
    }
}
