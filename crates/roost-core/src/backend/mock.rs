//! Programmable in-memory backend used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use crate::backend::BackendClient;
use crate::error::CoreError;
use crate::models::{ActorProfile, NotificationKind, NotificationRow, PresenceRow, ProfileRow};

#[derive(Default)]
pub struct MockBackend {
    pub notifications: Mutex<Vec<NotificationRow>>,
    pub profiles: Mutex<HashMap<String, ProfileRow>>,
    pub followees: Mutex<Vec<String>>,
    pub partners: Mutex<Vec<String>>,
    pub blocked: Mutex<Vec<String>>,
    pub presence: Mutex<Vec<PresenceRow>>,

    pub fail_loads: AtomicBool,
    pub fail_set_read: AtomicBool,
    pub fail_bulk_read: AtomicBool,
    pub deny_delete_follow: AtomicBool,
    /// Artificial latency applied to presence fetches, for staleness tests.
    pub presence_delay: Mutex<Option<Duration>>,

    pub presence_calls: AtomicUsize,
    pub profile_batch_calls: AtomicUsize,
    pub set_read_calls: Mutex<Vec<(String, bool)>>,
    pub bulk_read_calls: AtomicUsize,
    pub blocks_inserted: Mutex<Vec<(String, String)>>,
    pub follows_deleted: Mutex<Vec<(String, String)>>,
}

/// Build a follow-kind notification row with the given ordering key.
pub fn follow_row(id: &str, actor_id: &str, created_at: u64, is_read: bool) -> NotificationRow {
    NotificationRow {
        id: id.to_string(),
        actor_id: Some(actor_id.to_string()),
        kind: NotificationKind::Follow,
        conversation_id: None,
        post_id: None,
        title: format!("{actor_id} followed you"),
        body: String::new(),
        is_read,
        created_at: Utc.timestamp_opt(created_at as i64, 0).unwrap(),
    }
}

pub fn profile_row(user_id: &str, display_name: &str) -> ProfileRow {
    ProfileRow {
        user_id: user_id.to_string(),
        display_name: Some(display_name.to_string()),
        avatar_url: None,
    }
}

pub fn presence_row(user_id: &str, last_seen_at: Option<u64>) -> PresenceRow {
    PresenceRow {
        user_id: user_id.to_string(),
        last_seen_at: last_seen_at.map(|s| Utc.timestamp_opt(s as i64, 0).unwrap()),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn simulated(&self, flag: &AtomicBool) -> Result<(), CoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(CoreError::Backend("simulated failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn recent_notifications(
        &self,
        _user_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRow>, CoreError> {
        self.simulated(&self.fail_loads)?;
        let mut rows = self.notifications.lock().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn actor_profile(&self, user_id: &str) -> Result<Option<ActorProfile>, CoreError> {
        Ok(self
            .profiles
            .lock()
            .get(user_id)
            .cloned()
            .map(ActorProfile::from))
    }

    async fn set_notification_read(&self, id: &str, is_read: bool) -> Result<(), CoreError> {
        self.simulated(&self.fail_set_read)?;
        self.set_read_calls
            .lock()
            .push((id.to_string(), is_read));
        if let Some(row) = self.notifications.lock().iter_mut().find(|r| r.id == id) {
            row.is_read = is_read;
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, _user_id: &str) -> Result<(), CoreError> {
        self.simulated(&self.fail_bulk_read)?;
        self.bulk_read_calls.fetch_add(1, Ordering::SeqCst);
        for row in self.notifications.lock().iter_mut() {
            row.is_read = true;
        }
        Ok(())
    }

    async fn followee_ids(&self, _user_id: &str) -> Result<Vec<String>, CoreError> {
        self.simulated(&self.fail_loads)?;
        Ok(self.followees.lock().clone())
    }

    async fn recent_conversation_partner_ids(
        &self,
        _user_id: &str,
        _limit: usize,
    ) -> Result<Vec<String>, CoreError> {
        self.simulated(&self.fail_loads)?;
        Ok(self.partners.lock().clone())
    }

    async fn blocked_ids(&self, _user_id: &str) -> Result<Vec<String>, CoreError> {
        Ok(self.blocked.lock().clone())
    }

    async fn presence_records(&self, user_ids: &[String]) -> Result<Vec<PresenceRow>, CoreError> {
        let delay = *self.presence_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.presence_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .presence
            .lock()
            .iter()
            .filter(|row| user_ids.contains(&row.user_id))
            .cloned()
            .collect())
    }

    async fn profiles(&self, user_ids: &[String]) -> Result<Vec<ProfileRow>, CoreError> {
        self.profile_batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .profiles
            .lock()
            .values()
            .filter(|row| user_ids.contains(&row.user_id))
            .cloned()
            .collect())
    }

    async fn insert_block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), CoreError> {
        self.blocks_inserted
            .lock()
            .push((blocker_id.to_string(), blocked_id.to_string()));
        Ok(())
    }

    async fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<(), CoreError> {
        if self.deny_delete_follow.load(Ordering::SeqCst) {
            return Err(CoreError::Denied("row-level security".to_string()));
        }
        self.follows_deleted
            .lock()
            .push((follower_id.to_string(), followee_id.to_string()));
        Ok(())
    }
}
