use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::BackendClient;
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::models::{ActorProfile, PresenceRecord};

/// Current wall clock as seconds since UNIX epoch.
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Produces the ranked "people relevant to you" roster with
/// online/offline state, refreshed on a fixed cadence.
///
/// The roster is rebuilt from scratch every cycle; nothing here is
/// persisted. Teardown bumps a generation counter so a response still in
/// flight when the owning component goes away can never be committed.
pub struct PresenceAggregator {
    backend: Arc<dyn BackendClient>,
    user_id: String,
    recent_conversations_limit: usize,
    candidate_cap: usize,
    roster: Mutex<Vec<PresenceRecord>>,
    generation: AtomicU64,
}

impl PresenceAggregator {
    pub fn new(backend: Arc<dyn BackendClient>, config: &CoreConfig) -> Self {
        Self {
            backend,
            user_id: config.user_id.clone(),
            recent_conversations_limit: config.recent_conversations_limit,
            candidate_cap: config.presence_candidate_cap,
            roster: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn roster(&self) -> Vec<PresenceRecord> {
        self.roster.lock().clone()
    }

    /// Invalidate any refresh currently in flight. Called on teardown.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Followees first; a user who follows no one falls back to the
    /// distinct counterparts of their recent conversations. The current
    /// user and anyone they blocked are excluded, and the result is
    /// capped. Ordering is applied later, after presence attach.
    pub async fn resolve_relevant_users(&self) -> Result<Vec<String>, CoreError> {
        let mut candidates = self.backend.followee_ids(&self.user_id).await?;
        if candidates.is_empty() {
            candidates = self
                .backend
                .recent_conversation_partner_ids(&self.user_id, self.recent_conversations_limit)
                .await?;
        }

        let blocked = self.backend.blocked_ids(&self.user_id).await?;
        // Backend rows are not grouped by user, so dedupe by set rather
        // than by adjacency.
        let mut seen = HashSet::new();
        candidates.retain(|id| {
            id != &self.user_id && !blocked.contains(id) && seen.insert(id.clone())
        });
        candidates.truncate(self.candidate_cap);
        Ok(candidates)
    }

    /// Annotate a user set with last-seen and profile data in exactly
    /// two batched calls (presence + profiles), then rank: online users
    /// first, each partition newest activity first, users with no
    /// presence row last.
    pub async fn attach_presence(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<PresenceRecord>, CoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let presence_rows = self.backend.presence_records(user_ids).await?;
        let profile_rows = self.backend.profiles(user_ids).await?;

        let last_seen: HashMap<String, u64> = presence_rows
            .into_iter()
            .filter_map(|row| {
                let seen = row.last_seen_at?.timestamp().max(0) as u64;
                Some((row.user_id, seen))
            })
            .collect();
        let profiles: HashMap<String, ActorProfile> = profile_rows
            .into_iter()
            .map(|row| (row.user_id.clone(), ActorProfile::from(row)))
            .collect();

        let mut records: Vec<PresenceRecord> = user_ids
            .iter()
            .map(|id| {
                let profile = profiles.get(id);
                PresenceRecord {
                    user_id: id.clone(),
                    display_name: profile
                        .map(|p| p.display_name.clone())
                        .unwrap_or_else(|| id.clone()),
                    avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                    last_seen_at: last_seen.get(id).copied(),
                }
            })
            .collect();

        rank(&mut records, now_epoch());
        Ok(records)
    }

    /// One full resolve+attach cycle. The result is committed only if no
    /// teardown happened while it was in flight, so a stale response is
    /// a guaranteed no-op.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let generation = self.generation.load(Ordering::SeqCst);

        let users = self.resolve_relevant_users().await?;
        let records = self.attach_presence(&users).await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding stale presence refresh");
            return Ok(());
        }
        *self.roster.lock() = records;
        Ok(())
    }
}

/// Running poller for one sidebar instance. `stop` tears it down and
/// invalidates any in-flight refresh.
pub struct PresencePoller {
    aggregator: Arc<PresenceAggregator>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PresencePoller {
    /// Refresh immediately, then on every interval tick until stopped.
    pub fn spawn(aggregator: Arc<PresenceAggregator>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let worker = aggregator.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = worker.refresh().await {
                            warn!(error = %err, "presence refresh failed");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
        Self {
            aggregator,
            shutdown,
            handle,
        }
    }

    pub async fn stop(self) {
        self.aggregator.invalidate();
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

fn rank(records: &mut [PresenceRecord], now: u64) {
    records.sort_by(|a, b| match (b.is_online(now), a.is_online(now)) {
        (true, false) => CmpOrdering::Greater,
        (false, true) => CmpOrdering::Less,
        // Within a partition: newest activity first; `None` sorts last.
        _ => b.last_seen_at.cmp(&a.last_seen_at),
    });
}
