use std::time::Duration;

use crate::constants::{
    NOTIFICATION_WINDOW, PRESENCE_CANDIDATE_CAP, PRESENCE_POLL_INTERVAL_SECS,
    RECENT_CONVERSATIONS_LIMIT, REQUEST_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the hosted backend, e.g. `https://db.roost.example`.
    pub backend_url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Id of the signed-in user all queries are scoped to.
    pub user_id: String,
    pub notification_window: usize,
    pub presence_poll_interval: Duration,
    pub recent_conversations_limit: usize,
    pub presence_candidate_cap: usize,
    pub request_timeout: Duration,
}

impl CoreConfig {
    pub fn new(
        backend_url: impl Into<String>,
        anon_key: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            backend_url: backend_url.into(),
            anon_key: anon_key.into(),
            user_id: user_id.into(),
            notification_window: NOTIFICATION_WINDOW,
            presence_poll_interval: Duration::from_secs(PRESENCE_POLL_INTERVAL_SECS),
            recent_conversations_limit: RECENT_CONVERSATIONS_LIMIT,
            presence_candidate_cap: PRESENCE_CANDIDATE_CAP,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Websocket endpoint of the change feed, derived from the REST base URL.
    pub fn realtime_url(&self) -> String {
        let ws_base = self
            .backend_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!(
            "{}/{}?apikey={}",
            ws_base.trim_end_matches('/'),
            crate::constants::REALTIME_PATH,
            self.anon_key
        )
    }
}
