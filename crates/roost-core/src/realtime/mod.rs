pub mod worker;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::models::{NotificationPatch, NotificationRow};

/// Lifecycle of the change-feed subscription.
///
/// `Connecting` and `Connected` both reject a redundant connect request,
/// which makes double-subscription under re-entrant mount cycles
/// structurally impossible rather than guarded by a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Connecting,
    Connected,
    Closing,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::Idle => "idle",
            SubscriptionState::Connecting => "connecting",
            SubscriptionState::Connected => "connected",
            SubscriptionState::Closing => "closing",
        }
    }
}

pub struct SubscriptionLifecycle {
    state: Mutex<SubscriptionState>,
}

impl SubscriptionLifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SubscriptionState::Idle),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.lock()
    }

    /// `Idle -> Connecting`; every other state rejects the request.
    pub fn try_begin_connect(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        match *state {
            SubscriptionState::Idle => {
                *state = SubscriptionState::Connecting;
                Ok(())
            }
            other => Err(CoreError::AlreadySubscribed(other.as_str())),
        }
    }

    pub fn mark_connected(&self) {
        let mut state = self.state.lock();
        if *state == SubscriptionState::Connecting {
            *state = SubscriptionState::Connected;
        }
    }

    pub fn begin_close(&self) {
        *self.state.lock() = SubscriptionState::Closing;
    }

    pub fn reset(&self) {
        *self.state.lock() = SubscriptionState::Idle;
    }
}

impl Default for SubscriptionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A change delivered by the feed.
#[derive(Debug)]
pub enum PushEvent {
    Insert(NotificationRow),
    Update(NotificationPatch),
}

#[derive(Debug)]
pub enum RealtimeCommand {
    Shutdown,
}

#[derive(Deserialize)]
struct ChangeFrame {
    #[serde(rename = "type")]
    op: String,
    record: serde_json::Value,
}

/// Parse one text frame from the feed. Anything the client cannot make
/// sense of is an error the caller logs and discards; backend-side
/// inconsistency is not repairable here.
pub fn parse_frame(text: &str) -> Result<PushEvent, CoreError> {
    let frame: ChangeFrame =
        serde_json::from_str(text).map_err(|e| CoreError::MalformedPayload(e.to_string()))?;
    match frame.op.as_str() {
        "insert" | "INSERT" => Ok(PushEvent::Insert(NotificationRow::from_value(frame.record)?)),
        "update" | "UPDATE" => serde_json::from_value(frame.record)
            .map(PushEvent::Update)
            .map_err(|e| CoreError::MalformedPayload(e.to_string())),
        other => Err(CoreError::MalformedPayload(format!(
            "unknown change op {other:?}"
        ))),
    }
}

/// Owns the subscription lifecycle and spawns the feed worker.
pub struct RealtimeClient {
    lifecycle: Arc<SubscriptionLifecycle>,
}

/// Channel into the running worker. Consuming `shutdown` makes
/// "unsubscribe exactly once" a type-level property.
pub struct RealtimeHandle {
    command_tx: mpsc::UnboundedSender<RealtimeCommand>,
}

impl RealtimeHandle {
    pub fn shutdown(self) {
        let _ = self.command_tx.send(RealtimeCommand::Shutdown);
    }
}

impl RealtimeClient {
    pub fn new() -> Self {
        Self {
            lifecycle: Arc::new(SubscriptionLifecycle::new()),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.lifecycle.state()
    }

    /// Start the feed worker for the current user. Rejected while a
    /// previous subscription is still connecting, connected, or closing.
    pub fn connect(
        &self,
        config: &CoreConfig,
        event_tx: mpsc::UnboundedSender<PushEvent>,
    ) -> Result<RealtimeHandle, CoreError> {
        self.lifecycle.try_begin_connect()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(worker::run(
            config.realtime_url(),
            config.user_id.clone(),
            config.request_timeout,
            self.lifecycle.clone(),
            command_rx,
            event_tx,
        ));
        Ok(RealtimeHandle { command_tx })
    }
}

impl Default for RealtimeClient {
    fn default() -> Self {
        Self::new()
    }
}
