use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::backend::{BackendClient, HttpBackend};
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::events::CoreEvent;
use crate::presence::{PresenceAggregator, PresencePoller};
use crate::realtime::{PushEvent, RealtimeClient, RealtimeHandle, SubscriptionState};
use crate::reconciler::NotificationReconciler;
use crate::session;
use crate::social::SocialGraph;

/// Wires the reconciler, presence aggregator, and change feed together
/// for one signed-in session. UI layers read state through the exposed
/// components and drain `CoreEvent`s from the event channel.
pub struct CoreRuntime {
    config: CoreConfig,
    reconciler: Arc<NotificationReconciler>,
    presence: Arc<PresenceAggregator>,
    social: SocialGraph,
    realtime: RealtimeClient,
    realtime_handle: Option<RealtimeHandle>,
    poller: Option<PresencePoller>,
    event_rx: Option<mpsc::UnboundedReceiver<CoreEvent>>,
    pump: Option<JoinHandle<()>>,
}

impl CoreRuntime {
    /// Build against the hosted backend, using a stored access token
    /// when one is present in the OS keyring.
    pub fn new(config: CoreConfig) -> Result<Self, CoreError> {
        let access_token = session::load().ok().flatten().map(|t| t.access_token);
        let backend = Arc::new(HttpBackend::new(&config, access_token)?);
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: CoreConfig, backend: Arc<dyn BackendClient>) -> Self {
        let reconciler = Arc::new(NotificationReconciler::new(
            backend.clone(),
            config.user_id.clone(),
            config.notification_window,
        ));
        let presence = Arc::new(PresenceAggregator::new(backend.clone(), &config));
        let social = SocialGraph::new(backend, config.user_id.clone());
        Self {
            config,
            reconciler,
            presence,
            social,
            realtime: RealtimeClient::new(),
            realtime_handle: None,
            poller: None,
            event_rx: None,
            pump: None,
        }
    }

    pub fn reconciler(&self) -> Arc<NotificationReconciler> {
        self.reconciler.clone()
    }

    pub fn presence(&self) -> Arc<PresenceAggregator> {
        self.presence.clone()
    }

    pub fn social(&self) -> &SocialGraph {
        &self.social
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        self.realtime.state()
    }

    /// Load the initial notification window, subscribe to the change
    /// feed, and start presence polling.
    pub async fn start(&mut self) -> Result<(), CoreError> {
        self.reconciler.load_initial().await?;

        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let handle = self.realtime.connect(&self.config, push_tx)?;
        self.realtime_handle = Some(handle);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_rx = Some(event_rx);
        self.pump = Some(tokio::spawn(pump_push_events(
            self.reconciler.clone(),
            push_rx,
            event_tx,
        )));

        self.poller = Some(PresencePoller::spawn(
            self.presence.clone(),
            self.config.presence_poll_interval,
        ));

        info!(user_id = %self.config.user_id, "runtime started");
        Ok(())
    }

    /// UI layer takes the event channel once, after `start`.
    pub fn take_event_rx(&mut self) -> Option<mpsc::UnboundedReceiver<CoreEvent>> {
        self.event_rx.take()
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.realtime_handle.take() {
            handle.shutdown();
        }
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        // The pump drains to completion once the feed worker drops its
        // sender.
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
        // Stale session state must not leak into the next sign-in.
        self.reconciler.clear();
        info!("runtime stopped");
    }
}

/// Forward feed events through the reconciler, emitting a `CoreEvent`
/// for every change that actually altered local state.
async fn pump_push_events(
    reconciler: Arc<NotificationReconciler>,
    mut push_rx: mpsc::UnboundedReceiver<PushEvent>,
    event_tx: mpsc::UnboundedSender<CoreEvent>,
) {
    while let Some(push) = push_rx.recv().await {
        match push {
            PushEvent::Insert(row) => {
                if let Some(event) = reconciler.on_push_insert(row).await {
                    let _ = event_tx.send(CoreEvent::NotificationInserted(event));
                }
            }
            PushEvent::Update(patch) => {
                if reconciler.on_push_update(&patch) {
                    let _ = event_tx.send(CoreEvent::NotificationUpdated { id: patch.id });
                }
            }
        }
    }
}
