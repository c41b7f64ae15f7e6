pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod optimistic;
pub mod presence;
pub mod realtime;
pub mod reconciler;
pub mod runtime;
pub mod session;
pub mod social;
pub mod store;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use error::{CoreError, RemoveFollowerOutcome};
pub use events::CoreEvent;
pub use presence::{PresenceAggregator, PresencePoller};
pub use reconciler::NotificationReconciler;
pub use runtime::CoreRuntime;
