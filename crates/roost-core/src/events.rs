use crate::models::NotificationEvent;

/// Events the runtime emits to the UI layer. Presence has no entry
/// here: the sidebar queries the aggregator's roster directly.
#[derive(Debug)]
pub enum CoreEvent {
    /// A push-delivered notification landed in the window.
    NotificationInserted(NotificationEvent),
    /// An existing notification changed (e.g. read-state flipped on
    /// another device).
    NotificationUpdated { id: String },
}
