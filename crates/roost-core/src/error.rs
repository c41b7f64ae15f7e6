use std::fmt;

/// Errors surfaced by the backend boundary.
///
/// Every public operation catches these at its own boundary and converts
/// them to either a rollback (optimistic writes) or a no-op-with-report
/// (reads); nothing propagates into the rendering layer unhandled.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Transient network failure. State is left unchanged; the user may
    /// retry manually.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A call exceeded the request timeout. Treated exactly like an
    /// explicit error response, never left to hang.
    #[error("backend call timed out")]
    Timeout,

    /// The backend rejected the request for authorization reasons
    /// (e.g. a write denied by row-level security).
    #[error("backend denied the request: {0}")]
    Denied(String),

    /// Any other explicit error response from the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// A push payload or wire row that cannot be parsed. Logged and
    /// discarded, never surfaced to the user.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The realtime subscription is already connecting or connected.
    #[error("subscription already active (state: {0})")]
    AlreadySubscribed(&'static str),
}

impl CoreError {
    /// Whether this failure should be shown to the user (as opposed to
    /// only logged for diagnostics).
    pub fn is_user_visible(&self) -> bool {
        matches!(self, CoreError::Denied(_))
    }
}

/// Outcome of a `remove_follower` call. The second step of the write is
/// expected to be denied for non-privileged users; that is a success
/// path with its own name, not a swallowed generic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveFollowerOutcome {
    /// Both the block insert and the follow-row delete succeeded.
    FullyRemoved,
    /// The block row was inserted but the follow-row delete was denied
    /// by the backend's authorization layer, as expected.
    SecondStepDenied,
}

impl fmt::Display for RemoveFollowerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoveFollowerOutcome::FullyRemoved => write!(f, "fully removed"),
            RemoveFollowerOutcome::SecondStepDenied => write!(f, "blocked (follow row retained)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_denials_are_user_visible() {
        assert!(CoreError::Denied("rls".to_string()).is_user_visible());
        assert!(!CoreError::Timeout.is_user_visible());
        assert!(!CoreError::Backend("500".to_string()).is_user_visible());
        assert!(!CoreError::MalformedPayload("x".to_string()).is_user_visible());
    }
}
