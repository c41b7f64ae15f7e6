//! Optimistic write pattern: mutate local state first, confirm against
//! the backend, compensate on failure.
//!
//! Every mutating operation (read flags, likes, follows) repeats the
//! same shape, so the shape lives here once: the caller applies its
//! local change, captures an undo token, and hands this helper the
//! commit future plus the compensation keyed by that token.

use std::future::Future;

use crate::error::CoreError;

/// Await `commit`; on failure run `compensate(undo)` before returning
/// the error. The local apply has already happened on the caller's side.
pub async fn commit_or_compensate<U, C, R, F>(
    undo: U,
    commit: C,
    compensate: F,
) -> Result<(), CoreError>
where
    C: Future<Output = Result<(), CoreError>>,
    F: FnOnce(U) -> R,
    R: Future<Output = ()>,
{
    match commit.await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!(error = %err, "optimistic commit failed, compensating");
            compensate(undo).await;
            Err(err)
        }
    }
}
