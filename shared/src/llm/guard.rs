//! Deadline guard for backend calls.
//!
//! On expiry the wrapped future is dropped. Dropping a `reqwest` future
//! aborts the request on our side, but a request already accepted upstream
//! keeps running there.

use std::future::Future;
use std::time::Duration;

use super::failure::InvocationFailure;

/// Race `operation` against `deadline`, mapping expiry to [`InvocationFailure::Timeout`].
pub async fn with_timeout<T, F>(operation: F, deadline: Duration) -> Result<T, InvocationFailure>
where
    F: Future<Output = Result<T, InvocationFailure>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => Err(InvocationFailure::Timeout {
            deadline_ms: deadline.as_millis() as u64,
        }),
    }
}
