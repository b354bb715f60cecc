//! Bounded immediate retry, shared by the synchronous steps and the pool workers.

use crate::log_debug;
use crate::utils::Error;
use std::future::Future;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum RetryOutcome {
    Done,
    /// Every attempt failed; carries the last error.
    Exhausted(Error),
    Cancelled,
}

/// Runs `attempt` once, then up to `tries` more times while it keeps failing.
///
/// Cancellation is checked before each attempt and raced against the running one.
pub async fn with_retry<F, Fut>(
    tries: u32,
    cancel: &CancellationToken,
    mut attempt: F,
) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), Error>>,
{
    let mut last_error = None;

    for n in 0..=tries {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RetryOutcome::Cancelled,
            result = attempt(n) => result,
        };

        match result {
            Ok(()) => return RetryOutcome::Done,
            Err(e) => {
                log_debug!("Attempt {}/{} failed: {}", n + 1, tries + 1, e);
                last_error = Some(e);
            }
        }
    }

    RetryOutcome::Exhausted(last_error.unwrap_or_else(|| Error::new("no attempts made")))
}
