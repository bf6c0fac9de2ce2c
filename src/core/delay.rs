//! # Cancellation-aware sleep.

use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    core::executor::{Executor, TokioExecutor},
    error::Cancelled,
};

/// Sleeps for `duration` unless `token` is cancelled first.
///
/// Returns `Err(Cancelled)` immediately when the token is (or becomes) cancelled.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let token = CancellationToken::new();
/// token.cancel();
/// assert!(retryvisor::delay(Duration::from_secs(3600), &token).await.is_err());
/// # }
/// ```
pub async fn delay(duration: Duration, token: &CancellationToken) -> Result<(), Cancelled> {
    sleep_cancellable(&TokioExecutor::new(), duration, token).await
}

/// Same as [`delay`], sleeping through the given executor.
pub(crate) async fn sleep_cancellable(
    executor: &dyn Executor,
    duration: Duration,
    token: &CancellationToken,
) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    select! {
        biased;
        _ = token.cancelled() => Err(Cancelled),
        _ = executor.sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn sleeps_full_duration() {
        let token = CancellationToken::new();
        let start = Instant::now();
        delay(Duration::from_millis(200), &token).await.expect("not cancelled");
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_wait() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert_eq!(delay(Duration::from_secs(60), &token).await, Err(Cancelled));
        assert_eq!(start.elapsed(), Duration::from_millis(50));
    }
}
