//! Bounded fixed-interval polling.
//!
//! Used where a value becomes available asynchronously with no event to
//! wait on, such as an auth session that is still settling after a
//! redirect. The check runs immediately, then every `interval` until it
//! yields a value or `timeout` elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

pub const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const SETTLE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Poll `check` until it returns `Some`, or give up after `timeout`.
pub async fn poll_until<T, F, Fut>(interval: Duration, timeout: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(value) = check().await {
            return Some(value);
        }
        if Instant::now() + interval > deadline {
            tracing::debug!(attempts, timeout_ms = timeout.as_millis() as u64, "Gave up polling");
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}
