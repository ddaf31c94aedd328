//! Bounded polling.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Evaluates `predicate` once, then retries up to `max_times` more times,
/// sleeping `interval` before each retry. Returns the last result.
pub async fn wait_for<F>(mut predicate: F, max_times: u32, interval: Duration) -> bool
where
    F: FnMut() -> bool,
{
    if predicate() {
        return true;
    }
    for _ in 0..max_times {
        sleep(interval).await;
        if predicate() {
            return true;
        }
    }
    false
}

/// Async variant of [`wait_for`].
pub async fn wait_for_async<F, Fut>(mut predicate: F, max_times: u32, interval: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if predicate().await {
        return true;
    }
    for _ in 0..max_times {
        sleep(interval).await;
        if predicate().await {
            return true;
        }
    }
    false
}

/// Number of polls covering `timeout` at `interval`, rounded up.
#[must_use]
pub fn poll_count(timeout: Duration, interval: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    let times = timeout.as_millis().div_ceil(interval_ms);
    u32::try_from(times).unwrap_or(u32::MAX)
}
