use log::warn;
use std::future::Future;
use std::time::Duration;

pub const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 10000;

/// Exponential backoff with +/-25% jitter, capped at `MAX_DELAY_MS`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let delay_ms = BASE_DELAY_MS
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(MAX_DELAY_MS);
    let jitter_range = (delay_ms as f64 * 0.25) as u64;
    let jitter = fastrand::u64(0..=jitter_range * 2);
    Duration::from_millis(delay_ms.saturating_sub(jitter_range).saturating_add(jitter))
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or `max_retries` retries have failed.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    context: &str,
    max_retries: u32,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_retries || !is_retryable(&err) => return Err(err),
            Err(err) => {
                let delay = backoff_delay(attempt);
                warn!(
                    "Attempt {}/{} for {} failed: {}. Retrying in {}ms.",
                    attempt + 1,
                    max_retries + 1,
                    context,
                    err,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
