//! Bounded exponential backoff for idempotent gateway reads
//!
//! Retries only transport-level failures. HTTP status handling stays with
//! the caller, and state-mutating calls must not come through here.

use std::time::Duration;

/// Retries after the initial attempt.
const MAX_RETRIES: u32 = 3;

/// First delay, doubled each retry: 250ms, 500ms, 1s.
const FIRST_DELAY_MS: u64 = 250;

/// Sends an idempotent request up to `MAX_RETRIES + 1` times.
///
/// Only transport errors from `reqwest` trigger a retry; the caller
/// inspects response status codes itself. The last attempt's error is
/// returned once the budget is spent.
pub(crate) async fn retry_send<F, Fut>(
    operation: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut delay = Duration::from_millis(FIRST_DELAY_MS);
    for attempt in 1..=MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_retries = MAX_RETRIES,
                    "gateway read failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_exhausted_retries_return_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_send("get_state", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                // Port 1 is never listening, so every attempt is refused.
                reqwest::Client::builder()
                    .timeout(Duration::from_millis(50))
                    .build()
                    .unwrap()
                    .get("http://127.0.0.1:1/")
                    .send()
                    .await
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }
}
