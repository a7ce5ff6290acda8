//! Retry with exponential back-off and jitter for provider calls.
//!
//! [`retry_with_backoff`] wraps one provider attempt and retries on
//! transient errors only. Budget denials and permanent provider errors are
//! returned immediately — budget denial is not transient, and retrying an
//! auth rejection burns attempt cost for nothing.

use std::future::Future;
use std::time::Duration;

use crate::error::SerpError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 5xx responses and explicit transient classifications (429).
/// - Malformed response bodies — usually a truncated payload from an
///   overloaded upstream.
///
/// **Not retriable (hard stop):**
/// - [`SerpError::BudgetExhausted`] — skip straight to the next provider.
/// - [`SerpError::Permanent`] — auth or contract failure; fails the
///   provider for the remainder of the run.
pub(crate) fn is_retriable(err: &SerpError) -> bool {
    match err {
        SerpError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        SerpError::Transient { .. } | SerpError::Deserialize { .. } => true,
        SerpError::Permanent { .. }
        | SerpError::BudgetExhausted { .. }
        | SerpError::NoProviders
        | SerpError::AllProvidersFailed { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors. Delay before the n-th retry is
/// `backoff_base_ms * 2^(n-1)` with ±25% jitter, capped at 30s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SerpError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SerpError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient provider error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
