use std::time::Duration;

use agentrelay_core::GatewayError;
use tokio::time::sleep;
use tracing::warn;

/// Retry an agent call while it keeps reporting throttling.
///
/// # Arguments
/// * `operation` - The async call to retry
/// * `delays` - Seconds to wait before each retry; empty means a single attempt
///
/// # Returns
/// The first success, the first non-throttling error, or the last throttling
/// error once `delays` is exhausted.
pub async fn retry_on_throttle<F, Fut, T>(mut operation: F, delays: &[u64]) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, GatewayError>>,
{
    let attempts = delays.len() + 1;
    let mut pending = delays.iter();
    let mut attempt = 1;

    loop {
        match operation().await {
            Err(GatewayError::Throttled(detail)) => {
                let Some(delay_secs) = pending.next() else {
                    return Err(GatewayError::Throttled(detail));
                };
                warn!(
                    "Agent call throttled (attempt {attempt}/{attempts}): {detail}. Retrying after {delay_secs}s..."
                );
                sleep(Duration::from_secs(*delay_secs)).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
