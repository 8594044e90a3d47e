use std::future::Future;

use tracing::warn;

use crate::config::StoreConfig;
use crate::error::AppError;

/// Runs one unit of work under the store timeout, retrying transient store
/// failures with exponential backoff. Each attempt must open its own
/// transaction: a timed-out attempt is dropped, which rolls it back.
pub async fn run_with_retry<T, F, Fut>(
    config: &StoreConfig,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut retries = 0;
    loop {
        let result = match tokio::time::timeout(config.timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = config.timeout.as_millis() as u64, "Unit of work timed out");
                return Err(AppError::Unavailable(
                    "The store did not respond in time, please retry".to_string(),
                ));
            }
        };

        match result {
            Err(e) if e.is_transient() && retries < config.max_retries => {
                retries += 1;
                let delay = config.backoff_for(retries);
                warn!(operation, retries, delay_ms = delay.as_millis() as u64, error = %e, "Retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}
