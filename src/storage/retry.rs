//! src/storage/retry.rs
use super::StorageError;
use std::future::Future;
use std::time::Duration;

/// Retries at a fixed interval. The wait never grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearRetry {
    pub interval: Duration,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Wall-clock ceiling for a single attempt.
    pub maximum_execution_time: Duration,
    pub retry_policy: LinearRetry,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            maximum_execution_time: Duration::from_millis(1500),
            retry_policy: LinearRetry {
                interval: Duration::from_secs(3),
                max_retries: 3,
            },
        }
    }
}

/// Runs `operation` under `options`.
///
/// Each attempt is cut off after `maximum_execution_time`. Timed-out attempts
/// and retryable errors are tried again after `retry_policy.interval`, at most
/// `retry_policy.max_retries` times. When the budget runs out the last error
/// is returned; a run that kept timing out yields `StorageError::Timeout`.
pub async fn execute_with_retry<T, F, Fut>(
    options: &RequestOptions,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;

        let error = match tokio::time::timeout(options.maximum_execution_time, operation()).await
        {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => e,
            Err(_) => StorageError::Timeout { attempts },
        };

        if attempts > options.retry_policy.max_retries {
            return Err(error);
        }

        tracing::warn!(
            error.cause_chain = ?error,
            attempt = attempts,
            "Storage request failed, retrying in {:?}",
            options.retry_policy.interval
        );
        tokio::time::sleep(options.retry_policy.interval).await;
    }
}
