use std::future::Future;

use crate::error::ProviderError;

/// Retries a fallible request up to `max_attempts` times, honoring
/// `ProviderError::RateLimited`'s retry-after hint and falling back to exponential
/// backoff for other transient errors.
pub async fn with_backoff<F, Fut, T>(max_attempts: u32, mut f: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= max_attempts => return Err(err),
            Err(ProviderError::RateLimited { retry_after_ms }) => {
                tokio::time::sleep(std::time::Duration::from_millis(retry_after_ms)).await;
                attempt += 1;
            }
            Err(ProviderError::HttpError { status, .. }) if status >= 500 => {
                let backoff_ms = 250 * 2u64.pow(attempt);
                tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ProviderError> = with_backoff(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ProviderError> = with_backoff(3, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::RateLimited { retry_after_ms: 1 })
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let result: Result<u32, ProviderError> = with_backoff(2, || async {
            Err(ProviderError::RateLimited { retry_after_ms: 1 })
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_retriable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ProviderError> = with_backoff(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::HttpError {
                status: 401,
                body: "unauthorized".to_string(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
