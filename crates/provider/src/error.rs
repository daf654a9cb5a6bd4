//! HTTP-transport error shape, kept from the teacher's `provider::error` (`ProviderError`)
//! and mapped into `OperonError::OracleUnavailable` at the trait boundary.

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {status} - {body}")]
    HttpError { status: u16, body: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("request error: {0}")]
    RequestError(String),
}

impl ProviderError {
    pub fn from_http(status: u16, body: String, retry_after: Option<&str>) -> Self {
        if status == 429 {
            let retry_after_ms = retry_after
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return ProviderError::RateLimited { retry_after_ms };
        }
        ProviderError::HttpError { status, body }
    }
}
