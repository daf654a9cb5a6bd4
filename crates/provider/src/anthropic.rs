//! Anthropic oracle transport, generalized from the teacher's `AnthropicProvider`
//! (`provider::anthropic`) from a streaming chat API down to the single blocking
//! text-in/text-out call the `Oracle` contract needs.

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use operon_core::{Oracle, OperonError};

use crate::error::ProviderError;
use crate::retry::with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicOracle {
    client: reqwest::Client,
    repo_root: std::path::PathBuf,
}

impl AnthropicOracle {
    pub fn new(repo_root: std::path::PathBuf) -> Self {
        AnthropicOracle {
            client: reqwest::Client::new(),
            repo_root,
        }
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    async fn call(&self, prompt: &str, require_json: bool) -> Result<String, OperonError> {
        let config = operon_config::Config::load(&self.repo_root)
            .map_err(|e| OperonError::OracleUnavailable(format!("config load failed: {e}")))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| OperonError::OracleUnavailable("no anthropic api key configured".to_string()))?;
        let base_url = config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = if config.model == "default" {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let system = if require_json {
            "Respond with JSON only, no prose, no markdown fences."
        } else {
            "You are a careful code-editing assistant."
        };

        let body = json!({
            "model": model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "system": system,
            "messages": [{"role": "user", "content": prompt}],
        });

        with_backoff(3, || async {
            let resp = self
                .client
                .post(format!("{base_url}/messages"))
                .header("x-api-key", &api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .timeout(std::time::Duration::from_secs(config.timeout_s))
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::RequestError(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                let text = resp.text().await.unwrap_or_default();
                return Err(ProviderError::from_http(status.as_u16(), text, retry_after.as_deref()));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| ProviderError::DeserializationError(e.to_string()))?;
            Ok(data["content"][0]["text"].as_str().unwrap_or("").to_string())
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "anthropic oracle call failed");
            OperonError::OracleUnavailable(e.to_string())
        })
    }
}
