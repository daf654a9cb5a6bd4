//! OpenAI-compatible oracle transport, generalized from the teacher's `OpenAIProvider`
//! (`provider::openai`) the same way `anthropic.rs` generalizes `AnthropicProvider`. Also
//! serves OpenAI-compatible third parties since only `base_url` changes.

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use operon_core::{Oracle, OperonError};

use crate::error::ProviderError;
use crate::retry::with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIOracle {
    client: reqwest::Client,
    repo_root: std::path::PathBuf,
}

impl OpenAIOracle {
    pub fn new(repo_root: std::path::PathBuf) -> Self {
        OpenAIOracle {
            client: reqwest::Client::new(),
            repo_root,
        }
    }
}

#[async_trait]
impl Oracle for OpenAIOracle {
    async fn call(&self, prompt: &str, require_json: bool) -> Result<String, OperonError> {
        let config = operon_config::Config::load(&self.repo_root)
            .map_err(|e| OperonError::OracleUnavailable(format!("config load failed: {e}")))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| OperonError::OracleUnavailable("no openai api key configured".to_string()))?;
        let base_url = config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = if config.model == "default" {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let mut body = json!({
            "model": model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        if require_json {
            body["response_format"] = json!({"type": "json_object"});
        }

        with_backoff(3, || async {
            let resp = self
                .client
                .post(format!("{base_url}/chat/completions"))
                .bearer_auth(&api_key)
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
            Ok(data["choices"][0]["message"]["content"].as_str().unwrap_or("").to_string())
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "openai oracle call failed");
            OperonError::OracleUnavailable(e.to_string())
        })
    }
}
