//! The oracle contract (§6): `operon-core` owns the trait; `operon-provider` supplies
//! concrete transports. This inverts the teacher's `core -> provider` dependency since
//! the oracle is part of the core's required external contract (see DESIGN.md).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OperonError;

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Must not truncate `prompt`. Retrying on malformed JSON is the caller's concern
    /// (see `call_expecting_json`), not the transport's.
    async fn call(&self, prompt: &str, require_json: bool) -> Result<String, OperonError>;
}

const MAX_JSON_RETRIES: u32 = 2;

/// Extracts the first JSON object or array from oracle output, tolerant of fenced code
/// blocks. Retries the whole call up to `MAX_JSON_RETRIES` times on parse failure.
pub async fn call_expecting_json(oracle: &dyn Oracle, prompt: &str) -> Result<Value, OperonError> {
    let mut attempt = 0;
    loop {
        let text = oracle.call(prompt, true).await?;
        match extract_json(&text) {
            Some(value) => return Ok(value),
            None if attempt < MAX_JSON_RETRIES => {
                attempt += 1;
                continue;
            }
            None => {
                return Err(OperonError::OracleUnavailable(
                    "oracle never returned parseable JSON".to_string(),
                ))
            }
        }
    }
}

pub fn extract_json(text: &str) -> Option<Value> {
    let stripped = strip_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(stripped.trim()) {
        return Some(value);
    }
    let start = stripped.find(['{', '['])?;
    let opening = stripped.as_bytes()[start];
    let closing = if opening == b'{' { b'}' } else { b']' };
    let mut depth = 0i32;
    for (i, b) in stripped.as_bytes()[start..].iter().enumerate() {
        if *b == opening {
            depth += 1;
        } else if *b == closing {
            depth -= 1;
            if depth == 0 {
                let candidate = &stripped[start..start + i + 1];
                if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                    return Some(value);
                }
                break;
            }
        }
    }
    None
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_json_object() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn extracts_json_from_fenced_block() {
        let text = "here is the plan:\n```json\n{\"steps\": []}\n```\nthanks";
        let value = extract_json(text).unwrap();
        assert!(value["steps"].is_array());
    }

    #[test]
    fn extracts_first_complete_array_amid_prose() {
        let text = "Sure! [1, 2, 3] is the answer, not [4, 5].";
        let value = extract_json(text).unwrap();
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn returns_none_for_unparseable_text() {
        assert!(extract_json("no json here at all").is_none());
    }

    struct FlakyOracle {
        responses: std::sync::Mutex<Vec<&'static str>>,
    }

    #[async_trait::async_trait]
    impl Oracle for FlakyOracle {
        async fn call(&self, _prompt: &str, _require_json: bool) -> Result<String, OperonError> {
            Ok(self.responses.lock().unwrap().remove(0).to_string())
        }
    }

    #[tokio::test]
    async fn call_expecting_json_retries_until_parseable() {
        let oracle = FlakyOracle {
            responses: std::sync::Mutex::new(vec!["garbage", "still garbage", r#"{"ok": true}"#]),
        };
        let value = call_expecting_json(&oracle, "plan this").await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn call_expecting_json_gives_up_after_bounded_retries() {
        let oracle = FlakyOracle {
            responses: std::sync::Mutex::new(vec!["garbage", "garbage", "garbage"]),
        };
        let result = call_expecting_json(&oracle, "plan this").await;
        assert!(result.is_err());
    }
}
