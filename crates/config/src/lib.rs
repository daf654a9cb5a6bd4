use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// `<repo>/.operon/llm_config.json` — oracle provider selection and credentials.
/// Hot-reloaded on every oracle call, per the external-interfaces contract, so this
/// type carries no cached state beyond what was just read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    /// Headless mode auto-approves edits iff explicitly set here (§4.6).
    #[serde(default)]
    pub auto_approve: bool,
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "default".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_s() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_s: default_timeout_s(),
            auto_approve: false,
        }
    }
}

impl Config {
    pub fn config_dir(repo_root: &Path) -> PathBuf {
        repo_root.join(".operon")
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        Self::config_dir(repo_root).join("llm_config.json")
    }

    /// Missing config is not an error: defaults apply until the user writes one.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = Self::config_path(repo_root);
        if path.exists() {
            let content =
                std::fs::read_to_string(&path).context("failed to read llm_config.json")?;
            serde_json::from_str(&content).context("failed to parse llm_config.json")
        } else {
            Ok(Self::default())
        }
    }

    pub fn ensure_dirs(repo_root: &Path) -> Result<()> {
        std::fs::create_dir_all(Self::config_dir(repo_root))?;
        Ok(())
    }

    pub fn save(&self, repo_root: &Path) -> Result<()> {
        Self::ensure_dirs(repo_root)?;
        let path = Self::config_path(repo_root);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(&tmp, body).context("failed to write llm_config.json")?;
        std::fs::rename(&tmp, &path).context("failed to rename llm_config.json into place")?;
        Ok(())
    }
}
