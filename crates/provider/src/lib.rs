//! Oracle transports. `operon-core` owns the `Oracle` trait; this crate supplies the
//! concrete HTTP backends, selected and reconfigured from `operon-config::Config`.

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod retry;

use std::path::Path;
use std::sync::Arc;

use operon_core::Oracle;

use crate::anthropic::AnthropicOracle;
use crate::openai::OpenAIOracle;

/// Picks the transport named by `Config::provider`. Re-reads the config on every
/// `Oracle::call`, so a provider switch takes effect without restarting the agent.
pub fn oracle_for_config(repo_root: &Path, provider: &str) -> Arc<dyn Oracle> {
    match provider {
        "openai" => Arc::new(OpenAIOracle::new(repo_root.to_path_buf())),
        _ => Arc::new(AnthropicOracle::new(repo_root.to_path_buf())),
    }
}
