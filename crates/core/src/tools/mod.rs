//! Tool dispatch shape for C10, retained from the teacher's `tools/mod.rs`
//! (`Tool`/`ToolContext`/`ToolRegistry`) and narrowed to the CODER/REVIEWER action set
//! of §4.10.

pub mod permission;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::approval::ApprovalGate;
use operon_index::SymbolGraph;

pub use permission::ToolPermission;

#[derive(Debug, Clone)]
pub struct ToolResult {
    pub output: String,
    pub metadata: Value,
}

pub struct ToolContext {
    pub repo_root: PathBuf,
    pub index: Arc<Mutex<SymbolGraph>>,
    pub approval_gate: ApprovalGate,
    pub files_read: Arc<Mutex<Vec<String>>>,
    pub files_modified: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn permission(&self) -> ToolPermission;
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}
