use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
}

impl Language {
    /// Only Rust has an authoritative parser; everything else uses the regex fallback.
    pub fn is_primary(self) -> bool {
        matches!(self, Language::Rust)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Import,
    Decorator,
    Comment,
    Assignment,
    Annotation,
}

impl SymbolKind {
    /// Used by the chunk ranker's tie-break: function > class > variable > everything else.
    pub fn priority(self) -> u8 {
        match self {
            SymbolKind::Function => 3,
            SymbolKind::Class => 2,
            SymbolKind::Variable => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub kind: SymbolKind,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub signature: Option<Vec<String>>,
    pub docstring: Option<String>,
    pub parent_class: Option<String>,
    pub is_async: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageKind {
    Definition,
    Call,
    Reference,
    Attribute,
    Import,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSite {
    pub symbol: String,
    pub file: String,
    pub line: usize,
    pub kind: UsageKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub rel_path: String,
    pub hash: String,
    pub language: Language,
    /// Unix seconds; informational only, never consulted for staleness.
    pub modified_unix: u64,
    pub symbols: Vec<SymbolRecord>,
    /// Per-file usage index: names referenced from this file's own usage sites.
    pub usages: Vec<UsageSite>,
    /// Set when the primary-language parser faulted; never omits the record itself.
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub schema_version: u32,
    pub files: HashMap<String, FileRecord>,
    /// symbol name -> ordered usage sites across the whole repo.
    pub cross_refs: HashMap<String, Vec<UsageSite>>,
}

impl Default for Graph {
    fn default() -> Self {
        Graph {
            schema_version: SCHEMA_VERSION,
            files: HashMap::new(),
            cross_refs: HashMap::new(),
        }
    }
}

impl Graph {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub file: String,
    pub symbol: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    pub end_line: usize,
    pub source: String,
    pub docstring: Option<String>,
    pub score: f64,
}
