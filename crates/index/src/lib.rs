//! The intelligence index: file walking, symbol extraction, the persisted symbol
//! graph, chunk ranking, path resolution, and context retrieval (C1-C5, C12).

pub mod chunker;
pub mod extractor;
pub mod graph;
pub mod model;
pub mod resolver;
pub mod retrieval;
pub mod walker;

pub use graph::SymbolGraph;
pub use model::{Chunk, FileRecord, Graph, Language, SymbolKind, SymbolRecord, UsageKind, UsageSite};
pub use resolver::Resolution;
