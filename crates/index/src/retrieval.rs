use crate::chunker::{self, rank_chunks};
use crate::graph::SymbolGraph;
use crate::model::{Chunk, Language};

/// Assembles a bounded context string for `query` by greedily filling `char_budget`
/// with the highest-scoring chunks across every tracked symbol. Never splits a chunk
/// across the budget boundary; a chunk that would overflow is dropped whole, and
/// lower-ranked chunks are still tried in case they fit.
pub fn assemble_context(graph: &SymbolGraph, query: &str, char_budget: usize) -> String {
    let candidates = collect_candidates(graph);
    let ranked = rank_chunks(query, candidates);

    let mut out = String::new();
    let mut remaining = char_budget;
    for chunk in ranked {
        let rendered = render_chunk(&chunk);
        if rendered.chars().count() > remaining {
            continue;
        }
        remaining -= rendered.chars().count();
        out.push_str(&rendered);
    }
    out
}

fn render_chunk(chunk: &Chunk) -> String {
    format!(
        "{}:{}-{} ({:?} {})\n{}\n\n",
        chunk.file,
        chunk.start_line,
        chunk.end_line,
        chunk.kind,
        chunk.symbol,
        chunk.source
    )
}

fn collect_candidates(graph: &SymbolGraph) -> Vec<Chunk> {
    let mut files: Vec<&String> = graph.graph().files.keys().collect();
    files.sort();

    let mut chunks = Vec::new();
    for path in files {
        let record = &graph.graph().files[path];
        let content = std::fs::read_to_string(graph.repo_root().join(path)).unwrap_or_default();
        for symbol in &record.symbols {
            if let Some(chunk) = chunk_for_symbol(graph, path, symbol, &content, record.language) {
                chunks.push(chunk);
            }
        }
    }
    chunks
}

fn chunk_for_symbol(
    graph: &SymbolGraph,
    path: &str,
    symbol: &crate::model::SymbolRecord,
    content: &str,
    language: Language,
) -> Option<Chunk> {
    chunker::extract_chunk(graph, path, &symbol.name, content, language)
}
