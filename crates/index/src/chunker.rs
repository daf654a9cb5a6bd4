use std::collections::HashSet;

use regex::Regex;

use crate::graph::SymbolGraph;
use crate::model::{Chunk, Language, SymbolKind};

/// First N characters of source considered for token overlap, per the ranking contract.
const SOURCE_TOKEN_CHARS: usize = 400;

fn tokenize(text: &str) -> HashSet<String> {
    let splitter = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
    splitter
        .split(text)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Returns the source lines `[start..end]` (1-based inclusive) enclosing `symbol_name` in
/// `file_rel_path`. Rust (the primary language) uses the recorded symbol span exactly;
/// other languages fall back to +/-20 lines around the first textual match.
pub fn extract_chunk(
    graph: &SymbolGraph,
    file_rel_path: &str,
    symbol_name: &str,
    file_content: &str,
    language: Language,
) -> Option<Chunk> {
    let lines: Vec<&str> = file_content.lines().collect();

    if language.is_primary() {
        let symbol = graph
            .symbols_in_file(file_rel_path)
            .into_iter()
            .find(|s| s.name == symbol_name)?;
        let start = symbol.start_line.max(1);
        let end = symbol.end_line.min(lines.len().max(1));
        let source = slice_lines(&lines, start, end);
        return Some(Chunk {
            file: file_rel_path.to_string(),
            symbol: symbol_name.to_string(),
            kind: symbol.kind,
            start_line: start,
            end_line: end,
            source,
            docstring: symbol.docstring.clone(),
            score: 0.0,
        });
    }

    let idx = lines.iter().position(|l| l.contains(symbol_name))?;
    let start = idx.saturating_sub(20) + 1;
    let end = (idx + 20 + 1).min(lines.len());
    let source = slice_lines(&lines, start, end);
    Some(Chunk {
        file: file_rel_path.to_string(),
        symbol: symbol_name.to_string(),
        kind: SymbolKind::Variable,
        start_line: start,
        end_line: end,
        source,
        docstring: None,
        score: 0.0,
    })
}

fn slice_lines(lines: &[&str], start: usize, end: usize) -> String {
    if start == 0 || start > lines.len() {
        return String::new();
    }
    let end = end.min(lines.len());
    lines[start - 1..end].join("\n")
}

/// Scores and orders candidate chunks against `query`. Ties break by kind priority
/// (function > class > variable), then smaller span, then lexical file order.
pub fn rank_chunks(query: &str, mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    let q_tokens = tokenize(query);
    for chunk in &mut chunks {
        let truncated: String = chunk.source.chars().take(SOURCE_TOKEN_CHARS).collect();
        let mut tokens = tokenize(&chunk.symbol);
        if let Some(doc) = &chunk.docstring {
            tokens.extend(tokenize(doc));
        }
        tokens.extend(tokenize(&truncated));
        chunk.score = jaccard(&q_tokens, &tokens);
    }
    chunks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| b.kind.priority().cmp(&a.kind.priority()))
            .then_with(|| (a.end_line - a.start_line).cmp(&(b.end_line - b.start_line)))
            .then_with(|| a.file.cmp(&b.file))
    });
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_identical_sets_is_one() {
        let a = tokenize("hello world");
        let b = tokenize("hello world");
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn jaccard_disjoint_sets_is_zero() {
        let a = tokenize("alpha beta");
        let b = tokenize("gamma delta");
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn ranking_prefers_higher_overlap_then_kind_priority() {
        let chunks = vec![
            Chunk {
                file: "b.rs".into(),
                symbol: "helper".into(),
                kind: SymbolKind::Variable,
                start_line: 1,
                end_line: 2,
                source: "let helper = 1;".into(),
                docstring: None,
                score: 0.0,
            },
            Chunk {
                file: "a.rs".into(),
                symbol: "helper".into(),
                kind: SymbolKind::Function,
                start_line: 1,
                end_line: 5,
                source: "fn helper() {}".into(),
                docstring: None,
                score: 0.0,
            },
        ];
        let ranked = rank_chunks("helper", chunks);
        assert_eq!(ranked[0].kind, SymbolKind::Function);
    }

    #[test]
    fn fallback_chunk_uses_window_around_match() {
        let content: String = (1..=50).map(|n| format!("line {n}\n")).collect();
        let lines: Vec<&str> = content.lines().collect();
        let idx = lines.iter().position(|l| l.contains("line 25")).unwrap();
        let start = idx.saturating_sub(20) + 1;
        let end = (idx + 21).min(lines.len());
        assert_eq!(start, 5);
        assert_eq!(end, 45);
    }
}
