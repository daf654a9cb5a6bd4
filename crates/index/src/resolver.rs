use std::path::Path;

use crate::graph::SymbolGraph;

/// Outcome of resolving a user-supplied path against the tracked repository files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    pub found: bool,
}

/// Five-tier resolution: exact, case-insensitive, recursive basename, fuzzy stem,
/// symbol lookup. Returns the first tier to hit; `found = false` with the original
/// input when nothing matches, so callers may choose to create the file.
pub fn resolve(graph: &SymbolGraph, input: &str) -> Resolution {
    let tracked: Vec<&String> = graph.graph().files.keys().collect();

    if tracked.iter().any(|p| p.as_str() == input) {
        return Resolution {
            path: input.to_string(),
            found: true,
        };
    }

    let input_lower = input.to_lowercase();
    if let Some(hit) = tracked.iter().find(|p| p.to_lowercase() == input_lower) {
        return Resolution {
            path: (*hit).clone(),
            found: true,
        };
    }

    let basename = Path::new(input)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(input);
    let mut basename_hits: Vec<&String> = tracked
        .iter()
        .filter(|p| {
            Path::new(p.as_str())
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n == basename)
                .unwrap_or(false)
        })
        .copied()
        .collect();
    if !basename_hits.is_empty() {
        basename_hits.sort_by_key(|p| p.len());
        return Resolution {
            path: basename_hits[0].clone(),
            found: true,
        };
    }

    let stem = normalize_stem(input);
    let mut stem_hits: Vec<(&String, usize)> = tracked
        .iter()
        .filter_map(|p| {
            let candidate_stem = normalize_stem(p);
            if candidate_stem.contains(&stem) || stem.contains(&candidate_stem) {
                Some((*p, common_prefix_len(&stem, &candidate_stem)))
            } else {
                None
            }
        })
        .collect();
    if !stem_hits.is_empty() {
        stem_hits.sort_by(|a, b| b.1.cmp(&a.1));
        return Resolution {
            path: stem_hits[0].0.clone(),
            found: true,
        };
    }

    if let Some(site) = graph.find_definitions(input).into_iter().next() {
        return Resolution {
            path: site.file,
            found: true,
        };
    }

    Resolution {
        path: input.to_string(),
        found: false,
    }
}

fn normalize_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_lowercase()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
