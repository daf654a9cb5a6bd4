use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};

use crate::extractor;
use crate::model::{FileRecord, Graph, SymbolKind, UsageKind, UsageSite, SCHEMA_VERSION};
use crate::walker::{self, FileEntry};

const GRAPH_FILE: &str = "symbol_graph.json";

pub struct SymbolGraph {
    repo_root: PathBuf,
    graph: Graph,
}

impl SymbolGraph {
    fn graph_path(repo_root: &Path) -> PathBuf {
        repo_root.join(".operon").join(GRAPH_FILE)
    }

    /// Returns the persisted graph, or an empty shell stamped with the current schema
    /// version. A schema mismatch discards the stale document and starts fresh.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = Self::graph_path(repo_root);
        let graph = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Graph>(&content) {
                Ok(g) if g.schema_version == SCHEMA_VERSION => g,
                _ => Graph::empty(),
            },
            Err(_) => Graph::empty(),
        };
        Ok(SymbolGraph {
            repo_root: repo_root.to_path_buf(),
            graph,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Walks the repo, re-extracting only files whose hash changed (or all files when
    /// `incremental` is false), drops vanished files, then persists atomically.
    pub fn build(&mut self, incremental: bool) -> Result<()> {
        let entries = walker::walk_project(&self.repo_root)?;
        let seen: std::collections::HashSet<String> =
            entries.iter().map(|e| e.rel_path.clone()).collect();

        self.graph.files.retain(|path, _| seen.contains(path));

        for entry in &entries {
            let up_to_date = incremental
                && self
                    .graph
                    .files
                    .get(&entry.rel_path)
                    .map(|r| r.hash == entry.hash)
                    .unwrap_or(false);
            if up_to_date {
                continue;
            }
            let record = extract_file_record(entry)?;
            self.graph.files.insert(entry.rel_path.clone(), record);
        }

        self.rebuild_cross_refs();
        self.persist()
    }

    fn rebuild_cross_refs(&mut self) {
        let mut cross: HashMap<String, Vec<UsageSite>> = HashMap::new();
        let mut files: Vec<_> = self.graph.files.keys().cloned().collect();
        files.sort();
        for path in files {
            let record = &self.graph.files[&path];
            for symbol in &record.symbols {
                let kind = match symbol.kind {
                    SymbolKind::Import => UsageKind::Import,
                    _ => UsageKind::Definition,
                };
                cross.entry(symbol.name.clone()).or_default().push(UsageSite {
                    symbol: symbol.name.clone(),
                    file: path.clone(),
                    line: symbol.start_line,
                    kind,
                });
            }
            for usage in &record.usages {
                cross.entry(usage.symbol.clone()).or_default().push(usage.clone());
            }
        }
        self.graph.cross_refs = cross;
    }

    fn persist(&self) -> Result<()> {
        let dir = self.repo_root.join(".operon");
        std::fs::create_dir_all(&dir).context("creating .operon directory")?;
        let path = Self::graph_path(&self.repo_root);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&self.graph)?;
        std::fs::write(&tmp, body).context("writing temporary graph file")?;
        std::fs::rename(&tmp, &path).context("renaming temporary graph file into place")?;
        Ok(())
    }

    pub fn query(&self, name: &str) -> Vec<UsageSite> {
        self.graph.cross_refs.get(name).cloned().unwrap_or_default()
    }

    pub fn find_definitions(&self, name: &str) -> Vec<UsageSite> {
        self.query(name)
            .into_iter()
            .filter(|u| u.kind == UsageKind::Definition)
            .collect()
    }

    pub fn find_usages(&self, name: &str) -> Vec<UsageSite> {
        self.query(name)
            .into_iter()
            .filter(|u| u.kind != UsageKind::Definition)
            .collect()
    }

    pub fn symbols_in_file(&self, path: &str) -> Vec<&crate::model::SymbolRecord> {
        self.graph
            .files
            .get(path)
            .map(|r| r.symbols.iter().collect())
            .unwrap_or_default()
    }

    /// Case-insensitive: the only lookup tier the spec calls out as such.
    pub fn search_by_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut hits: Vec<String> = self
            .graph
            .cross_refs
            .keys()
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        hits.sort();
        hits
    }
}

fn extract_file_record(entry: &FileEntry) -> Result<FileRecord> {
    let content = std::fs::read_to_string(&entry.abs_path).unwrap_or_default();
    let symbols = extractor::extract_symbols(entry.language, &content);
    let parse_error = match extractor::check_syntax(entry.language, &content) {
        crate::extractor::SyntaxCheck::Ok => None,
        crate::extractor::SyntaxCheck::Error { line, message } => {
            Some(format!("{message} (line {line})"))
        }
    };
    let modified_unix = entry
        .modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(FileRecord {
        rel_path: entry.rel_path.clone(),
        hash: entry.hash.clone(),
        language: entry.language,
        modified_unix,
        symbols,
        usages: Vec::new(),
        parse_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn build_then_load_round_trips_and_is_current() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs", "fn one() {}\n");

        let mut graph = SymbolGraph::load(dir.path()).unwrap();
        graph.build(false).unwrap();
        assert!(graph.graph().files.contains_key("a.rs"));

        let reloaded = SymbolGraph::load(dir.path()).unwrap();
        assert_eq!(reloaded.graph().files["a.rs"].hash, graph.graph().files["a.rs"].hash);

        let disk_hash = crate::walker::hash_content(
            std::fs::read(dir.path().join("a.rs")).unwrap().as_slice(),
        );
        assert_eq!(reloaded.graph().files["a.rs"].hash, disk_hash);
    }

    #[test]
    fn incremental_build_skips_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs", "fn one() {}\n");
        let mut graph = SymbolGraph::load(dir.path()).unwrap();
        graph.build(false).unwrap();

        write(dir.path(), "b.rs", "fn two() {}\n");
        graph.build(true).unwrap();

        assert!(graph.graph().files.contains_key("a.rs"));
        assert!(graph.graph().files.contains_key("b.rs"));
    }

    #[test]
    fn vanished_files_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs", "fn one() {}\n");
        let mut graph = SymbolGraph::load(dir.path()).unwrap();
        graph.build(false).unwrap();
        std::fs::remove_file(dir.path().join("a.rs")).unwrap();
        graph.build(true).unwrap();
        assert!(!graph.graph().files.contains_key("a.rs"));
    }

    #[test]
    fn definitions_and_usages_partition_query() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs", "fn one() {}\n");
        let mut graph = SymbolGraph::load(dir.path()).unwrap();
        graph.build(false).unwrap();

        let all = graph.query("one");
        let defs = graph.find_definitions("one");
        let uses = graph.find_usages("one");
        assert_eq!(defs.len() + uses.len(), all.len());
        assert!(defs.iter().all(|u| !uses.contains(u)));
    }

    #[test]
    fn schema_mismatch_triggers_rebuild_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".operon")).unwrap();
        std::fs::write(
            dir.path().join(".operon").join("symbol_graph.json"),
            r#"{"schema_version":999,"files":{},"cross_refs":{}}"#,
        )
        .unwrap();
        let graph = SymbolGraph::load(dir.path()).unwrap();
        assert!(graph.graph().files.is_empty());
        assert_eq!(graph.graph().schema_version, SCHEMA_VERSION);
    }
}
