use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::model::Language;

const MAX_FILES: usize = 50_000;
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// One tracked file as seen on disk, with its content hash already computed.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub hash: String,
    pub language: Language,
    pub modified: SystemTime,
}

pub fn walk_project(root: &Path) -> Result<Vec<FileEntry>> {
    let gitignore = load_gitignore(root);
    let mut entries = Vec::new();
    walk_dir(root, root, &gitignore, &mut entries);
    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entries)
}

pub fn hash_content(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn walk_dir(root: &Path, dir: &Path, gitignore: &[String], out: &mut Vec<FileEntry>) {
    if out.len() >= MAX_FILES || !dir.is_dir() {
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    let mut names: Vec<_> = entries.flatten().collect();
    names.sort_by_key(|e| e.file_name());

    for entry in names {
        if out.len() >= MAX_FILES {
            return;
        }
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if should_skip(&name_str) {
            continue;
        }

        let rel = match path.strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        if is_ignored(&rel, gitignore) {
            continue;
        }

        if path.is_dir() {
            walk_dir(root, &path, gitignore, out);
        } else if path.is_file() {
            let Some(language) = indexable_language(&path) else {
                continue;
            };
            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if meta.len() > MAX_FILE_SIZE {
                continue;
            }

            let content = match std::fs::read(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };
            if content.iter().take(512).any(|b| *b == 0) {
                continue;
            }

            let hash = hash_content(&content);
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            out.push(FileEntry {
                rel_path: rel,
                abs_path: path,
                hash,
                language,
                modified,
            });
        }
    }
}

fn should_skip(name: &str) -> bool {
    name.starts_with('.')
        || matches!(
            name,
            "node_modules"
                | "target"
                | "__pycache__"
                | "vendor"
                | "dist"
                | "build"
                | ".git"
                | ".svn"
                | ".hg"
                | "venv"
                | ".venv"
                | "env"
                | "coverage"
                | ".operon"
        )
}

fn indexable_language(path: &Path) -> Option<Language> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "rs" => Some(Language::Rust),
        "py" => Some(Language::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
        "go" => Some(Language::Go),
        "java" => Some(Language::Java),
        "c" | "h" => Some(Language::C),
        "cpp" | "hpp" | "cc" | "cxx" => Some(Language::Cpp),
        "rb" => Some(Language::Ruby),
        _ => None,
    }
}

fn load_gitignore(root: &Path) -> Vec<String> {
    let path = root.join(".gitignore");
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
            .map(|l| l.trim().to_string())
            .collect(),
        Err(_) => vec![],
    }
}

fn is_ignored(rel_path: &str, gitignore: &[String]) -> bool {
    for pattern in gitignore {
        let pat = pattern.trim_end_matches('/');
        if pat.is_empty() {
            continue;
        }
        if rel_path.starts_with(pat) || rel_path.contains(&format!("/{pat}/")) {
            return true;
        }
        if let Some(ext) = pat.strip_prefix("*.") {
            if rel_path.ends_with(ext) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_deterministic() {
        let h1 = hash_content(b"hello world");
        let h2 = hash_content(b"hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn skip_patterns() {
        assert!(should_skip("node_modules"));
        assert!(should_skip(".git"));
        assert!(should_skip("target"));
        assert!(!should_skip("src"));
    }

    #[test]
    fn indexable_extensions() {
        assert_eq!(indexable_language(Path::new("main.rs")), Some(Language::Rust));
        assert_eq!(indexable_language(Path::new("app.py")), Some(Language::Python));
        assert_eq!(indexable_language(Path::new("image.png")), None);
    }

    #[test]
    fn walk_finds_rust_files_and_respects_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "ignored.rs\n").unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("ignored.rs"), "fn nope() {}\n").unwrap();
        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("target").join("built.rs"), "fn x(){}").unwrap();

        let entries = walk_project(dir.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert!(names.contains(&"main.rs"));
        assert!(!names.contains(&"ignored.rs"));
        assert!(!names.iter().any(|n| n.starts_with("target")));
    }
}
