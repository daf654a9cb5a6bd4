//! CLI surface (§6). Each function returns a process exit code per the table; all are
//! deterministic lookups over the symbol graph, not agent-loop operations.

use std::path::Path;

use regex::Regex;

use operon_core::Oracle;
use operon_index::model::SymbolKind;
use operon_index::{chunker, resolver, SymbolGraph};

pub const EXIT_OK: i32 = 0;
pub const EXIT_MISS: i32 = 2;
pub const EXIT_FAILURE: i32 = 3;

fn format_signature(sig: &Option<Vec<String>>) -> String {
    match sig {
        Some(params) => format!("({})", params.join(", ")),
        None => String::new(),
    }
}

pub fn explain_symbol(graph: &SymbolGraph, name: &str) -> i32 {
    let defs = graph.find_definitions(name);
    if defs.is_empty() {
        println!("no definition found for `{name}`");
        return EXIT_MISS;
    }
    for def in &defs {
        let Some(record) = graph.graph().files.get(&def.file) else {
            continue;
        };
        let Some(symbol) = record.symbols.iter().find(|s| s.name == name) else {
            continue;
        };
        println!(
            "{}:{}-{} {:?} {}{}",
            def.file,
            symbol.start_line,
            symbol.end_line,
            symbol.kind,
            name,
            format_signature(&symbol.signature)
        );
        if let Some(doc) = &symbol.docstring {
            println!("  {doc}");
        }
    }
    let callers = graph.find_usages(name);
    if callers.is_empty() {
        println!("no callers found");
    } else {
        println!("callers:");
        for usage in callers {
            println!("  {}:{}", usage.file, usage.line);
        }
    }
    EXIT_OK
}

pub fn explain_location(graph: &SymbolGraph, file: &str, line: usize) -> i32 {
    let resolution = resolver::resolve(graph, file);
    if !resolution.found {
        println!("no tracked file matches `{file}`");
        return EXIT_MISS;
    }
    let Some(record) = graph.graph().files.get(&resolution.path) else {
        return EXIT_MISS;
    };
    let enclosing = record
        .symbols
        .iter()
        .filter(|s| s.start_line <= line && line <= s.end_line)
        .min_by_key(|s| s.end_line - s.start_line);

    let Some(symbol) = enclosing else {
        println!("no symbol encloses {file}:{line}");
        return EXIT_MISS;
    };

    let content = std::fs::read_to_string(graph.repo_root().join(&resolution.path)).unwrap_or_default();
    if let Some(chunk) = chunker::extract_chunk(graph, &resolution.path, &symbol.name, &content, record.language) {
        println!("{}:{}-{} {:?} {}", chunk.file, chunk.start_line, chunk.end_line, chunk.kind, chunk.symbol);
        println!("{}", chunk.source);
    }
    EXIT_OK
}

pub fn explain_flow(graph: &SymbolGraph, func: &str) -> i32 {
    let defs = graph.find_definitions(func);
    let Some(def) = defs.first() else {
        println!("no definition found for `{func}`");
        return EXIT_MISS;
    };
    let Some(record) = graph.graph().files.get(&def.file) else {
        return EXIT_MISS;
    };
    let content = std::fs::read_to_string(graph.repo_root().join(&def.file)).unwrap_or_default();
    let Some(chunk) = chunker::extract_chunk(graph, &def.file, func, &content, record.language) else {
        return EXIT_MISS;
    };

    let call_re = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap();
    let mut callees: Vec<String> = call_re
        .captures_iter(&chunk.source)
        .map(|c| c[1].to_string())
        .filter(|name| name != func && graph.graph().cross_refs.contains_key(name))
        .collect();
    callees.sort();
    callees.dedup();

    println!("{func} calls:");
    for callee in &callees {
        println!("  {callee}");
    }
    EXIT_OK
}

pub fn usages(graph: &SymbolGraph, name: &str) -> i32 {
    let sites = graph.query(name);
    if sites.is_empty() {
        println!("no usages found for `{name}`");
        return EXIT_MISS;
    }
    for site in sites {
        println!("{}:{} {:?}", site.file, site.line, site.kind);
    }
    EXIT_OK
}

pub fn rename(graph: &SymbolGraph, old: &str, new: &str, apply: bool) -> i32 {
    let sites = graph.query(old);
    if sites.is_empty() {
        println!("no occurrences of `{old}` found");
        return EXIT_FAILURE;
    }

    let boundary = Regex::new(&format!(r"\b{}\b", regex::escape(old))).unwrap();
    let mut touched_files: Vec<String> = sites.iter().map(|s| s.file.clone()).collect();
    touched_files.sort();
    touched_files.dedup();

    for file in &touched_files {
        let path = graph.repo_root().join(file);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let rewritten = boundary.replace_all(&content, new).to_string();
        if rewritten == content {
            continue;
        }
        if apply {
            let tmp = path.with_extension("operon.tmp");
            if std::fs::write(&tmp, &rewritten).is_err() || std::fs::rename(&tmp, &path).is_err() {
                println!("failed to write {file}");
                return EXIT_FAILURE;
            }
            println!("renamed in {file}");
        } else {
            println!("--- {file} (dry run) ---");
            for (before_line, after_line) in content.lines().zip(rewritten.lines()) {
                if before_line != after_line {
                    println!("- {before_line}\n+ {after_line}");
                }
            }
        }
    }
    EXIT_OK
}

pub async fn docs(graph: &SymbolGraph, no_llm: bool, oracle: Option<&dyn Oracle>) -> i32 {
    let mut files: Vec<&String> = graph.graph().files.keys().collect();
    files.sort();
    for file in files {
        let record = &graph.graph().files[file];
        println!("{file}");
        for symbol in &record.symbols {
            let summary = if !no_llm {
                if let Some(oracle) = oracle {
                    let prompt = format!("In one sentence, summarize what `{}` does.", symbol.name);
                    oracle.call(&prompt, false).await.ok()
                } else {
                    None
                }
            } else {
                None
            };
            let fallback = symbol.docstring.clone().unwrap_or_else(|| "(no docstring)".to_string());
            println!("  {:?} {} - {}", symbol.kind, symbol.name, summary.unwrap_or(fallback));
        }
    }
    EXIT_OK
}

pub fn summarize(graph: &SymbolGraph, file: &str) -> i32 {
    let resolution = resolver::resolve(graph, file);
    if !resolution.found {
        println!("no tracked file matches `{file}`");
        return EXIT_MISS;
    }
    let record = &graph.graph().files[&resolution.path];
    for symbol in &record.symbols {
        let doc = symbol.docstring.clone().unwrap_or_else(|| "(no docstring)".to_string());
        println!(
            "{}-{} {:?} {}{}: {doc}",
            symbol.start_line,
            symbol.end_line,
            symbol.kind,
            symbol.name,
            format_signature(&symbol.signature)
        );
    }
    EXIT_OK
}

pub fn signature(graph: &SymbolGraph, func: &str, params: &str, apply: bool) -> i32 {
    let defs = graph.find_definitions(func);
    let Some(def) = defs.iter().find(|d| {
        graph
            .graph()
            .files
            .get(&d.file)
            .map(|r| r.symbols.iter().any(|s| s.name == func && s.kind == SymbolKind::Function))
            .unwrap_or(false)
    }) else {
        println!("no function definition found for `{func}`");
        return EXIT_FAILURE;
    };

    let path = graph.repo_root().join(&def.file);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return EXIT_FAILURE;
    };

    let def_re = Regex::new(&format!(r"fn\s+{}\s*\([^)]*\)", regex::escape(func))).ok();
    let Some(def_re) = def_re else {
        return EXIT_FAILURE;
    };
    let Some(matched) = def_re.find(&content) else {
        println!("could not locate signature text for `{func}`");
        return EXIT_FAILURE;
    };

    let replacement = format!("fn {func}({params})");
    let rewritten = format!("{}{}{}", &content[..matched.start()], replacement, &content[matched.end()..]);

    if let operon_index::extractor::SyntaxCheck::Error { line, message } =
        operon_index::extractor::check_syntax(operon_index::Language::Rust, &rewritten)
    {
        println!("syntax_reject: {message} (line {line})");
        return EXIT_FAILURE;
    }

    if apply {
        let tmp = path.with_extension("operon.tmp");
        if std::fs::write(&tmp, &rewritten).is_err() || std::fs::rename(&tmp, &path).is_err() {
            return EXIT_FAILURE;
        }
        println!("updated signature of {func} in {}", def.file);
    } else {
        println!("--- {} (dry run) ---", def.file);
        println!("- {}", matched.as_str());
        println!("+ {replacement}");
    }
    EXIT_OK
}

pub fn resolve_file_line(input: &str) -> Option<(String, usize)> {
    let (file, line) = input.rsplit_once(':')?;
    let line: usize = line.parse().ok()?;
    Some((file.to_string(), line))
}

pub fn repo_root_or_cwd(explicit: Option<String>) -> std::path::PathBuf {
    explicit.map(std::path::PathBuf::from).unwrap_or_else(|| {
        std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf())
    })
}
