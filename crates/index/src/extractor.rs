use crate::model::{Language, SymbolRecord};

mod regex_extractor;
mod rust_extractor;

/// Result of `check_syntax`: either the buffer parses, or it faults at a location.
#[derive(Debug, Clone)]
pub enum SyntaxCheck {
    Ok,
    Error { line: usize, message: String },
}

/// One implementation per language tag, dispatched from a single point (`extract`).
/// Rust gets an authoritative parse via `syn`; everything else is regex best-effort.
pub trait Extractor {
    fn extract(&self, source: &str) -> Vec<SymbolRecord>;
    fn check_syntax(&self, source: &str) -> SyntaxCheck;
}

pub fn extract_symbols(language: Language, source: &str) -> Vec<SymbolRecord> {
    dispatch(language).extract(source)
}

pub fn check_syntax(language: Language, source: &str) -> SyntaxCheck {
    dispatch(language).check_syntax(source)
}

fn dispatch(language: Language) -> Box<dyn Extractor> {
    match language {
        Language::Rust => Box::new(rust_extractor::RustExtractor),
        other => Box::new(regex_extractor::RegexExtractor::for_language(other)),
    }
}
