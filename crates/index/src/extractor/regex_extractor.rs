use regex::Regex;

use crate::model::{Language, SymbolKind, SymbolRecord};

use super::{Extractor, SyntaxCheck};

/// Best-effort, non-authoritative shapes for secondary languages. Never panics, never
/// reports a parse fault — `check_syntax` is permissively "looks ok" by contract.
pub struct RegexExtractor {
    language: Language,
    function_re: Regex,
    class_re: Regex,
    import_re: Regex,
}

impl RegexExtractor {
    pub fn for_language(language: Language) -> Self {
        let (function_pat, class_pat, import_pat) = match language {
            Language::Python => (
                r"^\s*(async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(",
                r"^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)",
                r"^\s*(?:import|from)\s+([A-Za-z0-9_.]+)",
            ),
            Language::JavaScript | Language::TypeScript => (
                r"^\s*(?:export\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\(",
                r"^\s*(?:export\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)",
                r#"^\s*import\s+.*from\s+['"]([^'"]+)['"]"#,
            ),
            Language::Go => (
                r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\(",
                r"^\s*type\s+([A-Za-z_][A-Za-z0-9_]*)\s+struct",
                r#"^\s*import\s+"([^"]+)""#,
            ),
            Language::Java => (
                r"^\s*(?:public|private|protected)?\s*(?:static\s+)?[\w<>\[\]]+\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(",
                r"^\s*(?:public\s+)?(?:class|interface)\s+([A-Za-z_][A-Za-z0-9_]*)",
                r"^\s*import\s+([A-Za-z0-9_.]+);",
            ),
            Language::C | Language::Cpp => (
                r"^\s*[\w:<>\*&\s]+\s+([A-Za-z_][A-Za-z0-9_]*)\s*\([^;{]*\)\s*\{",
                r"^\s*(?:class|struct)\s+([A-Za-z_][A-Za-z0-9_]*)",
                r#"^\s*#include\s*[<"]([^">]+)[">]"#,
            ),
            Language::Ruby => (
                r"^\s*def\s+([A-Za-z_][A-Za-z0-9_?!]*)",
                r"^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)",
                r#"^\s*require(?:_relative)?\s+['"]([^'"]+)['"]"#,
            ),
            Language::Rust => unreachable!("rust has an authoritative extractor"),
        };
        RegexExtractor {
            language,
            function_re: Regex::new(function_pat).unwrap(),
            class_re: Regex::new(class_pat).unwrap(),
            import_re: Regex::new(import_pat).unwrap(),
        }
    }
}

impl Extractor for RegexExtractor {
    fn extract(&self, source: &str) -> Vec<SymbolRecord> {
        let _ = self.language;
        let mut symbols = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let lineno = idx + 1;
            if let Some(caps) = self.function_re.captures(line) {
                let name = caps
                    .iter()
                    .skip(1)
                    .filter_map(|m| m)
                    .last()
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                if !name.is_empty() {
                    symbols.push(SymbolRecord {
                        kind: SymbolKind::Function,
                        name,
                        start_line: lineno,
                        end_line: lineno,
                        signature: None,
                        docstring: None,
                        parent_class: None,
                        is_async: line.contains("async"),
                    });
                    continue;
                }
            }
            if let Some(caps) = self.class_re.captures(line) {
                if let Some(m) = caps.get(1) {
                    symbols.push(SymbolRecord {
                        kind: SymbolKind::Class,
                        name: m.as_str().to_string(),
                        start_line: lineno,
                        end_line: lineno,
                        signature: None,
                        docstring: None,
                        parent_class: None,
                        is_async: false,
                    });
                    continue;
                }
            }
            if let Some(caps) = self.import_re.captures(line) {
                if let Some(m) = caps.get(1) {
                    symbols.push(SymbolRecord {
                        kind: SymbolKind::Import,
                        name: m.as_str().to_string(),
                        start_line: lineno,
                        end_line: lineno,
                        signature: None,
                        docstring: None,
                        parent_class: None,
                        is_async: false,
                    });
                }
            }
        }
        symbols
    }

    fn check_syntax(&self, _source: &str) -> SyntaxCheck {
        SyntaxCheck::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_functions_and_classes() {
        let src = "class Foo:\n    def bar(self):\n        pass\n";
        let symbols = RegexExtractor::for_language(Language::Python).extract(src);
        assert!(symbols.iter().any(|s| s.name == "Foo" && s.kind == SymbolKind::Class));
        assert!(symbols.iter().any(|s| s.name == "bar" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn go_functions() {
        let src = "func Add(a, b int) int {\n    return a + b\n}\n";
        let symbols = RegexExtractor::for_language(Language::Go).extract(src);
        assert!(symbols.iter().any(|s| s.name == "Add"));
    }

    #[test]
    fn check_syntax_is_always_permissive() {
        let extractor = RegexExtractor::for_language(Language::Python);
        matches!(extractor.check_syntax("not even python ]]]"), SyntaxCheck::Ok);
    }

    #[test]
    fn never_panics_on_empty_input() {
        let extractor = RegexExtractor::for_language(Language::JavaScript);
        assert!(extractor.extract("").is_empty());
    }
}
