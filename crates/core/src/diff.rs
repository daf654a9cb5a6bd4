//! SEARCH/REPLACE fenced-block diff engine (C6). Generalizes the teacher's
//! line-splicing, whole-file-rollback-on-failure idiom (`tools/apply_patch.rs`) to a
//! whitespace-tolerant match with indentation re-alignment, which neither teacher tool did.

const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
const SEPARATOR: &str = "=======";
const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Ok,
    Noop,
    Appended,
    NoMatch,
    Ambiguous,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub search: String,
    pub replace: String,
}

/// Parses one or more fenced SEARCH/REPLACE triplets out of an oracle/fast-path payload.
pub fn parse_blocks(payload: &str) -> Vec<Block> {
    let lines: Vec<&str> = payload.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim() == SEARCH_MARKER {
            let mut search_lines = Vec::new();
            i += 1;
            while i < lines.len() && lines[i].trim() != SEPARATOR {
                search_lines.push(lines[i]);
                i += 1;
            }
            i += 1; // skip separator
            let mut replace_lines = Vec::new();
            while i < lines.len() && lines[i].trim() != REPLACE_MARKER {
                replace_lines.push(lines[i]);
                i += 1;
            }
            i += 1; // skip replace marker
            blocks.push(Block {
                search: join_with_trailing_newline(&search_lines),
                replace: join_with_trailing_newline(&replace_lines),
            });
        } else {
            i += 1;
        }
    }
    blocks
}

fn join_with_trailing_newline(lines: &[&str]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

/// Applies every parsed block left-to-right against successive intermediate results.
/// Stops at the first block that doesn't yield `Ok`/`Noop`/`Appended` and surfaces that
/// block's reason.
pub fn apply_payload(original: &str, payload: &str) -> (Option<String>, Reason) {
    let blocks = parse_blocks(payload);
    let mut current = original.to_string();
    let mut last_reason = Reason::Noop;
    for block in &blocks {
        let (patched, reason) = apply_one(&current, &block.search, &block.replace);
        match reason {
            Reason::Ok | Reason::Appended => {
                current = patched.unwrap();
                last_reason = reason;
            }
            Reason::Noop => {
                last_reason = reason;
            }
            Reason::NoMatch | Reason::Ambiguous => return (None, reason),
        }
    }
    (Some(current), last_reason)
}

/// The core single-block matcher described in §4.5.
pub fn apply_one(original: &str, search: &str, replace: &str) -> (Option<String>, Reason) {
    if search.is_empty() {
        let mut patched = replace.to_string();
        patched.push_str(original);
        return (Some(patched), Reason::Appended);
    }

    let (orig_lines, orig_ends_nl) = lines_and_trailing_newline(original);
    let (search_lines, _) = lines_and_trailing_newline(search);

    match find_unique_range(&orig_lines, &search_lines, false) {
        MatchOutcome::Unique(range) => splice(original, &orig_lines, orig_ends_nl, range, replace),
        MatchOutcome::None => match find_unique_range(&orig_lines, &search_lines, true) {
            MatchOutcome::Unique(range) => {
                splice(original, &orig_lines, orig_ends_nl, range, replace)
            }
            MatchOutcome::None => (None, Reason::NoMatch),
            MatchOutcome::Multiple => (None, Reason::Ambiguous),
        },
        MatchOutcome::Multiple => (None, Reason::Ambiguous),
    }
}

enum MatchOutcome {
    Unique(std::ops::Range<usize>),
    None,
    Multiple,
}

fn find_unique_range(orig: &[&str], search: &[&str], tolerant: bool) -> MatchOutcome {
    if search.is_empty() || orig.len() < search.len() {
        return MatchOutcome::None;
    }
    let normalize = |s: &str| -> String {
        if tolerant {
            s.trim().to_string()
        } else {
            s.trim_end().to_string()
        }
    };
    let norm_search: Vec<String> = search.iter().map(|s| normalize(s)).collect();

    let mut hits = Vec::new();
    for start in 0..=(orig.len() - search.len()) {
        let window = &orig[start..start + search.len()];
        if window.iter().map(|s| normalize(s)).collect::<Vec<_>>() == norm_search {
            hits.push(start..(start + search.len()));
        }
    }
    match hits.len() {
        0 => MatchOutcome::None,
        1 => MatchOutcome::Unique(hits.remove(0)),
        _ => MatchOutcome::Multiple,
    }
}

fn splice(
    original: &str,
    orig_lines: &[&str],
    orig_ends_nl: bool,
    range: std::ops::Range<usize>,
    replace: &str,
) -> (Option<String>, Reason) {
    let indent = leading_whitespace(orig_lines[range.start]);
    let (replace_lines, _) = lines_and_trailing_newline(replace);
    let replace_min_indent = replace_lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l).len())
        .min()
        .unwrap_or(0);

    let reindented: Vec<String> = replace_lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                let stripped = &line[replace_min_indent.min(line.len())..];
                format!("{indent}{stripped}")
            }
        })
        .collect();

    let mut out_lines: Vec<String> = Vec::new();
    out_lines.extend(orig_lines[..range.start].iter().map(|s| s.to_string()));
    out_lines.extend(reindented);
    out_lines.extend(orig_lines[range.end..].iter().map(|s| s.to_string()));

    let mut patched = out_lines.join("\n");
    if orig_ends_nl {
        patched.push('\n');
    }

    if patched == original {
        (Some(patched), Reason::Noop)
    } else {
        (Some(patched), Reason::Ok)
    }
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').collect()
}

/// Splits on `\n` into plain content lines (no newline characters retained), and reports
/// whether the text ended with a trailing newline so the splice can reproduce it exactly.
fn lines_and_trailing_newline(text: &str) -> (Vec<&str>, bool) {
    if text.is_empty() {
        return (Vec::new(), false);
    }
    let ends_with_newline = text.ends_with('\n');
    let trimmed = if ends_with_newline {
        &text[..text.len() - 1]
    } else {
        text
    };
    (trimmed.split('\n').collect(), ends_with_newline)
}

pub fn insert_import(original: &str, import_line: &str) -> (Option<String>, Reason) {
    apply_one(original, "", &format!("{import_line}\n"))
}

pub fn append_to_file(original: &str, text: &str) -> (Option<String>, Reason) {
    apply_one(original, "", text)
}

pub fn insert_above(original: &str, target_line: &str, text: &str) -> (Option<String>, Reason) {
    apply_one(original, target_line, &format!("{text}\n{target_line}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_append_import_absent_search() {
        let orig = "def f():\n    pass\n";
        let (patched, reason) = apply_one(orig, "", "import json\n");
        assert_eq!(reason, Reason::Appended);
        assert_eq!(patched.unwrap(), "import json\ndef f():\n    pass\n");
    }

    #[test]
    fn scenario_indented_rewrite_reindents_replace() {
        let orig = "class A:\n    def m(self):\n        return 1\n";
        let search = "def m(self):\n    return 1";
        let replace = "def m(self):\n    return 2";
        let (patched, reason) = apply_one(orig, search, replace);
        assert_eq!(reason, Reason::Ok);
        assert_eq!(patched.unwrap(), "class A:\n    def m(self):\n        return 2\n");
    }

    #[test]
    fn scenario_ambiguous_match() {
        let orig = "def f():\n    return 1\n\ndef g():\n    return 1\n";
        let (patched, reason) = apply_one(orig, "return 1", "return 2");
        assert_eq!(reason, Reason::Ambiguous);
        assert!(patched.is_none());
    }

    #[test]
    fn no_match_when_search_absent() {
        let orig = "def f():\n    pass\n";
        let (patched, reason) = apply_one(orig, "nonexistent text", "replacement");
        assert_eq!(reason, Reason::NoMatch);
        assert!(patched.is_none());
    }

    #[test]
    fn identical_replace_yields_noop() {
        let orig = "x = 1\n";
        let (_, reason) = apply_one(orig, "x = 1", "x = 1");
        assert_eq!(reason, Reason::Noop);
    }

    #[test]
    fn trailing_whitespace_tolerant_match() {
        let orig = "def f():   \n    pass\n";
        let (patched, reason) = apply_one(orig, "def f():\n    pass", "def f():\n    return 1");
        assert_eq!(reason, Reason::Ok);
        assert!(patched.unwrap().contains("return 1"));
    }

    #[test]
    fn round_trip_reverse_application_restores_indentation() {
        let orig = "class A:\n    def m(self):\n        return 1\n";
        let search = "def m(self):\n    return 1";
        let replace = "def m(self):\n    return 2";
        let (patched, reason) = apply_one(orig, search, replace);
        assert_eq!(reason, Reason::Ok);
        let patched = patched.unwrap();

        let (reverted, reason2) = apply_one(&patched, replace, search);
        assert_eq!(reason2, Reason::Ok);
        assert_eq!(reverted.unwrap(), orig);
    }

    #[test]
    fn multi_block_payload_applies_left_to_right() {
        let orig = "a = 1\nb = 2\n";
        let payload = "<<<<<<< SEARCH\na = 1\n=======\na = 10\n>>>>>>> REPLACE\n\
                       <<<<<<< SEARCH\nb = 2\n=======\nb = 20\n>>>>>>> REPLACE\n";
        let (patched, reason) = apply_payload(orig, payload);
        assert_eq!(reason, Reason::Ok);
        assert_eq!(patched.unwrap(), "a = 10\nb = 20\n");
    }
}
