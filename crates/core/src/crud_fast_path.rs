//! CRUD fast path (§4.10): before asking the oracle to rewrite a function, classify the
//! goal against a pattern library. A match skips the oracle call entirely.

use regex::Regex;

use crate::model::ValidatorRule;

/// Returns a SEARCH/REPLACE payload when the goal matches a deterministic pattern for
/// this step's validator rule; `None` falls through to the oracle.
pub fn classify(goal: &str, rule: &ValidatorRule, original: &str) -> Option<String> {
    match rule {
        ValidatorRule::AddImport { name } => Some(block("", &import_line(name))),
        ValidatorRule::DeleteLines { start, end } => delete_lines(original, *start, *end),
        ValidatorRule::UpdateAssignment { name, value } => update_assignment(original, name, value),
        ValidatorRule::AddComment { text } => Some(block("", &format!("// {text}\n"))),
        ValidatorRule::NontrivialDiff => wrap_block(goal, original),
    }
}

fn import_line(name: &str) -> String {
    if name.contains("::") {
        format!("use {name};\n")
    } else {
        format!("import {name}\n")
    }
}

fn delete_lines(original: &str, start: usize, end: usize) -> Option<String> {
    let lines: Vec<&str> = original.lines().collect();
    if start == 0 || start > end || end > lines.len() {
        return None;
    }
    let search: String = lines[start - 1..end].join("\n");
    Some(block(&search, ""))
}

fn update_assignment(original: &str, name: &str, value: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r"(?m)^(\s*{}\s*=\s*)\S+.*$", regex::escape(name))).ok()?;
    let line = original.lines().find(|l| pattern.is_match(l))?;
    let caps = pattern.captures(line)?;
    let replacement = format!("{}{}", &caps[1], value);
    Some(block(line, &replacement))
}

fn wrap_block(goal: &str, original: &str) -> Option<String> {
    let re = Regex::new(r"(?i)wrap (.+) in (.+)").ok()?;
    let caps = re.captures(goal)?;
    let target = caps[1].trim();
    let wrapper = caps[2].trim();
    let line = original.lines().find(|l| l.contains(target))?;
    let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
    let replacement = format!("{indent}{wrapper} {{\n{indent}    {}\n{indent}}}", line.trim());
    Some(block(line, &replacement))
}

/// Omits the interior line entirely for an empty section, rather than emitting a blank
/// line `parse_blocks` would read back as a one-element `[""]` section.
fn block(search: &str, replace: &str) -> String {
    let mut out = String::from("<<<<<<< SEARCH\n");
    if !search.is_empty() {
        out.push_str(search);
        out.push('\n');
    }
    out.push_str("=======\n");
    if !replace.is_empty() {
        out.push_str(replace);
        out.push('\n');
    }
    out.push_str(">>>>>>> REPLACE\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_lines_produces_exact_block() {
        let original = "a\nb\nc\nd\ne\n";
        let payload = delete_lines(original, 2, 4).unwrap();
        assert!(payload.contains("b\nc\nd"));
    }

    #[test]
    fn add_import_uses_rust_syntax_for_paths() {
        let line = import_line("std::collections::HashMap");
        assert_eq!(line, "use std::collections::HashMap;\n");
    }

    #[test]
    fn add_import_uses_plain_syntax_without_path_separator() {
        let line = import_line("json");
        assert_eq!(line, "import json\n");
    }

    #[test]
    fn update_assignment_finds_and_rewrites_binding() {
        let original = "x = 1\ny = 2\n";
        let payload = update_assignment(original, "x", "42").unwrap();
        assert!(payload.contains("x = 1"));
        assert!(payload.contains("x = 42"));
    }

    #[test]
    fn nontrivial_diff_rule_falls_through_without_wrap_goal() {
        assert!(classify("refactor this please", &ValidatorRule::NontrivialDiff, "x = 1\n").is_none());
    }

    #[test]
    fn wrap_goal_matches_nontrivial_diff_rule() {
        let original = "risky_call();\n";
        let payload = wrap_block("wrap risky_call() in a try block", original).unwrap();
        assert!(payload.contains("a try block {"));
    }

    #[test]
    fn add_comment_payload_round_trips_through_parse_blocks_as_append() {
        let payload = block("", "// hi\n");
        let blocks = crate::diff::parse_blocks(&payload);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].search.is_empty(), "empty section must not round-trip to \"\\n\"");
        assert_eq!(blocks[0].replace, "// hi\n");

        let (patched, reason) = crate::diff::apply_payload("fn a() {}\n", &payload);
        assert_eq!(reason, crate::diff::Reason::Appended);
        assert_eq!(patched.unwrap(), "// hi\nfn a() {}\n");
    }

    #[test]
    fn delete_lines_payload_removes_exactly_the_deleted_lines() {
        let original = "a\nb\nc\nd\ne\n";
        let payload = delete_lines(original, 2, 4).unwrap();
        let blocks = crate::diff::parse_blocks(&payload);
        assert!(blocks[0].replace.is_empty(), "empty section must not round-trip to \"\\n\"");

        let (patched, reason) = crate::diff::apply_payload(original, &payload);
        assert_eq!(reason, crate::diff::Reason::Ok);
        let patched = patched.unwrap();
        assert_eq!(patched, "a\ne\n");
        assert_eq!(
            original.lines().count() - patched.lines().count(),
            3,
            "deleting lines 2-4 must leave exactly 3 fewer lines"
        );
    }
}
