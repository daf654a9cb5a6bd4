//! Validator (C9): deterministically checks a post-edit file against a goal-derived rule.

use regex::Regex;

const STOPWORDS: &[&str] = &["the", "a", "an", "to", "in", "of", "please", "and"];

fn lowercase_stopword_filtered(goal: &str) -> String {
    goal.to_lowercase()
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rules are tried in order; the first match decides.
pub fn validate(goal: &str, before: &str, after: &str) -> bool {
    if before == after {
        return false;
    }

    let goal = lowercase_stopword_filtered(goal);

    if let Some(caps) = Regex::new(r"delete lines (\d+)-(\d+)").unwrap().captures(&goal) {
        let a: usize = caps[1].parse().unwrap_or(0);
        let b: usize = caps[2].parse().unwrap_or(0);
        let expected = b.saturating_sub(a) + 1;
        let removed = before.lines().count().saturating_sub(after.lines().count());
        return removed == expected;
    }

    if let Some(caps) = Regex::new(r"add import (\S+)").unwrap().captures(&goal) {
        let token = &caps[1];
        return !before.contains(token) && after.contains(token);
    }

    if let Some(caps) = Regex::new(r"update (\S+)\s*=\s*(\S+)").unwrap().captures(&goal) {
        let name = &caps[1];
        let value = &caps[2];
        let binding = Regex::new(&format!(r"{}\s*=\s*{}", regex::escape(name), regex::escape(value)))
            .unwrap();
        return binding.is_match(after);
    }

    if let Some(caps) = Regex::new(r"add comment (.+)$").unwrap().captures(&goal) {
        let text = caps[1].trim();
        return after.lines().any(|l| l.trim().contains(text));
    }

    nontrivial_diff(before, after)
}

fn nontrivial_diff(before: &str, after: &str) -> bool {
    let before_lines: std::collections::HashSet<&str> =
        before.lines().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    let after_lines: std::collections::HashSet<&str> =
        after.lines().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    !before_lines.symmetric_difference(&after_lines).collect::<Vec<_>>().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_is_rejected() {
        assert!(!validate("anything", "a\n", "a\n"));
    }

    #[test]
    fn delete_lines_rule_counts_removed_lines() {
        let before = "a\nb\nc\nd\ne\n";
        let after = "a\ne\n";
        assert!(validate("delete lines 2-4", before, after));
        assert!(!validate("delete lines 2-3", before, after));
    }

    #[test]
    fn add_import_rule_checks_token_presence() {
        let before = "def f():\n    pass\n";
        let after = "import json\ndef f():\n    pass\n";
        assert!(validate("add import json", before, after));
        assert!(!validate("add import json", after, after));
    }

    #[test]
    fn update_assignment_rule_checks_binding() {
        let before = "x = 1\n";
        let after = "x = 2\n";
        assert!(validate("update x = 2", before, after));
        assert!(!validate("update x = 2", before, before));
    }

    #[test]
    fn add_comment_rule_checks_new_line() {
        let before = "fn f() {}\n";
        let after = "// explains f\nfn f() {}\n";
        assert!(validate("add comment explains f", before, after));
    }

    #[test]
    fn default_rule_requires_nontrivial_nonwhitespace_diff() {
        let before = "fn f() {\n    1\n}\n";
        let after = "fn f() {\n    2\n}\n";
        assert!(validate("refactor this function", before, after));

        let before2 = "fn f() {\n    1\n}\n";
        let after2 = "fn f() {\n    1\n}\n  \n";
        assert!(!validate("refactor this function", before2, after2));
    }
}
