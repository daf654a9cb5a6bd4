/// Narrowed from the teacher's `ToolPermission` (`ReadOnly`/`NeedsApproval`/`Denied` plus
/// a `TrustConfig` dimension): Operon has no trust tiers, only the mandatory approval
/// gate of §4.6, so `NeedsApproval` tools always route through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPermission {
    ReadOnly,
    NeedsApproval,
}

/// Phase-tool compatibility table (§4.10). Checked before dispatch; any other
/// combination fails fast with `tool_forbidden`.
pub fn allowed_in_coder(tool_name: &str) -> bool {
    matches!(
        tool_name,
        "find_file"
            | "read_file"
            | "semantic_search"
            | "exact_search"
            | "rewrite_function"
            | "create_file"
            | "insert_line"
            | "append_file"
    )
}

pub fn allowed_in_reviewer(tool_name: &str) -> bool {
    matches!(tool_name, "approve_step" | "reject_step" | "finish")
}
