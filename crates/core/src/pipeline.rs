//! Edit pipeline (§4.11): composition of the path resolver, diff engine, syntax check,
//! approval gate, and atomic write into the single CODER write action.

use std::path::Path;

use operon_index::SymbolGraph;

use crate::approval::{ApprovalGate, ApprovalPayload, Decision};
use crate::crud_fast_path;
use crate::diff;
use crate::error::OperonError;
use crate::model::{Observation, PlanStep};
use crate::oracle::Oracle;
use operon_index::extractor;

const MAX_APPLY_RETRIES: u32 = 2;

pub struct WriteOutcome {
    pub file: String,
    pub accepted: bool,
    pub post_write_hash: Option<String>,
    pub observation: Observation,
}

/// Runs one CODER write action end to end. `goal` is the overall agent goal (used by
/// the CRUD classifier and, if it falls through, the oracle prompt).
pub async fn run_write_step(
    repo_root: &Path,
    graph: &SymbolGraph,
    step: &PlanStep,
    goal: &str,
    oracle: &dyn Oracle,
    approval: &ApprovalGate,
) -> Result<WriteOutcome, OperonError> {
    let target = step
        .target_file
        .clone()
        .ok_or_else(|| OperonError::PathUnresolved("no target file on plan step".to_string()))?;

    let resolution = operon_index::resolver::resolve(graph, &target);
    let path = repo_root.join(&resolution.path);
    let original = std::fs::read_to_string(&path).unwrap_or_default();

    let mut payload = crud_fast_path::classify(goal, &step.validator, &original)
        .unwrap_or(String::new());

    let mut retries = 0;
    loop {
        if payload.is_empty() {
            payload = oracle.call(&coder_prompt(goal, &resolution.path, &original), false).await?;
        }

        let (patched, reason) = diff::apply_payload(&original, &payload);
        match reason {
            diff::Reason::Ok | diff::Reason::Appended => {
                let patched = patched.unwrap();
                return finish_write(repo_root, graph, &resolution.path, &original, &patched, approval)
                    .await;
            }
            diff::Reason::Noop => {
                return Ok(WriteOutcome {
                    file: resolution.path.clone(),
                    accepted: false,
                    post_write_hash: None,
                    observation: Observation {
                        action: "rewrite_function".to_string(),
                        summary: "diff engine returned noop".to_string(),
                        is_error: false,
                    },
                });
            }
            diff::Reason::NoMatch | diff::Reason::Ambiguous => {
                if retries >= MAX_APPLY_RETRIES {
                    let err = if reason == diff::Reason::NoMatch {
                        OperonError::NoMatch
                    } else {
                        OperonError::Ambiguous
                    };
                    return Err(err);
                }
                retries += 1;
                payload = String::new();
                continue;
            }
        }
    }
}

async fn finish_write(
    repo_root: &Path,
    graph: &SymbolGraph,
    rel_path: &str,
    original: &str,
    patched: &str,
    approval: &ApprovalGate,
) -> Result<WriteOutcome, OperonError> {
    let language = graph
        .graph()
        .files
        .get(rel_path)
        .map(|f| f.language)
        .unwrap_or(operon_index::Language::Rust);

    if let extractor::SyntaxCheck::Error { line, message } = extractor::check_syntax(language, patched) {
        return Err(OperonError::SyntaxReject(format!("{message} (line {line})")));
    }

    let payload = ApprovalPayload {
        file: rel_path.to_string(),
        search: original.to_string(),
        replace: patched.to_string(),
        summary: format!("rewrite {rel_path}"),
    };
    let decision = approval.ask_user_approval("rewrite_function", &payload).await;
    if decision != Decision::Accepted {
        return Err(OperonError::ApprovalRejected(format!("{rel_path} rejected")));
    }

    let abs_path = repo_root.join(rel_path);
    let tmp = abs_path.with_extension("operon.tmp");
    std::fs::write(&tmp, patched)
        .map_err(|e| OperonError::OracleUnavailable(format!("write failed: {e}")))?;
    std::fs::rename(&tmp, &abs_path)
        .map_err(|e| OperonError::OracleUnavailable(format!("rename failed: {e}")))?;

    let post_hash = crate::reviewer::hash_content(patched);
    Ok(WriteOutcome {
        file: rel_path.to_string(),
        accepted: true,
        post_write_hash: Some(post_hash),
        observation: Observation {
            action: "rewrite_function".to_string(),
            summary: format!("wrote {rel_path}"),
            is_error: false,
        },
    })
}

fn coder_prompt(goal: &str, file: &str, content: &str) -> String {
    format!(
        "Goal: {goal}\nFile: {file}\nCurrent content:\n{content}\n\n\
         Respond with one or more SEARCH/REPLACE blocks that accomplish the goal."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidatorRule;

    struct StubOracle {
        response: String,
    }

    #[async_trait::async_trait]
    impl Oracle for StubOracle {
        async fn call(&self, _prompt: &str, _require_json: bool) -> Result<String, OperonError> {
            Ok(self.response.clone())
        }
    }

    fn seeded_graph(dir: &Path) -> SymbolGraph {
        std::fs::write(dir.join("lib.rs"), "fn one() {\n    1\n}\n").unwrap();
        let mut graph = SymbolGraph::load(dir).unwrap();
        graph.build(false).unwrap();
        graph
    }

    #[tokio::test]
    async fn crud_fast_path_skips_oracle_call() {
        let dir = tempfile::tempdir().unwrap();
        let graph = seeded_graph(dir.path());
        let approval = ApprovalGate::new(true);
        let oracle = StubOracle {
            response: "should never be used".to_string(),
        };
        let step = PlanStep {
            description: "add comment explains one".to_string(),
            target_file: Some("lib.rs".to_string()),
            validator: ValidatorRule::AddComment {
                text: "explains one".to_string(),
            },
            is_question: false,
        };
        let outcome = run_write_step(
            dir.path(),
            &graph,
            &step,
            "add comment explains one to lib.rs",
            &oracle,
            &approval,
        )
        .await
        .unwrap();
        assert!(outcome.accepted);
    }

    #[tokio::test]
    async fn oracle_payload_applies_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let graph = seeded_graph(dir.path());
        let approval = ApprovalGate::new(true);
        let oracle = StubOracle {
            response: "<<<<<<< SEARCH\nfn one() {\n    1\n}\n=======\nfn one() {\n    2\n}\n>>>>>>> REPLACE\n".to_string(),
        };
        let step = PlanStep {
            description: "bump the constant".to_string(),
            target_file: Some("lib.rs".to_string()),
            validator: ValidatorRule::NontrivialDiff,
            is_question: false,
        };
        let outcome = run_write_step(dir.path(), &graph, &step, "bump the constant", &oracle, &approval)
            .await
            .unwrap();
        assert!(outcome.accepted);
        let content = std::fs::read_to_string(dir.path().join("lib.rs")).unwrap();
        assert!(content.contains('2'));
    }

    #[tokio::test]
    async fn rejected_approval_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let graph = seeded_graph(dir.path());
        let approval = ApprovalGate::new(false);
        let oracle = StubOracle {
            response: "<<<<<<< SEARCH\nfn one() {\n    1\n}\n=======\nfn one() {\n    2\n}\n>>>>>>> REPLACE\n".to_string(),
        };
        let step = PlanStep {
            description: "bump the constant".to_string(),
            target_file: Some("lib.rs".to_string()),
            validator: ValidatorRule::NontrivialDiff,
            is_question: false,
        };
        let responder_gate = approval.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            responder_gate.respond(Decision::Rejected).await;
        });
        let result = run_write_step(dir.path(), &graph, &step, "bump the constant", &oracle, &approval).await;
        assert!(matches!(result, Err(OperonError::ApprovalRejected(_))));
    }
}
