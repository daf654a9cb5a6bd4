//! Phase machine (C10): orchestrates PLANNER -> CODER <-> REVIEWER -> {DONE, FAILED},
//! enforcing tool permissions, loop/no-op detection, step budget, and the CRUD fast path.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use operon_index::SymbolGraph;

use crate::approval::ApprovalGate;
use crate::error::OperonError;
use crate::model::{
    ActionRecord, AgentState, Phase, PlanRecord, PlanStep, ValidatorRule, MAX_STEPS,
    NOOP_STREAK_MAX, REJECT_THRESHOLD,
};
use crate::oracle::{call_expecting_json, Oracle};
use crate::pipeline::run_write_step;
use crate::reviewer::{review, ReviewDecision};
use crate::tools::permission::{allowed_in_coder, allowed_in_reviewer};
use crate::validator;

#[derive(Debug, Deserialize)]
struct OraclePlanStep {
    description: String,
    target_file: Option<String>,
    validator: ValidatorRule,
    #[serde(default)]
    is_question: bool,
}

pub struct PhaseMachine<'a> {
    pub state: AgentState,
    graph: &'a SymbolGraph,
    oracle: &'a dyn Oracle,
    approval: &'a ApprovalGate,
    /// Set once a loop has already forced one handoff; a second trip is fatal.
    loop_handoff_used: bool,
}

impl<'a> PhaseMachine<'a> {
    pub fn new(
        goal: String,
        repo_root: PathBuf,
        graph: &'a SymbolGraph,
        oracle: &'a dyn Oracle,
        approval: &'a ApprovalGate,
    ) -> Self {
        PhaseMachine {
            state: AgentState::new(goal, repo_root),
            graph,
            oracle,
            approval,
            loop_handoff_used: false,
        }
    }

    /// Checks phase/tool compatibility and loop detection before a tool dispatches.
    /// Returns `Err(tool_forbidden)` or `Err(loop_detected)` on a second trip.
    fn gate_tool_call(&mut self, tool_name: &str, payload_canonical: &str) -> Result<(), OperonError> {
        let permitted = match self.state.phase {
            Phase::Coder => allowed_in_coder(tool_name),
            Phase::Reviewer => allowed_in_reviewer(tool_name),
            _ => false,
        };
        if !permitted {
            return Err(OperonError::ToolForbidden(format!(
                "{tool_name} not permitted in phase {:?}",
                self.state.phase
            )));
        }

        self.state.budgets.step_counter += 1;
        if self.state.budgets.step_counter > MAX_STEPS {
            return Err(OperonError::OracleUnavailable("step budget exhausted".to_string()));
        }

        let tripped = self.state.history.push_action(ActionRecord {
            action: tool_name.to_string(),
            payload_canonical: payload_canonical.to_string(),
        });
        if tripped {
            if self.loop_handoff_used {
                return Err(OperonError::LoopDetected);
            }
            self.loop_handoff_used = true;
            self.state.history.clear_observations();
            self.state.phase = Phase::Reviewer;
            warn!("loop_detected: forcing handoff to REVIEWER");
            return Err(OperonError::LoopDetected);
        }
        Ok(())
    }

    /// Drives the whole run to DONE or FAILED, never exceeding `MAX_STEPS` iterations.
    /// A git-tracked repo is checkpointed before CODER starts and either committed (on
    /// DONE) or rolled back (on FAILED) — see C8.
    pub async fn run(&mut self) -> Phase {
        if let Err(reason) = self.plan().await {
            warn!(%reason, "plan phase failed");
            self.state.phase = Phase::Failed;
            return Phase::Failed;
        }

        if crate::git_sidecar::is_git_repo(&self.state.repo_root) {
            let run_id = format!("{}", std::process::id());
            match crate::git_sidecar::start(&self.state.repo_root, &run_id) {
                Ok(git_state) => self.state.git_state = Some(git_state),
                Err(err) => {
                    warn!(%err, "git checkpoint failed, continuing without transactional safety");
                }
            }
        }

        self.state.phase = Phase::Coder;

        loop {
            match self.state.phase {
                Phase::Coder => self.run_coder_step().await,
                Phase::Reviewer => self.run_reviewer_step().await,
                Phase::Done | Phase::Failed => {
                    self.finalize_git();
                    return self.state.phase;
                }
                Phase::Planner => unreachable!("planner only runs once, before the loop"),
            }
            if self.state.budgets.step_counter > MAX_STEPS {
                self.state.phase = Phase::Failed;
                self.finalize_git();
                return Phase::Failed;
            }
        }
    }

    async fn plan(&mut self) -> Result<(), OperonError> {
        let context = operon_index::retrieval::assemble_context(self.graph, &self.state.goal, 4000);
        let prompt = format!(
            "Goal: {}\nRepository context:\n{context}\n\n\
             Respond with a JSON array of plan steps, each an object with keys \
             description, target_file, validator, is_question.",
            self.state.goal
        );
        let value = call_expecting_json(self.oracle, &prompt).await?;
        let oracle_steps: Vec<OraclePlanStep> = serde_json::from_value(value)
            .map_err(|e| OperonError::OracleUnavailable(format!("malformed plan: {e}")))?;

        let steps: Vec<PlanStep> = oracle_steps
            .into_iter()
            .map(|s| PlanStep {
                description: s.description,
                target_file: s.target_file,
                validator: s.validator,
                is_question: s.is_question,
            })
            .collect();

        self.state.plan = PlanRecord {
            steps,
            step_index: 0,
        };
        Ok(())
    }

    async fn run_coder_step(&mut self) {
        let Some(step) = self.state.current_step().cloned() else {
            self.state.phase = Phase::Reviewer;
            return;
        };

        if let Err(err) = self.gate_tool_call("rewrite_function", &step.description) {
            self.record_error(&err);
            if matches!(err, OperonError::ToolForbidden(_)) {
                self.state.phase = Phase::Failed;
            }
            return;
        }

        // Snapshot the file's content before the write and, the first time this run
        // touches it, remember its hash for the reviewer's pre-edit fingerprint check.
        let before = step.target_file.as_ref().map(|file| {
            self.state.context_buffer.get(file).cloned().unwrap_or_else(|| {
                std::fs::read_to_string(self.state.repo_root.join(file)).unwrap_or_default()
            })
        });
        if let (Some(file), Some(before)) = (step.target_file.as_ref(), before.as_ref()) {
            self.state
                .history
                .pre_edit_hashes
                .entry(file.clone())
                .or_insert_with(|| crate::reviewer::hash_content(before));
        }

        match run_write_step(
            &self.state.repo_root,
            self.graph,
            &step,
            &self.state.goal,
            self.oracle,
            self.approval,
        )
        .await
        {
            Ok(outcome) if outcome.accepted => {
                let before = before.unwrap_or_default();
                let after = std::fs::read_to_string(self.state.repo_root.join(&outcome.file))
                    .unwrap_or_default();
                self.state.context_buffer.insert(outcome.file.clone(), after.clone());

                if !self.state.history.files_modified.contains(&outcome.file) {
                    self.state.history.files_modified.push(outcome.file.clone());
                }
                if let Some(hash) = outcome.post_write_hash {
                    self.state.history.diff_memory.insert(outcome.file.clone(), hash);
                }
                self.state.history.push_observation(outcome.observation);

                if !validator::validate(&self.state.goal, &before, &after) {
                    self.state.budgets.no_op_streak += 1;
                    self.state.history.push_observation(crate::model::Observation {
                        action: "rewrite_function".to_string(),
                        summary: "validator rejected: edit did not satisfy the goal's rule".to_string(),
                        is_error: true,
                    });
                    if self.state.budgets.no_op_streak > NOOP_STREAK_MAX {
                        info!("noop_streak exceeded after validator rejection, forcing handoff to REVIEWER");
                        self.state.phase = Phase::Reviewer;
                    }
                    return;
                }

                self.state.plan.step_index += 1;
                self.state.budgets.no_op_streak = 0;

                if self.state.plan.step_index >= self.state.plan.steps.len() {
                    self.state.phase = Phase::Reviewer;
                }
            }
            Ok(outcome) => {
                self.state.budgets.no_op_streak += 1;
                self.state.history.push_observation(outcome.observation);
                if self.state.budgets.no_op_streak > NOOP_STREAK_MAX {
                    info!("noop_streak exceeded, forcing handoff to REVIEWER");
                    self.state.phase = Phase::Reviewer;
                }
            }
            Err(err) => self.record_error(&err),
        }
    }

    async fn run_reviewer_step(&mut self) {
        if let Err(err) = self.gate_tool_call("finish", "{}") {
            if matches!(err, OperonError::LoopDetected) {
                self.state.phase = Phase::Failed;
            }
            return;
        }

        let decisions = review(&self.state.repo_root, &self.state.history);

        let mut any_rejected = false;
        for (_, decision) in decisions {
            match decision {
                ReviewDecision::Reject { reason } => {
                    any_rejected = true;
                    warn!(reason, "reviewer rejected step");
                }
                ReviewDecision::AskOracle { current_content } => {
                    let prompt = format!(
                        "Goal: {}\nDoes the following content satisfy the goal? Answer yes or no.\n{current_content}",
                        self.state.goal
                    );
                    match self.oracle.call(&prompt, false).await {
                        Ok(answer) if answer.to_lowercase().contains("yes") => {}
                        _ => any_rejected = true,
                    }
                }
            }
        }

        if any_rejected {
            self.state.budgets.reject_counter += 1;
            if self.state.budgets.reject_counter >= REJECT_THRESHOLD {
                self.state.phase = Phase::Failed;
                return;
            }
            self.state.phase = Phase::Coder;
        } else {
            self.state.phase = Phase::Done;
        }
    }

    fn finalize_git(&mut self) {
        let Some(git_state) = self.state.git_state.take() else {
            return;
        };
        let modified: std::collections::HashSet<String> =
            self.state.history.files_modified.iter().cloned().collect();

        let result = match self.state.phase {
            Phase::Done => crate::git_sidecar::commit_and_reapply(
                &self.state.repo_root,
                &git_state,
                &modified,
                &format!("operon: {}", self.state.goal),
            ),
            _ => crate::git_sidecar::rollback(&self.state.repo_root, &git_state, &modified),
        };

        if let Err(err) = result {
            warn!(%err, "git finalization failed");
        }
    }

    fn record_error(&mut self, err: &OperonError) {
        self.state.history.push_observation(crate::model::Observation {
            action: "rewrite_function".to_string(),
            summary: err.to_string(),
            is_error: true,
        });
        if !err.is_recoverable() {
            self.state.phase = Phase::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalGate;
    use async_trait::async_trait;

    struct PlannerOracle;

    #[async_trait]
    impl Oracle for PlannerOracle {
        async fn call(&self, prompt: &str, _require_json: bool) -> Result<String, OperonError> {
            if prompt.contains("JSON array of plan steps") {
                Ok(r#"[{"description":"add comment hi","target_file":"a.rs","validator":{"AddComment":{"text":"hi"}},"is_question":false}]"#.to_string())
            } else if prompt.contains("satisfy the goal") {
                Ok("yes".to_string())
            } else {
                Ok(String::new())
            }
        }
    }

    #[tokio::test]
    async fn full_run_reaches_done_via_crud_fast_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        let mut graph = SymbolGraph::load(dir.path()).unwrap();
        graph.build(false).unwrap();

        let oracle = PlannerOracle;
        let approval = ApprovalGate::new(true);
        let mut machine = PhaseMachine::new(
            "add comment hi".to_string(),
            dir.path().to_path_buf(),
            &graph,
            &oracle,
            &approval,
        );
        let outcome = machine.run().await;
        assert_eq!(outcome, Phase::Done);
        assert!(!machine.state.history.files_modified.is_empty());
    }

    struct LoopingOracle;

    #[async_trait]
    impl Oracle for LoopingOracle {
        async fn call(&self, prompt: &str, _require_json: bool) -> Result<String, OperonError> {
            if prompt.contains("JSON array of plan steps") {
                Ok(r#"[{"description":"rewrite once","target_file":"a.rs","validator":"NontrivialDiff","is_question":false}]"#.to_string())
            } else {
                Ok(String::new())
            }
        }
    }

    #[tokio::test]
    async fn malformed_oracle_payload_does_not_panic_and_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        let mut graph = SymbolGraph::load(dir.path()).unwrap();
        graph.build(false).unwrap();

        let oracle = LoopingOracle;
        let approval = ApprovalGate::new(true);
        let mut machine = PhaseMachine::new(
            "rewrite once".to_string(),
            dir.path().to_path_buf(),
            &graph,
            &oracle,
            &approval,
        );
        let outcome = machine.run().await;
        assert!(matches!(outcome, Phase::Failed | Phase::Done));
    }
}
