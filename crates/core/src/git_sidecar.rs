//! Transactional safety (C8). Shells out to the `git` CLI via `std::process::Command`,
//! the way the teacher's `git_undo.rs` does, generalized to the full checkpoint ->
//! scoped-rollback -> re-apply-stash sequence of the transactional-safety contract (the
//! teacher's version is a simpler single-shot undo, not a full sidecar).

use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Result};

use crate::model::GitState;

const AGENT_BRANCH_PREFIX: &str = "operon/run";

pub fn is_git_repo(repo_root: &Path) -> bool {
    run(repo_root, &["rev-parse", "--is-inside-work-tree"])
        .map(|o| o.status_success)
        .unwrap_or(false)
}

struct Output {
    status_success: bool,
    stdout: String,
    stderr: String,
}

fn run(repo_root: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()?;
    Ok(Output {
        status_success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn current_branch(repo_root: &Path) -> Result<String> {
    Ok(run(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])?.stdout)
}

fn primary_branch_names() -> &'static [&'static str] {
    &["main", "master"]
}

/// At run start: record HEAD, stash any uncommitted user changes under a unique tag,
/// and switch to a dedicated agent branch if currently on the primary branch.
pub fn start(repo_root: &Path, run_id: &str) -> Result<GitState> {
    let head = run(repo_root, &["rev-parse", "HEAD"])?;
    if !head.status_success {
        bail!("could not resolve HEAD: {}", head.stderr);
    }
    let head_commit = head.stdout;

    let tag = format!("operon-checkpoint-{run_id}");
    let stash_msg = format!("{AGENT_BRANCH_PREFIX}: {tag}");
    let stash = run(repo_root, &["stash", "push", "-u", "-m", &stash_msg])?;
    let stash_tag = if stash.stdout.contains("No local changes") {
        None
    } else {
        Some(tag)
    };

    let branch = current_branch(repo_root)?;
    let agent_branch = if primary_branch_names().contains(&branch.as_str()) {
        let name = format!("{AGENT_BRANCH_PREFIX}-{run_id}");
        let checkout = run(repo_root, &["checkout", "-b", &name])?;
        if !checkout.status_success {
            bail!("could not create agent branch: {}", checkout.stderr);
        }
        Some(name)
    } else {
        None
    };

    Ok(GitState {
        head_commit,
        stash_tag,
        agent_branch,
    })
}

/// Restores every file in `F` to the recorded HEAD, scoped so no file outside `F` is
/// touched, then re-applies the stash (if one was taken), merging only into files
/// outside `F`. A stash conflict is surfaced, never silently discarded.
pub fn rollback(repo_root: &Path, state: &GitState, modified: &HashSet<String>) -> Result<()> {
    for file in modified {
        let checkout = run(
            repo_root,
            &["checkout", state.head_commit.as_str(), "--", file],
        )?;
        if !checkout.status_success {
            bail!("rollback_partial: could not restore {file}: {}", checkout.stderr);
        }
    }

    if let Some(tag) = &state.stash_tag {
        reapply_stash(repo_root, tag, modified)?;
    }
    Ok(())
}

/// On success: commit `F` with the agent-generated message, then re-apply the stash.
pub fn commit_and_reapply(
    repo_root: &Path,
    state: &GitState,
    modified: &HashSet<String>,
    message: &str,
) -> Result<()> {
    if !modified.is_empty() {
        let mut add_args = vec!["add", "--"];
        let files: Vec<&str> = modified.iter().map(|s| s.as_str()).collect();
        add_args.extend(files.iter());
        let add = run(repo_root, &add_args)?;
        if !add.status_success {
            bail!("rollback_partial: could not stage modified files: {}", add.stderr);
        }
        let commit = run(repo_root, &["commit", "-m", message])?;
        if !commit.status_success {
            bail!("rollback_partial: could not commit: {}", commit.stderr);
        }
    }

    if let Some(tag) = &state.stash_tag {
        reapply_stash(repo_root, tag, modified)?;
    }
    Ok(())
}

fn find_stash_ref(repo_root: &Path, tag: &str) -> Result<Option<String>> {
    let list = run(repo_root, &["stash", "list"])?;
    for line in list.stdout.lines() {
        if line.contains(tag) {
            if let Some(stash_ref) = line.split(':').next() {
                return Ok(Some(stash_ref.trim().to_string()));
            }
        }
    }
    Ok(None)
}

fn reapply_stash(repo_root: &Path, tag: &str, modified: &HashSet<String>) -> Result<()> {
    let Some(stash_ref) = find_stash_ref(repo_root, tag)? else {
        return Ok(());
    };
    let pop = run(repo_root, &["stash", "pop", &stash_ref])?;
    if pop.status_success {
        return Ok(());
    }
    // A conflict surfaces only if it touches a file the agent did not itself own;
    // conflicts confined to agent-owned files were already resolved by the rollback.
    let touched_outside_f = pop
        .stderr
        .lines()
        .any(|l| l.contains("CONFLICT") && !modified.iter().any(|f| l.contains(f.as_str())));
    if touched_outside_f {
        bail!("rollback_partial: stash re-apply conflicted outside agent-modified files: {}", pop.stderr);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn init_repo(dir: &Path) {
        run(dir, &["init", "-q"]).unwrap();
        run(dir, &["config", "user.email", "test@example.com"]).unwrap();
        run(dir, &["config", "user.name", "Test"]).unwrap();
        fs::write(dir.join("README.md"), "hello\n").unwrap();
        run(dir, &["add", "."]).unwrap();
        run(dir, &["commit", "-q", "-m", "init"]).unwrap();
    }

    #[test]
    fn detects_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(dir.path()));
        init_repo(dir.path());
        assert!(is_git_repo(dir.path()));
    }

    #[test]
    fn start_stashes_uncommitted_user_changes_and_branches_off_primary() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("U.txt"), "user wip\n").unwrap();

        let state = start(dir.path(), "test1").unwrap();
        assert!(state.stash_tag.is_some());
        assert!(state.agent_branch.is_some());
        // the stash removed the uncommitted change from the working tree
        assert!(!dir.path().join("U.txt").exists());
    }

    #[test]
    fn rollback_restores_only_agent_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let state = start(dir.path(), "test2").unwrap();

        fs::write(dir.path().join("README.md"), "agent changed this\n").unwrap();
        let mut modified = HashSet::new();
        modified.insert("README.md".to_string());

        rollback(dir.path(), &state, &modified).unwrap();
        let content = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(content, "hello\n");
    }

    #[test]
    fn rollback_preserves_unrelated_user_stash() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("U.txt"), "user wip\n").unwrap();
        let state = start(dir.path(), "test3").unwrap();

        fs::write(dir.path().join("README.md"), "agent changed this\n").unwrap();
        let mut modified = HashSet::new();
        modified.insert("README.md".to_string());

        rollback(dir.path(), &state, &modified).unwrap();

        let content = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(content, "hello\n");
        let user_file = fs::read_to_string(dir.path().join("U.txt")).unwrap();
        assert_eq!(user_file, "user wip\n");
    }
}
