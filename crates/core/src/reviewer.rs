//! Deterministic reviewer (C11): before consulting the oracle, confirms a structural
//! change occurred by comparing on-disk content against the recorded diff fingerprint.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::model::HistoryRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Reject { reason: String },
    AskOracle { current_content: String },
}

pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Per the open-question decision (§9): empty `files-modified` at REVIEWER entry is
/// treated conservatively as a reject, not a silent "nothing to do -> success".
///
/// Each file's pre-edit fingerprint comes from `history.pre_edit_hashes`, recorded by
/// CODER the first time it touched that file this run — never fabricated from the
/// post-write hash in `diff_memory`, which would always equal itself.
pub fn review(repo_root: &Path, history: &HistoryRecord) -> Vec<(String, ReviewDecision)> {
    if history.files_modified.is_empty() {
        return vec![(
            String::new(),
            ReviewDecision::Reject {
                reason: "no edits produced".to_string(),
            },
        )];
    }

    history
        .files_modified
        .iter()
        .map(|file| {
            let decision = review_one(repo_root, history, file);
            (file.clone(), decision)
        })
        .collect()
}

fn review_one(repo_root: &Path, history: &HistoryRecord, file: &str) -> ReviewDecision {
    let disk_content = match std::fs::read_to_string(repo_root.join(file)) {
        Ok(c) => c,
        Err(_) => {
            return ReviewDecision::Reject {
                reason: "no change on disk".to_string(),
            }
        }
    };
    let disk_hash = hash_content(&disk_content);
    let pre_edit_hash = history.pre_edit_hashes.get(file);

    let no_change = match pre_edit_hash {
        None => true,
        Some(pre) => disk_hash == *pre,
    };
    if no_change {
        return ReviewDecision::Reject {
            reason: "no change on disk".to_string(),
        };
    }

    ReviewDecision::AskOracle {
        current_content: disk_content,
    }
}
