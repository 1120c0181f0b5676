//! Deletion safety policy.
//!
//! Decisions are data; nothing in here touches the repository. The caller
//! removes a worktree only on `Allow`, or after explicit confirmation of an
//! `AllowWithWarning`.

use super::worktree::WorktreeRecord;

/// Outcome of a deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowWithWarning(String),
    Deny(String),
}

impl Decision {
    pub fn is_deny(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }
}

/// A request to delete one worktree.
#[derive(Debug, Clone)]
pub struct DeletionRequest {
    /// Directory name, branch name, or path identifying the target.
    pub target: String,
    /// Skip the unmerged-branch check.
    pub force: bool,
}

/// Ordered rules deciding whether a worktree may be deleted.
///
/// The main worktree is untouchable regardless of `force`. Unmerged work
/// without `force` is allowed but flagged so the caller can confirm; the
/// policy itself never blocks silently.
pub fn may_delete(record: &WorktreeRecord, request: &DeletionRequest, is_merged: bool) -> Decision {
    if record.is_main {
        return Decision::Deny("cannot delete the main worktree".to_string());
    }
    if !is_merged && !request.force {
        return Decision::AllowWithWarning("branch has unmerged commits".to_string());
    }
    Decision::Allow
}
