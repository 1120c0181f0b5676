//! Git integration: process invocation, listing parsers, status
//! classification, and the deletion safety policy.
//!
//! Uses the git CLI directly (rather than libgit2) so behavior matches
//! whatever hooks, sparse-checkout, and config the user's git applies.

use std::fmt;

mod branch;
mod cli;
mod paths;
mod policy;
mod status;
mod worktree;

pub use branch::{parse_branch_refs, rank_by_activity, BranchRecord};
pub use cli::{GitCli, GitError, GitOutput};
pub use paths::{resolve_worktree_path, worktree_dir_name, DEFAULT_TREES_DIR};
pub use policy::{may_delete, Decision, DeletionRequest};
pub use status::{classify, parse_status, ChangeSummary, StatusCategory};
pub use worktree::{parse_worktree_list, Listing, WorktreeManager, WorktreeRecord, WorktreeStatus};

/// Diagnostic for a malformed record a parser skipped.
///
/// Parsing never aborts a whole listing over one bad entry; warnings are
/// collected and handed back beside the successfully parsed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based index of the skipped record or line.
    pub at: usize,
    pub message: String,
}

impl ParseWarning {
    pub fn new(at: usize, message: impl Into<String>) -> Self {
        Self {
            at,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (entry {})", self.message, self.at)
    }
}
