//! Worktree change counting and status classification.
//!
//! Raw input is `git status --porcelain=v2` text. `1`/`2` entries carry an
//! `XY` field: X is the staged side, Y the unstaged side, `.` meaning
//! unchanged. Unmerged (`u`) entries count as unstaged, `?` as untracked.

use serde::Serialize;

/// Per-worktree counts of pending changes. Derived transiently from status
/// output; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub staged: usize,
    pub unstaged: usize,
    pub untracked: usize,
}

/// Compact status bucket for a worktree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusCategory {
    Clean,
    Modified,
    Staged,
    Untracked,
    Mixed,
}

/// Classify a change summary into exactly one category.
///
/// Clean when nothing is pending; Mixed when more than one of the three
/// buckets is nonzero; otherwise the single nonzero bucket names the
/// category.
pub fn classify(summary: ChangeSummary) -> StatusCategory {
    let buckets = [summary.staged, summary.unstaged, summary.untracked];
    match buckets.iter().filter(|&&count| count > 0).count() {
        0 => StatusCategory::Clean,
        1 if summary.staged > 0 => StatusCategory::Staged,
        1 if summary.unstaged > 0 => StatusCategory::Modified,
        1 => StatusCategory::Untracked,
        _ => StatusCategory::Mixed,
    }
}

/// Count staged/unstaged/untracked entries in porcelain-v2 status text.
///
/// Header (`#`) and ignored (`!`) lines are skipped, as is anything
/// unrecognized.
pub fn parse_status(raw: &str) -> ChangeSummary {
    let mut summary = ChangeSummary::default();

    for line in raw.lines() {
        let mut fields = line.split(' ');
        match fields.next() {
            Some("1" | "2") => {
                if let Some(xy) = fields.next() {
                    let mut sides = xy.chars();
                    if sides.next().is_some_and(|x| x != '.') {
                        summary.staged += 1;
                    }
                    if sides.next().is_some_and(|y| y != '.') {
                        summary.unstaged += 1;
                    }
                }
            }
            Some("u") => summary.unstaged += 1,
            Some("?") => summary.untracked += 1,
            _ => {}
        }
    }

    summary
}
