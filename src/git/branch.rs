//! Branch records: `for-each-ref` parsing and activity ranking.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::worktree::WorktreeRecord;
use super::ParseWarning;

/// One branch, local or remote-tracking, with its last-activity metadata.
#[derive(Debug, Clone, Serialize)]
pub struct BranchRecord {
    /// Short name: `feature/login` for local refs, `origin/feature/login`
    /// for remote-tracking ones.
    pub name: String,
    pub is_local: bool,
    pub is_remote: bool,
    /// True iff some worktree has this branch checked out.
    pub has_worktree: bool,
    pub last_commit: DateTime<Utc>,
    pub author: String,
    pub subject: String,
}

/// Parse `refname|unix-timestamp|author|subject` lines into branch records.
///
/// `origin/HEAD` and remote duplicates of local branches are dropped.
/// Malformed lines are skipped with a diagnostic rather than failing the
/// listing. `has_worktree` comes from cross-referencing the worktree
/// records by branch name; detached worktrees never match.
pub fn parse_branch_refs(
    raw: &str,
    worktrees: &[WorktreeRecord],
) -> (Vec<BranchRecord>, Vec<ParseWarning>) {
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    // Local names first, so remote-tracking duplicates can be dropped in a
    // single pass regardless of line order.
    let local_names: HashSet<&str> = raw
        .lines()
        .filter_map(|line| line.split('|').next())
        .filter_map(|refname| refname.strip_prefix("refs/heads/"))
        .collect();

    for (index, line) in raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let mut fields = line.splitn(4, '|');
        let (Some(refname), Some(timestamp), Some(author), Some(subject)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            warnings.push(ParseWarning::new(index + 1, "branch line has too few fields"));
            continue;
        };

        let (name, is_local) = if let Some(short) = refname.strip_prefix("refs/heads/") {
            (short.to_string(), true)
        } else if let Some(short) = refname.strip_prefix("refs/remotes/") {
            if short.ends_with("/HEAD") {
                continue;
            }
            let tracked = short.split_once('/').map(|(_, branch)| branch);
            if tracked.is_some_and(|branch| local_names.contains(branch)) {
                continue;
            }
            (short.to_string(), false)
        } else {
            warnings.push(ParseWarning::new(
                index + 1,
                format!("unrecognized ref '{refname}'"),
            ));
            continue;
        };

        let Ok(seconds) = timestamp.parse::<i64>() else {
            warnings.push(ParseWarning::new(
                index + 1,
                format!("bad commit timestamp '{timestamp}'"),
            ));
            continue;
        };
        let Some(last_commit) = DateTime::from_timestamp(seconds, 0) else {
            warnings.push(ParseWarning::new(
                index + 1,
                format!("commit timestamp '{timestamp}' out of range"),
            ));
            continue;
        };

        let local_name = if is_local {
            name.as_str()
        } else {
            name.split_once('/').map_or(name.as_str(), |(_, branch)| branch)
        };
        let has_worktree = worktrees
            .iter()
            .any(|worktree| worktree.branch.as_deref() == Some(local_name));

        records.push(BranchRecord {
            name,
            is_local,
            is_remote: !is_local,
            has_worktree,
            last_commit,
            author: author.to_string(),
            subject: subject.to_string(),
        });
    }

    (records, warnings)
}

/// Rank branches by last activity, newest first; name ascending breaks
/// ties for determinism. `limit` of zero means no limit. The input is left
/// untouched.
pub fn rank_by_activity(branches: &[BranchRecord], limit: usize) -> Vec<BranchRecord> {
    let mut ranked = branches.to_vec();
    ranked.sort_by(|a, b| {
        b.last_commit
            .cmp(&a.last_commit)
            .then_with(|| a.name.cmp(&b.name))
    });
    if limit > 0 {
        ranked.truncate(limit);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn worktree(branch: &str) -> WorktreeRecord {
        WorktreeRecord {
            path: PathBuf::from(format!("/repo/trees/{branch}")),
            branch: Some(branch.to_string()),
            head: None,
            is_main: false,
            bare: false,
            locked: false,
            prunable: false,
        }
    }

    fn branch(name: &str, seconds: i64) -> BranchRecord {
        BranchRecord {
            name: name.to_string(),
            is_local: true,
            is_remote: false,
            has_worktree: false,
            last_commit: DateTime::from_timestamp(seconds, 0).unwrap(),
            author: "a".to_string(),
            subject: "s".to_string(),
        }
    }

    #[test]
    fn test_parse_local_and_remote_refs() {
        let raw = "\
refs/heads/main|1700000300|Alice|trunk work
refs/heads/feature/login|1700000200|Bob|login form
refs/remotes/origin/release|1700000100|Carol|cut release";

        let (records, warnings) = parse_branch_refs(raw, &[]);
        assert!(warnings.is_empty());
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].name, "main");
        assert!(records[0].is_local);
        assert!(!records[0].is_remote);

        assert_eq!(records[1].name, "feature/login");

        assert_eq!(records[2].name, "origin/release");
        assert!(records[2].is_remote);
    }

    #[test]
    fn test_parse_drops_remote_duplicates_and_head() {
        let raw = "\
refs/heads/main|1700000300|Alice|trunk work
refs/remotes/origin/HEAD|1700000300|Alice|trunk work
refs/remotes/origin/main|1700000300|Alice|trunk work
refs/remotes/origin/only-remote|1700000100|Bob|remote only";

        let (records, warnings) = parse_branch_refs(raw, &[]);
        assert!(warnings.is_empty());
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["main", "origin/only-remote"]);
    }

    #[test]
    fn test_parse_skips_malformed_lines_with_diagnostics() {
        let raw = "\
refs/heads/main|1700000300|Alice|trunk work
refs/heads/broken|not-a-timestamp|Bob|oops
refs/heads/short|123
refs/heads/ok|1700000100|Carol|fine";

        let (records, warnings) = parse_branch_refs(raw, &[]);
        assert_eq!(records.len(), 2);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].at, 2);
        assert_eq!(warnings[1].at, 3);
    }

    #[test]
    fn test_has_worktree_cross_reference() {
        let raw = "\
refs/heads/feature/login|1700000200|Bob|login form
refs/heads/idle|1700000100|Bob|untouched
refs/remotes/origin/remote-only|1700000050|Bob|elsewhere";

        let trees = vec![worktree("feature/login")];
        let (records, _) = parse_branch_refs(raw, &trees);

        assert!(records[0].has_worktree);
        assert!(!records[1].has_worktree);
        assert!(!records[2].has_worktree);
    }

    #[test]
    fn test_detached_worktrees_never_match() {
        let mut detached = worktree("x");
        detached.branch = None;

        let raw = "refs/heads/x|1700000100|Bob|work";
        let (records, _) = parse_branch_refs(raw, &[detached]);
        assert!(!records[0].has_worktree);
    }

    #[test]
    fn test_rank_orders_newest_first_with_name_tiebreak() {
        let input = vec![
            branch("beta", 100),
            branch("alpha", 100),
            branch("newest", 300),
            branch("middle", 200),
        ];

        let ranked = rank_by_activity(&input, 0);
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["newest", "middle", "alpha", "beta"]);

        // Input order is untouched.
        assert_eq!(input[0].name, "beta");
    }

    #[test]
    fn test_rank_is_idempotent() {
        let input = vec![branch("a", 300), branch("b", 200), branch("c", 100)];
        let once = rank_by_activity(&input, 0);
        let twice = rank_by_activity(&once, 0);
        let names_once: Vec<&str> = once.iter().map(|r| r.name.as_str()).collect();
        let names_twice: Vec<&str> = twice.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names_once, names_twice);
    }

    #[test]
    fn test_rank_limit() {
        let input = vec![branch("a", 300), branch("b", 200), branch("c", 100)];
        assert_eq!(rank_by_activity(&input, 2).len(), 2);
        assert_eq!(rank_by_activity(&input, 0).len(), 3);
        assert_eq!(rank_by_activity(&input, 10).len(), 3);
    }
}
