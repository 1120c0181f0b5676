//! Worktree records, porcelain parsing, and the operations facade.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::branch::{parse_branch_refs, rank_by_activity, BranchRecord};
use super::cli::{GitCli, GitError};
use super::paths::resolve_worktree_path;
use super::policy::{may_delete, Decision, DeletionRequest};
use super::status::{classify, parse_status, StatusCategory};
use super::ParseWarning;

/// Snapshot of one worktree as reported by `git worktree list`.
///
/// Records are rebuilt on every listing and never cached; a record taken
/// before a mutating operation must be discarded afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct WorktreeRecord {
    pub path: PathBuf,
    /// Checked-out branch; `None` when the worktree is detached.
    pub branch: Option<String>,
    pub head: Option<String>,
    /// The primary checkout. Git lists it first; it is never removable.
    pub is_main: bool,
    pub bare: bool,
    pub locked: bool,
    pub prunable: bool,
}

impl WorktreeRecord {
    /// Directory basename, used for lookup and compact display.
    pub fn dir_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A worktree paired with its classified status. `status` is `None` when
/// the tree could not be inspected (e.g. a prunable entry whose directory
/// is gone).
#[derive(Debug, Clone, Serialize)]
pub struct WorktreeStatus {
    #[serde(flatten)]
    pub record: WorktreeRecord,
    pub status: Option<StatusCategory>,
}

/// Result of a listing pass: classified worktrees plus parse diagnostics.
#[derive(Debug, Clone)]
pub struct Listing {
    pub worktrees: Vec<WorktreeStatus>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse `git worktree list --porcelain` output into records.
///
/// Records are blank-line separated; each carries `worktree <path>`,
/// `HEAD <sha>`, `branch <ref>`, and flag lines. Unrecognized lines within
/// a record are ignored. A record without its mandatory path line is
/// dropped and reported as a diagnostic instead of failing the listing.
/// Input order is preserved; git lists the main worktree first.
pub fn parse_worktree_list(raw: &str) -> (Vec<WorktreeRecord>, Vec<ParseWarning>) {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let mut path = None;
        let mut head = None;
        let mut branch = None;
        let mut bare = false;
        let mut detached = false;
        let mut locked = false;
        let mut prunable = false;

        for line in block {
            if let Some(value) = line.strip_prefix("worktree ") {
                path = Some(PathBuf::from(value));
            } else if let Some(value) = line.strip_prefix("HEAD ") {
                head = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("branch ") {
                branch = Some(value.strip_prefix("refs/heads/").unwrap_or(value).to_string());
            } else if *line == "bare" {
                bare = true;
            } else if *line == "detached" {
                detached = true;
            } else if *line == "locked" || line.starts_with("locked ") {
                locked = true;
            } else if *line == "prunable" || line.starts_with("prunable ") {
                prunable = true;
            }
        }

        let Some(path) = path else {
            warnings.push(ParseWarning::new(index + 1, "worktree record missing its path"));
            continue;
        };
        if detached {
            branch = None;
        }

        records.push(WorktreeRecord {
            path,
            branch,
            head,
            is_main: index == 0,
            bare,
            locked,
            prunable,
        });
    }

    (records, warnings)
}

/// Operations facade over a single repository.
///
/// Holds the repository context explicitly so nothing below it depends on
/// process working-directory state.
pub struct WorktreeManager {
    repo_root: PathBuf,
    trees_root: PathBuf,
    merge_targets: Vec<String>,
}

impl WorktreeManager {
    pub fn new(repo_root: PathBuf, trees_root: PathBuf, merge_targets: Vec<String>) -> Self {
        Self {
            repo_root,
            trees_root,
            merge_targets,
        }
    }

    /// Locate the repository enclosing `dir` and build a manager for it.
    pub async fn discover(
        dir: &Path,
        trees_root: PathBuf,
        merge_targets: Vec<String>,
    ) -> Result<Self, GitError> {
        let repo_root = GitCli::repo_root(dir).await?;
        Ok(Self::new(repo_root, trees_root, merge_targets))
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// List worktrees with their classified status.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Listing, GitError> {
        let raw = GitCli::list_worktrees_raw(&self.repo_root).await?;
        let (records, warnings) = parse_worktree_list(&raw);

        let mut worktrees = Vec::with_capacity(records.len());
        for record in records {
            let status = self.status_of(&record).await;
            worktrees.push(WorktreeStatus { record, status });
        }

        Ok(Listing { worktrees, warnings })
    }

    async fn status_of(&self, record: &WorktreeRecord) -> Option<StatusCategory> {
        if !record.path.exists() {
            return None;
        }
        match GitCli::status_raw(&record.path).await {
            Ok(raw) => Some(classify(parse_status(&raw))),
            Err(err) => {
                warn!(path = %record.path.display(), %err, "could not read worktree status");
                None
            }
        }
    }

    /// Create a worktree for `branch`, creating the branch too when it
    /// exists neither locally nor as `origin/<branch>`.
    ///
    /// Fails with `PathConflict` when the destination exists and is
    /// non-empty; an empty directory is fine, git takes it over.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        branch: &str,
        explicit_path: Option<PathBuf>,
        copy_env: bool,
    ) -> Result<WorktreeRecord, GitError> {
        let destination = resolve_worktree_path(branch, explicit_path, &self.trees_root);
        // Relative destinations are anchored at the repository root, which
        // is also where GitCli runs the command.
        let destination = if destination.is_absolute() {
            destination
        } else {
            let relative = destination
                .strip_prefix(".")
                .map(Path::to_path_buf)
                .unwrap_or(destination);
            self.repo_root.join(relative)
        };

        if non_empty_or_unreadable(&destination).await {
            return Err(GitError::PathConflict(destination));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| GitError::Io {
                    context: format!("could not create {}", parent.display()),
                    source,
                })?;
        }

        let create_branch = !GitCli::branch_exists(&self.repo_root, branch).await?;
        GitCli::add_worktree(&self.repo_root, &destination, branch, create_branch).await?;
        info!(
            branch,
            path = %destination.display(),
            created_branch = create_branch,
            "worktree created"
        );

        if copy_env {
            self.copy_env_file(&destination).await;
        }

        // Fresh listing so the caller gets the record exactly as git
        // reports it (absolute path, head, flags).
        let raw = GitCli::list_worktrees_raw(&self.repo_root).await?;
        let (records, _) = parse_worktree_list(&raw);
        let wanted = destination
            .canonicalize()
            .unwrap_or_else(|_| destination.clone());
        records
            .into_iter()
            .find(|record| {
                record.path == destination
                    || record
                        .path
                        .canonicalize()
                        .map(|path| path == wanted)
                        .unwrap_or(false)
            })
            .ok_or_else(|| GitError::WorktreeNotFound(branch.to_string()))
    }

    /// Carry the root `.env` into a new worktree so local tooling keeps
    /// working; failure is logged, never fatal.
    async fn copy_env_file(&self, destination: &Path) {
        let source = self.repo_root.join(".env");
        if !source.exists() {
            return;
        }
        match tokio::fs::copy(&source, destination.join(".env")).await {
            Ok(_) => debug!("copied .env into new worktree"),
            Err(err) => warn!(%err, "could not copy .env into new worktree"),
        }
    }

    /// Resolve a worktree by directory name, branch name, or path.
    pub async fn find(&self, name: &str) -> Result<WorktreeRecord, GitError> {
        let raw = GitCli::list_worktrees_raw(&self.repo_root).await?;
        let (records, _) = parse_worktree_list(&raw);

        records
            .into_iter()
            .find(|record| {
                record.dir_name() == name
                    || record.branch.as_deref() == Some(name)
                    || record.path == Path::new(name)
                    || record.path.ends_with(name)
            })
            .ok_or_else(|| GitError::WorktreeNotFound(name.to_string()))
    }

    /// Find the deletion target and run the safety policy.
    ///
    /// Returns the record and the decision; actually removing anything is
    /// `remove`'s job, called only on `Allow` or after the caller confirms
    /// an `AllowWithWarning`.
    #[instrument(skip(self))]
    pub async fn plan_delete(
        &self,
        request: &DeletionRequest,
    ) -> Result<(WorktreeRecord, Decision), GitError> {
        let record = self.find(&request.target).await?;

        let is_merged = match record.branch.as_deref() {
            Some(branch) => {
                GitCli::is_merged(&self.repo_root, branch, &self.merge_targets).await?
            }
            // Detached: no branch to lose, so the merge check is moot.
            None => true,
        };

        let decision = may_delete(&record, request, is_merged);
        debug!(target = %request.target, ?decision, "deletion planned");
        Ok((record, decision))
    }

    /// Remove a worktree, falling back to `--force` when the plain removal
    /// fails (e.g. a dirty tree the caller already confirmed).
    #[instrument(skip(self, record), fields(path = %record.path.display()))]
    pub async fn remove(&self, record: &WorktreeRecord) -> Result<(), GitError> {
        if let Err(err) = GitCli::remove_worktree(&self.repo_root, &record.path, false).await {
            warn!(%err, "worktree remove failed, retrying with --force");
            GitCli::remove_worktree(&self.repo_root, &record.path, true).await?;
        }
        if let Err(err) = GitCli::prune_worktrees(&self.repo_root).await {
            warn!(%err, "worktree prune failed");
        }
        info!("worktree removed");
        Ok(())
    }

    /// Branches ranked by last activity, newest first. `limit` of zero
    /// means all of them.
    #[instrument(skip(self))]
    pub async fn recent_branches(
        &self,
        limit: usize,
    ) -> Result<(Vec<BranchRecord>, Vec<ParseWarning>), GitError> {
        let worktree_raw = GitCli::list_worktrees_raw(&self.repo_root).await?;
        let (worktrees, mut warnings) = parse_worktree_list(&worktree_raw);

        let refs_raw = GitCli::branch_refs_raw(&self.repo_root).await?;
        let (branches, branch_warnings) = parse_branch_refs(&refs_raw, &worktrees);
        warnings.extend(branch_warnings);

        Ok((rank_by_activity(&branches, limit), warnings))
    }
}

async fn non_empty_or_unreadable(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match tokio::fs::read_dir(path).await {
        Ok(mut entries) => entries.next_entry().await.map(|e| e.is_some()).unwrap_or(true),
        // Exists but is a file, or unreadable: either way not usable.
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
worktree /home/dev/project
HEAD 1111111111111111111111111111111111111111
branch refs/heads/main

worktree /home/dev/project/trees/feature-login
HEAD 2222222222222222222222222222222222222222
branch refs/heads/feature/login

worktree /home/dev/project/trees/spike
HEAD 3333333333333333333333333333333333333333
detached
locked working on it
";

    #[test]
    fn test_parse_preserves_order_and_marks_main() {
        let (records, warnings) = parse_worktree_list(LISTING);
        assert!(warnings.is_empty());
        assert_eq!(records.len(), 3);

        assert!(records[0].is_main);
        assert_eq!(records[0].branch.as_deref(), Some("main"));
        assert_eq!(records[0].path, PathBuf::from("/home/dev/project"));

        assert!(!records[1].is_main);
        assert_eq!(records[1].branch.as_deref(), Some("feature/login"));
        assert_eq!(
            records[1].head.as_deref(),
            Some("2222222222222222222222222222222222222222")
        );
    }

    #[test]
    fn test_parse_detached_and_flags() {
        let (records, _) = parse_worktree_list(LISTING);
        let spike = &records[2];
        assert_eq!(spike.branch, None);
        assert!(spike.locked);
        assert!(!spike.prunable);
        assert_eq!(spike.dir_name(), "spike");
    }

    #[test]
    fn test_parse_drops_record_missing_path_with_diagnostic() {
        let mangled = "\
worktree /home/dev/project
HEAD 1111111111111111111111111111111111111111
branch refs/heads/main

HEAD 2222222222222222222222222222222222222222
branch refs/heads/lost

worktree /home/dev/project/trees/kept
HEAD 3333333333333333333333333333333333333333
branch refs/heads/kept
";
        let (records, warnings) = parse_worktree_list(mangled);
        assert_eq!(records.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].at, 2);
        assert!(warnings[0].message.contains("missing its path"));
    }

    #[test]
    fn test_parse_ignores_unknown_lines() {
        let raw = "\
worktree /home/dev/project
HEAD 1111111111111111111111111111111111111111
branch refs/heads/main
somefutureattribute with a value
";
        let (records, warnings) = parse_worktree_list(raw);
        assert_eq!(records.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_parse_empty_input() {
        let (records, warnings) = parse_worktree_list("");
        assert!(records.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_parse_bare_and_prunable_flags() {
        let raw = "\
worktree /home/dev/project.git
bare

worktree /home/dev/project/trees/stale
HEAD 4444444444444444444444444444444444444444
branch refs/heads/stale
prunable gitdir file points to non-existent location
";
        let (records, _) = parse_worktree_list(raw);
        assert!(records[0].bare);
        assert!(records[1].prunable);
    }
}
