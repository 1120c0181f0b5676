//! Low-level git command wrapper.
//!
//! `run` captures stdout/stderr/exit status and never fails on a nonzero
//! exit; callers that require success go through `run_checked`. The only
//! hard failures at this layer are a missing or unspawnable git binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Errors from git invocations and the operations built on them.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git is not installed or not in PATH")]
    NotInstalled,

    #[error("failed to spawn git: {0}")]
    Spawn(std::io::Error),

    #[error("not inside a git repository (searched from {0})")]
    NotARepository(PathBuf),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("destination '{0}' already exists and is not empty")]
    PathConflict(PathBuf),

    #[error("no worktree matches '{0}'")]
    WorktreeNotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one git invocation. A nonzero exit is data here,
/// not an error.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Stateless git command wrapper; every call takes its repository (or
/// worktree) directory explicitly.
pub struct GitCli;

impl GitCli {
    /// Execute git with `args` in `dir`, capturing output and exit status.
    ///
    /// Errors only when the binary cannot be located or started; a command
    /// that runs and fails comes back as a `GitOutput` with its exit code.
    pub async fn run(dir: &Path, args: &[&str]) -> Result<GitOutput, GitError> {
        debug!(?args, dir = %dir.display(), "running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GitError::NotInstalled,
                _ => GitError::Spawn(e),
            })?;

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute git and require success, returning trimmed stdout.
    async fn run_checked(dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let out = Self::run(dir, args).await?;
        if !out.success() {
            return Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout.trim().to_string())
    }

    /// Root of the repository enclosing `dir`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn repo_root(dir: &Path) -> Result<PathBuf, GitError> {
        match Self::run(dir, &["rev-parse", "--show-toplevel"]).await? {
            out if out.success() => Ok(PathBuf::from(out.stdout.trim())),
            _ => Err(GitError::NotARepository(dir.to_path_buf())),
        }
    }

    /// Current branch of a worktree; `None` when detached.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn current_branch(dir: &Path) -> Result<Option<String>, GitError> {
        let name = Self::run_checked(dir, &["branch", "--show-current"]).await?;
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    /// HEAD commit SHA of a worktree.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn head_commit(dir: &Path) -> Result<String, GitError> {
        Self::run_checked(dir, &["rev-parse", "HEAD"]).await
    }

    /// Raw `worktree list --porcelain` text; parsing lives in `worktree.rs`.
    #[instrument(skip_all, fields(repo = %repo.display()))]
    pub async fn list_worktrees_raw(repo: &Path) -> Result<String, GitError> {
        Self::run_checked(repo, &["worktree", "list", "--porcelain"]).await
    }

    /// Raw branch listing, one `refname|unix-timestamp|author|subject` line
    /// per ref; parsing lives in `branch.rs`.
    #[instrument(skip_all, fields(repo = %repo.display()))]
    pub async fn branch_refs_raw(repo: &Path) -> Result<String, GitError> {
        Self::run_checked(
            repo,
            &[
                "for-each-ref",
                "--format=%(refname)|%(committerdate:unix)|%(authorname)|%(subject)",
                "refs/heads/",
                "refs/remotes/origin/",
            ],
        )
        .await
    }

    /// Raw porcelain-v2 status of a single worktree.
    #[instrument(skip_all, fields(worktree = %worktree.display()))]
    pub async fn status_raw(worktree: &Path) -> Result<String, GitError> {
        Self::run_checked(worktree, &["status", "--porcelain=v2"]).await
    }

    /// True if `branch` exists locally or as `origin/<branch>`.
    #[instrument(skip_all, fields(repo = %repo.display(), branch))]
    pub async fn branch_exists(repo: &Path, branch: &str) -> Result<bool, GitError> {
        let local = Self::run_checked(repo, &["branch", "--list", branch]).await?;
        if !local.is_empty() {
            return Ok(true);
        }
        let remote =
            Self::run_checked(repo, &["branch", "-r", "--list", &format!("origin/{branch}")])
                .await?;
        Ok(!remote.is_empty())
    }

    /// Whether every commit of `branch` is reachable from one of `targets`.
    ///
    /// Rides the exit status of `merge-base --is-ancestor`; a target that
    /// does not exist simply fails the check and the next candidate is tried.
    #[instrument(skip_all, fields(repo = %repo.display(), branch))]
    pub async fn is_merged(repo: &Path, branch: &str, targets: &[String]) -> Result<bool, GitError> {
        for target in targets {
            let out = Self::run(repo, &["merge-base", "--is-ancestor", branch, target]).await?;
            if out.success() {
                debug!(branch, target, "branch is merged");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Add a worktree; `create_branch` makes the branch as part of checkout.
    #[instrument(skip_all, fields(repo = %repo.display(), path = %path.display(), branch, create_branch))]
    pub async fn add_worktree(
        repo: &Path,
        path: &Path,
        branch: &str,
        create_branch: bool,
    ) -> Result<(), GitError> {
        let path_str = path.to_string_lossy();
        if create_branch {
            Self::run_checked(repo, &["worktree", "add", "-b", branch, &path_str]).await?;
        } else {
            Self::run_checked(repo, &["worktree", "add", &path_str, branch]).await?;
        }
        Ok(())
    }

    /// Remove a worktree.
    #[instrument(skip_all, fields(repo = %repo.display(), path = %path.display(), force))]
    pub async fn remove_worktree(repo: &Path, path: &Path, force: bool) -> Result<(), GitError> {
        let path_str = path.to_string_lossy();
        if force {
            Self::run_checked(repo, &["worktree", "remove", "--force", &path_str]).await?;
        } else {
            Self::run_checked(repo, &["worktree", "remove", &path_str]).await?;
        }
        Ok(())
    }

    /// Prune stale worktree metadata.
    #[instrument(skip_all, fields(repo = %repo.display()))]
    pub async fn prune_worktrees(repo: &Path) -> Result<(), GitError> {
        Self::run_checked(repo, &["worktree", "prune"]).await?;
        Ok(())
    }

    /// Git binary version string, for diagnostics.
    pub async fn version() -> Result<String, GitError> {
        let out = Self::run(Path::new("."), &["--version"]).await?;
        Ok(out.stdout.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_success() {
        let ok = GitOutput {
            stdout: String::new(),
            stderr: String::new(),
            status: 0,
        };
        assert!(ok.success());

        let failed = GitOutput {
            stdout: String::new(),
            stderr: "fatal: oops".to_string(),
            status: 128,
        };
        assert!(!failed.success());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            GitError::NotInstalled.to_string(),
            "git is not installed or not in PATH"
        );

        let err = GitError::CommandFailed {
            command: "worktree".to_string(),
            stderr: "fatal: not a working tree".to_string(),
        };
        assert_eq!(err.to_string(), "git worktree failed: fatal: not a working tree");

        let conflict = GitError::PathConflict(PathBuf::from("./trees/feature-x"));
        assert!(conflict.to_string().contains("already exists"));
    }
}
