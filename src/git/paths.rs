//! Filesystem layout for managed worktrees.
//!
//! Naming and resolution only; nothing here checks for collisions or
//! creates directories. That stays with the worktree-creation path, which
//! refuses non-empty destinations.

use std::path::{Path, PathBuf};

/// Default directory for new worktrees, relative to the repository root.
pub const DEFAULT_TREES_DIR: &str = "./trees";

/// Directory name for a branch's worktree: slashes become dashes.
pub fn worktree_dir_name(branch: &str) -> String {
    branch.replace('/', "-")
}

/// Resolve the destination for a new worktree.
///
/// An explicit path wins verbatim; otherwise the branch lands under the
/// trees root.
pub fn resolve_worktree_path(
    branch: &str,
    explicit: Option<PathBuf>,
    trees_root: &Path,
) -> PathBuf {
    match explicit {
        Some(path) => path,
        None => trees_root.join(worktree_dir_name(branch)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_name_replaces_slashes() {
        assert_eq!(worktree_dir_name("feature/login"), "feature-login");
        assert_eq!(worktree_dir_name("a/b/c"), "a-b-c");
        assert_eq!(worktree_dir_name("plain"), "plain");
    }

    #[test]
    fn test_resolve_defaults_under_trees_root() {
        let got = resolve_worktree_path("feature/login", None, Path::new(DEFAULT_TREES_DIR));
        assert_eq!(got, PathBuf::from("./trees/feature-login"));
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let got = resolve_worktree_path(
            "x",
            Some(PathBuf::from("./custom")),
            Path::new(DEFAULT_TREES_DIR),
        );
        assert_eq!(got, PathBuf::from("./custom"));
    }
}
