//! Terminal output for listings and branch rankings.
//!
//! Everything here is formatting; records arrive already classified and
//! ranked. The compact layouts are deliberately narrow so they stay
//! readable on a phone-sized terminal.

use chrono::{DateTime, Utc};

use crate::git::{BranchRecord, Listing, StatusCategory, WorktreeRecord};

/// One-character status marker for the compact listing.
pub fn status_symbol(status: Option<StatusCategory>) -> &'static str {
    match status {
        Some(StatusCategory::Clean) => "✓",
        Some(StatusCategory::Modified) => "!",
        Some(StatusCategory::Staged) => "S",
        Some(StatusCategory::Untracked) => "?",
        Some(StatusCategory::Mixed) => "M",
        None => "✗",
    }
}

fn status_label(status: Option<StatusCategory>) -> &'static str {
    match status {
        Some(StatusCategory::Clean) => "Clean",
        Some(StatusCategory::Modified) => "Modified",
        Some(StatusCategory::Staged) => "Staged",
        Some(StatusCategory::Untracked) => "Untracked",
        Some(StatusCategory::Mixed) => "Mixed",
        None => "ERROR",
    }
}

/// Compact one-line-per-worktree listing.
pub fn print_compact(listing: &Listing) {
    for worktree in &listing.worktrees {
        let branch = worktree.record.branch.as_deref().unwrap_or("DETACHED");
        let name = if worktree.record.is_main {
            "main".to_string()
        } else {
            worktree.record.dir_name()
        };
        println!(
            "🌿 {} {} ({})",
            status_symbol(worktree.status),
            branch,
            name
        );
    }
}

/// Fixed-width table listing.
pub fn print_table(listing: &Listing) {
    println!("{:<42} {:<24} {}", "WORKTREE PATH", "BRANCH", "STATUS");
    println!("{}", "─".repeat(76));
    for worktree in &listing.worktrees {
        let branch = worktree.record.branch.as_deref().unwrap_or("DETACHED");
        println!(
            "{:<42} {:<24} {}",
            display_path(&worktree.record),
            branch,
            status_label(worktree.status)
        );
    }
}

/// `.` for the main worktree, a cwd-relative path where possible, the
/// absolute path otherwise.
fn display_path(record: &WorktreeRecord) -> String {
    if record.is_main {
        return ".".to_string();
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| {
            record
                .path
                .strip_prefix(&cwd)
                .ok()
                .map(|rel| format!("./{}", rel.display()))
        })
        .unwrap_or_else(|| record.path.display().to_string())
}

/// Recency-ranked branch listing with worktree/local/remote markers.
pub fn print_branches(branches: &[BranchRecord]) {
    println!("📅 Recent branches by activity");
    println!("{}", "─".repeat(60));

    for (position, branch) in branches.iter().enumerate() {
        let mut markers = String::new();
        if branch.has_worktree {
            markers.push_str("🌿 ");
        }
        markers.push_str(if branch.is_remote { "📡" } else { "📍" });

        println!("{:>2}. {} {}", position + 1, markers, branch.name);
        println!(
            "    {} • {}",
            relative_age(branch.last_commit),
            branch.author
        );
        println!("    \"{}\"", truncate(&branch.subject, 50));
    }

    println!();
    println!("Legend: 🌿 has worktree  📍 local  📡 remote");
}

/// Human age of a commit: "3 days ago", "2 hours ago".
fn relative_age(when: DateTime<Utc>) -> String {
    let delta = Utc::now().signed_duration_since(when);

    let days = delta.num_days();
    if days >= 365 {
        return plural(days / 365, "year");
    }
    if days >= 30 {
        return plural(days / 30, "month");
    }
    if days >= 1 {
        return plural(days, "day");
    }
    if delta.num_hours() >= 1 {
        return plural(delta.num_hours(), "hour");
    }
    if delta.num_minutes() >= 1 {
        return plural(delta.num_minutes(), "minute");
    }
    "just now".to_string()
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_symbols() {
        assert_eq!(status_symbol(Some(StatusCategory::Clean)), "✓");
        assert_eq!(status_symbol(Some(StatusCategory::Modified)), "!");
        assert_eq!(status_symbol(Some(StatusCategory::Staged)), "S");
        assert_eq!(status_symbol(Some(StatusCategory::Untracked)), "?");
        assert_eq!(status_symbol(Some(StatusCategory::Mixed)), "M");
        assert_eq!(status_symbol(None), "✗");
    }

    #[test]
    fn test_relative_age_buckets() {
        let now = Utc::now();
        assert_eq!(relative_age(now), "just now");
        assert_eq!(relative_age(now - Duration::minutes(5)), "5 minutes ago");
        assert_eq!(relative_age(now - Duration::hours(1)), "1 hour ago");
        assert_eq!(relative_age(now - Duration::days(3)), "3 days ago");
        assert_eq!(relative_age(now - Duration::days(70)), "2 months ago");
        assert_eq!(relative_age(now - Duration::days(800)), "2 years ago");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
        // Multi-byte input must not panic.
        assert_eq!(truncate("héllo wörld", 5), "héllo…");
    }
}
