use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Result;
use clap::{Parser, Subcommand};

use canopy::config::Config;
use canopy::git::{Decision, DeletionRequest, GitCli, GitError, WorktreeManager};
use canopy::{logging, render};

/// Check that git is on PATH before doing anything useful.
fn check_git_available() -> Result<(), GitError> {
    which::which("git").map(|_| ()).map_err(|_| GitError::NotInstalled)
}

/// Print a helpful error message for git issues
fn print_git_error(err: &GitError) {
    eprintln!("Error: {}", err);
    eprintln!();

    match err {
        GitError::NotInstalled => {
            eprintln!("git is required to run canopy.");
            eprintln!();
            eprintln!("Install git:");
            eprintln!("  macOS:         brew install git");
            eprintln!("  Ubuntu/Debian: sudo apt install git");
            eprintln!("  Fedora/RHEL:   sudo dnf install git");
            eprintln!("  Arch:          sudo pacman -S git");
        }
        GitError::NotARepository(_) => {
            eprintln!("Run canopy from inside a git repository.");
        }
        _ => {
            eprintln!("Please ensure git is properly installed and working.");
        }
    }
}

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Git worktree manager: per-branch checkouts under trees/")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List worktrees with status (the default)
    List {
        /// Table layout instead of the compact one
        #[arg(short, long)]
        table: bool,

        /// Machine-readable JSON output
        #[arg(long)]
        json: bool,
    },

    /// Create a worktree (and the branch, if it does not exist yet)
    New {
        /// Branch to check out
        branch: String,

        /// Destination path (default: ./trees/<branch-with-dashes>)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Delete a worktree, with an unmerged-branch safety check
    #[command(alias = "remove")]
    Delete {
        /// Worktree to delete (directory name, branch, or path)
        name: String,

        /// Skip the merge safety check
        #[arg(short, long)]
        force: bool,

        /// Answer yes to the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Print the cd command for a worktree
    Switch {
        /// Worktree to switch to (directory name, branch, or path)
        name: String,
    },

    /// List branches by last activity
    Branches {
        /// Max branches to show (0 or less shows all)
        #[arg(short, long)]
        limit: Option<i64>,

        /// Machine-readable JSON output
        #[arg(long)]
        json: bool,
    },

    /// Repository and worktree diagnostics
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init_logging(&config, cli.debug)?;

    if let Err(err) = check_git_available() {
        print_git_error(&err);
        std::process::exit(1);
    }

    match cli.command {
        Some(Commands::List { table, json }) => {
            cmd_list(&config, table, json).await?;
        }
        Some(Commands::New { branch, path }) => {
            cmd_new(&config, &branch, path).await?;
        }
        Some(Commands::Delete { name, force, yes }) => {
            cmd_delete(&config, name, force, yes).await?;
        }
        Some(Commands::Switch { name }) => {
            cmd_switch(&config, &name).await?;
        }
        Some(Commands::Branches { limit, json }) => {
            cmd_branches(&config, limit, json).await?;
        }
        Some(Commands::Status) => {
            cmd_status(&config).await?;
        }
        None => {
            // No subcommand = compact listing
            cmd_list(&config, false, false).await?;
        }
    }

    Ok(())
}

/// Build a manager for the repository enclosing the current directory.
async fn manager_for_cwd(config: &Config) -> Result<WorktreeManager> {
    let cwd = std::env::current_dir()?;
    let manager = match WorktreeManager::discover(
        &cwd,
        PathBuf::from(&config.paths.trees_dir),
        config.branches.merge_targets.clone(),
    )
    .await
    {
        Ok(manager) => manager,
        Err(err @ (GitError::NotARepository(_) | GitError::NotInstalled)) => {
            print_git_error(&err);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };
    Ok(manager)
}

async fn cmd_list(config: &Config, table: bool, json: bool) -> Result<()> {
    let manager = manager_for_cwd(config).await?;
    let listing = manager.list().await?;

    for warning in &listing.warnings {
        eprintln!("warning: {warning}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listing.worktrees)?);
    } else if table {
        render::print_table(&listing);
    } else {
        render::print_compact(&listing);
    }

    Ok(())
}

async fn cmd_new(config: &Config, branch: &str, path: Option<PathBuf>) -> Result<()> {
    let manager = manager_for_cwd(config).await?;

    let record = match manager.create(branch, path, config.create.copy_env).await {
        Ok(record) => record,
        Err(GitError::PathConflict(destination)) => {
            eprintln!(
                "Error: {} already exists and is not empty",
                destination.display()
            );
            eprintln!("Pick another destination with --path");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    println!(
        "✓ Created worktree {} at {}",
        branch,
        record.path.display()
    );
    println!();
    println!("Worktrees:");
    render::print_compact(&manager.list().await?);

    Ok(())
}

async fn cmd_delete(config: &Config, name: String, force: bool, yes: bool) -> Result<()> {
    let manager = manager_for_cwd(config).await?;
    let request = DeletionRequest {
        target: name,
        force,
    };

    let (record, decision) = match manager.plan_delete(&request).await {
        Ok(planned) => planned,
        Err(GitError::WorktreeNotFound(name)) => {
            eprintln!("Error: worktree '{name}' not found");
            eprintln!();
            eprintln!("Available worktrees:");
            render::print_compact(&manager.list().await?);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    let branch = record.branch.as_deref().unwrap_or("DETACHED").to_string();

    match decision {
        Decision::Deny(reason) => {
            eprintln!("Error: {reason}");
            std::process::exit(1);
        }
        Decision::AllowWithWarning(reason) => {
            println!("⚠ Warning: {reason} ('{branch}')");
            println!("  Deleting worktree at {}", record.path.display());
            println!("  Use --force to skip this check");
            if !yes && !confirm("Continue anyway?")? {
                println!("Cancelled");
                return Ok(());
            }
        }
        Decision::Allow => {}
    }

    manager.remove(&record).await?;

    println!("✓ Deleted worktree {} at {}", branch, record.path.display());
    println!();
    println!("Remaining worktrees:");
    render::print_compact(&manager.list().await?);

    Ok(())
}

async fn cmd_switch(config: &Config, name: &str) -> Result<()> {
    let manager = manager_for_cwd(config).await?;

    let record = match manager.find(name).await {
        Ok(record) => record,
        Err(GitError::WorktreeNotFound(name)) => {
            eprintln!("Error: worktree '{name}' not found");
            eprintln!();
            eprintln!("Available worktrees:");
            render::print_compact(&manager.list().await?);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    let path = record.path.canonicalize().unwrap_or_else(|_| record.path.clone());
    let branch = record.branch.as_deref().unwrap_or("DETACHED");
    let command = format!("cd '{}'", path.display());

    println!("🌿 {} → {}", branch, path.display());
    if copy_to_clipboard(&command).await {
        println!("(command copied to clipboard)");
    }
    println!();
    println!("Run:");
    println!("  {command}");

    Ok(())
}

async fn cmd_branches(config: &Config, limit: Option<i64>, json: bool) -> Result<()> {
    let manager = manager_for_cwd(config).await?;

    // Zero or negative means "show everything".
    let limit = match limit {
        Some(given) => usize::try_from(given).unwrap_or(0),
        None => config.branches.default_limit,
    };

    let (branches, warnings) = manager.recent_branches(limit).await?;
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&branches)?);
        return Ok(());
    }

    if branches.is_empty() {
        println!("No branches found");
        return Ok(());
    }

    render::print_branches(&branches);
    Ok(())
}

async fn cmd_status(config: &Config) -> Result<()> {
    let manager = manager_for_cwd(config).await?;
    let repo_root = manager.repo_root().to_path_buf();

    println!("Repository");
    println!("{}", "─".repeat(60));
    println!("  Root:    {}", repo_root.display());
    match GitCli::current_branch(&repo_root).await? {
        Some(branch) => println!("  Branch:  {branch}"),
        None => println!("  Branch:  DETACHED"),
    }
    match GitCli::head_commit(&repo_root).await {
        Ok(head) => println!("  HEAD:    {}", &head[..head.len().min(12)]),
        Err(err) => println!("  HEAD:    unavailable ({err})"),
    }
    println!();

    println!("Worktrees");
    println!("{}", "─".repeat(60));
    let listing = manager.list().await?;
    println!("  Total: {}", listing.worktrees.len());
    render::print_compact(&listing);
    println!();

    println!("Trees directory");
    println!("{}", "─".repeat(60));
    let trees_name = config.paths.trees_dir.trim_start_matches("./");
    let trees_dir = repo_root.join(trees_name);
    println!("  Path:   {}", trees_dir.display());
    println!("  Exists: {}", trees_dir.exists());
    if let Ok(entries) = std::fs::read_dir(&trees_dir) {
        println!("  Entries: {}", entries.count());
    }
    let ignored = std::fs::read_to_string(repo_root.join(".gitignore"))
        .map(|content| content.lines().any(|line| line.contains(trees_name)))
        .unwrap_or(false);
    if ignored {
        println!("  .gitignore covers '{trees_name}' ✓");
    } else {
        println!("  .gitignore does not mention '{trees_name}'");
    }
    println!();

    println!("Branches");
    println!("{}", "─".repeat(60));
    let (branches, _) = manager.recent_branches(0).await?;
    let local = branches.iter().filter(|b| b.is_local).count();
    let remote = branches.iter().filter(|b| b.is_remote).count();
    println!("  Local:       {local}");
    println!("  Remote-only: {remote}");
    println!();

    println!("Health");
    println!("{}", "─".repeat(60));
    match GitCli::version().await {
        Ok(version) => println!("  {version} ✓"),
        Err(err) => println!("  git unavailable: {err}"),
    }

    Ok(())
}

/// Interactive y/N prompt.
fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Best-effort clipboard copy of the cd command (pbcopy on macOS, xclip on
/// Linux). A missing clipboard tool is not an error.
async fn copy_to_clipboard(text: &str) -> bool {
    let candidates: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (binary, args) in candidates {
        if which::which(binary).is_err() {
            continue;
        }

        let child = tokio::process::Command::new(binary)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let Ok(mut child) = child else { continue };

        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            if stdin.write_all(text.as_bytes()).await.is_err() {
                continue;
            }
        }

        if matches!(child.wait().await, Ok(status) if status.success()) {
            return true;
        }
    }

    false
}
