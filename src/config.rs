use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub branches: BranchesConfig,
    #[serde(default)]
    pub create: CreateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where new worktrees land, relative to the repository root.
    #[serde(default = "default_trees_dir")]
    pub trees_dir: String,
}

fn default_trees_dir() -> String {
    crate::git::DEFAULT_TREES_DIR.to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            trees_dir: default_trees_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchesConfig {
    /// Branches a deletion target may be merged into, checked in order.
    #[serde(default = "default_merge_targets")]
    pub merge_targets: Vec<String>,

    /// How many branches `branches` shows when no `--limit` is given.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_merge_targets() -> Vec<String> {
    vec![
        "main".to_string(),
        "master".to_string(),
        "develop".to_string(),
    ]
}

fn default_limit() -> usize {
    10
}

impl Default for BranchesConfig {
    fn default() -> Self {
        Self {
            merge_targets: default_merge_targets(),
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConfig {
    /// Copy the repository root `.env` into new worktrees.
    #[serde(default = "default_copy_env")]
    pub copy_env: bool,
}

fn default_copy_env() -> bool {
    true
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            copy_env: default_copy_env(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Project-local config file, resolved from the invocation directory.
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".canopy.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so canopy works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // Project config next to the repository
        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/canopy/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("canopy").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with CANOPY_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CANOPY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.paths.trees_dir, "./trees");
        assert_eq!(config.branches.merge_targets, vec!["main", "master", "develop"]);
        assert_eq!(config.branches.default_limit, 10);
        assert!(config.create.copy_env);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults_round_trip_through_json() {
        // Config::load feeds defaults through serde_json; make sure that
        // path stays lossless.
        let defaults = Config::default();
        let json = serde_json::to_string(&defaults).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.paths.trees_dir, defaults.paths.trees_dir);
        assert_eq!(back.branches.merge_targets, defaults.branches.merge_targets);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let partial: Config = toml_from_str("[branches]\ndefault_limit = 5\n");
        assert_eq!(partial.branches.default_limit, 5);
        assert_eq!(partial.paths.trees_dir, "./trees");
    }

    fn toml_from_str(raw: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
