//!
//! This module defines the top-level configuration structure and its loading logic.
//! Configuration lives in `.fencefmt.toml`, found by walking up from a start directory.

use crate::code_block_tools::CodeBlockToolsConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name looked up when no explicit config path is given.
pub const CONFIG_FILE_NAME: &str = ".fencefmt.toml";

/// Represents the complete configuration loaded from `.fencefmt.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Path the configuration was loaded from, if any
    pub source: Option<PathBuf>,
    pub code_blocks: CodeBlockToolsConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the TOML content
    #[error("Failed to parse config at {path}: {source}")]
    ParseError { source: toml::de::Error, path: String },

    /// Configuration file already exists
    #[error("Configuration file already exists at {path}")]
    FileExists { path: String },
}

impl Config {
    /// Load configuration from an explicit file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            source,
            path: path.display().to_string(),
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let code_blocks = toml::from_str(content).map_err(|source| ConfigError::ParseError {
            source,
            path: path.display().to_string(),
        })?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            code_blocks,
        })
    }

    /// Load `explicit` if given, else the nearest config above `start`, else defaults.
    pub fn resolve(explicit: Option<&Path>, start: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match find_config_file(start) {
            Some(path) => {
                log::debug!("Using config file {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Find the nearest `.fencefmt.toml` in `start` or one of its ancestors.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let start = if start.is_file() { start.parent()? } else { start };
    let start = std::path::absolute(start).unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Contents written by `fencefmt init`.
pub const DEFAULT_CONFIG: &str = r#"# fencefmt configuration file

# Timeout per formatter invocation in milliseconds (0 disables the timeout)
timeout = 30000

[families.python]
enabled = true
# Extra fence tags treated as Python
aliases = []
# Leave `steps` out to use the built-in chain:
#   ruff format --line-length=120 {dir}
#   ruff check --fix ... {dir}   (failure allowed)
# [[families.python.steps]]
# command = ["ruff", "format", "--line-length=120", "{dir}"]

[families.shell]
enabled = true
aliases = []
# Built-in chain:
#   npx prettier --write --plugin={npm-root}/prettier-plugin-sh/lib/index.cjs **/*.sh

[document]
# Whole-document formatter, run after code blocks are spliced back
enabled = true
command = ["npx", "prettier", "--write", "--list-different"]
# Extra arguments for files under a docs/ directory (except docs/**/reference/)
docs-args = ["--tab-width", "4"]
version-command = ["npx", "prettier", "--version"]
expected-version = "3.6.2"
"#;

/// Create a default configuration file at the specified path.
pub fn create_default_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::FileExists {
            path: path.display().to_string(),
        });
    }

    fs::write(path, DEFAULT_CONFIG).map_err(|source| ConfigError::IoError {
        source,
        path: path.display().to_string(),
    })
}
