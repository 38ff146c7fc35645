//! fencefmt: formats Python and shell code blocks embedded in Markdown.
//!
//! The library exposes the formatting pipeline in [`code_block_tools`], the
//! `.fencefmt.toml` loader in [`config`], and the editor hook payload parser
//! in [`hook`]. The `fencefmt` binary is a thin clap front end over these.

pub mod code_block_tools;
pub mod config;
pub mod exit_codes;
pub mod file_processor;
pub mod hook;
pub mod utils;

pub use code_block_tools::{CodeBlockFormatter, Diagnostic, DiagnosticKind, Family, FileOutcome, WriteMode};
pub use config::{Config, ConfigError};
