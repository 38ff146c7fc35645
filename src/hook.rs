//! PostToolUse hook entry point.
//!
//! The assistant pipes a JSON description of the finished tool call to the
//! hook on stdin. Only `tool_input.file_path` matters here; every other field
//! is ignored and any payload that does not name an existing Markdown file
//! turns the hook into a no-op.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The subset of the hook payload fencefmt reads.
#[derive(Debug, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default)]
    pub tool_input: ToolInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Why a payload was not acted upon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    InvalidPayload(String),
    NoFilePath,
    NotMarkdown(PathBuf),
    Missing(PathBuf),
}

/// Extract the Markdown document a payload refers to.
pub fn markdown_target(payload: &str) -> Result<PathBuf, Skip> {
    let payload: HookPayload = serde_json::from_str(payload).map_err(|e| Skip::InvalidPayload(e.to_string()))?;
    let file_path = payload
        .tool_input
        .file_path
        .filter(|p| !p.is_empty())
        .ok_or(Skip::NoFilePath)?;

    let path = PathBuf::from(file_path);
    if !is_markdown(&path) {
        return Err(Skip::NotMarkdown(path));
    }
    if !path.exists() {
        return Err(Skip::Missing(path));
    }
    Ok(path)
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
