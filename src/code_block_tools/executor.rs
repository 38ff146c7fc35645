//! Tool execution engine for running external formatters.
//!
//! Tools are run as blocking subprocesses in a given working directory, with
//! timeout support and lazy tool availability checking.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Result of executing a tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output from the tool.
    pub stdout: String,
    /// Standard error from the tool.
    pub stderr: String,
    /// Exit code (0 typically means success).
    pub exit_code: i32,
    /// Whether the tool executed successfully (exit code 0).
    pub success: bool,
}

/// Error during tool execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// Tool binary not found in PATH.
    #[error("Tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },
    /// Tool ran but reported failure.
    #[error("Tool '{tool}' failed: {message}")]
    ExecutionFailed { tool: String, message: String },
    /// Tool execution timed out.
    #[error("Tool '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },
    /// I/O error during execution.
    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Executor for running external tools.
///
/// Caches tool availability checks for efficiency.
pub struct ToolExecutor {
    /// Cache of tool availability checks (tool name -> available).
    tool_cache: Arc<Mutex<HashMap<String, bool>>>,
    /// Default timeout in milliseconds (0 waits forever).
    default_timeout_ms: u64,
}

impl ToolExecutor {
    /// Create a new executor with the given default timeout.
    pub fn new(default_timeout_ms: u64) -> Self {
        Self {
            tool_cache: Arc::new(Mutex::new(HashMap::new())),
            default_timeout_ms,
        }
    }

    /// Check if a tool is available (lazy, cached).
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        if let Ok(cache) = self.tool_cache.lock()
            && let Some(&available) = cache.get(tool_name)
        {
            return available;
        }

        let available = check_tool_exists(tool_name);

        if let Ok(mut cache) = self.tool_cache.lock() {
            cache.insert(tool_name.to_string(), available);
        }

        available
    }

    /// Run `command` in `cwd`, waiting at most `timeout_ms` (or the default).
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// [`ToolOutput::success`]. Use [`ToolExecutor::run_checked`] to turn it
    /// into [`ExecutorError::ExecutionFailed`].
    pub fn run(&self, command: &[String], cwd: &Path, timeout_ms: Option<u64>) -> Result<ToolOutput, ExecutorError> {
        let Some((tool_name, args)) = command.split_first() else {
            return Err(ExecutorError::ExecutionFailed {
                tool: "unknown".to_string(),
                message: "Empty command".to_string(),
            });
        };

        if !self.is_tool_available(tool_name) {
            return Err(ExecutorError::ToolNotFound {
                tool: tool_name.clone(),
            });
        }

        log::debug!("Running {} in {}", command.join(" "), cwd.display());
        let started = Instant::now();

        let mut child = Command::new(tool_name)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExecutorError::ToolNotFound {
                    tool: tool_name.clone(),
                },
                _ => ExecutorError::IoError {
                    message: format!("Failed to spawn '{tool_name}': {e}"),
                },
            })?;

        let mut stdout_handle = child
            .stdout
            .take()
            .map(|stdout| thread::spawn(move || read_pipe_to_string(stdout)));
        let mut stderr_handle = child
            .stderr
            .take()
            .map(|stderr| thread::spawn(move || read_pipe_to_string(stderr)));

        let timeout = Duration::from_millis(timeout_ms.unwrap_or(self.default_timeout_ms));
        let status = if timeout.is_zero() {
            child.wait().map_err(|e| ExecutorError::IoError {
                message: format!("Failed to wait for '{tool_name}': {e}"),
            })?
        } else {
            loop {
                if let Some(status) = child.try_wait().map_err(|e| ExecutorError::IoError {
                    message: format!("Failed to poll '{tool_name}': {e}"),
                })? {
                    break status;
                }
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = join_reader(stdout_handle.take());
                    let _ = join_reader(stderr_handle.take());
                    return Err(ExecutorError::Timeout {
                        tool: tool_name.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
        };

        let stdout = join_reader(stdout_handle.take()).map_err(|e| ExecutorError::IoError { message: e })?;
        let stderr = join_reader(stderr_handle.take()).map_err(|e| ExecutorError::IoError { message: e })?;
        let exit_code = status.code().unwrap_or(-1);
        log::debug!("{tool_name} exited with {exit_code} after {:?}", started.elapsed());

        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code,
            success: status.success(),
        })
    }

    /// Like [`ToolExecutor::run`], but a non-zero exit becomes an error.
    pub fn run_checked(
        &self,
        command: &[String],
        cwd: &Path,
        timeout_ms: Option<u64>,
    ) -> Result<ToolOutput, ExecutorError> {
        let output = self.run(command, cwd, timeout_ms)?;
        if output.success {
            return Ok(output);
        }
        let exit_code = output.exit_code;
        let stderr = output.stderr.trim();
        Err(ExecutorError::ExecutionFailed {
            tool: command.first().cloned().unwrap_or_default(),
            message: if stderr.is_empty() {
                format!("Exit code {exit_code}")
            } else {
                format!("Exit code {exit_code}: {stderr}")
            },
        })
    }
}

/// Check if a tool binary exists, using `which` on Unix or `where` on Windows.
fn check_tool_exists(tool_name: &str) -> bool {
    #[cfg(unix)]
    let finder = "which";
    #[cfg(windows)]
    let finder = "where";

    // Without a finder, let the spawn itself report a missing tool
    Command::new(finder)
        .arg(tool_name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_or(true, |s| s.success())
}

fn read_pipe_to_string<R: Read>(mut pipe: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).to_string())
}

fn join_reader(handle: Option<thread::JoinHandle<std::io::Result<String>>>) -> Result<String, String> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(res) => res.map_err(|e| format!("Failed to read output: {e}")),
            Err(_) => Err("Output reader thread panicked".to_string()),
        },
        None => Ok(String::new()),
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(30_000) // 30 seconds default
    }
}
