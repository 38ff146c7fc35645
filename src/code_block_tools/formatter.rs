//! Formatter adapters: the seams between a formatting pass and external tools.
//!
//! [`BatchFormatter`] formats every isolated unit of one family in a single
//! batched invocation; [`DocumentFormatter`] runs once over the finished
//! document. Both report failures as values and never abort the pass.

use super::config::{DocumentFormatterConfig, FormatterStep};
use super::executor::{ExecutorError, ToolExecutor};
use super::family::Family;
use super::unit::IsolatedUnit;
use std::cell::{Cell, OnceCell};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Why a formatter did not (fully) succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatterError {
    #[error(transparent)]
    Tool(#[from] ExecutorError),
    #[error("could not resolve global npm root: {0}")]
    NpmRoot(String),
    #[error("{tool} version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        tool: String,
        expected: String,
        found: String,
    },
    #[error("no formatter configured for {0}")]
    NotConfigured(Family),
}

/// Formats all isolated units of a family in place.
pub trait BatchFormatter {
    /// Rewrite the units of `family` found in `dir`.
    ///
    /// `Ok` means the unit files hold usable output; the returned errors are
    /// non-fatal warnings. `Err` means the units must be used verbatim.
    fn format_batch(
        &self,
        family: Family,
        dir: &Path,
        units: &[IsolatedUnit],
    ) -> Result<Vec<FormatterError>, FormatterError>;
}

/// Formats a whole document file in place.
pub trait DocumentFormatter {
    /// Same contract as [`BatchFormatter::format_batch`], for a single file.
    fn format_document(&self, path: &Path) -> Result<Vec<FormatterError>, FormatterError>;
}

/// Runs each family's configured [`FormatterStep`]s as subprocesses.
pub struct CommandFormatter {
    executor: ToolExecutor,
    steps: BTreeMap<Family, Vec<FormatterStep>>,
    npm_root: OnceCell<Result<String, String>>,
}

impl CommandFormatter {
    pub fn new(executor: ToolExecutor, steps: BTreeMap<Family, Vec<FormatterStep>>) -> Self {
        Self {
            executor,
            steps,
            npm_root: OnceCell::new(),
        }
    }

    fn npm_root(&self, cwd: &Path) -> Result<String, FormatterError> {
        self.npm_root
            .get_or_init(|| {
                let command = ["npm", "root", "-g"].map(String::from);
                self.executor
                    .run_checked(&command, cwd, None)
                    .map(|output| output.stdout.trim().to_string())
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(FormatterError::NpmRoot)
    }

    fn expand(&self, command: &[String], dir: &Path) -> Result<Vec<String>, FormatterError> {
        let dir_str = dir.display().to_string();
        let mut expanded = Vec::with_capacity(command.len());
        for arg in command {
            let mut arg = arg.replace("{dir}", &dir_str);
            if arg.contains("{npm-root}") {
                arg = arg.replace("{npm-root}", &self.npm_root(dir)?);
            }
            expanded.push(arg);
        }
        Ok(expanded)
    }
}

impl BatchFormatter for CommandFormatter {
    fn format_batch(
        &self,
        family: Family,
        dir: &Path,
        units: &[IsolatedUnit],
    ) -> Result<Vec<FormatterError>, FormatterError> {
        let steps = match self.steps.get(&family) {
            Some(steps) if !steps.is_empty() => steps,
            _ => return Err(FormatterError::NotConfigured(family)),
        };
        log::debug!("Formatting {} {family} block(s) in {}", units.len(), dir.display());

        let mut warnings = Vec::new();
        for step in steps {
            let result = self
                .expand(&step.command, dir)
                .and_then(|command| Ok(self.executor.run_checked(&command, dir, None)?));
            match result {
                Ok(_) => {}
                Err(e) if step.allow_failure => {
                    log::debug!("Allowed failure in {family} step: {e}");
                    warnings.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(warnings)
    }
}

/// Runs the configured whole-document formatter (prettier by default).
pub struct CommandDocumentFormatter {
    executor: ToolExecutor,
    config: DocumentFormatterConfig,
    version_checked: Cell<bool>,
}

impl CommandDocumentFormatter {
    pub fn new(executor: ToolExecutor, config: DocumentFormatterConfig) -> Self {
        Self {
            executor,
            config,
            version_checked: Cell::new(false),
        }
    }

    /// Full command line for `path`, absolute path last.
    pub fn command_for(&self, path: &Path) -> Vec<String> {
        let mut command = self.config.command.clone();
        if is_docs_path(path) {
            // `npx prettier --tab-width 4 --write ...`
            let insert_at = command.len().min(2);
            for (i, arg) in self.config.docs_args.iter().enumerate() {
                command.insert(insert_at + i, arg.clone());
            }
        }
        command.push(path.display().to_string());
        command
    }

    fn check_version(&self, cwd: &Path) -> Result<Option<FormatterError>, FormatterError> {
        if self.version_checked.replace(true) || self.config.version_command.is_empty() {
            return Ok(None);
        }
        let output = self.executor.run_checked(&self.config.version_command, cwd, Some(5_000))?;
        let found = output.stdout.trim().to_string();
        match &self.config.expected_version {
            Some(expected) if !found.contains(expected.as_str()) => Ok(Some(FormatterError::VersionMismatch {
                tool: self.config.version_command.join(" "),
                expected: expected.clone(),
                found,
            })),
            _ => Ok(None),
        }
    }
}

impl DocumentFormatter for CommandDocumentFormatter {
    fn format_document(&self, path: &Path) -> Result<Vec<FormatterError>, FormatterError> {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let cwd = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

        let mut warnings: Vec<FormatterError> = self.check_version(&cwd)?.into_iter().collect();
        let command = self.command_for(&path);
        let output = self.executor.run(&command, &cwd, None)?;
        if !output.success {
            warnings.push(
                ExecutorError::ExecutionFailed {
                    tool: command.first().cloned().unwrap_or_default(),
                    message: format!("Exit code {}: {}", output.exit_code, output.stderr.trim()),
                }
                .into(),
            );
        } else if !output.stdout.trim().is_empty() {
            log::debug!("Document formatter rewrote {}", path.display());
        }
        Ok(warnings)
    }
}

/// Documentation trees get their own formatter options, API references excepted.
pub fn is_docs_path(path: &Path) -> bool {
    let has = |name: &str| path.components().any(|c| matches!(c, Component::Normal(s) if s == name));
    has("docs") && !has("reference")
}
