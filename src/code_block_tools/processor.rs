//! Main processor for code block formatting.
//!
//! One pass over one document: extract blocks, isolate them as files,
//! run each family's formatter once over its batch, read results back,
//! splice them into the document and optionally run the document formatter.

use super::config::CodeBlockToolsConfig;
use super::executor::{ExecutorError, ToolExecutor};
use super::extractor::{BlockExtractor, EmbeddedBlock, Extraction};
use super::family::{AliasTable, Family};
use super::formatter::{
    BatchFormatter, CommandDocumentFormatter, CommandFormatter, DocumentFormatter, FormatterError,
};
use super::splicer::{Replacement, splice};
use super::unit::{IsolatedUnit, UnitBatch};
use crate::utils::line_ending::{detect_line_ending_enum, normalize_line_ending, LineEnding};
use std::fmt;
use std::fs;
use std::path::Path;

/// Category of a non-fatal problem met during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Opening fence without a matching closing fence.
    MalformedBlock,
    /// Formatter binary missing or not configured.
    ToolUnavailable,
    /// Formatter exited with a failure status.
    ToolFailure,
    /// Formatter exceeded its timeout.
    Timeout,
    /// Formatter reported an unexpected version.
    VersionMismatch,
    /// Temporary storage for isolated units could not be used.
    UnitStorage,
    /// A formatted unit could not be read back.
    UnitUnreadable,
    /// The document could not be read.
    DocumentUnreadable,
    /// The rewritten document could not be written.
    DocumentWriteFailed,
}

/// A problem surfaced to the caller; never fatal to the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub family: Option<Family>,
    /// 1-indexed line in the document, when the problem belongs to a block.
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            family: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn with_family(mut self, family: Family) -> Self {
        self.family = Some(family);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    fn from_formatter_error(error: &FormatterError) -> Self {
        let kind = match error {
            FormatterError::Tool(ExecutorError::ToolNotFound { .. })
            | FormatterError::NotConfigured(_)
            | FormatterError::NpmRoot(_) => DiagnosticKind::ToolUnavailable,
            FormatterError::Tool(ExecutorError::Timeout { .. }) => DiagnosticKind::Timeout,
            FormatterError::VersionMismatch { .. } => DiagnosticKind::VersionMismatch,
            FormatterError::Tool(_) => DiagnosticKind::ToolFailure,
        };
        Self::new(kind, error.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        if let Some(family) = self.family {
            write!(f, "[{family}] ")?;
        }
        f.write_str(&self.message)
    }
}

/// Formatting result for one isolated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattingResult {
    Formatted(String),
    /// The block keeps its original content.
    Unchanged,
}

/// Outcome of formatting a document's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub content: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Recognized blocks found in the document.
    pub blocks_found: usize,
    /// Blocks whose content was replaced.
    pub blocks_changed: usize,
}

/// Outcome of formatting a document file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    /// Whether the block pass changed the document text.
    pub changed: bool,
    /// Whether the new text was written back.
    pub written: bool,
    pub blocks_found: usize,
    pub blocks_changed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Whether a file pass may modify the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Write,
    /// Report what would change without touching the file.
    Check,
}

/// Main processor for code block formatting.
pub struct CodeBlockFormatter {
    extractor: BlockExtractor,
    batch_formatter: Box<dyn BatchFormatter>,
    document_formatter: Option<Box<dyn DocumentFormatter>>,
}

impl CodeBlockFormatter {
    /// Processor wired to external tools as described by `config`.
    pub fn from_config(config: &CodeBlockToolsConfig) -> Result<Self, fancy_regex::Error> {
        let aliases = AliasTable::new(&config.extra_aliases());
        let families = config.enabled_families();
        let steps = families
            .iter()
            .map(|&f| (f, config.families.get(f).effective_steps(f)))
            .collect();

        let batch_formatter = CommandFormatter::new(ToolExecutor::new(config.timeout), steps);
        let document_formatter: Option<Box<dyn DocumentFormatter>> = if config.document.enabled {
            Some(Box::new(CommandDocumentFormatter::new(
                ToolExecutor::new(config.timeout),
                config.document.clone(),
            )))
        } else {
            None
        };

        Self::new(&aliases, &families, Box::new(batch_formatter), document_formatter)
    }

    /// Processor with explicit formatter implementations.
    pub fn new(
        aliases: &AliasTable,
        families: &[Family],
        batch_formatter: Box<dyn BatchFormatter>,
        document_formatter: Option<Box<dyn DocumentFormatter>>,
    ) -> Result<Self, fancy_regex::Error> {
        Ok(Self {
            extractor: BlockExtractor::new(aliases, families)?,
            batch_formatter,
            document_formatter,
        })
    }

    pub fn extract(&self, content: &str) -> Extraction {
        self.extractor.extract(content)
    }

    /// Format the embedded blocks of `content`.
    ///
    /// `document` only names the units; nothing is read from or written to it.
    pub fn format_text(&self, document: &Path, content: &str) -> PassOutcome {
        let extraction = self.extractor.extract(content);
        let mut diagnostics: Vec<Diagnostic> = extraction
            .malformed
            .iter()
            .map(|m| {
                Diagnostic::new(DiagnosticKind::MalformedBlock, m.reason.clone())
                    .with_family(m.family)
                    .with_line(m.line)
            })
            .collect();

        let blocks = extraction.blocks;
        let mut outcome = PassOutcome {
            content: content.to_string(),
            blocks_found: blocks.len(),
            ..Default::default()
        };
        if blocks.is_empty() {
            outcome.diagnostics = diagnostics;
            return outcome;
        }

        // Dropped at the end of this function, removing every unit
        let mut batch = match UnitBatch::new() {
            Ok(batch) => batch,
            Err(e) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnitStorage,
                    format!("could not create temporary directory: {e}"),
                ));
                outcome.diagnostics = diagnostics;
                return outcome;
            }
        };

        for (index, block) in blocks.iter().enumerate() {
            if let Err(e) = batch.add(document, index, block) {
                diagnostics.push(
                    Diagnostic::new(DiagnosticKind::UnitStorage, format!("could not write isolated unit: {e}"))
                        .with_family(block.family)
                        .with_line(block.line(content)),
                );
            }
        }

        let mut replacements = Vec::new();
        let families: Vec<Family> = batch.families().collect();
        for family in families {
            let units = batch.units(family);
            let results = self.format_family(family, &batch, units, &blocks, content, &mut diagnostics);
            for (unit, result) in units.iter().zip(results) {
                if let FormattingResult::Formatted(text) = result {
                    let replacement = Replacement::for_block(&blocks[unit.block_index], &text);
                    if !replacement.is_noop(content) {
                        replacements.push(replacement);
                    }
                }
            }
        }

        outcome.blocks_changed = replacements.len();
        outcome.content = splice(content, &replacements);
        outcome.diagnostics = diagnostics;
        outcome
    }

    fn format_family(
        &self,
        family: Family,
        batch: &UnitBatch,
        units: &[IsolatedUnit],
        blocks: &[EmbeddedBlock],
        content: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<FormattingResult> {
        match self.batch_formatter.format_batch(family, &batch.family_dir(family), units) {
            Ok(warnings) => {
                diagnostics.extend(
                    warnings
                        .iter()
                        .map(|w| Diagnostic::from_formatter_error(w).with_family(family)),
                );
            }
            Err(e) => {
                log::debug!("Leaving {family} blocks unformatted: {e}");
                diagnostics.push(Diagnostic::from_formatter_error(&e).with_family(family));
                return vec![FormattingResult::Unchanged; units.len()];
            }
        }

        units
            .iter()
            .map(|unit| match unit.read_back() {
                Ok(text) if text == unit.original => FormattingResult::Unchanged,
                Ok(text) => FormattingResult::Formatted(text),
                Err(e) => {
                    let line = blocks[unit.block_index].line(content);
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::UnitUnreadable,
                            format!("could not read formatted block back: {e}"),
                        )
                        .with_family(family)
                        .with_line(line),
                    );
                    FormattingResult::Unchanged
                }
            })
            .collect()
    }

    /// Format the document at `path`.
    ///
    /// In [`WriteMode::Write`] the file is rewritten only when its text
    /// changed, then handed to the document formatter. Problems end up in
    /// [`FileOutcome::diagnostics`]; nothing here fails the caller.
    pub fn format_file(&self, path: &Path, mode: WriteMode) -> FileOutcome {
        let mut outcome = FileOutcome::default();

        let original = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                outcome.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DocumentUnreadable,
                    format!("could not read {}: {e}", path.display()),
                ));
                return outcome;
            }
        };

        let line_ending = detect_line_ending_enum(&original);
        let normalized = normalize_line_ending(&original, LineEnding::Lf);
        let pass = self.format_text(path, &normalized);
        let formatted = if pass.blocks_changed > 0 {
            normalize_line_ending(&pass.content, line_ending.preferred(&original))
        } else {
            original.clone()
        };

        outcome.blocks_found = pass.blocks_found;
        outcome.blocks_changed = pass.blocks_changed;
        outcome.diagnostics = pass.diagnostics;
        outcome.changed = formatted != original;

        if mode == WriteMode::Write {
            self.write_back(path, &formatted, &mut outcome);
        }

        for diagnostic in &outcome.diagnostics {
            log::warn!("{}: {diagnostic}", path.display());
        }
        outcome
    }

    fn write_back(&self, path: &Path, formatted: &str, outcome: &mut FileOutcome) {
        if outcome.changed {
            match fs::write(path, formatted) {
                Ok(()) => outcome.written = true,
                Err(e) => {
                    outcome.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::DocumentWriteFailed,
                        format!("could not write {}: {e}", path.display()),
                    ));
                    return;
                }
            }
        }

        if let Some(document_formatter) = &self.document_formatter {
            match document_formatter.format_document(path) {
                Ok(warnings) => outcome
                    .diagnostics
                    .extend(warnings.iter().map(Diagnostic::from_formatter_error)),
                Err(e) => outcome.diagnostics.push(Diagnostic::from_formatter_error(&e)),
            }
        }
    }
}
