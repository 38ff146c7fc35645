//! Formatting of code blocks embedded in Markdown using external tools.
//!
//! A formatting pass runs over one document:
//!
//! 1. [`extractor`] finds fenced blocks whose tag belongs to an enabled
//!    [`Family`] and records their indentation and byte ranges.
//! 2. [`unit`] writes each block, dedented, to its own file in a temporary
//!    directory (one subdirectory per family).
//! 3. [`formatter`] runs each family's tool chain once over its directory.
//! 4. Each unit is read back, re-indented and [`splicer`] puts it back in
//!    place by byte range.
//! 5. The document formatter (prettier by default) runs over the file.
//!
//! Missing tools, failing tools and unreadable units never abort a pass:
//! the affected blocks keep their content and a [`Diagnostic`] is returned.
//!
//! # Configuration
//!
//! ```toml
//! timeout = 30000                  # ms per tool
//!
//! [families.python]
//! aliases = ["py3"]
//!
//! [[families.python.steps]]
//! command = ["ruff", "format", "--line-length=120", "{dir}"]
//!
//! [families.shell]
//! enabled = false
//!
//! [document]
//! command = ["npx", "prettier", "--write", "--list-different"]
//! ```
//!
//! # Families
//!
//! - `python`: `python`, `py`, `{ .py .annotate }`
//! - `shell`: `bash`, `sh`, `shell`

pub mod config;
pub mod executor;
pub mod extractor;
pub mod family;
pub mod formatter;
pub mod indent;
pub mod processor;
pub mod splicer;
pub mod unit;

pub use config::{CodeBlockToolsConfig, DocumentFormatterConfig, FamilyConfig, FormatterStep};
pub use executor::{ExecutorError, ToolExecutor, ToolOutput};
pub use extractor::{BlockExtractor, BlockMatch, EmbeddedBlock, Extraction, MalformedBlock};
pub use family::{AliasTable, Family};
pub use formatter::{BatchFormatter, CommandDocumentFormatter, CommandFormatter, DocumentFormatter, FormatterError};
pub use indent::{dedent, indent};
pub use processor::{
    CodeBlockFormatter, Diagnostic, DiagnosticKind, FileOutcome, FormattingResult, PassOutcome, WriteMode,
};
pub use splicer::{Replacement, splice};
pub use unit::{IsolatedUnit, UnitBatch, unit_file_name};
