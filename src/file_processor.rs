//! File discovery and per-file formatting for the `fmt` command.

use crate::code_block_tools::{CodeBlockFormatter, FileOutcome, WriteMode};
use crate::hook::is_markdown;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Collect the Markdown files named by `paths`.
///
/// Explicit files are taken as given (if they are Markdown); directories are
/// walked with `.gitignore` support unless `respect_gitignore` is false.
pub fn find_markdown_files(paths: &[PathBuf], respect_gitignore: bool) -> Result<Vec<PathBuf>, ignore::Error> {
    let mut file_paths = Vec::new();
    let mut dirs = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_markdown(path) {
                file_paths.push(clean_path(path));
            } else {
                log::warn!("Skipping {}: not a Markdown file", path.display());
            }
        } else if path.is_dir() {
            dirs.push(path.clone());
        } else {
            log::warn!("Skipping {}: no such file or directory", path.display());
        }
    }

    if let Some((first, rest)) = dirs.split_first() {
        let mut types_builder = ignore::types::TypesBuilder::new();
        types_builder.add("markdown", "*.md")?;
        types_builder.add("markdown", "*.MD")?;
        types_builder.select("markdown");

        let mut walk_builder = WalkBuilder::new(first);
        for dir in rest {
            walk_builder.add(dir);
        }
        walk_builder
            .types(types_builder.build()?)
            .git_ignore(respect_gitignore)
            .git_global(respect_gitignore)
            .git_exclude(respect_gitignore)
            .require_git(false);

        for result in walk_builder.build() {
            match result {
                Ok(entry) if entry.path().is_file() => file_paths.push(clean_path(entry.path())),
                Ok(_) => {}
                Err(err) => log::warn!("Error walking directory: {err}"),
            }
        }
    }

    // Overlapping inputs can yield the same file twice
    file_paths.sort();
    file_paths.dedup();
    Ok(file_paths)
}

fn clean_path(path: &Path) -> PathBuf {
    path.strip_prefix("./").map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

/// Per-run totals for the summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub files_changed: usize,
    pub blocks_found: usize,
    pub blocks_changed: usize,
    pub diagnostics: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files += 1;
        self.files_changed += usize::from(outcome.changed);
        self.blocks_found += outcome.blocks_found;
        self.blocks_changed += outcome.blocks_changed;
        self.diagnostics += outcome.diagnostics.len();
    }
}

/// Format every file, calling `report` with each outcome as it completes.
pub fn process_files<F>(formatter: &CodeBlockFormatter, files: &[PathBuf], mode: WriteMode, mut report: F) -> RunSummary
where
    F: FnMut(&Path, &FileOutcome),
{
    let mut summary = RunSummary::default();
    for file in files {
        let outcome = formatter.format_file(file, mode);
        report(file, &outcome);
        summary.record(&outcome);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_markdown_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::create_dir_all(root.join("ignored")).unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::write(root.join("docs/nested/guide.md"), "").unwrap();
        fs::write(root.join("docs/script.sh"), "").unwrap();
        fs::write(root.join("ignored/skip.md"), "").unwrap();
        fs::write(root.join(".gitignore"), "ignored/\n").unwrap();

        let files = find_markdown_files(&[root.to_path_buf()], true).unwrap();
        assert_eq!(files, vec![root.join("README.md"), root.join("docs/nested/guide.md")]);

        let all = find_markdown_files(&[root.to_path_buf()], false).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_explicit_files_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("a.md"), "").unwrap();
        fs::write(root.join("b.txt"), "").unwrap();

        let files = find_markdown_files(
            &[root.join("a.md"), root.join("b.txt"), root.to_path_buf(), root.join("missing.md")],
            true,
        )
        .unwrap();
        assert_eq!(files, vec![root.join("a.md")]);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.record(&FileOutcome {
            changed: true,
            written: true,
            blocks_found: 2,
            blocks_changed: 1,
            diagnostics: Vec::new(),
        });
        summary.record(&FileOutcome::default());
        assert_eq!(
            summary,
            RunSummary {
                files: 2,
                files_changed: 1,
                blocks_found: 2,
                blocks_changed: 1,
                diagnostics: 0,
            }
        );
    }
}
