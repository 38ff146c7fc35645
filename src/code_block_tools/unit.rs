//! Isolated units: extracted blocks materialized as standalone files.
//!
//! Each block gets a deterministic file name inside a per-pass temporary
//! directory, grouped into one subdirectory per family so a family's
//! formatter can be pointed at a single directory.

use super::extractor::EmbeddedBlock;
use super::family::Family;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").expect("valid filename regex"));

/// Number of hex characters of the path hash kept in unit names.
const HASH_LEN: usize = 8;

/// Deterministic, filesystem-safe name for an isolated unit.
///
/// The hash mixes the full document path with the ordinal, so two documents
/// that share a basename in different directories never collide.
pub fn unit_file_name(document: &Path, ordinal: usize, family: Family) -> String {
    let stem = document.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let parent = document
        .parent()
        .map(|p| p.to_string_lossy().replace(['/', '\\'], "_").replace(' ', "-"))
        .unwrap_or_default();
    let key = format!("{}_{ordinal}", document.display());
    let hash = blake3::hash(key.as_bytes()).to_hex();
    let letter = family.letter();
    let ext = family.extension();
    let name = format!("{stem}_{parent}_{letter}{ordinal}_{}{ext}", &hash[..HASH_LEN]);
    UNSAFE_FILENAME_CHARS.replace_all(&name, "_").into_owned()
}

/// One block written to disk for external formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedUnit {
    /// Index of the block in the extraction's block list.
    pub block_index: usize,
    pub family: Family,
    pub path: PathBuf,
    /// Content written to the unit, used when formatting fails.
    pub original: String,
}

impl IsolatedUnit {
    /// Read the unit back after formatting, trailing newlines stripped.
    pub fn read_back(&self) -> io::Result<String> {
        let text = fs::read_to_string(&self.path)?;
        Ok(text.trim_end_matches('\n').to_string())
    }
}

/// Scoped temporary storage for one formatting pass.
///
/// The directory and everything in it is removed when the batch is dropped,
/// whichever way the pass ends.
pub struct UnitBatch {
    dir: TempDir,
    units: BTreeMap<Family, Vec<IsolatedUnit>>,
}

impl UnitBatch {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("fencefmt-").tempdir()?;
        Ok(Self {
            dir,
            units: BTreeMap::new(),
        })
    }

    /// Directory holding the units of `family`.
    pub fn family_dir(&self, family: Family) -> PathBuf {
        self.dir.path().join(family.key())
    }

    /// Write `block` as a unit named after `document`.
    pub fn add(&mut self, document: &Path, block_index: usize, block: &EmbeddedBlock) -> io::Result<&IsolatedUnit> {
        let dir = self.family_dir(block.family);
        fs::create_dir_all(&dir)?;
        let path = dir.join(unit_file_name(document, block.ordinal, block.family));
        fs::write(&path, &block.dedented_content)?;

        let units = self.units.entry(block.family).or_default();
        units.push(IsolatedUnit {
            block_index,
            family: block.family,
            path,
            original: block.dedented_content.clone(),
        });
        Ok(&units[units.len() - 1])
    }

    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        self.units.keys().copied()
    }

    pub fn units(&self, family: Family) -> &[IsolatedUnit] {
        self.units.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_block_tools::extractor::BlockExtractor;
    use crate::code_block_tools::family::AliasTable;

    #[test]
    fn test_unit_file_name_shape() {
        let name = unit_file_name(Path::new("docs/guide/intro.md"), 3, Family::Python);
        assert!(name.starts_with("intro_docs_guide_p3_"), "{name}");
        assert!(name.ends_with(".py"));
        assert_eq!(name.len(), "intro_docs_guide_p3_".len() + HASH_LEN + ".py".len());
    }

    #[test]
    fn test_unit_file_name_is_deterministic() {
        let a = unit_file_name(Path::new("/repo/README.md"), 1000, Family::Shell);
        let b = unit_file_name(Path::new("/repo/README.md"), 1000, Family::Shell);
        assert_eq!(a, b);
        assert!(a.contains("_s1000_"));
    }

    #[test]
    fn test_unit_file_name_sanitizes() {
        let name = unit_file_name(Path::new("my docs/a:b (1).md"), 0, Family::Python);
        assert!(!name.contains(' '));
        assert!(!name.contains(':'));
        assert!(!name.contains('('));
        assert!(name.starts_with("a_b__1__my-docs_p0_"), "{name}");
    }

    #[test]
    fn test_same_basename_different_directories() {
        let a = unit_file_name(Path::new("a/README.md"), 0, Family::Python);
        let b = unit_file_name(Path::new("b/README.md"), 0, Family::Python);
        assert_ne!(a, b);
    }

    #[test]
    fn test_batch_writes_and_cleans_up() {
        let extractor = BlockExtractor::new(&AliasTable::default(), &Family::ALL).unwrap();
        let content = "  ```py\n  x = 1\n  ```\n";
        let extraction = extractor.extract(content);

        let mut batch = UnitBatch::new().unwrap();
        let root = batch.family_dir(Family::Python).parent().unwrap().to_path_buf();
        let unit = batch.add(Path::new("notes.md"), 0, &extraction.blocks[0]).unwrap().clone();

        assert!(unit.path.starts_with(batch.family_dir(Family::Python)));
        assert_eq!(fs::read_to_string(&unit.path).unwrap(), "x = 1");
        assert_eq!(unit.read_back().unwrap(), "x = 1");
        assert_eq!(batch.units(Family::Python).len(), 1);
        assert!(batch.units(Family::Shell).is_empty());

        drop(batch);
        assert!(!root.exists());
    }

    #[test]
    fn test_read_back_strips_trailing_newlines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unit.py");
        fs::write(&path, "x = 1\n\n").unwrap();
        let unit = IsolatedUnit {
            block_index: 0,
            family: Family::Python,
            path,
            original: "x=1".to_string(),
        };
        assert_eq!(unit.read_back().unwrap(), "x = 1");
    }
}
