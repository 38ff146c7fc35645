//! Splicing formatted block content back into the document.
//!
//! Replacements are addressed by the byte ranges captured during extraction
//! and applied back to front, so identical blocks are each replaced at their
//! own position and earlier offsets never shift.

use super::extractor::EmbeddedBlock;
use super::indent::indent;
use std::ops::Range;

/// New content for one block's content range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub range: Range<usize>,
    pub content: String,
}

impl Replacement {
    /// Replacement that puts `formatted` back at `block`'s indentation.
    pub fn for_block(block: &EmbeddedBlock, formatted: &str) -> Self {
        let mut content = indent(formatted, block.indentation);
        // A bodyless block's range sits at the closing fence, so the new body
        // needs its own line break
        if block.bodyless && !content.is_empty() {
            content.push('\n');
        }
        Self {
            range: block.content_range.clone(),
            content,
        }
    }

    /// Whether applying this would leave the document unchanged.
    pub fn is_noop(&self, original: &str) -> bool {
        original.get(self.range.clone()) == Some(self.content.as_str())
    }
}

/// Apply `replacements` to `original`.
///
/// Ranges that fall outside the text, split a character, or overlap a range
/// already applied are skipped.
pub fn splice(original: &str, replacements: &[Replacement]) -> String {
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let mut result = original.to_string();
    let mut floor = original.len();
    for replacement in ordered {
        let Range { start, end } = replacement.range;
        if start > end || end > floor || original.get(start..end).is_none() {
            log::debug!("Skipping replacement at {start}..{end}: invalid or overlapping range");
            continue;
        }
        result.replace_range(start..end, &replacement.content);
        floor = start;
    }
    result
}
