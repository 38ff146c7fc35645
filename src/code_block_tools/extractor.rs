//! Fenced block extraction.
//!
//! Blocks are located with one regex per family over the raw document text.
//! The closing fence is a line holding exactly the opening fence's
//! indentation and three backticks (trailing blanks allowed), which is why
//! this needs a back-reference (and `fancy_regex`). An info-string line such
//! as ```` ```text ```` never closes a block.

use super::family::{AliasTable, Family};
use super::indent::dedent;
use fancy_regex::Regex;
use std::ops::Range;

/// One fenced block of a recognized family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock {
    pub family: Family,
    /// Tag exactly as written after the opening fence.
    pub tag: String,
    /// Leading spaces shared by the opening and closing fence.
    pub indentation: usize,
    /// Text between the fences, indentation not yet stripped.
    pub raw_content: String,
    /// `raw_content` with `indentation` spaces removed per line.
    pub dedented_content: String,
    /// Family bucket + index within the family; unique across the document.
    pub ordinal: usize,
    /// Byte range of the whole fenced region, fences included.
    pub span: Range<usize>,
    /// Byte range of `raw_content` within the document. Empty and placed at
    /// the closing fence when the block has no body.
    pub content_range: Range<usize>,
    /// The closing fence directly follows the opening fence.
    pub bodyless: bool,
}

impl EmbeddedBlock {
    /// 1-indexed line of the opening fence.
    pub fn line(&self, content: &str) -> usize {
        line_of(content, self.span.start)
    }
}

/// An opening fence that could not be turned into a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedBlock {
    pub family: Family,
    /// 1-indexed line of the opening fence.
    pub line: usize,
    pub reason: String,
}

/// Outcome of looking for the next block of a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMatch {
    Found(EmbeddedBlock),
    NotFound,
    /// `resume_at` is where scanning continues (the line after the opener).
    Malformed { block: MalformedBlock, resume_at: usize },
}

/// Everything the extractor found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Blocks ordered by position in the document.
    pub blocks: Vec<EmbeddedBlock>,
    pub malformed: Vec<MalformedBlock>,
}

struct FamilyPatterns {
    family: Family,
    opener: Regex,
    block: Regex,
}

/// Finds fenced blocks for a set of enabled families.
pub struct BlockExtractor {
    patterns: Vec<FamilyPatterns>,
}

impl BlockExtractor {
    /// Compile the fence patterns for `families` from the alias table.
    pub fn new(aliases: &AliasTable, families: &[Family]) -> Result<Self, fancy_regex::Error> {
        let mut ordered: Vec<Family> = families.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut patterns = Vec::with_capacity(ordered.len());
        for family in ordered {
            let tags = aliases.pattern(family);
            if tags.is_empty() {
                continue;
            }
            let opener = Regex::new(&format!(r"(?m)^( *)```({tags})\n"))?;
            let block = Regex::new(&format!(r"(?ms)^( *)```({tags})\n(?:(.*?)\n)??\1```[ \t]*$"))?;
            patterns.push(FamilyPatterns { family, opener, block });
        }
        Ok(Self { patterns })
    }

    /// Extract every block of every enabled family.
    ///
    /// Families are scanned independently. A block overlapping one found by
    /// an earlier family (e.g. a `bash` fence quoted inside a `python` block)
    /// is dropped so that splicing never sees overlapping ranges.
    pub fn extract(&self, content: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for patterns in &self.patterns {
            let mut pos = 0;
            let mut index = 0;
            loop {
                match next_block(patterns, content, pos, index) {
                    BlockMatch::Found(block) => {
                        pos = block.span.end;
                        index += 1;
                        let overlaps = extraction
                            .blocks
                            .iter()
                            .any(|b| b.span.start < block.span.end && block.span.start < b.span.end);
                        if overlaps {
                            log::debug!(
                                "Skipping {} block at byte {}: overlaps an earlier block",
                                block.family,
                                block.span.start
                            );
                        } else {
                            extraction.blocks.push(block);
                        }
                    }
                    BlockMatch::Malformed { block, resume_at } => {
                        pos = resume_at;
                        extraction.malformed.push(block);
                    }
                    BlockMatch::NotFound => break,
                }
            }
        }

        extraction.blocks.sort_by_key(|b| b.span.start);
        extraction.malformed.sort_by_key(|m| m.line);
        extraction
    }

    /// Look for the next block of `family` starting at byte `pos`.
    pub fn next_block(&self, family: Family, content: &str, pos: usize, index: usize) -> BlockMatch {
        match self.patterns.iter().find(|p| p.family == family) {
            Some(patterns) => next_block(patterns, content, pos, index),
            None => BlockMatch::NotFound,
        }
    }
}

fn next_block(patterns: &FamilyPatterns, content: &str, pos: usize, index: usize) -> BlockMatch {
    let family = patterns.family;
    if pos >= content.len() {
        return BlockMatch::NotFound;
    }

    let opener = match patterns.opener.find_from_pos(content, pos) {
        Ok(Some(m)) => m,
        Ok(None) => return BlockMatch::NotFound,
        Err(e) => {
            return BlockMatch::Malformed {
                block: MalformedBlock {
                    family,
                    line: line_of(content, pos),
                    reason: format!("fence scan failed: {e}"),
                },
                resume_at: content.len(),
            };
        }
    };

    let malformed = |reason: String| BlockMatch::Malformed {
        block: MalformedBlock {
            family,
            line: line_of(content, opener.start()),
            reason,
        },
        resume_at: opener.end(),
    };

    let caps = match patterns.block.captures_from_pos(content, opener.start()) {
        Ok(Some(caps)) => caps,
        Ok(None) => return malformed("unterminated fence".to_string()),
        Err(e) => return malformed(format!("fence scan failed: {e}")),
    };

    let (Some(whole), Some(indent), Some(tag)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return malformed("unterminated fence".to_string());
    };

    // A match further down means this opener never closed
    if whole.start() != opener.start() {
        return malformed("unterminated fence".to_string());
    }

    let indentation = indent.as_str().len();
    let (raw_content, content_range) = match caps.get(3) {
        Some(body) => (body.as_str().to_string(), body.start()..body.end()),
        // Opener line ends with '\n'; the closing fence starts right after it
        None => (String::new(), opener.end()..opener.end()),
    };
    let bodyless = caps.get(3).is_none();
    BlockMatch::Found(EmbeddedBlock {
        family,
        tag: tag.as_str().to_string(),
        indentation,
        dedented_content: dedent(&raw_content, indentation),
        raw_content,
        ordinal: family.bucket() + index,
        span: whole.start()..whole.end(),
        content_range,
        bodyless,
    })
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())].bytes().filter(|&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> BlockExtractor {
        BlockExtractor::new(&AliasTable::default(), &Family::ALL).unwrap()
    }

    #[test]
    fn test_extract_python_and_shell() {
        let content = "# Title\n\n```python\nx = 1\n```\n\nText\n\n```bash\necho hi\n```\n";
        let extraction = extractor().extract(content);

        assert!(extraction.malformed.is_empty());
        assert_eq!(extraction.blocks.len(), 2);

        let py = &extraction.blocks[0];
        assert_eq!(py.family, Family::Python);
        assert_eq!(py.tag, "python");
        assert_eq!(py.raw_content, "x = 1");
        assert_eq!(py.ordinal, 0);
        assert_eq!(&content[py.span.clone()], "```python\nx = 1\n```");
        assert_eq!(&content[py.content_range.clone()], "x = 1");
        assert_eq!(py.line(content), 3);

        let sh = &extraction.blocks[1];
        assert_eq!(sh.family, Family::Shell);
        assert_eq!(sh.tag, "bash");
        assert_eq!(sh.ordinal, 1000);
    }

    #[test]
    fn test_closing_fence_needs_same_indentation() {
        let content = "  ```py\n  a = 1\n    ```\n  b = 2\n  ```\n";
        let extraction = extractor().extract(content);

        assert_eq!(extraction.blocks.len(), 1);
        let block = &extraction.blocks[0];
        assert_eq!(block.indentation, 2);
        assert_eq!(block.raw_content, "  a = 1\n    ```\n  b = 2");
        assert_eq!(block.dedented_content, "a = 1\n  ```\nb = 2");
    }

    #[test]
    fn test_interleaved_indentation_levels() {
        let content = "- item\n\n    ```sh\n    ls\n    ```\n\n```python\nprint(1)\n```\n\n  ```shell\n  pwd\n  ```\n";
        let extraction = extractor().extract(content);

        let found: Vec<(Family, usize, &str)> = extraction
            .blocks
            .iter()
            .map(|b| (b.family, b.indentation, b.dedented_content.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (Family::Shell, 4, "ls"),
                (Family::Python, 0, "print(1)"),
                (Family::Shell, 2, "pwd"),
            ]
        );
        assert_eq!(extraction.blocks[0].ordinal, 1000);
        assert_eq!(extraction.blocks[2].ordinal, 1001);
    }

    #[test]
    fn test_unterminated_fence_is_malformed() {
        let content = "```python\nx = 1\n\nno closing fence\n";
        let extraction = extractor().extract(content);

        assert!(extraction.blocks.is_empty());
        assert_eq!(extraction.malformed.len(), 1);
        assert_eq!(extraction.malformed[0].line, 1);
        assert_eq!(extraction.malformed[0].reason, "unterminated fence");
    }

    #[test]
    fn test_malformed_opener_does_not_hide_later_blocks() {
        let content = "    ```py\nnever closed\n\n```py\ny = 2\n```\n";
        let extraction = extractor().extract(content);

        assert_eq!(extraction.malformed.len(), 1);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].raw_content, "y = 2");
    }

    #[test]
    fn test_unknown_and_decorated_tags_are_ignored() {
        let content = "```rust\nfn main() {}\n```\n\n```python title=\"x\"\nx\n```\n\n```\nplain\n```\n";
        let extraction = extractor().extract(content);
        assert!(extraction.blocks.is_empty());
        assert!(extraction.malformed.is_empty());
    }

    #[test]
    fn test_annotate_alias() {
        let content = "```{ .py .annotate }\nimport os\n```\n\n```{.py .annotate}\nimport sys\n```\n";
        let extraction = extractor().extract(content);
        assert_eq!(extraction.blocks.len(), 2);
        assert_eq!(extraction.blocks[0].tag, "{ .py .annotate }");
        assert_eq!(extraction.blocks[1].tag, "{.py .annotate}");
    }

    #[test]
    fn test_only_enabled_families() {
        let extractor = BlockExtractor::new(&AliasTable::default(), &[Family::Shell]).unwrap();
        let content = "```python\nx\n```\n\n```sh\nls\n```\n";
        let extraction = extractor.extract(content);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].family, Family::Shell);
        assert_eq!(extraction.blocks[0].ordinal, 1000);
    }

    #[test]
    fn test_nested_fence_in_other_family_is_dropped() {
        let content = "```python\ndoc = \"\"\"\n```bash\nls\n```\n";
        let extraction = extractor().extract(content);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].family, Family::Python);
    }

    #[test]
    fn test_bodyless_block_does_not_swallow_prose() {
        let content = "```sh\n```\n\nProse.   \n\n```sh\nls   \n```\n";
        let extraction = extractor().extract(content);

        assert!(extraction.malformed.is_empty());
        assert_eq!(extraction.blocks.len(), 2);

        let empty = &extraction.blocks[0];
        assert!(empty.bodyless);
        assert_eq!(empty.raw_content, "");
        assert_eq!(&content[empty.span.clone()], "```sh\n```");
        assert_eq!(empty.content_range, 6..6);

        let ls = &extraction.blocks[1];
        assert!(!ls.bodyless);
        assert_eq!(ls.raw_content, "ls   ");
        assert_eq!(ls.line(content), 6);
    }

    #[test]
    fn test_blank_line_body_is_not_bodyless() {
        let content = "```py\n\n```\n";
        let extraction = extractor().extract(content);

        assert_eq!(extraction.blocks.len(), 1);
        assert!(!extraction.blocks[0].bodyless);
        assert_eq!(extraction.blocks[0].raw_content, "");
        assert_eq!(extraction.blocks[0].content_range, 6..6);
    }

    #[test]
    fn test_info_string_line_does_not_close_block() {
        let content = "```python\ndoc = '''\n```text\nhello\n'''\n```\n";
        let extraction = extractor().extract(content);

        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].raw_content, "doc = '''\n```text\nhello\n'''");
    }

    #[test]
    fn test_closing_fence_allows_trailing_blanks() {
        let content = "```bash\npwd\n```  \ntext\n";
        let extraction = extractor().extract(content);

        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(&content[extraction.blocks[0].span.clone()], "```bash\npwd\n```  ");
    }

    #[test]
    fn test_next_block_results() {
        let extractor = extractor();
        let content = "```sh\nls\n```\n";

        match extractor.next_block(Family::Shell, content, 0, 0) {
            BlockMatch::Found(block) => assert_eq!(block.raw_content, "ls"),
            other => panic!("expected a block, got {other:?}"),
        }
        assert_eq!(extractor.next_block(Family::Python, content, 0, 0), BlockMatch::NotFound);
        assert_eq!(extractor.next_block(Family::Shell, content, content.len(), 1), BlockMatch::NotFound);
    }
}
