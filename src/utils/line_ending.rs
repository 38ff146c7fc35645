//! Line ending detection and normalization at the document I/O boundary.
//!
//! Fence patterns expect `\n`, so documents are normalized to LF before
//! extraction and converted back before they are written.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
    Mixed,
}

impl LineEnding {
    /// Concrete ending to write back; mixed documents get the majority style.
    pub fn preferred(self, original: &str) -> LineEnding {
        match self {
            LineEnding::Mixed => {
                let crlf_count = original.matches("\r\n").count();
                let lf_count = original.matches('\n').count() - crlf_count;
                if crlf_count > lf_count {
                    LineEnding::Crlf
                } else {
                    LineEnding::Lf
                }
            }
            other => other,
        }
    }
}

pub fn detect_line_ending_enum(content: &str) -> LineEnding {
    let has_crlf = content.contains("\r\n");
    // Check if there are LF characters that are NOT part of CRLF
    let content_without_crlf = content.replace("\r\n", "");
    let has_standalone_lf = content_without_crlf.contains('\n');

    match (has_crlf, has_standalone_lf) {
        (true, true) => LineEnding::Mixed,
        (true, false) => LineEnding::Crlf,
        (false, _) => LineEnding::Lf,
    }
}

pub fn normalize_line_ending(content: &str, target: LineEnding) -> String {
    match target {
        LineEnding::Lf => content.replace("\r\n", "\n"),
        LineEnding::Crlf => {
            // First normalize everything to LF, then convert to CRLF
            let normalized = content.replace("\r\n", "\n");
            normalized.replace('\n', "\r\n")
        }
        LineEnding::Mixed => content.to_string(), // Don't change mixed endings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_line_ending() {
        assert_eq!(detect_line_ending_enum("a\nb\n"), LineEnding::Lf);
        assert_eq!(detect_line_ending_enum("a\r\nb\r\n"), LineEnding::Crlf);
        assert_eq!(detect_line_ending_enum("a\r\nb\n"), LineEnding::Mixed);
        assert_eq!(detect_line_ending_enum("no newline"), LineEnding::Lf);
    }

    #[test]
    fn test_normalize_round_trip() {
        let crlf = "a\r\nb\r\n";
        let lf = normalize_line_ending(crlf, LineEnding::Lf);
        assert_eq!(lf, "a\nb\n");
        assert_eq!(normalize_line_ending(&lf, LineEnding::Crlf), crlf);
    }

    #[test]
    fn test_preferred_for_mixed() {
        let mostly_crlf = "a\r\nb\r\nc\n";
        assert_eq!(LineEnding::Mixed.preferred(mostly_crlf), LineEnding::Crlf);
        let mostly_lf = "a\nb\nc\r\n";
        assert_eq!(LineEnding::Mixed.preferred(mostly_lf), LineEnding::Lf);
        assert_eq!(LineEnding::Crlf.preferred("a\n"), LineEnding::Crlf);
    }
}
