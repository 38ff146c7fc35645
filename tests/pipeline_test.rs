use fencefmt_lib::code_block_tools::{
    AliasTable, BatchFormatter, CodeBlockFormatter, DiagnosticKind, Family, FormatterError, IsolatedUnit, dedent,
    indent, unit_file_name,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Leaves every unit untouched.
struct NoopFormatter;

impl BatchFormatter for NoopFormatter {
    fn format_batch(&self, _: Family, _: &Path, _: &[IsolatedUnit]) -> Result<Vec<FormatterError>, FormatterError> {
        Ok(Vec::new())
    }
}

/// Trims trailing whitespace, then loses the first unit of the batch.
struct TrimThenLoseFirst;

impl BatchFormatter for TrimThenLoseFirst {
    fn format_batch(&self, _: Family, _: &Path, units: &[IsolatedUnit]) -> Result<Vec<FormatterError>, FormatterError> {
        for unit in units {
            let text = fs::read_to_string(&unit.path).unwrap();
            let trimmed: Vec<&str> = text.split('\n').map(str::trim_end).collect();
            fs::write(&unit.path, trimmed.join("\n")).unwrap();
        }
        fs::remove_file(&units[0].path).unwrap();
        Ok(Vec::new())
    }
}

fn formatter(batch: Box<dyn BatchFormatter>) -> CodeBlockFormatter {
    CodeBlockFormatter::new(&AliasTable::default(), &Family::ALL, batch, None).unwrap()
}

#[test]
fn test_unreadable_unit_only_affects_its_block() {
    let content = "```python\na = 1   \n```\n\ntext\n\n```py\nb = 2   \n```\n";
    let outcome = formatter(Box::new(TrimThenLoseFirst)).format_text(Path::new("doc.md"), content);

    assert_eq!(outcome.content, "```python\na = 1   \n```\n\ntext\n\n```py\nb = 2\n```\n");
    assert_eq!(outcome.blocks_changed, 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::UnitUnreadable);
    assert_eq!(outcome.diagnostics[0].line, Some(1));
}

#[test]
fn test_same_named_documents_get_distinct_units() {
    let docs = [Path::new("/repo/a/README.md"), Path::new("/repo/b/README.md")];
    let mut names = HashSet::new();
    for doc in docs {
        for family in Family::ALL {
            for ordinal in 0..5 {
                assert!(names.insert(unit_file_name(doc, family.bucket() + ordinal, family)));
            }
        }
    }
    assert_eq!(names.len(), 20);
}

#[derive(Debug, Clone)]
enum Segment {
    Prose(String),
    Block { indentation: usize, tag: &'static str, lines: Vec<String> },
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-zA-Z #.,]{0,20}".prop_map(Segment::Prose),
        (
            prop_oneof![Just(0usize), Just(2), Just(4), Just(8)],
            prop_oneof![
                Just("python"),
                Just("py"),
                Just("bash"),
                Just("sh"),
                Just("shell"),
                Just("rust"),
            ],
            prop::collection::vec("[a-z =()]{0,12}", 0..5),
        )
            .prop_map(|(indentation, tag, lines)| Segment::Block { indentation, tag, lines }),
    ]
}

fn render(segments: &[Segment]) -> (String, usize) {
    let mut doc = String::new();
    let mut recognized = 0;
    for segment in segments {
        match segment {
            Segment::Prose(text) => {
                doc.push_str(text);
                doc.push('\n');
            }
            Segment::Block { indentation, tag, lines } => {
                let pad = " ".repeat(*indentation);
                doc.push_str(&format!("{pad}```{tag}\n"));
                for line in lines {
                    doc.push_str(&format!("{pad}{line}\n"));
                }
                doc.push_str(&format!("{pad}```\n"));
                if *tag != "rust" {
                    recognized += 1;
                }
            }
        }
    }
    (doc, recognized)
}

proptest! {
    #[test]
    fn unformatted_pass_reproduces_document(segments in prop::collection::vec(segment(), 0..8)) {
        let (doc, recognized) = render(&segments);
        let outcome = formatter(Box::new(NoopFormatter)).format_text(Path::new("doc.md"), &doc);

        prop_assert_eq!(&outcome.content, &doc);
        prop_assert_eq!(outcome.blocks_found, recognized);
        prop_assert_eq!(outcome.blocks_changed, 0);
        prop_assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn indent_restores_dedented_content(
        n in 0usize..9,
        lines in prop::collection::vec(prop_oneof![Just(None), "[a-z][a-z ]{0,10}".prop_map(Some)], 1..8),
    ) {
        let pad = " ".repeat(n);
        let content = lines
            .iter()
            .map(|line| line.as_ref().map(|l| format!("{pad}{l}")).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");

        prop_assert_eq!(indent(&dedent(&content, n), n), content);
    }
}
