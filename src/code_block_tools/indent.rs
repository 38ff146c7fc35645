//! Indentation handling for blocks nested under list items or admonitions.

/// Remove exactly `n` leading spaces from every line that starts with them.
///
/// Lines that are shorter than `n` or carry fewer leading spaces are passed
/// through unchanged, which tolerates trailing blank lines indented less
/// than the fence.
pub fn dedent(content: &str, n: usize) -> String {
    if n == 0 {
        return content.to_string();
    }
    let pad = " ".repeat(n);
    content
        .split('\n')
        .map(|line| line.strip_prefix(pad.as_str()).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every non-blank line with `n` spaces. Blank lines stay as they are.
pub fn indent(content: &str, n: usize) -> String {
    if n == 0 {
        return content.to_string();
    }
    let pad = " ".repeat(n);
    content
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
