//! Text processing utilities.

/// Trim every line and join the non-empty ones with a single space.
pub fn join_nonempty_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
