//! Word-level tokenization of a single line.

/// Split `line` into maximal runs of whitespace and non-whitespace.
///
/// Whitespace runs are tokens of their own, so a changed space never merges
/// into the neighbouring word. Joining the tokens reproduces `line`.
#[must_use]
pub fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (index, ch) in line.char_indices() {
        let is_space = ch.is_whitespace();
        match current {
            Some(previous) if previous != is_space => {
                tokens.push(&line[start..index]);
                start = index;
            }
            _ => {}
        }
        current = Some(is_space);
    }

    if start < line.len() {
        tokens.push(&line[start..]);
    }

    tokens
}
