//! Tags raw hunk lines and adds word-level refinement to changed line pairs.
//!
//! Pairing is positional: a run of deletions immediately followed by an
//! addition run of the same length is zipped one-to-one. This is a heuristic,
//! not semantic line matching. Runs of unequal length, and additions or
//! deletions standing alone, are emitted without words.

use quill_engine_api::{LineOrigin, RawLine};

use super::align::{align, split_sides};
use super::tokenize::tokenize;
use crate::api::{Line, WordSegment};

/// Marker text used when the engine reports an empty "no newline" line.
pub const NO_NEWLINE_TEXT: &str = "\\ No newline at end of file";

/// Controls word-level refinement of paired lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordDiffOptions {
    /// Whether paired lines are refined at all.
    pub enabled: bool,
    /// Lines with more tokens than this on either side are left unrefined.
    pub max_line_tokens: usize,
}

impl Default for WordDiffOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_line_tokens: 512,
        }
    }
}

/// Convert one hunk's raw lines into classified [`Line`]s, preserving order.
#[must_use]
pub fn classify_hunk(raw: &[RawLine], options: &WordDiffOptions) -> Vec<Line> {
    let mut lines = Vec::with_capacity(raw.len());
    let mut index = 0;

    while index < raw.len() {
        if raw[index].origin == LineOrigin::Deletion {
            let deletions_end = run_end(raw, index, LineOrigin::Deletion);
            let additions_end = run_end(raw, deletions_end, LineOrigin::Addition);
            emit_change_run(
                &raw[index..deletions_end],
                &raw[deletions_end..additions_end],
                options,
                &mut lines,
            );
            index = additions_end;
        } else {
            lines.push(plain_line(&raw[index], None));
            index += 1;
        }
    }

    lines
}

/// End of the run of `origin` lines starting at `start`. A no-newline marker
/// following a member of the run belongs to it.
fn run_end(raw: &[RawLine], start: usize, origin: LineOrigin) -> usize {
    let mut end = start;
    while let Some(line) = raw.get(end) {
        let belongs =
            line.origin == origin || (line.origin == LineOrigin::NoNewline && end > start);
        if !belongs {
            break;
        }
        end += 1;
    }
    end
}

fn emit_change_run(
    deletions: &[RawLine],
    additions: &[RawLine],
    options: &WordDiffOptions,
    lines: &mut Vec<Line>,
) {
    let old_lines: Vec<&RawLine> = content_lines(deletions).collect();
    let new_lines: Vec<&RawLine> = content_lines(additions).collect();

    let mut old_words: Vec<Option<Vec<WordSegment>>> = vec![None; old_lines.len()];
    let mut new_words: Vec<Option<Vec<WordSegment>>> = vec![None; new_lines.len()];

    if options.enabled && old_lines.len() == new_lines.len() {
        for (pair, (old, new)) in old_lines.iter().zip(&new_lines).enumerate() {
            if let Some((old_side, new_side)) = refine(&old.content, &new.content, options) {
                old_words[pair] = Some(old_side);
                new_words[pair] = Some(new_side);
            }
        }
    }

    let mut old_words = old_words.into_iter();
    for raw in deletions {
        let words = match raw.origin {
            LineOrigin::NoNewline => None,
            _ => old_words.next().flatten(),
        };
        lines.push(plain_line(raw, words));
    }

    let mut new_words = new_words.into_iter();
    for raw in additions {
        let words = match raw.origin {
            LineOrigin::NoNewline => None,
            _ => new_words.next().flatten(),
        };
        lines.push(plain_line(raw, words));
    }
}

fn content_lines(run: &[RawLine]) -> impl Iterator<Item = &RawLine> {
    run.iter()
        .filter(|line| line.origin != LineOrigin::NoNewline)
}

fn refine(
    old: &str,
    new: &str,
    options: &WordDiffOptions,
) -> Option<(Vec<WordSegment>, Vec<WordSegment>)> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);
    if old_tokens.len() > options.max_line_tokens || new_tokens.len() > options.max_line_tokens {
        return None;
    }

    let segments = align(&old_tokens, &new_tokens);
    Some(split_sides(&segments))
}

fn plain_line(raw: &RawLine, words: Option<Vec<WordSegment>>) -> Line {
    match raw.origin {
        LineOrigin::Context => Line::Context {
            content: raw.content.clone(),
            old_line: raw.old_lineno,
            new_line: raw.new_lineno,
        },
        LineOrigin::Addition => Line::Addition {
            content: raw.content.clone(),
            new_line: raw.new_lineno,
            words,
        },
        LineOrigin::Deletion => Line::Deletion {
            content: raw.content.clone(),
            old_line: raw.old_lineno,
            words,
        },
        LineOrigin::NoNewline => Line::NoNewlineMarker {
            content: if raw.content.is_empty() {
                NO_NEWLINE_TEXT.to_owned()
            } else {
                raw.content.clone()
            },
        },
    }
}
