//! Minimal-edit alignment of two token sequences.

use crate::api::{SegmentKind, WordSegment};

/// Align `old` against `new`, producing segments covering both sides.
///
/// The alignment keeps a longest common subsequence of tokens unchanged, so
/// the number of added plus removed tokens is minimal. The shared prefix and
/// suffix are always kept whole; in the middle, ties between optimal
/// alignments favour unchanged runs that start earliest in the new line.
/// Inside a change run removed text precedes added text, and neighbouring
/// tokens of the same kind share a segment.
#[must_use]
pub fn align(old: &[&str], new: &[&str]) -> Vec<WordSegment> {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(left, right)| left == right)
        .count();
    let old_rest = &old[prefix..];
    let new_rest = &new[prefix..];

    let suffix = old_rest
        .iter()
        .rev()
        .zip(new_rest.iter().rev())
        .take_while(|(left, right)| left == right)
        .count();
    let old_middle = &old_rest[..old_rest.len() - suffix];
    let new_middle = &new_rest[..new_rest.len() - suffix];

    let mut builder = SegmentBuilder::default();
    for token in &old[..prefix] {
        builder.push(SegmentKind::Unchanged, token);
    }
    align_middle(old_middle, new_middle, &mut builder);
    for token in &old_rest[old_rest.len() - suffix..] {
        builder.push(SegmentKind::Unchanged, token);
    }
    builder.finish()
}

/// Split an alignment into the segments visible on each side.
///
/// The old side keeps unchanged and removed runs, the new side keeps
/// unchanged and added runs.
#[must_use]
pub fn split_sides(segments: &[WordSegment]) -> (Vec<WordSegment>, Vec<WordSegment>) {
    let old = segments
        .iter()
        .filter(|segment| segment.kind != SegmentKind::Added)
        .cloned()
        .collect();
    let new = segments
        .iter()
        .filter(|segment| segment.kind != SegmentKind::Removed)
        .cloned()
        .collect();
    (old, new)
}

fn align_middle(old: &[&str], new: &[&str], builder: &mut SegmentBuilder) {
    let rows = old.len();
    let cols = new.len();
    if rows == 0 || cols == 0 {
        builder.extend(SegmentKind::Removed, old);
        builder.extend(SegmentKind::Added, new);
        return;
    }

    // table[i * width + j] = LCS length of old[i..] and new[j..]
    let width = cols + 1;
    let mut table = vec![0_u32; (rows + 1) * width];
    for i in (0..rows).rev() {
        for j in (0..cols).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < rows && j < cols {
        if old[i] == new[j] {
            builder.extend(SegmentKind::Removed, &removed);
            builder.extend(SegmentKind::Added, &added);
            removed.clear();
            added.clear();
            builder.push(SegmentKind::Unchanged, old[i]);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            removed.push(old[i]);
            i += 1;
        } else {
            added.push(new[j]);
            j += 1;
        }
    }

    removed.extend_from_slice(&old[i..]);
    added.extend_from_slice(&new[j..]);
    builder.extend(SegmentKind::Removed, &removed);
    builder.extend(SegmentKind::Added, &added);
}

#[derive(Debug, Default)]
struct SegmentBuilder {
    segments: Vec<WordSegment>,
}

impl SegmentBuilder {
    fn push(&mut self, kind: SegmentKind, token: &str) {
        match self.segments.last_mut() {
            Some(last) if last.kind == kind => last.content.push_str(token),
            _ => self.segments.push(WordSegment::new(kind, token)),
        }
    }

    fn extend(&mut self, kind: SegmentKind, tokens: &[&str]) {
        for token in tokens {
            self.push(kind, token);
        }
    }

    fn finish(self) -> Vec<WordSegment> {
        self.segments
    }
}
