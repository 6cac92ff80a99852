use serde::{Deserialize, Serialize};

/// Comparison result for a single file between two commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct FileDiffRecord {
    /// How the file changed.
    pub change_type: ChangeType,
    /// Path on the old side. Equal to `new_path` unless renamed or copied.
    pub old_path: String,
    /// Path on the new side.
    pub new_path: String,
    /// Binary content is never broken into hunks.
    #[serde(default)]
    pub is_binary: bool,
    /// Summary of added and removed lines.
    #[serde(default)]
    pub stats: DiffStats,
    /// Hunks in source order.
    #[serde(default)]
    pub hunks: Vec<Hunk>,
}

impl FileDiffRecord {
    /// The path a reviewer would recognise the file by.
    #[must_use]
    pub fn display_path(&self) -> &str {
        match self.change_type {
            ChangeType::Deleted => &self.old_path,
            _ => &self.new_path,
        }
    }

    /// Whether either side of the record touches `path`.
    #[must_use]
    pub fn touches(&self, path: &str) -> bool {
        self.old_path == path || self.new_path == path
    }
}

/// Summary information about the changes within a file diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, uniffi::Record)]
pub struct DiffStats {
    /// Number of added lines.
    pub additions: u32,
    /// Number of removed lines.
    pub deletions: u32,
}

impl DiffStats {
    /// A stats instance with zero additions and deletions.
    pub const ZERO: Self = Self {
        additions: 0,
        deletions: 0,
    };

    /// Convenience constructor for explicit values.
    #[must_use]
    pub const fn new(additions: u32, deletions: u32) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    /// Combine two stats structs.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            additions: self.additions + other.additions,
            deletions: self.deletions + other.deletions,
        }
    }
}

/// A contiguous run of changed and context lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Hunk {
    /// The range header describing the hunk offsets.
    pub header: HunkRange,
    /// Optional section header extracted from the diff.
    #[serde(default)]
    pub section: Option<String>,
    /// Lines in source order.
    #[serde(default)]
    pub lines: Vec<Line>,
}

/// The line number ranges referenced by a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, uniffi::Record)]
pub struct HunkRange {
    /// Starting line number on the old side.
    pub old_start: u32,
    /// Number of lines covered on the old side.
    pub old_lines: u32,
    /// Starting line number on the new side.
    pub new_start: u32,
    /// Number of lines covered on the new side.
    pub new_lines: u32,
}

/// A single line within a hunk.
///
/// Only additions and deletions can carry word segments, and only when the
/// line was paired with a counterpart of the opposite kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Line {
    /// Unchanged line present on both sides.
    Context {
        /// Raw text without the trailing newline.
        content: String,
        /// 1-based line number on the old side.
        #[serde(default)]
        old_line: Option<u32>,
        /// 1-based line number on the new side.
        #[serde(default)]
        new_line: Option<u32>,
    },
    /// Line present only on the new side.
    Addition {
        /// Raw text without the trailing newline.
        content: String,
        /// 1-based line number on the new side.
        #[serde(default)]
        new_line: Option<u32>,
        /// Word-level refinement against the paired deletion.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        words: Option<Vec<WordSegment>>,
    },
    /// Line present only on the old side.
    Deletion {
        /// Raw text without the trailing newline.
        content: String,
        /// 1-based line number on the old side.
        #[serde(default)]
        old_line: Option<u32>,
        /// Word-level refinement against the paired addition.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        words: Option<Vec<WordSegment>>,
    },
    /// The preceding line has no trailing newline.
    NoNewlineMarker {
        /// Marker text as reported by the engine.
        content: String,
    },
}

impl Line {
    /// The role the line plays in the hunk.
    #[must_use]
    pub const fn kind(&self) -> LineKind {
        match self {
            Self::Context { .. } => LineKind::Context,
            Self::Addition { .. } => LineKind::Addition,
            Self::Deletion { .. } => LineKind::Deletion,
            Self::NoNewlineMarker { .. } => LineKind::NoNewlineMarker,
        }
    }

    /// Raw text of the line.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Context { content, .. }
            | Self::Addition { content, .. }
            | Self::Deletion { content, .. }
            | Self::NoNewlineMarker { content } => content,
        }
    }

    /// Word segments, when the line was refined.
    #[must_use]
    pub fn words(&self) -> Option<&[WordSegment]> {
        match self {
            Self::Addition { words, .. } | Self::Deletion { words, .. } => words.as_deref(),
            Self::Context { .. } | Self::NoNewlineMarker { .. } => None,
        }
    }
}

/// Discriminant of [`Line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Unchanged context line.
    Context,
    /// A newly added line.
    Addition,
    /// A deleted line.
    Deletion,
    /// "No newline at end of file" marker.
    NoNewlineMarker,
}

/// A token or whitespace run within a refined line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct WordSegment {
    /// Whether the run is shared, added or removed.
    pub kind: SegmentKind,
    /// Exact text of the run.
    pub content: String,
}

impl WordSegment {
    /// Convenience constructor.
    pub fn new(kind: SegmentKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Classification of a [`WordSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Present on both sides.
    Unchanged,
    /// Present only on the new side.
    Added,
    /// Present only on the old side.
    Removed,
}

/// File change classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// File only exists on the new side.
    Added,
    /// File only exists on the old side.
    Deleted,
    /// File exists on both sides with modifications.
    Modified,
    /// File path changed between the two sides.
    Renamed,
    /// File content copied from another location.
    Copied,
    /// Only the mode or object type changed.
    ModeChanged,
}
