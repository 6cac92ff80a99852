use serde::{Deserialize, Serialize};

/// Name/email pair recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl Identity {
    /// Construct a new identity.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Commit metadata as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Full commit identifier.
    pub id: String,
    /// Identifier of the commit's root tree.
    pub tree: String,
    /// Parent identifiers, first parent first.
    #[serde(default)]
    pub parents: Vec<String>,
    /// First line of the message.
    pub summary: String,
    /// Full commit message.
    pub message: String,
    /// Author identity.
    pub author: Identity,
    /// Author timestamp in seconds since the Unix epoch.
    pub time: i64,
}

/// Engine-native classification of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawChangeKind {
    /// File only exists on the new side.
    Added,
    /// File only exists on the old side.
    Deleted,
    /// Content changed in place.
    Modified,
    /// Path changed, possibly with content edits.
    Renamed,
    /// New path copied from an existing one.
    Copied,
    /// Only the file mode or object type changed.
    ModeChanged,
}

/// Engine-native tag of a single patch line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrigin {
    /// Unchanged line present on both sides.
    Context,
    /// Line present only on the new side.
    Addition,
    /// Line present only on the old side.
    Deletion,
    /// "No newline at end of file" marker for the preceding line.
    NoNewline,
}

/// One line of a raw hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    /// Classification assigned by the engine.
    pub origin: LineOrigin,
    /// Line text without its trailing newline.
    pub content: String,
    /// 1-based line number on the old side.
    #[serde(default)]
    pub old_lineno: Option<u32>,
    /// 1-based line number on the new side.
    #[serde(default)]
    pub new_lineno: Option<u32>,
}

impl RawLine {
    /// Convenience constructor without line numbers.
    #[must_use]
    pub fn new(origin: LineOrigin, content: impl Into<String>) -> Self {
        Self {
            origin,
            content: content.into(),
            old_lineno: None,
            new_lineno: None,
        }
    }
}

/// Contiguous block of raw patch lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawHunk {
    /// Starting line on the old side.
    pub old_start: u32,
    /// Number of old-side lines covered.
    pub old_lines: u32,
    /// Starting line on the new side.
    pub new_start: u32,
    /// Number of new-side lines covered.
    pub new_lines: u32,
    /// Section text trailing the `@@` header, if any.
    #[serde(default)]
    pub section: Option<String>,
    /// Lines in source order.
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

/// Raw comparison result for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFileDiff {
    /// How the file changed.
    pub kind: RawChangeKind,
    /// Path on the old side, absent for additions.
    #[serde(default)]
    pub old_path: Option<String>,
    /// Path on the new side, absent for deletions.
    #[serde(default)]
    pub new_path: Option<String>,
    /// Whether either side is binary content.
    #[serde(default)]
    pub is_binary: bool,
    /// Hunks in source order.
    #[serde(default)]
    pub hunks: Vec<RawHunk>,
}

/// Knobs forwarded to the engine's line diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDiffOptions {
    /// Unchanged lines of context around each hunk.
    pub context_lines: u32,
    /// Pair deleted/added files into renames.
    pub detect_renames: bool,
    /// Detect new files copied from unmodified sources.
    pub detect_copies: bool,
}

impl Default for RawDiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            detect_renames: true,
            detect_copies: true,
        }
    }
}

/// Result of replaying one commit onto another in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// Change-set applied without conflicts; `tree` holds the result.
    Clean {
        /// Resulting tree identifier.
        tree: String,
    },
    /// Change-set collides with the target on these paths.
    Conflicted {
        /// Conflicting paths as reported by the engine.
        paths: Vec<String>,
    },
}

/// Result of merging a branch tip into another commit in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Source is already contained in the target.
    UpToDate,
    /// Target is an ancestor of source; the branch can simply advance.
    FastForward {
        /// Commit the branch should advance to.
        target: String,
    },
    /// Three-way merge succeeded; `tree` holds the merged content.
    Merged {
        /// Resulting tree identifier.
        tree: String,
    },
    /// Three-way merge left conflicts on these paths.
    Conflicted {
        /// Conflicting paths as reported by the engine.
        paths: Vec<String>,
    },
}

/// Description of a commit object to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit<'a> {
    /// Tree the commit records.
    pub tree: &'a str,
    /// Full commit message.
    pub message: &'a str,
    /// Parent identifiers, first parent first.
    pub parents: &'a [String],
    /// Author identity.
    pub author: &'a Identity,
    /// Author timestamp to preserve, or `None` for the current time.
    pub author_time: Option<i64>,
    /// Committer identity.
    pub committer: &'a Identity,
}

/// Errors surfaced by engine implementations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A reference or object id could not be resolved.
    #[error("reference not found: {reference}")]
    NotFound {
        /// The reference exactly as supplied.
        reference: String,
    },
    /// Any other engine failure.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl EngineError {
    /// Helper to construct a not-found error.
    #[must_use]
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::NotFound {
            reference: reference.into(),
        }
    }

    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Whether the error reports an unresolvable reference.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience result alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_use_snake_case_tags() {
        let json = serde_json::to_string(&MergeOutcome::FastForward {
            target: "abc".into(),
        })
        .expect("serialize outcome");
        assert_eq!(json, r#"{"fast_forward":{"target":"abc"}}"#);

        let kind = serde_json::to_string(&RawChangeKind::ModeChanged).expect("serialize kind");
        assert_eq!(kind, "\"mode_changed\"");
    }

    #[test]
    fn not_found_is_classified() {
        assert!(EngineError::not_found("main").is_not_found());
        assert!(!EngineError::failure("boom").is_not_found());
        assert_eq!(
            EngineError::not_found("feature/x").to_string(),
            "reference not found: feature/x"
        );
    }

    #[test]
    fn raw_diff_options_default_to_three_lines() {
        let options = RawDiffOptions::default();
        assert_eq!(options.context_lines, 3);
        assert!(options.detect_renames);
        assert!(options.detect_copies);
    }
}
