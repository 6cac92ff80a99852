//! Structured diff generation on top of the engine's raw line diffs.

pub mod align;
pub mod classify;
pub mod tokenize;

use quill_engine_api::{RawChangeKind, RawDiffOptions, RawFileDiff, VersionEngine};
use tracing::{debug, instrument};

use self::classify::{classify_hunk, WordDiffOptions};
use crate::api::{ChangeType, DiffStats, FileDiffRecord, Hunk, HunkRange, Line};
use crate::config::DiffConfig;
use crate::{resolve_reference, Error, Result};

/// Entry point for diff generation.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    raw: RawDiffOptions,
    words: WordDiffOptions,
}

impl DiffEngine {
    /// Construct a diff engine with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a diff engine from the `[diff]` configuration section.
    #[must_use]
    pub fn from_config(config: &DiffConfig) -> Self {
        Self {
            raw: RawDiffOptions {
                context_lines: config.context_lines,
                detect_renames: config.detect_renames,
                detect_copies: config.detect_copies,
            },
            words: WordDiffOptions {
                enabled: config.word_diff,
                max_line_tokens: usize::try_from(config.max_line_tokens).unwrap_or(usize::MAX),
            },
        }
    }

    /// Compare two references, returning one record per changed file in the
    /// engine's order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefNotFound`] if either reference cannot be resolved
    /// and [`Error::Engine`] if the engine fails to produce the diff.
    #[instrument(skip(self, engine))]
    pub fn compare(
        &self,
        engine: &dyn VersionEngine,
        old: &str,
        new: &str,
    ) -> Result<Vec<FileDiffRecord>> {
        let old_commit = resolve_reference(engine, old, Error::ref_not_found)?;
        let new_commit = resolve_reference(engine, new, Error::ref_not_found)?;
        self.diff_commits(engine, &old_commit.id, &new_commit.id)
    }

    /// Diff a single commit against its first parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefNotFound`] for unknown references and
    /// [`Error::InsufficientHistory`] when the commit has no parent.
    #[instrument(skip(self, engine))]
    pub fn diff_commit(
        &self,
        engine: &dyn VersionEngine,
        reference: &str,
    ) -> Result<Vec<FileDiffRecord>> {
        let commit = resolve_reference(engine, reference, Error::ref_not_found)?;
        let Some(parent) = commit.parents.first() else {
            return Err(Error::InsufficientHistory {
                reference: reference.to_owned(),
            });
        };
        self.diff_commits(engine, parent, &commit.id)
    }

    /// Diff two resolved commit ids, keeping only records touching `paths`.
    pub(crate) fn diff_paths(
        &self,
        engine: &dyn VersionEngine,
        old_id: &str,
        new_id: &str,
        paths: &[String],
    ) -> Result<Vec<FileDiffRecord>> {
        let records = self.diff_commits(engine, old_id, new_id)?;
        Ok(records
            .into_iter()
            .filter(|record| paths.iter().any(|path| record.touches(path)))
            .collect())
    }

    fn diff_commits(
        &self,
        engine: &dyn VersionEngine,
        old_id: &str,
        new_id: &str,
    ) -> Result<Vec<FileDiffRecord>> {
        let raw = engine.raw_diff(old_id, new_id, &self.raw)?;
        debug!(files = raw.len(), "engine produced raw diff");
        Ok(raw.iter().map(|file| self.build_record(file)).collect())
    }

    fn build_record(&self, raw: &RawFileDiff) -> FileDiffRecord {
        let new_path = raw
            .new_path
            .clone()
            .or_else(|| raw.old_path.clone())
            .unwrap_or_default();
        let old_path = raw.old_path.clone().unwrap_or_else(|| new_path.clone());

        let hunks: Vec<Hunk> = if raw.is_binary {
            Vec::new()
        } else {
            raw.hunks
                .iter()
                .map(|hunk| Hunk {
                    header: HunkRange {
                        old_start: hunk.old_start,
                        old_lines: hunk.old_lines,
                        new_start: hunk.new_start,
                        new_lines: hunk.new_lines,
                    },
                    section: hunk.section.clone(),
                    lines: classify_hunk(&hunk.lines, &self.words),
                })
                .collect()
        };

        FileDiffRecord {
            change_type: change_type(raw.kind),
            old_path,
            new_path,
            is_binary: raw.is_binary,
            stats: stats_for(&hunks),
            hunks,
        }
    }
}

const fn change_type(kind: RawChangeKind) -> ChangeType {
    match kind {
        RawChangeKind::Added => ChangeType::Added,
        RawChangeKind::Deleted => ChangeType::Deleted,
        RawChangeKind::Modified => ChangeType::Modified,
        RawChangeKind::Renamed => ChangeType::Renamed,
        RawChangeKind::Copied => ChangeType::Copied,
        RawChangeKind::ModeChanged => ChangeType::ModeChanged,
    }
}

fn stats_for(hunks: &[Hunk]) -> DiffStats {
    hunks
        .iter()
        .flat_map(|hunk| &hunk.lines)
        .fold(DiffStats::ZERO, |stats, line| match line {
            Line::Addition { .. } => stats.add(DiffStats::new(1, 0)),
            Line::Deletion { .. } => stats.add(DiffStats::new(0, 1)),
            Line::Context { .. } | Line::NoNewlineMarker { .. } => stats,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_engine_api::{LineOrigin, RawHunk, RawLine};

    fn raw_file(kind: RawChangeKind, old: Option<&str>, new: Option<&str>) -> RawFileDiff {
        RawFileDiff {
            kind,
            old_path: old.map(str::to_owned),
            new_path: new.map(str::to_owned),
            is_binary: false,
            hunks: Vec::new(),
        }
    }

    #[test]
    fn binary_files_never_carry_hunks() {
        let mut raw = raw_file(RawChangeKind::Modified, Some("cover.png"), Some("cover.png"));
        raw.is_binary = true;
        raw.hunks.push(RawHunk {
            lines: vec![RawLine::new(LineOrigin::Addition, "garbage")],
            ..RawHunk::default()
        });

        let record = DiffEngine::new().build_record(&raw);
        assert!(record.is_binary);
        assert!(record.hunks.is_empty());
        assert_eq!(record.stats, DiffStats::ZERO);
    }

    #[test]
    fn added_and_deleted_paths_are_mirrored() {
        let engine = DiffEngine::new();
        let added = engine.build_record(&raw_file(RawChangeKind::Added, None, Some("new.md")));
        assert_eq!(added.change_type, ChangeType::Added);
        assert_eq!(added.old_path, "new.md");
        assert_eq!(added.new_path, "new.md");

        let deleted = engine.build_record(&raw_file(RawChangeKind::Deleted, Some("old.md"), None));
        assert_eq!(deleted.change_type, ChangeType::Deleted);
        assert_eq!(deleted.old_path, "old.md");
        assert_eq!(deleted.new_path, "old.md");
    }

    #[test]
    fn stats_count_changed_lines() {
        let mut raw = raw_file(RawChangeKind::Modified, Some("a.md"), Some("a.md"));
        raw.hunks.push(RawHunk {
            old_start: 1,
            old_lines: 2,
            new_start: 1,
            new_lines: 3,
            section: None,
            lines: vec![
                RawLine::new(LineOrigin::Context, "keep"),
                RawLine::new(LineOrigin::Deletion, "old"),
                RawLine::new(LineOrigin::Addition, "new"),
                RawLine::new(LineOrigin::Addition, "extra"),
            ],
        });

        let record = DiffEngine::new().build_record(&raw);
        assert_eq!(record.stats, DiffStats::new(2, 1));
        assert_eq!(record.hunks[0].header.new_lines, 3);
    }

    #[test]
    fn config_controls_word_refinement() {
        let config = DiffConfig {
            word_diff: false,
            ..DiffConfig::default()
        };
        let engine = DiffEngine::from_config(&config);
        let mut raw = raw_file(RawChangeKind::Modified, Some("a.md"), Some("a.md"));
        raw.hunks.push(RawHunk {
            lines: vec![
                RawLine::new(LineOrigin::Deletion, "before"),
                RawLine::new(LineOrigin::Addition, "after"),
            ],
            ..RawHunk::default()
        });

        let record = engine.build_record(&raw);
        assert!(record.hunks[0].lines.iter().all(|line| line.words().is_none()));
    }
}
