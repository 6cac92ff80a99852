//! Interface between the Quill core and the version-control engine it drives.

mod types;

pub use types::{
    ApplyOutcome, CommitMeta, EngineError, EngineResult, Identity, LineOrigin, MergeOutcome,
    NewCommit, RawChangeKind, RawDiffOptions, RawFileDiff, RawHunk, RawLine,
};

/// Operations the core needs from an underlying version-control engine.
///
/// References are accepted in any form the engine understands (branch names,
/// tags, full or abbreviated ids). Unresolvable references must be reported
/// as [`EngineError::NotFound`].
pub trait VersionEngine {
    /// Resolve a reference to the commit it points at.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for unknown references.
    fn resolve(&self, reference: &str) -> EngineResult<CommitMeta>;

    /// Line-oriented comparison of two commits, in engine path order.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when either commit cannot be read.
    fn raw_diff(
        &self,
        old: &str,
        new: &str,
        options: &RawDiffOptions,
    ) -> EngineResult<Vec<RawFileDiff>>;

    /// Commits reachable from `target` but not from `base`, in any order.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when the history cannot be walked.
    fn ancestry_difference(&self, target: &str, base: &str) -> EngineResult<Vec<CommitMeta>>;

    /// Whether `ancestor` is reachable from `descendant` (or equal to it).
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when the graph cannot be read.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> EngineResult<bool>;

    /// Replay `commit`'s change-set onto `onto` without touching refs or the
    /// working tree.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors for failures other than conflicts.
    fn apply_commit(&self, commit: &str, onto: &str) -> EngineResult<ApplyOutcome>;

    /// Merge `source` into `onto` without touching refs or the working tree.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors for failures other than conflicts.
    fn merge_branch(&self, source: &str, onto: &str) -> EngineResult<MergeOutcome>;

    /// Write a commit object. Does not move any reference.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when the object cannot be written.
    fn create_commit(&self, commit: &NewCommit<'_>) -> EngineResult<CommitMeta>;

    /// Short name of the branch HEAD points at, `None` when detached.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when HEAD cannot be read.
    fn head_branch(&self) -> EngineResult<Option<String>>;

    /// Tracked paths with uncommitted modifications.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when status cannot be computed.
    fn dirty_paths(&self) -> EngineResult<Vec<String>>;

    /// Move `branch` from `expected_tip` to `new_tip` and update the working
    /// tree to match.
    ///
    /// # Errors
    ///
    /// Fails if the branch no longer points at `expected_tip` or the working
    /// tree cannot be updated.
    fn advance_branch(&self, branch: &str, new_tip: &str, expected_tip: &str) -> EngineResult<()>;

    /// Force `branch`, the index and the working tree back to `tip`, but only
    /// while the branch still points at `tip` or at `written`, the commit the
    /// failed attempt itself produced.
    ///
    /// Returns `false` and leaves the branch and working tree untouched when
    /// the branch has moved anywhere else.
    ///
    /// # Errors
    ///
    /// Returns engine-defined errors when the restore cannot be completed.
    fn restore_branch(
        &self,
        branch: &str,
        tip: &str,
        written: Option<&str>,
    ) -> EngineResult<bool>;
}
