//! Selective integration: cherry-picking single commits and merging whole
//! branches into the checked-out branch.
//!
//! Every mutation is all-or-nothing. Conflicts are reported as data and leave
//! the branch tip untouched; engine failures after the first write restore
//! the branch, index and working tree to the tip observed at the start of
//! the call. A branch that another writer moved in the meantime is never
//! rolled back.

use quill_engine_api::{
    ApplyOutcome, CommitMeta, EngineError, EngineResult, Identity, MergeOutcome, NewCommit,
    VersionEngine,
};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{short_id, CommitRef, FileDiffRecord, IntegrationResult};
use crate::config::IntegrationConfig;
use crate::diff::DiffEngine;
use crate::{resolve_reference, Error, Result};

/// Applies commits and branches onto the checked-out branch.
#[derive(Debug, Clone)]
pub struct IntegrationEngine {
    committer: Identity,
    record_origin: bool,
    diff: DiffEngine,
}

impl Default for IntegrationEngine {
    fn default() -> Self {
        Self::from_config(&IntegrationConfig::default(), DiffEngine::new())
    }
}

impl IntegrationEngine {
    /// Engine using the default committer identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine honouring `[integration]` settings; `diff` renders conflict
    /// previews.
    #[must_use]
    pub fn from_config(config: &IntegrationConfig, diff: DiffEngine) -> Self {
        Self {
            committer: Identity::new(&config.committer_name, &config.committer_email),
            record_origin: config.record_origin,
            diff,
        }
    }

    /// Replay `commit_ref` on top of the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetachedState`] without a checked-out branch,
    /// [`Error::CommitNotFound`] for an unknown commit,
    /// [`Error::DirtyWorkingTree`] when tracked files carry edits, and
    /// [`Error::RollbackFailed`] when a failed attempt could not be undone.
    #[instrument(skip(self, engine))]
    pub fn cherry_pick(
        &self,
        engine: &dyn VersionEngine,
        commit_ref: &str,
    ) -> Result<IntegrationResult> {
        let (branch, tip) = checked_out_tip(engine)?;
        let commit = resolve_reference(engine, commit_ref, Error::commit_not_found)?;
        ensure_clean(engine)?;

        if engine.is_ancestor(&commit.id, &tip.id)? {
            info!(commit = %commit.id, branch, "commit already contained in branch");
            return Ok(IntegrationResult::NoOp {
                reason: format!("{} is already part of {branch}", short_id(&commit.id)),
            });
        }

        let mut written = None;
        let attempt = self.pick_onto(engine, &branch, &tip, &commit, &mut written);
        settle(engine, "cherry-pick", &branch, &tip, written.as_deref(), attempt)
    }

    /// Merge `source_ref` into the checked-out branch, fast-forwarding when
    /// the branch has not diverged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetachedState`] without a checked-out branch,
    /// [`Error::RefNotFound`] for an unknown source,
    /// [`Error::DirtyWorkingTree`] when tracked files carry edits, and
    /// [`Error::RollbackFailed`] when a failed attempt could not be undone.
    #[instrument(skip(self, engine))]
    pub fn integrate_branch(
        &self,
        engine: &dyn VersionEngine,
        source_ref: &str,
    ) -> Result<IntegrationResult> {
        let (branch, tip) = checked_out_tip(engine)?;
        let source = resolve_reference(engine, source_ref, Error::ref_not_found)?;
        ensure_clean(engine)?;

        let mut written = None;
        let attempt = self.merge_into(engine, &branch, &tip, &source, source_ref, &mut written);
        settle(engine, "merge", &branch, &tip, written.as_deref(), attempt)
    }

    fn pick_onto(
        &self,
        engine: &dyn VersionEngine,
        branch: &str,
        tip: &CommitMeta,
        commit: &CommitMeta,
        written: &mut Option<String>,
    ) -> EngineResult<IntegrationResult> {
        let tree = match engine.apply_commit(&commit.id, &tip.id)? {
            ApplyOutcome::Clean { tree } => tree,
            ApplyOutcome::Conflicted { paths } => {
                let previews = commit.parents.first().map_or_else(Vec::new, |parent| {
                    self.previews(engine, parent, &commit.id, &paths)
                });
                return Ok(conflict(paths, previews));
            }
        };

        if tree == tip.tree {
            info!(commit = %commit.id, branch, "cherry-pick introduces no changes");
            return Ok(IntegrationResult::NoOp {
                reason: format!(
                    "changes from {} are already present in {branch}",
                    short_id(&commit.id)
                ),
            });
        }

        let message = self.picked_message(commit);
        let parents = [tip.id.clone()];
        let created = engine.create_commit(&NewCommit {
            tree: &tree,
            message: &message,
            parents: &parents,
            author: &commit.author,
            author_time: Some(commit.time),
            committer: &self.committer,
        })?;
        *written = Some(created.id.clone());
        engine.advance_branch(branch, &created.id, &tip.id)?;

        info!(commit = %commit.id, new_commit = %created.id, branch, "cherry-pick applied");
        Ok(IntegrationResult::Applied {
            summary: format!(
                "Cherry-picked {} onto {branch}: {}",
                short_id(&commit.id),
                commit.summary
            ),
            new_commit: CommitRef::new(created.id, branch),
            fast_forward: false,
        })
    }

    fn merge_into(
        &self,
        engine: &dyn VersionEngine,
        branch: &str,
        tip: &CommitMeta,
        source: &CommitMeta,
        source_ref: &str,
        written: &mut Option<String>,
    ) -> EngineResult<IntegrationResult> {
        match engine.merge_branch(&source.id, &tip.id)? {
            MergeOutcome::UpToDate => {
                info!(branch, source = source_ref, "branch already up to date");
                Ok(IntegrationResult::NoOp {
                    reason: format!("{branch} already contains {source_ref}"),
                })
            }
            MergeOutcome::FastForward { target } => {
                engine.advance_branch(branch, &target, &tip.id)?;
                info!(branch, target = %target, "fast-forwarded");
                Ok(IntegrationResult::Applied {
                    summary: format!("Fast-forwarded {branch} to {source_ref}"),
                    new_commit: CommitRef::new(target, branch),
                    fast_forward: true,
                })
            }
            MergeOutcome::Merged { tree } => {
                let message = format!("Merge branch '{source_ref}'");
                let parents = [tip.id.clone(), source.id.clone()];
                let created = engine.create_commit(&NewCommit {
                    tree: &tree,
                    message: &message,
                    parents: &parents,
                    author: &self.committer,
                    author_time: None,
                    committer: &self.committer,
                })?;
                *written = Some(created.id.clone());
                engine.advance_branch(branch, &created.id, &tip.id)?;
                info!(branch, new_commit = %created.id, "merge commit created");
                Ok(IntegrationResult::Applied {
                    summary: format!("Merged {source_ref} into {branch}"),
                    new_commit: CommitRef::new(created.id, branch),
                    fast_forward: false,
                })
            }
            MergeOutcome::Conflicted { paths } => {
                let previews = self.previews(engine, &tip.id, &source.id, &paths);
                Ok(conflict(paths, previews))
            }
        }
    }

    fn picked_message(&self, commit: &CommitMeta) -> String {
        if !self.record_origin {
            return commit.message.clone();
        }
        format!(
            "{}\n\n(cherry picked from commit {})\n",
            commit.message.trim_end(),
            commit.id
        )
    }

    fn previews(
        &self,
        engine: &dyn VersionEngine,
        old_id: &str,
        new_id: &str,
        paths: &[String],
    ) -> Vec<FileDiffRecord> {
        match self.diff.diff_paths(engine, old_id, new_id, paths) {
            Ok(records) => records,
            Err(err) => {
                warn!(%err, old_id, new_id, "could not render conflict previews");
                Vec::new()
            }
        }
    }
}

fn checked_out_tip(engine: &dyn VersionEngine) -> Result<(String, CommitMeta)> {
    let branch = engine.head_branch()?.ok_or(Error::DetachedState)?;
    let tip = resolve_reference(engine, &branch, Error::ref_not_found)?;
    debug!(branch, tip = %tip.id, "resolved working tip");
    Ok((branch, tip))
}

fn ensure_clean(engine: &dyn VersionEngine) -> Result<()> {
    let paths = engine.dirty_paths()?;
    if paths.is_empty() {
        Ok(())
    } else {
        warn!(?paths, "refusing to integrate into a dirty working tree");
        Err(Error::DirtyWorkingTree { paths })
    }
}

fn conflict(mut paths: Vec<String>, previews: Vec<FileDiffRecord>) -> IntegrationResult {
    paths.sort();
    paths.dedup();
    info!(?paths, "integration stopped on conflicts");
    IntegrationResult::Conflict {
        conflicting_paths: paths,
        previews,
    }
}

/// Turn an attempt's engine failure into [`IntegrationResult::Failed`] after
/// restoring `branch` to `tip`. `written` is the commit the attempt created,
/// if it got that far.
fn settle(
    engine: &dyn VersionEngine,
    operation: &str,
    branch: &str,
    tip: &CommitMeta,
    written: Option<&str>,
    attempt: EngineResult<IntegrationResult>,
) -> Result<IntegrationResult> {
    let cause = match attempt {
        Ok(result) => return Ok(result),
        Err(cause) => cause,
    };

    warn!(operation, branch, tip = %tip.id, %cause, "engine failed, rolling back");
    match engine.restore_branch(branch, &tip.id, written) {
        Ok(true) => Ok(IntegrationResult::Failed {
            cause: failure_cause(operation, branch, &cause),
        }),
        Ok(false) => {
            warn!(operation, branch, "branch moved by another writer, not rolled back");
            Ok(IntegrationResult::Failed {
                cause: format!(
                    "{}; {branch} was moved by another writer and left untouched",
                    failure_cause(operation, branch, &cause)
                ),
            })
        }
        Err(source) => {
            error!(
                operation,
                branch,
                tip = %tip.id,
                %source,
                "rollback failed, repository left in an intermediate state"
            );
            Err(Error::RollbackFailed {
                branch: branch.to_owned(),
                tip: tip.id.clone(),
                source,
            })
        }
    }
}

fn failure_cause(operation: &str, branch: &str, cause: &EngineError) -> String {
    format!("{operation} onto {branch} failed: {cause}")
}
