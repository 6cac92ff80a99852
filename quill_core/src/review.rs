//! Integration candidates: commits on a branch that the working line lacks.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use quill_engine_api::{CommitMeta, VersionEngine};
use tracing::{debug, instrument};

use crate::api::{CommitRef, ReviewCandidate, Signature};
use crate::config::ReviewConfig;
use crate::{resolve_reference, Error, Result};

/// Computes the ordered set of commits a branch would bring in.
#[derive(Debug, Clone, Default)]
pub struct ReviewResolver {
    default_limit: Option<u32>,
}

impl ReviewResolver {
    /// Resolver without a default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver honouring `[review]` settings.
    #[must_use]
    pub const fn from_config(config: &ReviewConfig) -> Self {
        Self {
            default_limit: config.default_limit,
        }
    }

    /// Commits reachable from `target` but not from `working`, newest first.
    ///
    /// Children always precede their parents; among commits that become
    /// available together, the newer author time wins and equal times are
    /// ordered by ascending commit id. An identical or already-merged target
    /// yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefNotFound`] when either reference is unknown and
    /// [`Error::Engine`] when the history walk fails.
    #[instrument(skip(self, engine))]
    pub fn review_branch(
        &self,
        engine: &dyn VersionEngine,
        target: &str,
        working: &str,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewCandidate>> {
        let target_commit = resolve_reference(engine, target, Error::ref_not_found)?;
        let working_commit = resolve_reference(engine, working, Error::ref_not_found)?;

        if target_commit.id == working_commit.id {
            debug!("target and working reference are identical");
            return Ok(Vec::new());
        }

        let commits = engine.ancestry_difference(&target_commit.id, &working_commit.id)?;
        let limit = limit
            .or(self.default_limit)
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        let candidates: Vec<ReviewCandidate> = order_newest_first(commits)
            .into_iter()
            .take(limit)
            .zip(0_u32..)
            .map(|(commit, rank)| {
                let name = if commit.id == target_commit.id {
                    target.to_owned()
                } else {
                    crate::api::short_id(&commit.id).to_owned()
                };
                ReviewCandidate {
                    commit: CommitRef::new(commit.id, name),
                    author: Signature {
                        name: commit.author.name,
                        email: Some(commit.author.email).filter(|email| !email.is_empty()),
                    },
                    summary: commit.summary,
                    timestamp: commit.time,
                    rank,
                }
            })
            .collect();

        debug!(count = candidates.len(), "resolved review candidates");
        Ok(candidates)
    }
}

/// Topologically order `commits` with children first.
///
/// Only edges between members of `commits` are considered.
pub(crate) fn order_newest_first(commits: Vec<CommitMeta>) -> Vec<CommitMeta> {
    let mut by_id: HashMap<String, CommitMeta> = HashMap::with_capacity(commits.len());
    for commit in commits {
        by_id.entry(commit.id.clone()).or_insert(commit);
    }

    let mut children: HashMap<String, usize> =
        by_id.keys().map(|id| (id.clone(), 0)).collect();
    for commit in by_id.values() {
        for parent in &commit.parents {
            if let Some(count) = children.get_mut(parent) {
                *count += 1;
            }
        }
    }

    let mut ready: BTreeSet<(Reverse<i64>, String)> = children
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| (Reverse(by_id[id].time), id.clone()))
        .collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    while let Some((_, id)) = ready.pop_first() {
        let Some(commit) = by_id.remove(&id) else {
            continue;
        };
        for parent in &commit.parents {
            if let Some(count) = children.get_mut(parent) {
                *count -= 1;
                if *count == 0 {
                    if let Some(parent_commit) = by_id.get(parent) {
                        ready.insert((Reverse(parent_commit.time), parent.clone()));
                    }
                }
            }
        }
        ordered.push(commit);
    }

    ordered
}
