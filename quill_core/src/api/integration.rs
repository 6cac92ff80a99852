use serde::{Deserialize, Serialize};

use super::diff::FileDiffRecord;
use super::repository::CommitRef;

/// Outcome of a cherry-pick or branch integration.
///
/// Only `Applied` corresponds to a changed repository; every other variant
/// leaves the working tip where it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntegrationResult {
    /// The working tip advanced.
    Applied {
        /// New working tip. For fast-forwards this is the source tip itself.
        new_commit: CommitRef,
        /// One-line description of what happened.
        summary: String,
        /// Whether the tip advanced without creating a commit.
        #[serde(default)]
        fast_forward: bool,
    },
    /// The change collides with the working tip on these paths.
    Conflict {
        /// Conflicting paths, sorted and deduplicated.
        conflicting_paths: Vec<String>,
        /// Incoming change for the conflicting paths, as a structured diff.
        #[serde(default)]
        previews: Vec<FileDiffRecord>,
    },
    /// Nothing needed to be done.
    NoOp {
        /// Why nothing was done.
        reason: String,
    },
    /// The engine failed; the repository was restored to its prior state.
    Failed {
        /// Underlying failure, with the references involved.
        cause: String,
    },
}

impl IntegrationResult {
    /// Whether the repository was changed by the operation.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Conflicting paths when the operation stopped on a conflict.
    #[must_use]
    pub fn conflicting_paths(&self) -> Option<&[String]> {
        match self {
            Self::Conflict {
                conflicting_paths, ..
            } => Some(conflicting_paths),
            Self::Applied { .. } | Self::NoOp { .. } | Self::Failed { .. } => None,
        }
    }
}
