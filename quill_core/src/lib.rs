//! Core library for Quill's manuscript review workflow.
//!
//! The crate is layered around three primary responsibilities:
//! - turning the engine's raw line diffs into word-level structured diffs
//! - resolving which commits a branch would bring into the working line
//! - cherry-picking and merging with all-or-nothing conflict handling

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

uniffi::setup_scaffolding!();

/// Public data models shared with presentation layers.
pub mod api;
/// Layered configuration loaded from TOML.
pub mod config;
/// Structured diff generation: tokenizer, aligner, classifier, builder.
pub mod diff;
/// Foreign-callable session surface.
pub mod ffi;
/// Cherry-pick and branch integration.
pub mod integrate;
/// Tracing subscriber setup.
pub mod logging;
/// Git repository access implementing the engine interface.
pub mod repository;
/// Branch review candidate resolution.
pub mod review;

pub use api::*;
pub use config::CoreConfig;
pub use diff::DiffEngine;
pub use integrate::IntegrationEngine;
pub use quill_engine_api::{EngineError, VersionEngine};
pub use repository::Repository;
pub use review::ReviewResolver;

use quill_engine_api::CommitMeta;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied reference does not exist.
    #[error("reference not found: {reference}")]
    RefNotFound {
        /// Reference exactly as supplied.
        reference: String,
    },
    /// A caller-supplied commit does not exist.
    #[error("commit not found: {reference}")]
    CommitNotFound {
        /// Reference exactly as supplied.
        reference: String,
    },
    /// A parent diff was requested for a commit without parents.
    #[error("{reference} has no parent commit to compare against")]
    InsufficientHistory {
        /// Reference of the root commit.
        reference: String,
    },
    /// HEAD is not attached to a branch that could be advanced.
    #[error("HEAD is detached; check out a branch before integrating changes")]
    DetachedState,
    /// Another mutation is already running against the repository.
    #[error("repository is busy with another change: {path}")]
    RepositoryBusy {
        /// Repository root.
        path: String,
    },
    /// Tracked files carry uncommitted edits that a mutation would clobber.
    #[error("working tree has uncommitted changes: {}", paths.join(", "))]
    DirtyWorkingTree {
        /// Modified paths.
        paths: Vec<String>,
    },
    /// The version-control engine failed.
    #[error("engine error: {source}")]
    Engine {
        /// Error reported by the engine.
        #[from]
        source: EngineError,
    },
    /// Restoring the pre-call state after a failed mutation failed too.
    #[error("rollback of {branch} to {tip} failed, repository needs attention: {source}")]
    RollbackFailed {
        /// Branch being restored.
        branch: String,
        /// Commit the branch should point at.
        tip: String,
        /// Error reported by the engine while restoring.
        #[source]
        source: EngineError,
    },
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error bubbled up by the core library.
        #[from]
        source: git2::Error,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Bare repositories are currently unsupported.
    #[error("repository at {path} is bare and unsupported")]
    BareRepository {
        /// Path of the repository lacking a working tree.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Configuration could not be parsed or is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
    /// A thread panicked while holding the repository mutation lock.
    #[error("repository mutation lock was poisoned")]
    LockPoisoned,
}

impl Error {
    /// Construct [`Error::RefNotFound`].
    #[must_use]
    pub fn ref_not_found(reference: &str) -> Self {
        Self::RefNotFound {
            reference: reference.to_owned(),
        }
    }

    /// Construct [`Error::CommitNotFound`].
    #[must_use]
    pub fn commit_not_found(reference: &str) -> Self {
        Self::CommitNotFound {
            reference: reference.to_owned(),
        }
    }
}

/// Resolve a caller-supplied reference, mapping "not found" through
/// `not_found` so callers can pick the error that names their argument.
pub(crate) fn resolve_reference(
    engine: &dyn VersionEngine,
    reference: &str,
    not_found: fn(&str) -> Error,
) -> Result<CommitMeta> {
    match engine.resolve(reference) {
        Ok(commit) => Ok(commit),
        Err(err) if err.is_not_found() => Err(not_found(reference)),
        Err(err) => Err(Error::from(err)),
    }
}
