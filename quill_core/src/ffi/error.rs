use std::sync::PoisonError;

use thiserror::Error;

use crate::Error;

/// Errors surfaced through the `UniFFI` bindings.
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum CoreError {
    /// A reference could not be resolved.
    #[error("reference not found: {reference}")]
    RefNotFound {
        /// Reference exactly as supplied.
        reference: String,
    },
    /// A commit could not be resolved.
    #[error("commit not found: {reference}")]
    CommitNotFound {
        /// Reference exactly as supplied.
        reference: String,
    },
    /// A root commit has no parent to diff against.
    #[error("{reference} has no parent commit to compare against")]
    InsufficientHistory {
        /// Reference of the root commit.
        reference: String,
    },
    /// HEAD is not on a branch.
    #[error("HEAD is detached")]
    DetachedState,
    /// Another mutation holds the repository.
    #[error("repository is busy: {path}")]
    RepositoryBusy {
        /// Repository root.
        path: String,
    },
    /// Uncommitted edits block the mutation.
    #[error("working tree has uncommitted changes: {}", paths.join(", "))]
    DirtyWorkingTree {
        /// Modified paths.
        paths: Vec<String>,
    },
    /// The engine failed outside of a mutation.
    #[error("engine error: {message}")]
    Engine {
        /// Engine message.
        message: String,
    },
    /// Rollback after a failed mutation did not complete.
    #[error("{message}")]
    RollbackFailed {
        /// Branch, tip and cause.
        message: String,
    },
    /// Path does not correspond to a git repository.
    #[error("path is not a git repository: {path}")]
    NotARepository {
        /// Offending path.
        path: String,
    },
    /// Repository is bare and unsupported.
    #[error("repository is bare and unsupported: {path}")]
    BareRepository {
        /// Offending path.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("filesystem error: {message}")]
    Io {
        /// Path and cause.
        message: String,
    },
    /// Configuration was rejected.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
    /// Internal invariant failed.
    #[error("internal error")]
    Internal,
}

impl From<Error> for CoreError {
    fn from(error: Error) -> Self {
        match error {
            Error::RefNotFound { reference } => Self::RefNotFound { reference },
            Error::CommitNotFound { reference } => Self::CommitNotFound { reference },
            Error::InsufficientHistory { reference } => Self::InsufficientHistory { reference },
            Error::DetachedState => Self::DetachedState,
            Error::RepositoryBusy { path } => Self::RepositoryBusy { path },
            Error::DirtyWorkingTree { paths } => Self::DirtyWorkingTree { paths },
            Error::Engine { source } => Self::Engine {
                message: source.to_string(),
            },
            err @ Error::RollbackFailed { .. } => Self::RollbackFailed {
                message: err.to_string(),
            },
            Error::Git { source } => Self::Engine {
                message: source.message().to_owned(),
            },
            Error::NotARepository { path } => Self::NotARepository { path },
            Error::BareRepository { path } => Self::BareRepository { path },
            err @ Error::Io { .. } => Self::Io {
                message: err.to_string(),
            },
            Error::Config { message } => Self::Config { message },
            Error::LockPoisoned => Self::Internal,
        }
    }
}

impl<T> From<PoisonError<T>> for CoreError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_engine_api::EngineError;

    #[test]
    fn display_keeps_reference_names() {
        let err = CoreError::from(Error::ref_not_found("feature/epilogue"));
        assert_eq!(err.to_string(), "reference not found: feature/epilogue");
    }

    #[test]
    fn rollback_failure_keeps_branch_and_tip() {
        let err = CoreError::from(Error::RollbackFailed {
            branch: "main".into(),
            tip: "abc1234".into(),
            source: EngineError::failure("index.lock exists"),
        });
        let message = err.to_string();
        assert!(message.contains("main"));
        assert!(message.contains("abc1234"));
        assert!(message.contains("index.lock"));
    }
}
