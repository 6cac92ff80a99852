use serde::{Deserialize, Serialize};

/// Immutable pointer to a commit together with the name it was reached by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Record)]
pub struct CommitRef {
    /// Full object identifier.
    pub id: String,
    /// Branch, tag or short hash used for display.
    pub name: String,
}

impl CommitRef {
    /// Construct a reference with an explicit display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Construct a reference displayed by its abbreviated id.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = short_id(&id).to_owned();
        Self { id, name }
    }
}

/// First seven characters of an object id.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

/// Structured author/committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Signature {
    /// Display name for the individual.
    pub name: String,
    /// Optional email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// Basic information about the repository being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct RepositoryInfo {
    /// Absolute path to the repository working tree.
    pub root: String,
    /// Default branch name when available (e.g., "main").
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Lightweight summary of the workspace status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct WorkspaceStatus {
    /// Name of the currently checked-out branch, if any.
    #[serde(default)]
    pub current_branch: Option<String>,
    /// Indicates if there are uncommitted modifications.
    pub dirty: bool,
}

/// Repository metadata, workspace state and working tip in one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct RepositorySnapshot {
    /// Static metadata about the repository.
    pub info: RepositoryInfo,
    /// Current workspace status (branch/dirty).
    pub workspace: WorkspaceStatus,
    /// Commit HEAD resolves to, absent for an unborn branch.
    #[serde(default)]
    pub head: Option<CommitRef>,
}

/// A local branch that can be offered for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct BranchInfo {
    /// Short branch name.
    pub name: String,
    /// Commit the branch points at.
    pub tip: CommitRef,
    /// Whether HEAD is attached to this branch.
    pub is_head: bool,
}
