//! Public data models shared across Quill's upward API surface.
//!
//! The structures in this module are designed to be:
//! - serializable via `serde` for the JSON wire contract renderers consume
//! - restricted to FFI-friendly primitives so `uniffi` can bridge them

/// Structured diff types surfaced to reviewers.
pub mod diff;
/// Outcome of cherry-pick and branch integration.
pub mod integration;
/// Repository metadata and commit references.
pub mod repository;
/// Integration candidates produced by branch review.
pub mod review;

pub use diff::{
    ChangeType, DiffStats, FileDiffRecord, Hunk, HunkRange, Line, LineKind, SegmentKind,
    WordSegment,
};
pub use integration::IntegrationResult;
pub use repository::{
    short_id, BranchInfo, CommitRef, RepositoryInfo, RepositorySnapshot, Signature,
    WorkspaceStatus,
};
pub use review::ReviewCandidate;
