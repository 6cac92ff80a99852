use serde::{Deserialize, Serialize};

use super::repository::{CommitRef, Signature};

/// A commit offered to the reviewer as an integration candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ReviewCandidate {
    /// The commit under review.
    pub commit: CommitRef,
    /// Who wrote the change.
    pub author: Signature,
    /// First line of the commit message.
    pub summary: String,
    /// Author timestamp in seconds since the Unix epoch.
    pub timestamp: i64,
    /// 0-based position in newest-first topological order.
    pub rank: u32,
}
