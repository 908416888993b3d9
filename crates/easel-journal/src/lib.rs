//! easel-journal — tamper-evident discovery run records.
//!
//! Every discovery run produces a [`RunRecord`]: which ranges were searched,
//! which candidates were probed and verified, and how the run ended. Records
//! are content-hashed with BLAKE3 and stored as date-partitioned JSON files,
//! so a deploy that suddenly targets a different address can be traced back
//! to the run that rewrote it.

pub mod hash;
pub mod session;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use easel_core::types::{CandidateOrigin, HostAddr};

/// Unique identifier for a discovery run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One candidate tried within a search scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateAttempt {
    pub addr: HostAddr,
    pub origin: CandidateOrigin,
    /// `None` when the probe was skipped (hostname fallback) or abandoned
    /// because another candidate had already been accepted.
    pub reachable: Option<bool>,
    /// `None` when the candidate never reached verification.
    pub verified: Option<bool>,
}

/// All attempts made within one search scope: a CIDR range, or the fixed
/// hostname for the final fallback pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeAttempt {
    pub target: String,
    pub candidates: Vec<CandidateAttempt>,
}

/// How a run ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A candidate was verified and its address persisted.
    Located {
        address: HostAddr,
        origin: CandidateOrigin,
    },
    /// Every range and the hostname fallback failed.
    Exhausted,
    /// The run aborted before the search completed.
    Aborted { error: String },
}

/// The complete record of one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ranges: Vec<RangeAttempt>,
    pub outcome: Option<RunOutcome>,
    /// BLAKE3 content hash (hex) — set on finalization.
    pub content_hash: Option<String>,
}

impl RunRecord {
    /// Compute the BLAKE3 hash of the record's content.
    /// The hash covers all fields except `content_hash` itself.
    pub fn compute_hash(&self) -> String {
        hash::compute_record_hash(self)
    }

    /// Verify that the stored content_hash matches a freshly computed hash.
    pub fn verify_integrity(&self) -> bool {
        match &self.content_hash {
            Some(stored) => stored == &self.compute_hash(),
            None => false,
        }
    }
}
