//! BLAKE3 content hashing for run records.
//!
//! Computes a deterministic hash of all record fields (excluding the
//! content_hash itself) so that any later modification is detectable.

use serde::Serialize;

use crate::{RangeAttempt, RunId, RunOutcome, RunRecord};

/// Hashable representation of a RunRecord (excludes content_hash).
#[derive(Serialize)]
struct HashableRecord<'a> {
    id: &'a RunId,
    started_at: &'a chrono::DateTime<chrono::Utc>,
    completed_at: &'a Option<chrono::DateTime<chrono::Utc>>,
    ranges: &'a [RangeAttempt],
    outcome: &'a Option<RunOutcome>,
}

/// Compute the BLAKE3 hash of a record's content.
///
/// Serializes all fields except `content_hash` to canonical JSON, then
/// hashes the bytes with BLAKE3. Returns the hex-encoded hash.
pub fn compute_record_hash(record: &RunRecord) -> String {
    let hashable = HashableRecord {
        id: &record.id,
        started_at: &record.started_at,
        completed_at: &record.completed_at,
        ranges: &record.ranges,
        outcome: &record.outcome,
    };

    let json = serde_json::to_vec(&hashable).expect("RunRecord serialization should not fail");
    blake3::hash(&json).to_hex().to_string()
}
