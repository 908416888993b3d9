//! Builder that records a discovery run incrementally.
//!
//! The orchestrator drives it as the search proceeds:
//!
//! ```no_run
//! # use easel_journal::session::RunJournal;
//! # use easel_journal::RunOutcome;
//! # use easel_core::types::{Candidate, ProbeResult};
//! # use std::net::Ipv4Addr;
//! let mut journal = RunJournal::new();
//! journal.begin_scope("192.168.1.0/24");
//! journal.record_probe(&ProbeResult {
//!     candidate: Candidate::heuristic(Ipv4Addr::new(192, 168, 1, 64)),
//!     reachable: false,
//!     elapsed_ms: Some(1003),
//! });
//! let record = journal.finalize(RunOutcome::Exhausted);
//! assert!(record.content_hash.is_some());
//! ```

use chrono::Utc;

use easel_core::types::{ProbeResult, VerificationResult};

use crate::{CandidateAttempt, RangeAttempt, RunId, RunOutcome, RunRecord};

/// Records one discovery run as it happens.
pub struct RunJournal {
    record: RunRecord,
}

impl RunJournal {
    /// Start recording a new run.
    pub fn new() -> Self {
        Self {
            record: RunRecord {
                id: RunId::new(),
                started_at: Utc::now(),
                completed_at: None,
                ranges: Vec::new(),
                outcome: None,
                content_hash: None,
            },
        }
    }

    /// The run ID (available before finalization).
    pub fn id(&self) -> RunId {
        self.record.id
    }

    /// Open a new search scope: a CIDR range, or the fallback hostname.
    pub fn begin_scope(&mut self, target: &str) {
        self.record.ranges.push(RangeAttempt {
            target: target.to_string(),
            candidates: Vec::new(),
        });
    }

    /// Record a reachability probe in the current scope.
    pub fn record_probe(&mut self, probe: &ProbeResult) {
        self.current_scope().candidates.push(CandidateAttempt {
            addr: probe.candidate.addr.clone(),
            origin: probe.candidate.origin,
            reachable: Some(probe.reachable),
            verified: None,
        });
    }

    /// Record a verification attempt. Merges into the candidate's probe
    /// entry when one exists; hostname-fallback candidates are never probed
    /// and get a fresh entry.
    pub fn record_verification(&mut self, verification: &VerificationResult) {
        let scope = self.current_scope();
        if let Some(attempt) = scope
            .candidates
            .iter_mut()
            .rev()
            .find(|a| a.addr == verification.candidate.addr)
        {
            attempt.verified = Some(verification.verified);
        } else {
            scope.candidates.push(CandidateAttempt {
                addr: verification.candidate.addr.clone(),
                origin: verification.candidate.origin,
                reachable: None,
                verified: Some(verification.verified),
            });
        }
    }

    /// Close the record: set completed_at, the outcome and the content hash.
    pub fn finalize(mut self, outcome: RunOutcome) -> RunRecord {
        self.record.completed_at = Some(Utc::now());
        self.record.outcome = Some(outcome);
        let hash = self.record.compute_hash();
        self.record.content_hash = Some(hash);
        self.record
    }

    fn current_scope(&mut self) -> &mut RangeAttempt {
        if self.record.ranges.is_empty() {
            self.begin_scope("-");
        }
        self.record
            .ranges
            .last_mut()
            .expect("at least one scope exists")
    }
}

impl Default for RunJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use easel_core::types::{Candidate, CandidateOrigin, HostAddr};

    use super::*;

    #[test]
    fn verification_merges_into_probe_entry() {
        let candidate = Candidate::scan(Ipv4Addr::new(30, 30, 10, 64));
        let mut journal = RunJournal::new();
        journal.begin_scope("30.30.10.0/24");
        journal.record_probe(&ProbeResult {
            candidate: candidate.clone(),
            reachable: true,
            elapsed_ms: Some(12),
        });
        journal.record_verification(&VerificationResult {
            candidate,
            verified: true,
        });

        let record = journal.finalize(RunOutcome::Located {
            address: HostAddr::Ip(Ipv4Addr::new(30, 30, 10, 64)),
            origin: CandidateOrigin::ScanResult,
        });

        assert_eq!(record.ranges.len(), 1);
        assert_eq!(record.ranges[0].candidates.len(), 1);
        let attempt = &record.ranges[0].candidates[0];
        assert_eq!(attempt.reachable, Some(true));
        assert_eq!(attempt.verified, Some(true));
    }

    #[test]
    fn unprobed_verification_gets_fresh_entry() {
        let mut journal = RunJournal::new();
        journal.begin_scope("raspberrypi.local");
        journal.record_verification(&VerificationResult {
            candidate: Candidate::hostname("raspberrypi.local"),
            verified: false,
        });

        let record = journal.finalize(RunOutcome::Exhausted);
        let attempt = &record.ranges[0].candidates[0];
        assert_eq!(attempt.reachable, None);
        assert_eq!(attempt.verified, Some(false));
        assert_eq!(attempt.origin, CandidateOrigin::HostnameFallback);
    }

    #[test]
    fn finalized_record_passes_integrity_check() {
        let mut journal = RunJournal::new();
        journal.begin_scope("192.168.1.0/24");
        let record = journal.finalize(RunOutcome::Exhausted);

        assert!(record.completed_at.is_some());
        assert!(record.verify_integrity());
    }

    #[test]
    fn tampering_breaks_integrity() {
        let journal = RunJournal::new();
        let mut record = journal.finalize(RunOutcome::Exhausted);
        assert!(record.verify_integrity());

        record.outcome = Some(RunOutcome::Located {
            address: HostAddr::Name("impostor.local".to_string()),
            origin: CandidateOrigin::HostnameFallback,
        });
        assert!(!record.verify_integrity());
    }
}
