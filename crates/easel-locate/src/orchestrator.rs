//! The discovery state machine.
//!
//! Ranges are searched in order; within a range the active scan runs
//! first, then the heuristic batch. An accepted candidate must still pass
//! verification, and a verification failure backtracks to the next range
//! rather than ending the run. The fixed hostname is the last resort.
//! Every run is journaled, win or lose.

use std::sync::Arc;
use std::time::Instant;

use easel_core::types::{Candidate, CandidateOrigin, HostAddr, ProbeResult, VerificationResult};
use easel_journal::session::RunJournal;
use easel_journal::store::JournalStore;
use easel_journal::RunOutcome;
use ipnet::Ipv4Net;

use crate::config::LocateConfig;
use crate::error::Result;
use crate::probe::{self, Prober};
use crate::registry::{RewriteOutcome, TargetRegistry};
use crate::scanner::RangeScanner;
use crate::verify::Verifier;
use crate::{candidates, interfaces};

/// A verified location for the display unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub address: HostAddr,
    pub origin: CandidateOrigin,
}

/// Drives scan, probe, verify and persist for one discovery run.
pub struct Orchestrator {
    config: LocateConfig,
    scanner: Arc<dyn RangeScanner>,
    prober: Arc<dyn Prober>,
    verifier: Arc<dyn Verifier>,
    registry: TargetRegistry,
    persist: bool,
}

impl Orchestrator {
    pub fn new(
        config: LocateConfig,
        scanner: Arc<dyn RangeScanner>,
        prober: Arc<dyn Prober>,
        verifier: Arc<dyn Verifier>,
        registry: TargetRegistry,
    ) -> Self {
        Self {
            config,
            scanner,
            prober,
            verifier,
            registry,
            persist: true,
        }
    }

    /// Search and verify without touching the deploy document.
    pub fn dry_run(mut self) -> Self {
        self.persist = false;
        self
    }

    /// Run a full discovery over the ranges derived from the local
    /// interfaces plus the configured fallback range.
    pub async fn run(&self) -> Result<Option<Discovery>> {
        let ranges = interfaces::discover_ranges(self.config.fallback.cidr);
        self.run_with_ranges(ranges).await
    }

    /// Run a full discovery over an explicit set of ranges.
    pub async fn run_with_ranges(&self, ranges: Vec<Ipv4Net>) -> Result<Option<Discovery>> {
        let mut journal = RunJournal::new();
        tracing::info!(run_id = %journal.id(), ranges = ranges.len(), "Starting discovery run");

        let result = self.search(&ranges, &mut journal).await;

        let outcome = match &result {
            Ok(Some(discovery)) => RunOutcome::Located {
                address: discovery.address.clone(),
                origin: discovery.origin,
            },
            Ok(None) => RunOutcome::Exhausted,
            Err(e) => RunOutcome::Aborted {
                error: e.to_string(),
            },
        };
        self.store_journal(journal, outcome);

        result
    }

    async fn search(
        &self,
        ranges: &[Ipv4Net],
        journal: &mut RunJournal,
    ) -> Result<Option<Discovery>> {
        for &range in ranges {
            journal.begin_scope(&range.to_string());
            if let Some(discovery) = self.search_range(range, journal).await? {
                return Ok(Some(discovery));
            }
            tracing::info!(range = %range, "Range exhausted, moving on");
        }

        // Last resort: the fixed hostname, verified directly. mDNS names
        // do not reliably answer pings, so the probe step is skipped.
        let hostname = &self.config.fallback.hostname;
        tracing::info!(hostname = %hostname, "All ranges exhausted, trying hostname fallback");
        journal.begin_scope(hostname);
        self.try_candidate(Candidate::hostname(hostname), journal)
            .await
    }

    async fn search_range(
        &self,
        range: Ipv4Net,
        journal: &mut RunJournal,
    ) -> Result<Option<Discovery>> {
        // The fallback range is resolved by candidate generation alone;
        // scanning it would be wasted work.
        let scan_hit = if range == self.config.fallback.cidr {
            None
        } else {
            self.scanner.find_device(range).await
        };
        let candidates = candidates::generate(range, scan_hit, &self.config);

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => {
                let candidate = only.clone();
                let addr = match &candidate.addr {
                    HostAddr::Ip(ip) => *ip,
                    HostAddr::Name(_) => return Ok(None),
                };
                let start = Instant::now();
                let reachable = self.prober.is_reachable(addr).await;
                journal.record_probe(&ProbeResult {
                    candidate: candidate.clone(),
                    reachable,
                    elapsed_ms: Some(start.elapsed().as_millis() as u64),
                });
                if !reachable {
                    tracing::debug!(addr = %addr, "Candidate did not answer the probe");
                    return Ok(None);
                }
                self.try_candidate(candidate, journal).await
            }
            _ => {
                // At most one candidate per range gets accepted; the rest
                // of the batch is abandoned once someone answers.
                match probe::first_reachable(Arc::clone(&self.prober), candidates).await {
                    Some(result) => {
                        journal.record_probe(&result);
                        self.try_candidate(result.candidate, journal).await
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Verify one accepted candidate and, on success, persist its address.
    async fn try_candidate(
        &self,
        candidate: Candidate,
        journal: &mut RunJournal,
    ) -> Result<Option<Discovery>> {
        let verified = self.verifier.verify(&candidate.addr).await;
        journal.record_verification(&VerificationResult {
            candidate: candidate.clone(),
            verified,
        });

        if !verified {
            tracing::info!(addr = %candidate.addr, "Candidate failed verification");
            return Ok(None);
        }

        if self.persist {
            match self.registry.write_address(&candidate.addr)? {
                RewriteOutcome::Updated => {}
                RewriteOutcome::Unchanged => {
                    tracing::debug!(addr = %candidate.addr, "Deploy document already current");
                }
                RewriteOutcome::KeyMissing => {}
            }
        } else {
            tracing::info!(addr = %candidate.addr, "Dry run, deploy document left alone");
        }

        Ok(Some(Discovery {
            address: candidate.addr,
            origin: candidate.origin,
        }))
    }

    /// A journal that cannot be written should not fail a successful run.
    fn store_journal(&self, journal: RunJournal, outcome: RunOutcome) {
        let record = journal.finalize(outcome);
        match JournalStore::new(&self.config.journal_dir) {
            Ok(store) => {
                if let Err(e) = store.save(&record) {
                    tracing::warn!(run_id = %record.id, error = %e, "Could not store run journal");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not open journal store");
            }
        }
    }
}
