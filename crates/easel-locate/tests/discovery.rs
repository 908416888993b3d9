//! End-to-end discovery scenarios with stubbed network effects.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tempfile::TempDir;

use easel_core::types::{CandidateOrigin, HostAddr};
use easel_locate::config::LocateConfig;
use easel_locate::orchestrator::Orchestrator;
use easel_locate::probe::Prober;
use easel_locate::registry::TargetRegistry;
use easel_locate::scanner::RangeScanner;
use easel_locate::verify::Verifier;

struct StubScanner {
    hits: HashMap<Ipv4Net, Ipv4Addr>,
}

#[async_trait]
impl RangeScanner for StubScanner {
    async fn find_device(&self, range: Ipv4Net) -> Option<Ipv4Addr> {
        self.hits.get(&range).copied()
    }
}

struct StubProber {
    alive: HashSet<Ipv4Addr>,
}

#[async_trait]
impl Prober for StubProber {
    async fn is_reachable(&self, addr: Ipv4Addr) -> bool {
        self.alive.contains(&addr)
    }
}

struct StubVerifier {
    accepts: HashSet<String>,
}

#[async_trait]
impl Verifier for StubVerifier {
    async fn verify(&self, addr: &HostAddr) -> bool {
        self.accepts.contains(&addr.to_string())
    }
}

const DEPLOY_DOC: &str = "\
# easel deploy target
name = \"living-room\"
address = \"30.30.10.64\"
port = 22
";

struct Harness {
    dir: TempDir,
    config: LocateConfig,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let deploy_path = dir.path().join("deploy.toml");
        std::fs::write(&deploy_path, DEPLOY_DOC).unwrap();

        let mut config = LocateConfig::default();
        config.ssh.password = "2308".to_string();
        config.journal_dir = dir.path().join("journal").to_string_lossy().into_owned();
        config.deploy.config_path = deploy_path.to_string_lossy().into_owned();
        Self { dir, config }
    }

    fn orchestrator(
        &self,
        hits: &[(&str, &str)],
        alive: &[&str],
        accepts: &[&str],
    ) -> Orchestrator {
        let scanner = StubScanner {
            hits: hits
                .iter()
                .map(|(range, addr)| (range.parse().unwrap(), addr.parse().unwrap()))
                .collect(),
        };
        let prober = StubProber {
            alive: alive.iter().map(|a| a.parse().unwrap()).collect(),
        };
        let verifier = StubVerifier {
            accepts: accepts.iter().map(|a| a.to_string()).collect(),
        };
        let registry = TargetRegistry::new(
            &self.config.deploy.config_path,
            &self.config.deploy.address_key,
        );
        Orchestrator::new(
            self.config.clone(),
            Arc::new(scanner),
            Arc::new(prober),
            Arc::new(verifier),
            registry,
        )
    }

    fn deploy_doc(&self) -> String {
        std::fs::read_to_string(&self.config.deploy.config_path).unwrap()
    }

    fn journal_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .flatten()
                .map(|e| {
                    let path = e.path();
                    if path.is_dir() {
                        count(&path)
                    } else {
                        usize::from(path.extension().is_some_and(|x| x == "json"))
                    }
                })
                .sum()
        }
        count(&self.dir.path().join("journal"))
    }
}

fn ranges(specs: &[&str]) -> Vec<Ipv4Net> {
    specs.iter().map(|s| s.parse().unwrap()).collect()
}

#[tokio::test]
async fn last_known_address_is_the_fast_path_on_the_fallback_range() {
    let harness = Harness::new();
    // No scanner hits configured: the fallback range must resolve without
    // ever consulting the scanner.
    let orchestrator = harness.orchestrator(&[], &["30.30.10.64"], &["30.30.10.64"]);

    let discovery = orchestrator
        .run_with_ranges(ranges(&["30.30.10.0/24"]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(discovery.address.to_string(), "30.30.10.64");
    assert_eq!(discovery.origin, CandidateOrigin::ScanResult);
    assert_eq!(harness.deploy_doc(), DEPLOY_DOC);
}

#[tokio::test]
async fn scan_hit_is_verified_and_persisted() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(
        &[("192.168.1.0/24", "192.168.1.77")],
        &["192.168.1.77"],
        &["192.168.1.77"],
    );

    let discovery = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24"]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(discovery.address.to_string(), "192.168.1.77");
    assert_eq!(discovery.origin, CandidateOrigin::ScanResult);
    assert_eq!(
        harness.deploy_doc(),
        DEPLOY_DOC.replace("30.30.10.64", "192.168.1.77")
    );
    assert_eq!(harness.journal_count(), 1);
}

#[tokio::test]
async fn heuristic_batch_locates_the_unit_when_the_scan_is_empty() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(&[], &["192.168.1.100"], &["192.168.1.100"]);

    let discovery = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24"]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(discovery.address.to_string(), "192.168.1.100");
    assert_eq!(discovery.origin, CandidateOrigin::Heuristic);
    assert!(harness.deploy_doc().contains("address = \"192.168.1.100\""));
}

#[tokio::test]
async fn failed_verification_backtracks_to_the_next_range() {
    let harness = Harness::new();
    // 192.168.1.100 answers pings but is some other machine; the unit
    // actually lives in the second range.
    let orchestrator = harness.orchestrator(
        &[],
        &["192.168.1.100", "10.0.0.64"],
        &["10.0.0.64"],
    );

    let discovery = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24", "10.0.0.0/24"]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(discovery.address.to_string(), "10.0.0.64");
    assert_eq!(discovery.origin, CandidateOrigin::Heuristic);
}

#[tokio::test]
async fn hostname_fallback_is_the_last_resort() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(&[], &[], &["raspberrypi.local"]);

    let discovery = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24"]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(discovery.address.to_string(), "raspberrypi.local");
    assert_eq!(discovery.origin, CandidateOrigin::HostnameFallback);
    assert!(harness
        .deploy_doc()
        .contains("address = \"raspberrypi.local\""));
}

#[tokio::test]
async fn exhausted_run_changes_nothing_but_still_journals() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(&[], &[], &[]);

    let result = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24", "10.0.0.0/24"]))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(harness.deploy_doc(), DEPLOY_DOC);
    assert_eq!(harness.journal_count(), 1);
}

#[tokio::test]
async fn dry_run_never_touches_the_deploy_document() {
    let harness = Harness::new();
    let orchestrator = harness
        .orchestrator(
            &[("192.168.1.0/24", "192.168.1.77")],
            &["192.168.1.77"],
            &["192.168.1.77"],
        )
        .dry_run();

    let discovery = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24"]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(discovery.address.to_string(), "192.168.1.77");
    assert_eq!(harness.deploy_doc(), DEPLOY_DOC);
}

#[tokio::test]
async fn unreachable_scan_hit_does_not_reach_verification() {
    let harness = Harness::new();
    // The scan reports a stale ARP entry; nothing answers there and the
    // heuristics were bypassed, so the range yields nothing.
    let orchestrator = harness.orchestrator(
        &[("192.168.1.0/24", "192.168.1.77")],
        &[],
        &["192.168.1.77"],
    );

    let result = orchestrator
        .run_with_ranges(ranges(&["192.168.1.0/24"]))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(harness.deploy_doc(), DEPLOY_DOC);
}
