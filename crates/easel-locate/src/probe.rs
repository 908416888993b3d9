//! Reachability probing.
//!
//! One ICMP echo per candidate via the system ping binary. Heuristic
//! batches are probed concurrently and the range settles on the first
//! reachable candidate; the remaining probes are aborted and drained so
//! nothing outlives the decision.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use easel_core::types::{Candidate, HostAddr, ProbeResult};
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::config::LocateConfig;

/// Something that can answer "is this address alive right now".
#[async_trait]
pub trait Prober: Send + Sync {
    async fn is_reachable(&self, addr: Ipv4Addr) -> bool;
}

/// `Prober` backed by the system ping binary.
pub struct PingProbe {
    ping_path: String,
    probe_timeout: Duration,
}

impl PingProbe {
    pub fn new(config: &LocateConfig) -> Self {
        Self {
            ping_path: config.ping_path.clone(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

/// Did the ping summary report exactly one echo reply?
fn one_packet_received(summary: &str) -> bool {
    summary
        .lines()
        .any(|line| line.contains("1 received") || line.contains("1 packets received"))
}

#[async_trait]
impl Prober for PingProbe {
    async fn is_reachable(&self, addr: Ipv4Addr) -> bool {
        let child = Command::new(&self.ping_path)
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.probe_timeout.as_secs().max(1).to_string())
            .arg(addr.to_string())
            .output();

        // The binary enforces its own deadline; the outer timeout only
        // guards against a wedged process.
        let output = match tokio::time::timeout(self.probe_timeout + Duration::from_secs(2), child)
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!(addr = %addr, error = %e, "Ping could not run");
                return false;
            }
            Err(_) => {
                tracing::debug!(addr = %addr, "Ping timed out");
                return false;
            }
        };

        output.status.success() && one_packet_received(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Probe a batch concurrently and settle on the first reachable candidate.
///
/// Returns `None` when nothing answered. Name candidates carry no probe
/// semantics and are skipped. In-flight probes are aborted and drained
/// before returning, so a range settles exactly once.
pub async fn first_reachable(
    prober: Arc<dyn Prober>,
    candidates: Vec<Candidate>,
) -> Option<ProbeResult> {
    let mut tasks = JoinSet::new();
    for candidate in candidates {
        let addr = match &candidate.addr {
            HostAddr::Ip(ip) => *ip,
            HostAddr::Name(_) => continue,
        };
        let prober = Arc::clone(&prober);
        tasks.spawn(async move {
            let start = Instant::now();
            let reachable = prober.is_reachable(addr).await;
            ProbeResult {
                candidate,
                reachable,
                elapsed_ms: Some(start.elapsed().as_millis() as u64),
            }
        });
    }

    let mut winner = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) if result.reachable => {
                winner = Some(result);
                break;
            }
            Ok(_) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                tracing::warn!(error = %e, "Probe task failed");
            }
        }
    }

    tasks.abort_all();
    while tasks.join_next().await.is_some() {}

    winner
}
