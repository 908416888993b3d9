//! Domain types for target discovery.
//!
//! A discovery run turns local network ranges into [`Candidate`] addresses,
//! probes and verifies them in priority order, and ends with at most one
//! verified target.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EaselError;

/// An address the display unit might live at: dotted-quad or mDNS hostname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum HostAddr {
    Ip(Ipv4Addr),
    Name(String),
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostAddr::Ip(ip) => write!(f, "{ip}"),
            HostAddr::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for HostAddr {
    type Err = EaselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EaselError::Address("empty address".to_string()));
        }
        match s.parse::<Ipv4Addr>() {
            Ok(ip) => Ok(Self::Ip(ip)),
            Err(_) => Ok(Self::Name(s.to_string())),
        }
    }
}

impl From<Ipv4Addr> for HostAddr {
    fn from(ip: Ipv4Addr) -> Self {
        Self::Ip(ip)
    }
}

/// How a candidate address was derived; doubles as its priority class
/// (scan results are tried before heuristics, the hostname comes last).
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateOrigin {
    /// Reported by the active network scan (highest confidence).
    ScanResult,
    /// A well-known host suffix applied to a local range.
    Heuristic,
    /// The fixed mDNS hostname tried after all ranges are exhausted.
    HostnameFallback,
}

impl fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CandidateOrigin::ScanResult => "scan-result",
            CandidateOrigin::Heuristic => "heuristic",
            CandidateOrigin::HostnameFallback => "hostname-fallback",
        })
    }
}

/// A single address considered a possible location of the target device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub addr: HostAddr,
    pub origin: CandidateOrigin,
}

impl Candidate {
    pub fn scan(ip: Ipv4Addr) -> Self {
        Self {
            addr: HostAddr::Ip(ip),
            origin: CandidateOrigin::ScanResult,
        }
    }

    pub fn heuristic(ip: Ipv4Addr) -> Self {
        Self {
            addr: HostAddr::Ip(ip),
            origin: CandidateOrigin::Heuristic,
        }
    }

    pub fn hostname(name: impl Into<String>) -> Self {
        Self {
            addr: HostAddr::Name(name.into()),
            origin: CandidateOrigin::HostnameFallback,
        }
    }
}

/// Outcome of one reachability probe. Produced and consumed within a single
/// discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub reachable: bool,
    pub elapsed_ms: Option<u64>,
}

/// Outcome of one authenticated verification attempt. A candidate is only
/// "the target" when `verified` is true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationResult {
    pub candidate: Candidate,
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_serializes_as_kebab_case() {
        let json = serde_json::to_string(&CandidateOrigin::ScanResult).unwrap();
        assert_eq!(json, "\"scan-result\"");

        let json = serde_json::to_string(&CandidateOrigin::HostnameFallback).unwrap();
        assert_eq!(json, "\"hostname-fallback\"");
    }

    #[test]
    fn origin_orders_by_priority() {
        assert!(CandidateOrigin::ScanResult < CandidateOrigin::Heuristic);
        assert!(CandidateOrigin::Heuristic < CandidateOrigin::HostnameFallback);
    }

    #[test]
    fn host_addr_parses_dotted_quad() {
        let addr: HostAddr = "30.30.10.64".parse().unwrap();
        assert_eq!(addr, HostAddr::Ip(Ipv4Addr::new(30, 30, 10, 64)));
    }

    #[test]
    fn host_addr_falls_back_to_name() {
        let addr: HostAddr = "raspberrypi.local".parse().unwrap();
        assert_eq!(addr, HostAddr::Name("raspberrypi.local".to_string()));
    }

    #[test]
    fn host_addr_rejects_empty() {
        assert!("   ".parse::<HostAddr>().is_err());
    }

    #[test]
    fn host_addr_roundtrips_through_json() {
        let ip = HostAddr::Ip(Ipv4Addr::new(192, 168, 1, 64));
        let name = HostAddr::Name("raspberrypi.local".to_string());

        let back: HostAddr = serde_json::from_str(&serde_json::to_string(&ip).unwrap()).unwrap();
        assert_eq!(back, ip);

        let back: HostAddr = serde_json::from_str(&serde_json::to_string(&name).unwrap()).unwrap();
        assert_eq!(back, name);
    }
}
