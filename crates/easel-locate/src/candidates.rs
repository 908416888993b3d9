//! Candidate address generation.
//!
//! A range yields either one scan-result candidate, when the active scan
//! identified the unit, or a heuristic batch built from the host suffixes
//! the unit has historically taken. The last verified address leads the
//! batch when it falls inside the range.

use std::net::Ipv4Addr;

use easel_core::types::Candidate;
use ipnet::Ipv4Net;

use crate::config::LocateConfig;

/// Map a host suffix onto a /24 range.
fn with_suffix(range: Ipv4Net, suffix: u8) -> Ipv4Addr {
    let net = range.network().octets();
    Ipv4Addr::new(net[0], net[1], net[2], suffix)
}

/// Heuristic addresses for one range, deduplicated, the last verified
/// address first when it belongs to the range. Network and broadcast
/// suffixes never produce candidates.
pub fn heuristic_addrs(range: Ipv4Net, suffixes: &[u8], last_known: Ipv4Addr) -> Vec<Ipv4Addr> {
    let mut addrs = Vec::new();
    if range.contains(&last_known) {
        addrs.push(last_known);
    }
    for &suffix in suffixes {
        if suffix == 0 || suffix == 255 {
            continue;
        }
        let addr = with_suffix(range, suffix);
        if !addrs.contains(&addr) {
            addrs.push(addr);
        }
    }
    addrs
}

/// Candidates for one range.
///
/// The fallback range short-circuits to the last verified address; the
/// unit usually has not moved, and probing one address is much cheaper
/// than scanning 254. Otherwise `scan_hit` short-circuits heuristics: a
/// scan-identified address is the only candidate worth trying.
pub fn generate(
    range: Ipv4Net,
    scan_hit: Option<Ipv4Addr>,
    config: &LocateConfig,
) -> Vec<Candidate> {
    if range == config.fallback.cidr {
        return vec![Candidate::scan(config.fallback.last_known)];
    }
    if let Some(addr) = scan_hit {
        return vec![Candidate::scan(addr)];
    }
    heuristic_addrs(range, &config.heuristic_hosts, config.fallback.last_known)
        .into_iter()
        .map(Candidate::heuristic)
        .collect()
}
