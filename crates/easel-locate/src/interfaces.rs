//! Local interface enumeration.
//!
//! Derives the /24 ranges worth searching from the host's own addresses.
//! The range that historically hosted the unit is always appended, so a
//! laptop sitting on an unrelated network can still find it.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;

/// Zero the host bits of `ip` down to its /24 boundary.
pub fn to_slash24(ip: Ipv4Addr) -> Ipv4Net {
    let octets = ip.octets();
    let base = Ipv4Addr::new(octets[0], octets[1], octets[2], 0);
    Ipv4Net::new(base, 24).expect("/24 is a valid prefix length")
}

/// Candidate /24 ranges from a set of interfaces, deduplicated in
/// first-seen order. Loopback, link-local and unspecified addresses never
/// contribute a range.
pub fn local_ranges(interfaces: &[NetworkInterface]) -> Vec<Ipv4Net> {
    let mut ranges = Vec::new();
    for interface in interfaces {
        if interface.is_loopback() {
            continue;
        }
        for net in &interface.ips {
            let IpNetwork::V4(v4) = *net else { continue };
            let ip = v4.ip();
            if ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() {
                continue;
            }
            let range = to_slash24(ip);
            if !ranges.contains(&range) {
                ranges.push(range);
            }
        }
    }
    ranges
}

/// Ranges to search, with the configured fallback range appended when the
/// local interfaces did not already produce it. Never empty.
pub fn candidate_ranges(interfaces: &[NetworkInterface], fallback: Ipv4Net) -> Vec<Ipv4Net> {
    let mut ranges = local_ranges(interfaces);
    if !ranges.contains(&fallback) {
        ranges.push(fallback);
    }
    ranges
}

/// Enumerate the host's interfaces and derive the search ranges.
pub fn discover_ranges(fallback: Ipv4Net) -> Vec<Ipv4Net> {
    candidate_ranges(&datalink::interfaces(), fallback)
}

#[cfg(test)]
mod tests {
    use pnet::ipnetwork::Ipv4Network;

    use super::*;

    const IFF_UP: u32 = 1;
    const IFF_LOOPBACK: u32 = 1 << 3;

    fn mock_interface(name: &str, ips: Vec<IpNetwork>, flags: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index: 0,
            mac: None,
            ips,
            flags,
        }
    }

    fn v4(addr: Ipv4Addr, prefix: u8) -> IpNetwork {
        IpNetwork::V4(Ipv4Network::new(addr, prefix).unwrap())
    }

    fn fallback() -> Ipv4Net {
        "30.30.10.0/24".parse().unwrap()
    }

    #[test]
    fn empty_interface_set_still_yields_fallback() {
        let ranges = candidate_ranges(&[], fallback());
        assert_eq!(ranges, vec![fallback()]);
    }

    #[test]
    fn loopback_interface_is_excluded() {
        let lo = mock_interface(
            "lo",
            vec![v4(Ipv4Addr::new(127, 0, 0, 1), 8)],
            IFF_UP | IFF_LOOPBACK,
        );
        let ranges = candidate_ranges(&[lo], fallback());
        assert_eq!(ranges, vec![fallback()]);
    }

    #[test]
    fn link_local_address_is_excluded() {
        let eth = mock_interface(
            "eth0",
            vec![v4(Ipv4Addr::new(169, 254, 12, 7), 16)],
            IFF_UP,
        );
        assert!(local_ranges(&[eth]).is_empty());
    }

    #[test]
    fn address_is_normalized_to_slash24() {
        let eth = mock_interface(
            "eth0",
            vec![v4(Ipv4Addr::new(192, 168, 1, 100), 24)],
            IFF_UP,
        );
        let ranges = local_ranges(&[eth]);
        assert_eq!(ranges, vec!["192.168.1.0/24".parse::<Ipv4Net>().unwrap()]);
    }

    #[test]
    fn ranges_are_deduplicated_in_first_seen_order() {
        let eth = mock_interface(
            "eth0",
            vec![
                v4(Ipv4Addr::new(192, 168, 1, 100), 24),
                v4(Ipv4Addr::new(192, 168, 1, 101), 24),
            ],
            IFF_UP,
        );
        let wlan = mock_interface(
            "wlan0",
            vec![v4(Ipv4Addr::new(10, 0, 0, 5), 24)],
            IFF_UP,
        );
        let ranges = local_ranges(&[eth, wlan]);
        assert_eq!(
            ranges,
            vec![
                "192.168.1.0/24".parse::<Ipv4Net>().unwrap(),
                "10.0.0.0/24".parse::<Ipv4Net>().unwrap(),
            ]
        );
    }

    #[test]
    fn fallback_is_not_duplicated() {
        let eth = mock_interface(
            "eth0",
            vec![v4(Ipv4Addr::new(30, 30, 10, 77), 24)],
            IFF_UP,
        );
        let ranges = candidate_ranges(&[eth], fallback());
        assert_eq!(ranges, vec![fallback()]);
    }
}
