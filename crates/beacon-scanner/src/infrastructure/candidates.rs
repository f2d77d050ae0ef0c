//! Where scanners get their broadcast addresses from.
//!
//! Every IPv4 network a host is attached to has a *directed broadcast
//! address*: the network address with all host bits set, e.g.
//! `192.168.1.255` for `192.168.1.0/24`.  A datagram sent there reaches every
//! host on that segment, which is exactly what discovery needs.
//!
//! [`InterfaceCandidates`] asks the OS for those addresses through the
//! `network-interface` crate.  [`StaticCandidates`] returns a fixed list; it
//! backs the `[candidates] broadcast_addresses` config override and tests
//! that run over loopback.

use std::net::Ipv4Addr;

use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use tracing::{debug, warn};

/// Supplies the broadcast addresses to probe, in probing order.
#[cfg_attr(test, mockall::automock)]
pub trait CandidateSource: Send + Sync {
    fn broadcast_addresses(&self) -> Vec<Ipv4Addr>;
}

/// Broadcast addresses of the host's IPv4 interfaces, in interface order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceCandidates;

impl CandidateSource for InterfaceCandidates {
    fn broadcast_addresses(&self) -> Vec<Ipv4Addr> {
        let interfaces = match NetworkInterface::show() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                warn!("could not enumerate network interfaces: {e}");
                return Vec::new();
            }
        };

        let found = dedup_in_order(interfaces.iter().flat_map(|iface| {
            iface.addr.iter().filter_map(|addr| match addr {
                Addr::V4(v4) => v4.broadcast,
                Addr::V6(_) => None,
            })
        }));
        debug!(candidates = ?found, "broadcast addresses from interfaces");
        found
    }
}

/// A fixed list of broadcast addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCandidates {
    addresses: Vec<Ipv4Addr>,
}

impl StaticCandidates {
    pub fn new(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            addresses: dedup_in_order(addresses),
        }
    }
}

impl CandidateSource for StaticCandidates {
    fn broadcast_addresses(&self) -> Vec<Ipv4Addr> {
        self.addresses.clone()
    }
}

/// Picks the configured list when one is given, the interfaces otherwise.
pub fn candidate_source(configured: &[Ipv4Addr]) -> Box<dyn CandidateSource> {
    if configured.is_empty() {
        Box::new(InterfaceCandidates)
    } else {
        Box::new(StaticCandidates::new(configured.iter().copied()))
    }
}

/// Drops repeated addresses, keeping the first occurrence.
fn dedup_in_order(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Vec<Ipv4Addr> {
    let mut out: Vec<Ipv4Addr> = Vec::new();
    for addr in addresses {
        if !out.contains(&addr) {
            out.push(addr);
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_candidates_keep_order_and_drop_duplicates() {
        // Arrange
        let a = Ipv4Addr::new(192, 168, 1, 255);
        let b = Ipv4Addr::new(10, 0, 0, 255);

        // Act
        let source = StaticCandidates::new([a, b, a]);

        // Assert
        assert_eq!(source.broadcast_addresses(), vec![a, b]);
    }

    #[test]
    fn test_interface_candidates_are_unique_ipv4_broadcasts() {
        // The host's interfaces are unknown; only the invariants are checked.
        let found = InterfaceCandidates.broadcast_addresses();

        for (i, addr) in found.iter().enumerate() {
            assert!(!found[i + 1..].contains(addr), "{addr} listed twice");
        }
    }

    #[test]
    fn test_candidate_source_prefers_configured_list() {
        let configured = [Ipv4Addr::LOCALHOST];
        let source = candidate_source(&configured);
        assert_eq!(source.broadcast_addresses(), vec![Ipv4Addr::LOCALHOST]);
    }

    #[test]
    fn test_mock_source_is_usable_as_trait_object() {
        let mut mock = MockCandidateSource::new();
        mock.expect_broadcast_addresses()
            .times(1)
            .return_const(vec![Ipv4Addr::BROADCAST]);

        let source: Box<dyn CandidateSource> = Box::new(mock);

        assert_eq!(source.broadcast_addresses(), vec![Ipv4Addr::BROADCAST]);
    }
}
