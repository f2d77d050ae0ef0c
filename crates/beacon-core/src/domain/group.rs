//! Broadcast groups and the two ways of walking a candidate list.

use std::collections::VecDeque;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Destination of one scan attempt: a broadcast IP plus the discovery port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BroadcastGroup {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl BroadcastGroup {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// The group as a `sendto` destination.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for BroadcastGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl From<BroadcastGroup> for SocketAddr {
    fn from(group: BroadcastGroup) -> Self {
        group.socket_addr()
    }
}

// ── CandidatePool ─────────────────────────────────────────────────────────────

/// Broadcast IPs handed out once each, in order.
///
/// Every group returned by [`CandidatePool::next_group`] is removed; once the
/// pool is empty the search is over.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    addresses: VecDeque<Ipv4Addr>,
    port: u16,
}

impl CandidatePool {
    pub fn new(addresses: impl IntoIterator<Item = Ipv4Addr>, port: u16) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
            port,
        }
    }

    /// Removes `ip` from the pool so it is not tried twice.
    pub fn without(mut self, ip: Ipv4Addr) -> Self {
        self.addresses.retain(|candidate| *candidate != ip);
        self
    }

    /// Pops the next group, or `None` once the pool is exhausted.
    pub fn next_group(&mut self) -> Option<BroadcastGroup> {
        self.addresses
            .pop_front()
            .map(|ip| BroadcastGroup::new(ip, self.port))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

// ── CandidateRotation ─────────────────────────────────────────────────────────

/// Broadcast IPs cycled indefinitely.
///
/// The cursor survives [`CandidateRotation::refresh`], so a rotation that is
/// re-fed the same addresses picks up where it left off.
#[derive(Debug, Clone, Default)]
pub struct CandidateRotation {
    addresses: Vec<Ipv4Addr>,
    cursor: usize,
    port: u16,
}

impl CandidateRotation {
    pub fn new(addresses: Vec<Ipv4Addr>, port: u16) -> Self {
        Self {
            addresses,
            cursor: 0,
            port,
        }
    }

    /// Replaces the address list, keeping the cursor position in range.
    pub fn refresh(&mut self, addresses: Vec<Ipv4Addr>) {
        self.addresses = addresses;
        if self.addresses.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor %= self.addresses.len();
        }
    }

    /// Returns the next group, wrapping around at the end.
    ///
    /// Returns `None` only when there are no addresses at all.
    pub fn next_group(&mut self) -> Option<BroadcastGroup> {
        let ip = *self.addresses.get(self.cursor)?;
        self.cursor = (self.cursor + 1) % self.addresses.len();
        Some(BroadcastGroup::new(ip, self.port))
    }

    /// Number of distinct groups in one full rotation.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
