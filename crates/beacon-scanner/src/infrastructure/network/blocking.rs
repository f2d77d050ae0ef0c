//! Blocking scanner: send, then wait up to a timeout for the reply.
//!
//! For every broadcast group the scanner makes up to `retries` attempts.  An
//! attempt is:
//!
//! 1. Bind a fresh UDP socket on `0.0.0.0:0` with `SO_BROADCAST` enabled,
//!    multicast TTL 1 and the configured read timeout.
//! 2. Send the request to the group.
//! 3. Block in `recv_from` until a reply arrives or the timeout fires.
//! 4. Drop the socket.
//!
//! With `N` silent candidates the scanner therefore sends exactly
//! `N × retries` requests and gives up after roughly
//! `N × retries × timeout`.  Steps 1-4 run inside `spawn_blocking` so the
//! Tokio worker threads never wait on the socket.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{
    protocol::messages::MAX_REPLY_SIZE, BroadcastGroup, CandidatePool, Decoder,
    DiscoveryRequest, DiscoveryResponse,
};
use tracing::{debug, info, warn};

use super::{is_timeout_error, SCAN_MULTICAST_TTL};
use crate::application::scan::{interpret_response, Discovery, ScanError, ScanStrategy};
use crate::infrastructure::candidates::CandidateSource;
use crate::infrastructure::storage::config::ScannerConfig;

/// Tunables for a [`BlockingScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingSettings {
    /// Discovery port the groups are built with.
    pub port: u16,
    /// Attempts per group.
    pub retries: u32,
    /// How long one attempt waits for a reply.
    pub timeout: Duration,
}

impl Default for BlockingSettings {
    fn default() -> Self {
        Self {
            port: beacon_core::protocol::messages::DEFAULT_DISCOVERY_PORT,
            retries: 2,
            timeout: Duration::from_secs(3),
        }
    }
}

impl From<&ScannerConfig> for BlockingSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            port: config.discovery.port,
            retries: config.blocking.retries,
            timeout: Duration::from_millis(config.blocking.timeout_ms),
        }
    }
}

/// Scanner that blocks on each attempt until reply or timeout.
pub struct BlockingScanner {
    decoder: Decoder,
    request: DiscoveryRequest,
    settings: BlockingSettings,
    candidates: Box<dyn CandidateSource>,
    last_response: Option<DiscoveryResponse>,
}

impl BlockingScanner {
    pub fn new(
        decoder: Decoder,
        settings: BlockingSettings,
        candidates: Box<dyn CandidateSource>,
    ) -> Self {
        Self {
            request: decoder.request(),
            decoder,
            settings,
            candidates,
            last_response: None,
        }
    }

    /// The most recent reply received, decodable or not.
    pub fn last_response(&self) -> Option<&DiscoveryResponse> {
        self.last_response.as_ref()
    }

    /// Makes up to `retries` attempts against `group`.
    async fn try_group(&mut self, group: BroadcastGroup) -> Result<Option<Discovery>, ScanError> {
        for attempt in 1..=self.settings.retries {
            debug!(%group, attempt, "sending discovery request");
            let Some(response) = self.scan_once(group).await else {
                continue;
            };
            self.last_response = Some(response.clone());
            if let Some(discovery) = interpret_response(&self.decoder, group, &response)? {
                return Ok(Some(discovery));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ScanStrategy for BlockingScanner {
    async fn scan_once(&mut self, group: BroadcastGroup) -> Option<DiscoveryResponse> {
        let payload = self.request.as_bytes().to_vec();
        let timeout = self.settings.timeout;

        let outcome =
            tokio::task::spawn_blocking(move || exchange(&payload, group, timeout)).await;

        match outcome {
            Ok(Ok(Some(response))) => {
                info!(%group, sender = %response.sender, len = response.payload.len(), "received reply");
                Some(response)
            }
            Ok(Ok(None)) => {
                debug!(%group, "timed out, no reply");
                None
            }
            Ok(Err(e)) => {
                warn!(%group, "discovery attempt failed: {e}");
                None
            }
            Err(e) => {
                warn!(%group, "discovery attempt task failed: {e}");
                None
            }
        }
    }

    async fn scan_all_groups(
        &mut self,
        preferred: Option<BroadcastGroup>,
    ) -> Result<Option<Discovery>, ScanError> {
        let mut pool = CandidatePool::new(self.candidates.broadcast_addresses(), self.settings.port);
        debug!(candidates = pool.len(), ?preferred, "starting blocking scan");

        if let Some(group) = preferred {
            pool = pool.without(group.ip);
            if let Some(discovery) = self.try_group(group).await? {
                return Ok(Some(discovery));
            }
        }

        while let Some(group) = pool.next_group() {
            if let Some(discovery) = self.try_group(group).await? {
                return Ok(Some(discovery));
            }
        }

        info!("every broadcast group tried without a usable reply");
        Ok(None)
    }
}

/// One send / receive exchange on a socket that lives only for this call.
///
/// Returns `Ok(None)` on timeout.
fn exchange(
    payload: &[u8],
    group: BroadcastGroup,
    timeout: Duration,
) -> std::io::Result<Option<DiscoveryResponse>> {
    let socket = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))?;
    socket.set_broadcast(true)?;
    socket.set_multicast_ttl_v4(SCAN_MULTICAST_TTL)?;
    socket.set_read_timeout(Some(timeout))?;

    socket.send_to(payload, group.socket_addr())?;

    let mut buf = [0u8; MAX_REPLY_SIZE];
    match socket.recv_from(&mut buf) {
        Ok((len, sender)) => Ok(Some(DiscoveryResponse {
            sender,
            payload: buf[..len].to_vec(),
        })),
        Err(e) if is_timeout_error(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::candidates::MockCandidateSource;

    fn settings(port: u16) -> BlockingSettings {
        BlockingSettings {
            port,
            retries: 2,
            timeout: Duration::from_millis(100),
        }
    }

    /// A loopback socket that answers every datagram with `reply`.
    fn echo_responder(reply: &'static [u8], answers: usize) -> (u16, std::thread::JoinHandle<()>) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 64];
            for _ in 0..answers {
                let (_, src) = socket.recv_from(&mut buf).unwrap();
                socket.send_to(reply, src).unwrap();
            }
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_empty_candidate_list_returns_none_without_sending() {
        // Arrange
        let mut source = MockCandidateSource::new();
        source
            .expect_broadcast_addresses()
            .times(1)
            .return_const(Vec::<Ipv4Addr>::new());
        let mut scanner =
            BlockingScanner::new(Decoder::proxy_robots(), settings(9), Box::new(source));

        // Act
        let result = scanner.scan_all_groups(None).await;

        // Assert
        assert_eq!(result, Ok(None));
        assert!(scanner.last_response().is_none());
    }

    #[tokio::test]
    async fn test_scan_once_returns_reply_and_sender() {
        // Arrange
        let (port, handle) = echo_responder(b"9012", 1);
        let mut scanner = BlockingScanner::new(
            Decoder::proxy_robots(),
            settings(port),
            Box::new(MockCandidateSource::new()),
        );

        // Act
        let response = scanner
            .scan_once(BroadcastGroup::new(Ipv4Addr::LOCALHOST, port))
            .await;

        // Assert
        let response = response.expect("reply");
        assert_eq!(response.payload, b"9012");
        assert_eq!(response.sender, SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_scan_once_times_out_when_nobody_answers() {
        // Arrange: a bound socket that never replies
        let sink = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = sink.local_addr().unwrap().port();
        let mut scanner = BlockingScanner::new(
            Decoder::proxy_robots(),
            settings(port),
            Box::new(MockCandidateSource::new()),
        );

        // Act
        let response = scanner
            .scan_once(BroadcastGroup::new(Ipv4Addr::LOCALHOST, port))
            .await;

        // Assert
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_goodbye_replies_use_up_retries_then_return_none() {
        // Arrange
        let (port, handle) = echo_responder(b"Goodbye", 2);
        let mut source = MockCandidateSource::new();
        source
            .expect_broadcast_addresses()
            .return_const(vec![Ipv4Addr::LOCALHOST]);
        let mut scanner =
            BlockingScanner::new(Decoder::proxy_robots(), settings(port), Box::new(source));

        // Act
        let result = scanner.scan_all_groups(None).await;

        // Assert
        assert_eq!(result, Ok(None));
        assert_eq!(scanner.last_response().unwrap().payload, b"Goodbye");
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_fatal_reply_aborts_scan_with_protocol_error() {
        // Arrange: a ServerGame scanner hears a bare port number
        let (port, handle) = echo_responder(b"9012", 1);
        let mut source = MockCandidateSource::new();
        source
            .expect_broadcast_addresses()
            .return_const(vec![Ipv4Addr::LOCALHOST]);
        let mut scanner =
            BlockingScanner::new(Decoder::server_game(2), settings(port), Box::new(source));

        // Act
        let result = scanner.scan_all_groups(None).await;

        // Assert
        assert!(matches!(result, Err(ScanError::Protocol { .. })));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_preferred_group_is_tried_before_the_pool() {
        // Arrange: the pool lists an unused address; only the preferred answers
        let (port, handle) = echo_responder(b"9012", 1);
        let mut source = MockCandidateSource::new();
        source
            .expect_broadcast_addresses()
            .return_const(vec![Ipv4Addr::new(127, 0, 0, 9), Ipv4Addr::LOCALHOST]);
        let mut scanner =
            BlockingScanner::new(Decoder::proxy_robots(), settings(port), Box::new(source));
        let preferred = BroadcastGroup::new(Ipv4Addr::LOCALHOST, port);

        // Act
        let discovery = scanner.scan_all_groups(Some(preferred)).await.unwrap();

        // Assert
        assert_eq!(discovery.expect("found").group, preferred);
        handle.join().unwrap();
    }
}
