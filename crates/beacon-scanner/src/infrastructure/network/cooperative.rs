//! Cooperative scanner: non-blocking socket, short polls, async sleeps.
//!
//! An attempt sends the request on a fresh Tokio UDP socket and then polls
//! it with `try_recv_from` up to `max_polls` times, sleeping `poll_delay`
//! between polls while nothing has arrived.  The task only yields at the
//! send, the polls and the sleeps, so many scanners can share a runtime.
//!
//! Candidates come from a [`CandidateRotation`] that wraps around instead of
//! running out.  Its cursor survives between scans, so a new search resumes
//! with the group after the last one tried.  `max_rounds` bounds a search to
//! that many full rotations; `None` keeps cycling until something answers.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{
    protocol::messages::MAX_REPLY_SIZE, BroadcastGroup, CandidateRotation, Decoder,
    DiscoveryRequest, DiscoveryResponse,
};
use tokio::{net::UdpSocket, time};
use tracing::{debug, info, warn};

use super::{is_timeout_error, SCAN_MULTICAST_TTL};
use crate::application::scan::{interpret_response, Discovery, ScanError, ScanStrategy};
use crate::infrastructure::candidates::CandidateSource;
use crate::infrastructure::storage::config::ScannerConfig;

/// Tunables for a [`CooperativeScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooperativeSettings {
    pub port: u16,
    /// `try_recv_from` calls per attempt.
    pub max_polls: u32,
    /// Sleep between two polls.
    pub poll_delay: Duration,
    /// Full rotations per search; `None` = until found.
    pub max_rounds: Option<u32>,
}

impl Default for CooperativeSettings {
    fn default() -> Self {
        Self {
            port: beacon_core::protocol::messages::DEFAULT_DISCOVERY_PORT,
            max_polls: 10,
            poll_delay: Duration::from_millis(200),
            max_rounds: Some(3),
        }
    }
}

impl From<&ScannerConfig> for CooperativeSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            port: config.discovery.port,
            max_polls: config.cooperative.max_polls,
            poll_delay: Duration::from_millis(config.cooperative.poll_delay_ms),
            max_rounds: config.cooperative.max_rounds,
        }
    }
}

/// Scanner that polls a non-blocking socket between async sleeps.
pub struct CooperativeScanner {
    decoder: Decoder,
    request: DiscoveryRequest,
    settings: CooperativeSettings,
    candidates: Box<dyn CandidateSource>,
    rotation: CandidateRotation,
}

impl CooperativeScanner {
    pub fn new(
        decoder: Decoder,
        settings: CooperativeSettings,
        candidates: Box<dyn CandidateSource>,
    ) -> Self {
        let rotation = CandidateRotation::new(candidates.broadcast_addresses(), settings.port);
        Self {
            request: decoder.request(),
            decoder,
            settings,
            candidates,
            rotation,
        }
    }

    async fn try_group(&mut self, group: BroadcastGroup) -> Result<Option<Discovery>, ScanError> {
        match self.scan_once(group).await {
            Some(response) => interpret_response(&self.decoder, group, &response),
            None => Ok(None),
        }
    }

    async fn exchange(&self, group: BroadcastGroup) -> std::io::Result<Option<DiscoveryResponse>> {
        let socket =
            UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.set_broadcast(true)?;
        socket.set_multicast_ttl_v4(SCAN_MULTICAST_TTL)?;

        socket
            .send_to(self.request.as_bytes(), group.socket_addr())
            .await?;

        let mut buf = [0u8; MAX_REPLY_SIZE];
        for poll in 1..=self.settings.max_polls {
            match socket.try_recv_from(&mut buf) {
                Ok((len, sender)) => {
                    return Ok(Some(DiscoveryResponse {
                        sender,
                        payload: buf[..len].to_vec(),
                    }))
                }
                Err(e) if is_timeout_error(&e) => {
                    if poll < self.settings.max_polls {
                        time::sleep(self.settings.poll_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ScanStrategy for CooperativeScanner {
    async fn scan_once(&mut self, group: BroadcastGroup) -> Option<DiscoveryResponse> {
        match self.exchange(group).await {
            Ok(Some(response)) => {
                info!(%group, sender = %response.sender, len = response.payload.len(), "received reply");
                Some(response)
            }
            Ok(None) => {
                info!(%group, "failed to contact group");
                None
            }
            Err(e) => {
                warn!(%group, "discovery attempt failed: {e}");
                None
            }
        }
    }

    async fn scan_all_groups(
        &mut self,
        preferred: Option<BroadcastGroup>,
    ) -> Result<Option<Discovery>, ScanError> {
        self.rotation.refresh(self.candidates.broadcast_addresses());
        if self.rotation.is_empty() && preferred.is_none() {
            warn!("no broadcast candidates to scan");
            return Ok(None);
        }

        if let Some(group) = preferred {
            if let Some(discovery) = self.try_group(group).await? {
                return Ok(Some(discovery));
            }
        }

        let per_round = self.rotation.len();
        let mut round: u32 = 0;
        while per_round > 0 && self.settings.max_rounds.map_or(true, |max| round < max) {
            debug!(round, candidates = per_round, "starting rotation");
            for _ in 0..per_round {
                let Some(group) = self.rotation.next_group() else {
                    break;
                };
                // Already tried just above.
                if round == 0 && preferred == Some(group) {
                    continue;
                }
                if let Some(discovery) = self.try_group(group).await? {
                    return Ok(Some(discovery));
                }
            }
            round += 1;
        }

        info!(rounds = round, "no usable reply from any broadcast group");
        Ok(None)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
