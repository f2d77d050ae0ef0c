//! The scan abstraction shared by every scanner.
//!
//! A [`ScanStrategy`] knows how to perform two operations:
//!
//! - `scan_once(group)` sends one request to one broadcast group and waits
//!   for one reply.  It never decodes and never fails: no reply is `None`.
//! - `scan_all_groups(preferred)` keeps calling `scan_once` over the local
//!   broadcast groups until a reply decodes, starting with `preferred` when
//!   the caller remembers a group that answered before.
//!
//! Two implementations exist in `infrastructure::network`: a blocking one
//! (bounded retries per group, each with a read timeout) and a cooperative
//! one (non-blocking polls separated by short sleeps).  The monitor only
//! sees this trait, so tests can drive it with a scripted double.

use std::net::SocketAddr;

use async_trait::async_trait;
use beacon_core::{BroadcastGroup, DecodeError, DecodedEndpoints, Decoder, DiscoveryResponse};
use thiserror::Error;
use tracing::warn;

/// Errors a scan can surface.
///
/// Transient network failures (timeouts, send errors) are absorbed by the
/// scanner and only logged; what remains is a reply that proves the peer
/// speaks a different protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    /// A reply violated the wire format in a way retrying cannot fix.
    #[error("protocol violation in reply from {sender}: {source}")]
    Protocol {
        sender: SocketAddr,
        #[source]
        source: DecodeError,
    },
}

/// A successfully decoded reply together with the group that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Broadcast group the winning request was sent to.
    pub group: BroadcastGroup,
    /// Unicast address the reply came from.
    pub sender: SocketAddr,
    pub endpoints: DecodedEndpoints,
}

/// One way of searching for a responder.
#[async_trait]
pub trait ScanStrategy: Send {
    /// Sends one request to `group` and returns the first reply, if any.
    async fn scan_once(&mut self, group: BroadcastGroup) -> Option<DiscoveryResponse>;

    /// Searches the local broadcast groups, `preferred` first.
    ///
    /// Returns `Ok(None)` when every candidate was tried without a usable
    /// reply.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Protocol`] when a reply fails to decode fatally.
    async fn scan_all_groups(
        &mut self,
        preferred: Option<BroadcastGroup>,
    ) -> Result<Option<Discovery>, ScanError>;
}

#[async_trait]
impl<S: ScanStrategy + ?Sized> ScanStrategy for Box<S> {
    async fn scan_once(&mut self, group: BroadcastGroup) -> Option<DiscoveryResponse> {
        (**self).scan_once(group).await
    }

    async fn scan_all_groups(
        &mut self,
        preferred: Option<BroadcastGroup>,
    ) -> Result<Option<Discovery>, ScanError> {
        (**self).scan_all_groups(preferred).await
    }
}

/// Decodes `response` and classifies the outcome for a scan loop.
///
/// - `Ok(Some(_))`: usable reply, stop searching.
/// - `Ok(None)`: recoverable decode failure, count it as a failed try.
/// - `Err(_)`: fatal protocol violation, abort the scan.
///
/// # Errors
///
/// Returns [`ScanError::Protocol`] for fatal decode errors.
pub fn interpret_response(
    decoder: &Decoder,
    group: BroadcastGroup,
    response: &DiscoveryResponse,
) -> Result<Option<Discovery>, ScanError> {
    match decoder.decode(response.sender, &response.payload) {
        Ok(endpoints) => Ok(Some(Discovery {
            group,
            sender: response.sender,
            endpoints,
        })),
        Err(source) if source.is_fatal() => Err(ScanError::Protocol {
            sender: response.sender,
            source,
        }),
        Err(e) => {
            warn!(sender = %response.sender, %group, "unusable reply: {e}");
            Ok(None)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
