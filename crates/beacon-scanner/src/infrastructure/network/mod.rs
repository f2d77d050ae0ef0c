//! UDP scanners.
//!
//! # Sub-modules
//!
//! - **`blocking`** – [`BlockingScanner`]: classic send / wait-with-timeout.
//!   Each group gets `retries` attempts, each attempt blocks for up to the
//!   read timeout.  The blocking calls run on Tokio's blocking thread pool.
//!
//! - **`cooperative`** – [`CooperativeScanner`]: non-blocking socket, a few
//!   `try_recv_from` polls separated by short async sleeps, and a candidate
//!   rotation that cycles instead of running out.
//!
//! # Why a fresh socket per attempt? (for beginners)
//!
//! A UDP socket keeps a receive queue.  If a late reply to attempt *N*
//! arrives after attempt *N* timed out, a reused socket would hand that
//! stale datagram to attempt *N + 1* as if it were a fresh answer from the
//! new group.  Binding a new socket for every attempt (and dropping it when
//! the attempt ends, whatever the outcome) makes every attempt start empty.

pub mod blocking;
pub mod cooperative;

pub use blocking::{BlockingScanner, BlockingSettings};
pub use cooperative::{CooperativeScanner, CooperativeSettings};

use beacon_core::Decoder;

use crate::application::scan::ScanStrategy;
use crate::infrastructure::candidates::CandidateSource;
use crate::infrastructure::storage::config::{ScannerConfig, StrategyKind};

/// Multicast TTL applied to every scan socket; keeps requests on the local
/// segment.
pub(crate) const SCAN_MULTICAST_TTL: u32 = 1;

/// Builds the scanner selected by `strategy` from `config`.
pub fn build_strategy(
    config: &ScannerConfig,
    strategy: StrategyKind,
    candidates: Box<dyn CandidateSource>,
) -> Box<dyn ScanStrategy> {
    let decoder = Decoder::new(config.discovery.kind, config.discovery.protocol_version);
    match strategy {
        StrategyKind::Blocking => Box::new(BlockingScanner::new(
            decoder,
            BlockingSettings::from(config),
            candidates,
        )),
        StrategyKind::Cooperative => Box::new(CooperativeScanner::new(
            decoder,
            CooperativeSettings::from(config),
            candidates,
        )),
    }
}

/// Returns `true` for OS timeout / would-block errors that mean "no reply".
pub(crate) fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
