//! DiscoveryMonitor: keeps track of whether a responder is reachable.
//!
//! The monitor wraps a [`ScanStrategy`] in a two-state machine and runs it on
//! a fixed tick:
//!
//! ```text
//!                 scan_all_groups(last_group) succeeds
//!   NotFound ───────────────────────────────────────────► Found
//!  {last_group}      publish ServerGame / ProxyRobots     {group}
//!       ▲                                                   │
//!       │            scan_once(group) gets no reply         │
//!       └───────────────────────────────────────────────────┘
//!                          publish Lost
//! ```
//!
//! While `Found`, each tick is a single keepalive request to the group that
//! answered.  Any reply at all keeps the state; the monitor does not decode
//! keepalive replies.  When contact is lost the group is remembered as
//! `last_group`, so the next full search tries it first.
//!
//! Events go out on an unbounded Tokio `mpsc` channel, so a slow or idle
//! consumer never stalls the ticks (and with them the keepalives).  Events
//! are only produced on transitions, so the backlog grows by at most two per
//! found/lost cycle.  The monitor publishes exactly one event per transition
//! and nothing while the state holds.  The loop ends when the receiver is
//! dropped.

use std::time::Duration;

use beacon_core::{BroadcastGroup, DiscoveryEvent, Kind};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle, time};
use tracing::{debug, error, info};

use crate::application::scan::ScanStrategy;

/// Pause between two ticks unless configured otherwise.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(4);

/// Error type for the monitor loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// Nobody is listening for events any more.
    #[error("discovery event receiver dropped")]
    ReceiverDropped,
}

/// Where the monitor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No responder known.  `last_group` is the group that answered before
    /// contact was lost, if any.
    NotFound { last_group: Option<BroadcastGroup> },
    /// A responder answered from `group`.
    Found { group: BroadcastGroup },
}

impl Default for MonitorState {
    fn default() -> Self {
        MonitorState::NotFound { last_group: None }
    }
}

/// Tunables for a [`DiscoveryMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// What is being looked for; only used in log messages.
    pub kind: Kind,
    pub tick_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            kind: Kind::ServerGame,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Drives a [`ScanStrategy`] and publishes found/lost events.
pub struct DiscoveryMonitor<S> {
    strategy: S,
    settings: MonitorSettings,
    state: MonitorState,
    tx: mpsc::UnboundedSender<DiscoveryEvent>,
}

impl<S: ScanStrategy> DiscoveryMonitor<S> {
    /// Creates a monitor in the `NotFound` state and the receiver for its
    /// events.
    pub fn new(
        strategy: S,
        settings: MonitorSettings,
    ) -> (Self, mpsc::UnboundedReceiver<DiscoveryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            strategy,
            settings,
            state: MonitorState::default(),
            tx,
        };
        (monitor, rx)
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Performs one step of the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ReceiverDropped`] if the event receiver is
    /// gone, either before the tick starts or when publishing.
    pub async fn tick(&mut self) -> Result<(), MonitorError> {
        if self.tx.is_closed() {
            return Err(MonitorError::ReceiverDropped);
        }
        let kind = self.settings.kind;

        match self.state {
            MonitorState::NotFound { last_group } => {
                match self.strategy.scan_all_groups(last_group).await {
                    Ok(Some(discovery)) => {
                        info!(group = %discovery.group, sender = %discovery.sender, "made contact with {kind}");
                        self.state = MonitorState::Found {
                            group: discovery.group,
                        };
                        self.publish(DiscoveryEvent::from(&discovery.endpoints))?;
                    }
                    Ok(None) => info!("could not find {kind}"),
                    Err(e) => error!("giving up on this search for {kind}: {e}"),
                }
            }
            MonitorState::Found { group } => match self.strategy.scan_once(group).await {
                Some(response) => {
                    debug!(%group, sender = %response.sender, "keepalive answered");
                }
                None => {
                    info!(%group, "contact lost with {kind}");
                    self.state = MonitorState::NotFound {
                        last_group: Some(group),
                    };
                    self.publish(DiscoveryEvent::Lost)?;
                }
            },
        }
        Ok(())
    }

    /// Runs `max_ticks` ticks (`None` = until the receiver is dropped),
    /// sleeping the tick interval between them.
    ///
    /// Returns the monitor so callers can inspect its final state.
    pub async fn run(mut self, max_ticks: Option<u64>) -> Self {
        let mut ticks: u64 = 0;

        loop {
            if self.tick().await.is_err() {
                debug!("event receiver dropped; monitor stopping");
                break;
            }
            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            time::sleep(self.settings.tick_interval).await;
        }

        self
    }

    /// Moves the monitor onto a Tokio task.
    pub fn spawn(self, max_ticks: Option<u64>) -> JoinHandle<()>
    where
        S: 'static,
    {
        tokio::spawn(async move {
            self.run(max_ticks).await;
        })
    }

    fn publish(&self, event: DiscoveryEvent) -> Result<(), MonitorError> {
        self.tx
            .send(event)
            .map_err(|_| MonitorError::ReceiverDropped)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
