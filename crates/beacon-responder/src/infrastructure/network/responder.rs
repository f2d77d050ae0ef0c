//! UDP broadcast responder.
//!
//! The responder binds a UDP socket on the discovery port (default 9080) and
//! answers every datagram it receives.  For each request it:
//!
//! 1. Classifies the payload by prefix using the configured role table.
//! 2. Builds the reply (a pool port, `"Goodbye"`, the admin port, or a
//!    ServerGame advertisement).
//! 3. Sends the reply as a unicast datagram to the request's source address.
//!
//! The loop runs either in the caller's thread ([`BroadcastResponder::run`])
//! or on a dedicated thread ([`start_responder`]) so blocking socket I/O never
//! stalls the Tokio runtime.
//!
//! # How a broadcast query reaches us (for beginners)
//!
//! A scanner that does not know where we are sends its request to the LAN
//! broadcast address (e.g. `192.168.1.255`) on the discovery port.  Every host
//! on the segment receives that datagram; only hosts with a socket bound to
//! the port see it.  `recv_from` tells us the sender's address, which is all
//! we need to answer with an ordinary unicast `send_to`.
//!
//! # Read timeout
//!
//! The socket has a short read timeout (default 500 ms).  When `recv_from`
//! times out we simply go round again; that is where the loop checks the
//! `running` flag, so shutdown is observed within one timeout.
//!
//! # Loop budget
//!
//! `max_loops` counts *receive cycles*: every call to
//! [`BroadcastResponder::serve_once`], whether it got a datagram, timed out,
//! or failed.  `run(Some(3))` on a silent socket therefore returns after
//! three read timeouts.  Callers that need N answered requests should pick a
//! read timeout longer than the gap between requests.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use beacon_core::protocol::messages::MAX_REPLY_SIZE;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::{
    allocate_ports::{AllocationError, PortAllocator},
    answer_query::AnswerQueryUseCase,
};
use crate::infrastructure::storage::config::ResponderConfig;

/// Error type for responder start-up.
///
/// Per-request failures are logged and never surface here.
#[derive(Debug, Error)]
pub enum ResponderError {
    /// The UDP socket could not be bound.
    #[error("failed to bind responder socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The bound socket could not be configured or queried.
    #[error("responder socket error: {0}")]
    Socket(#[source] std::io::Error),
    /// The background thread could not be started.
    #[error("failed to spawn responder thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A bound responder socket plus the state that decides what to answer.
#[derive(Debug)]
pub struct BroadcastResponder {
    socket: UdpSocket,
    use_case: AnswerQueryUseCase,
    buf: Vec<u8>,
}

impl BroadcastResponder {
    /// Binds the socket described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponderError::BindFailed`] if the port is unavailable and
    /// [`ResponderError::Socket`] if the read timeout cannot be applied.
    pub fn bind(config: &ResponderConfig) -> Result<Self, ResponderError> {
        let addr = config.bind_addr();
        let socket =
            UdpSocket::bind(addr).map_err(|source| ResponderError::BindFailed { addr, source })?;
        socket
            .set_read_timeout(Some(config.read_timeout()))
            .map_err(ResponderError::Socket)?;

        let use_case = AnswerQueryUseCase::new(
            config.roles.clone(),
            PortAllocator::new(config.ports.iter().copied()),
            config.admin_port,
            config.advertise.clone(),
        );

        let responder = Self {
            socket,
            use_case,
            buf: vec![0u8; MAX_REPLY_SIZE],
        };
        info!(
            addr = %responder.local_addr()?,
            ports = config.ports.len(),
            admin_port = config.admin_port,
            "responder listening"
        );
        Ok(responder)
    }

    /// The address actually bound (useful when the config asked for port 0).
    ///
    /// # Errors
    ///
    /// Returns [`ResponderError::Socket`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, ResponderError> {
        self.socket.local_addr().map_err(ResponderError::Socket)
    }

    /// Appends a port to the robot pool.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::PoolExhausted`] once `"Goodbye"` has been
    /// sent.
    pub fn add_socket_port(&mut self, port: u16) -> Result<(), AllocationError> {
        self.use_case.add_socket_port(port)
    }

    /// Performs one receive cycle.
    ///
    /// Returns `true` if a datagram was received (whether or not a reply
    /// could be sent) and `false` on timeout or receive error.
    pub fn serve_once(&mut self) -> bool {
        let (len, src) = match self.socket.recv_from(&mut self.buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => return false,
            Err(e) => {
                error!("responder recv error: {e}");
                return false;
            }
        };

        let Some(reply) = self.use_case.answer(&self.buf[..len]) else {
            debug!(sender = %src, "no reply for request");
            return true;
        };

        match reply.encode() {
            Ok(bytes) => match self.socket.send_to(&bytes, src) {
                Ok(_) => debug!(sender = %src, ?reply, "answered request"),
                Err(e) => warn!(sender = %src, "failed to send reply: {e}"),
            },
            Err(e) => error!(sender = %src, "failed to encode reply: {e}"),
        }
        true
    }

    /// Performs `max_loops` receive cycles (`None` = forever) in the calling
    /// thread.
    pub fn run(&mut self, max_loops: Option<u64>) {
        let running = AtomicBool::new(true);
        self.run_while(&running, max_loops);
    }

    /// Like [`run`](Self::run) but also stops once `running` is cleared.
    pub fn run_while(&mut self, running: &AtomicBool, max_loops: Option<u64>) {
        let mut loops: u64 = 0;
        let mut handled: u64 = 0;

        while running.load(Ordering::Relaxed) {
            if max_loops.is_some_and(|max| loops >= max) {
                break;
            }
            loops += 1;
            if self.serve_once() {
                handled += 1;
            }
        }

        info!(loops, handled, "responder stopped");
    }

    /// Moves the responder onto a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`ResponderError::Spawn`] if the thread cannot be created.
    pub fn spawn(
        mut self,
        running: Arc<AtomicBool>,
        max_loops: Option<u64>,
    ) -> Result<JoinHandle<()>, ResponderError> {
        std::thread::Builder::new()
            .name("beacon-responder".to_string())
            .spawn(move || self.run_while(&running, max_loops))
            .map_err(ResponderError::Spawn)
    }
}

/// Binds a responder from `config` and runs it on a background thread until
/// `running` clears or `max_loops` receive cycles have run.
///
/// Returns the bound address together with the thread handle.
///
/// # Errors
///
/// Returns any [`ResponderError`] from binding or spawning.
pub fn start_responder(
    config: &ResponderConfig,
    running: Arc<AtomicBool>,
    max_loops: Option<u64>,
) -> Result<(SocketAddr, JoinHandle<()>), ResponderError> {
    let responder = BroadcastResponder::bind(config)?;
    let addr = responder.local_addr()?;
    let handle = responder.spawn(running, max_loops)?;
    Ok((addr, handle))
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
