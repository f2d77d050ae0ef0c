//! Port allocation for robot queries.
//!
//! Each robot that asks gets the next port from a FIFO queue.  When the queue
//! runs dry the allocator switches to its *exhausted* state and answers
//! `"Goodbye"` to every later request.
//!
//! # Lifecycle
//!
//! ```text
//! Available ──(queue empties on allocate)──► Exhausted
//!    ▲  │                                        │
//!    └──┘ add_port                               └── add_port rejected
//! ```
//!
//! The transition is one-way for the lifetime of a responder run.

use std::collections::VecDeque;

use beacon_core::Reply;
use thiserror::Error;
use tracing::{debug, info};

/// Error type for port allocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    /// Ports cannot be added once the pool has been drained.
    #[error("port pool is exhausted; port {0} was not added")]
    PoolExhausted(u16),
}

/// FIFO pool of ports handed out to robots.
#[derive(Debug, Clone, Default)]
pub struct PortAllocator {
    queue: VecDeque<u16>,
    exhausted: bool,
}

impl PortAllocator {
    /// Creates an allocator that will hand out `ports` in order.
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            queue: ports.into_iter().collect(),
            exhausted: false,
        }
    }

    /// Appends a port to the end of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::PoolExhausted`] once the allocator has
    /// answered `"Goodbye"`.
    pub fn add_port(&mut self, port: u16) -> Result<(), AllocationError> {
        if self.exhausted {
            return Err(AllocationError::PoolExhausted(port));
        }
        self.queue.push_back(port);
        Ok(())
    }

    /// Pops the next port, or returns [`Reply::Goodbye`] once empty.
    pub fn allocate(&mut self) -> Reply {
        if self.exhausted {
            return Reply::Goodbye;
        }
        match self.queue.pop_front() {
            Some(port) => {
                debug!(port, remaining = self.queue.len(), "allocated port");
                Reply::Port(port)
            }
            None => {
                info!("port pool exhausted; answering Goodbye from now on");
                self.exhausted = true;
                Reply::Goodbye
            }
        }
    }

    /// Number of ports still waiting to be handed out.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// `true` once the allocator has answered `"Goodbye"`.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
