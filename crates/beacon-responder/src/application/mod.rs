//! Application layer for the responder.
//!
//! Contains the use cases that decide *what* to answer, independent of how
//! datagrams are received or sent:
//!
//! - **`allocate_ports`** – the FIFO port pool with its one-way exhausted
//!   state.
//! - **`answer_query`** – the role table that classifies a request by prefix
//!   and turns it into a [`beacon_core::Reply`].
//!
//! **Dependency rule**: this layer depends only on `beacon_core`; it never
//! touches sockets.

pub mod allocate_ports;
pub mod answer_query;
