//! Network infrastructure for the responder.
//!
//! - **`responder`** – binds the discovery port, answers each request with a
//!   unicast reply, and runs either for a bounded number of receive cycles or
//!   on a background thread until a shared `running` flag clears.

pub mod responder;
