//! AnswerQueryUseCase: turns a received request into a reply.
//!
//! Requests are classified by prefix using a [`RoleTable`].  The table is
//! plain configuration: an ordered list of `prefix → policy` rules plus a
//! fallback policy for requests that match no rule.
//!
//! ```toml
//! [roles]
//! fallback = "robot"
//!
//! [[roles.rules]]
//! prefix = "admin"
//! policy = "admin"
//!
//! [[roles.rules]]
//! prefix = "robot"
//! policy = "robot"
//! ```

use beacon_core::{
    protocol::messages::{ADMIN_TAG, ROBOT_TAG},
    Reply, ServerGameEndpoints,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::allocate_ports::{AllocationError, PortAllocator};

/// How a classified request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Next port from the pool, then `"Goodbye"`.
    Robot,
    /// The fixed administrative port.
    Admin,
    /// The configured ServerGame endpoint advertisement.
    Endpoints,
}

/// One classification rule: requests starting with `prefix` get `policy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub prefix: String,
    pub policy: Policy,
}

impl RoleRule {
    pub fn new(prefix: impl Into<String>, policy: Policy) -> Self {
        Self {
            prefix: prefix.into(),
            policy,
        }
    }

    fn matches(&self, message: &[u8]) -> bool {
        message.starts_with(self.prefix.as_bytes())
    }
}

/// Ordered prefix rules; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    /// Policy for requests matching no rule.
    #[serde(default = "default_fallback")]
    pub fallback: Policy,
    #[serde(default = "default_rules")]
    pub rules: Vec<RoleRule>,
}

fn default_fallback() -> Policy {
    Policy::Robot
}

fn default_rules() -> Vec<RoleRule> {
    vec![
        RoleRule::new(String::from_utf8_lossy(ADMIN_TAG), Policy::Admin),
        RoleRule::new(String::from_utf8_lossy(ROBOT_TAG), Policy::Robot),
    ]
}

impl Default for RoleTable {
    fn default() -> Self {
        Self {
            fallback: default_fallback(),
            rules: default_rules(),
        }
    }
}

impl RoleTable {
    /// Returns the policy for `message`.
    pub fn classify(&self, message: &[u8]) -> Policy {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map_or(self.fallback, |rule| rule.policy)
    }

    /// `true` if any rule (or the fallback) selects `policy`.
    pub fn uses(&self, policy: Policy) -> bool {
        self.fallback == policy || self.rules.iter().any(|rule| rule.policy == policy)
    }
}

/// Answers classified requests.
///
/// Owns the port pool, so a single instance must serve every request of a
/// responder run.
#[derive(Debug, Clone)]
pub struct AnswerQueryUseCase {
    roles: RoleTable,
    allocator: PortAllocator,
    admin_port: u16,
    advertise: Option<ServerGameEndpoints>,
}

impl AnswerQueryUseCase {
    pub fn new(
        roles: RoleTable,
        allocator: PortAllocator,
        admin_port: u16,
        advertise: Option<ServerGameEndpoints>,
    ) -> Self {
        Self {
            roles,
            allocator,
            admin_port,
            advertise,
        }
    }

    /// Appends a port to the robot pool.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::PoolExhausted`] once the pool has been
    /// drained.
    pub fn add_socket_port(&mut self, port: u16) -> Result<(), AllocationError> {
        self.allocator.add_port(port)
    }

    /// Produces the reply for `message`.
    ///
    /// Returns `None` only when the `endpoints` policy is selected but no
    /// advertisement is configured.
    pub fn answer(&mut self, message: &[u8]) -> Option<Reply> {
        match self.roles.classify(message) {
            Policy::Robot => Some(self.allocator.allocate()),
            Policy::Admin => Some(Reply::Admin(self.admin_port)),
            Policy::Endpoints => match &self.advertise {
                Some(endpoints) => Some(Reply::Endpoints(endpoints.clone())),
                None => {
                    warn!("endpoints policy selected but nothing is advertised");
                    None
                }
            },
        }
    }

    pub fn allocator(&self) -> &PortAllocator {
        &self.allocator
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
