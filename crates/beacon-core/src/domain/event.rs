//! Events published by a discovery monitor.

use crate::protocol::messages::DecodedEndpoints;

/// What a discovery monitor puts on its output channel.
///
/// A monitor emits exactly one discovery event when a server is first found
/// and exactly one [`DiscoveryEvent::Lost`] when it stops answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A ServerGame server was found.
    ServerGame {
        push: String,
        subscribe: String,
        reply: String,
    },
    /// A ProxyRobots responder allocated a port.
    ProxyRobots { port: u16 },
    /// The previously found server stopped answering.
    Lost,
}

impl From<&DecodedEndpoints> for DiscoveryEvent {
    fn from(endpoints: &DecodedEndpoints) -> Self {
        match endpoints {
            DecodedEndpoints::ServerGame(e) => DiscoveryEvent::ServerGame {
                push: e.push.clone(),
                subscribe: e.subscribe.clone(),
                reply: e.reply.clone(),
            },
            DecodedEndpoints::ProxyRobots { port } => DiscoveryEvent::ProxyRobots { port: *port },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::ServerGameEndpoints;

    #[test]
    fn test_server_game_event_carries_three_addresses() {
        let decoded = DecodedEndpoints::ServerGame(ServerGameEndpoints {
            push: "tcp://1.2.3.4:9000".to_string(),
            subscribe: "tcp://1.2.3.4:9001".to_string(),
            reply: "tcp://1.2.3.4:9002".to_string(),
            agent: Some("tcp://1.2.3.4:9003".to_string()),
        });

        let event = DiscoveryEvent::from(&decoded);

        assert_eq!(
            event,
            DiscoveryEvent::ServerGame {
                push: "tcp://1.2.3.4:9000".to_string(),
                subscribe: "tcp://1.2.3.4:9001".to_string(),
                reply: "tcp://1.2.3.4:9002".to_string(),
            }
        );
    }

    #[test]
    fn test_proxy_robots_event_carries_port() {
        let event = DiscoveryEvent::from(&DecodedEndpoints::ProxyRobots { port: 9012 });
        assert_eq!(event, DiscoveryEvent::ProxyRobots { port: 9012 });
    }
}
