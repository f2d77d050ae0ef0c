//! Loopback integration tests for the responder.
//!
//! Each test binds a responder on `127.0.0.1:0`, runs it on its background
//! thread, and talks to it with a plain std UDP socket.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use beacon_core::{Decoder, DecodedEndpoints, ServerGameEndpoints};
use beacon_responder::application::answer_query::{Policy, RoleRule};
use beacon_responder::infrastructure::{
    network::responder::start_responder, storage::config::ResponderConfig,
};

fn loopback_config(ports: Vec<u16>) -> ResponderConfig {
    ResponderConfig {
        bind_address: Ipv4Addr::LOCALHOST,
        bind_port: 0,
        ports,
        read_timeout_ms: 50,
        ..ResponderConfig::default()
    }
}

/// Long read timeout, so a bounded run's cycles are spent on requests
/// rather than on idle timeouts.
fn counted_config(ports: Vec<u16>) -> ResponderConfig {
    ResponderConfig {
        read_timeout_ms: 5_000,
        ..loopback_config(ports)
    }
}

fn client() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind client");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set timeout");
    socket
}

fn ask(client: &UdpSocket, to: SocketAddr, msg: &[u8]) -> Vec<u8> {
    client.send_to(msg, to).expect("send");
    let mut buf = [0u8; 512];
    let (len, _) = client.recv_from(&mut buf).expect("reply");
    buf[..len].to_vec()
}

#[test]
fn test_pool_is_drained_in_order_then_goodbye_forever() {
    // Arrange
    let running = Arc::new(AtomicBool::new(true));
    let (addr, handle) =
        start_responder(&counted_config(vec![9012, 9013]), Arc::clone(&running), Some(4))
            .expect("start responder");
    let client = client();

    // Act
    let replies: Vec<Vec<u8>> = (0..4).map(|_| ask(&client, addr, b"robot")).collect();

    // Assert
    assert_eq!(
        replies,
        vec![
            b"9012".to_vec(),
            b"9013".to_vec(),
            b"Goodbye".to_vec(),
            b"Goodbye".to_vec()
        ]
    );
    // All four receive cycles are spent, so the thread ends on its own.
    handle.join().expect("responder thread");
}

#[test]
fn test_admin_query_gets_admin_port_even_after_exhaustion() {
    // Arrange
    let running = Arc::new(AtomicBool::new(true));
    let mut cfg = loopback_config(vec![]);
    cfg.admin_port = 4242;
    let (addr, handle) =
        start_responder(&cfg, Arc::clone(&running), None).expect("start responder");
    let client = client();

    // Act
    let robot = ask(&client, addr, b"robot");
    let admin = ask(&client, addr, b"admin");

    // Assert
    assert_eq!(robot, b"Goodbye");
    assert_eq!(admin, b"4242");

    running.store(false, Ordering::Relaxed);
    handle.join().expect("responder thread");
}

#[test]
fn test_endpoints_policy_advertises_server_game_reply() {
    // Arrange
    let running = Arc::new(AtomicBool::new(true));
    let mut cfg = counted_config(vec![]);
    cfg.roles.rules.push(RoleRule::new("2", Policy::Endpoints));
    cfg.advertise = Some(ServerGameEndpoints {
        push: "tcp://*:9000".to_string(),
        subscribe: "tcp://*:9001".to_string(),
        reply: "tcp://*:9002".to_string(),
        agent: Some("tcp://*:9003".to_string()),
    });
    let (addr, handle) =
        start_responder(&cfg, Arc::clone(&running), Some(1)).expect("start responder");
    let client = client();

    // Act
    let bytes = ask(&client, addr, b"2");
    let decoded = Decoder::server_game(2)
        .decode(addr, &bytes)
        .expect("advertisement decodes");

    // Assert: the wildcard resolves to the responder's address
    match decoded {
        DecodedEndpoints::ServerGame(e) => {
            assert_eq!(e.push, "tcp://127.0.0.1:9000");
            assert_eq!(e.subscribe, "tcp://127.0.0.1:9001");
            assert_eq!(e.reply, "tcp://127.0.0.1:9002");
            assert_eq!(e.agent.as_deref(), Some("tcp://127.0.0.1:9003"));
        }
        other => panic!("expected ServerGame endpoints, got {other:?}"),
    }
    handle.join().expect("responder thread");
}
