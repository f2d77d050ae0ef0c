//! Loopback integration tests: real scanners against a real responder.
//!
//! Candidates are pinned with `StaticCandidates` so the tests never depend on
//! the host's network interfaces.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::{atomic::AtomicBool, Arc};
use std::time::{Duration, Instant};

use beacon_core::{DecodedEndpoints, Decoder, DiscoveryEvent, ServerGameEndpoints};
use beacon_responder::application::answer_query::{Policy, RoleRule};
use beacon_responder::infrastructure::{
    network::responder::start_responder, storage::config::ResponderConfig,
};
use beacon_scanner::application::{
    monitor::{DiscoveryMonitor, MonitorSettings},
    scan::ScanStrategy,
};
use beacon_scanner::infrastructure::{
    candidates::StaticCandidates,
    network::{BlockingScanner, BlockingSettings, CooperativeScanner, CooperativeSettings},
};

/// Every responder here runs a bounded number of receive cycles; the long
/// read timeout keeps idle timeouts from spending them.
fn responder_config(ports: Vec<u16>) -> ResponderConfig {
    ResponderConfig {
        bind_address: Ipv4Addr::LOCALHOST,
        bind_port: 0,
        ports,
        read_timeout_ms: 5_000,
        ..ResponderConfig::default()
    }
}

fn blocking(port: u16, retries: u32, timeout_ms: u64) -> BlockingSettings {
    BlockingSettings {
        port,
        retries,
        timeout: Duration::from_millis(timeout_ms),
    }
}

#[tokio::test]
async fn test_blocking_scanner_gets_port_from_responder() {
    // Arrange
    let running = Arc::new(AtomicBool::new(true));
    let (addr, handle) = start_responder(&responder_config(vec![9012]), running, Some(1))
        .expect("start responder");
    let mut scanner = BlockingScanner::new(
        Decoder::proxy_robots(),
        blocking(addr.port(), 2, 500),
        Box::new(StaticCandidates::new([Ipv4Addr::LOCALHOST])),
    );

    // Act
    let discovery = scanner.scan_all_groups(None).await.unwrap().expect("found");

    // Assert
    assert_eq!(discovery.endpoints, DecodedEndpoints::ProxyRobots { port: 9012 });
    assert_eq!(discovery.sender, addr);
    handle.join().unwrap();
}

#[tokio::test]
async fn test_cooperative_scanner_decodes_server_game_advertisement() {
    // Arrange
    let running = Arc::new(AtomicBool::new(true));
    let mut cfg = responder_config(vec![]);
    cfg.roles.rules.insert(0, RoleRule::new("2", Policy::Endpoints));
    cfg.advertise = Some(ServerGameEndpoints {
        push: "tcp://*:9000".to_string(),
        subscribe: "tcp://*:9001".to_string(),
        reply: "tcp://*:9002".to_string(),
        agent: Some("tcp://*:9003".to_string()),
    });
    let (addr, handle) = start_responder(&cfg, running, Some(1)).expect("start responder");
    let mut scanner = CooperativeScanner::new(
        Decoder::server_game(2),
        CooperativeSettings {
            port: addr.port(),
            max_polls: 10,
            poll_delay: Duration::from_millis(20),
            max_rounds: Some(1),
        },
        Box::new(StaticCandidates::new([Ipv4Addr::LOCALHOST])),
    );

    // Act
    let discovery = scanner.scan_all_groups(None).await.unwrap().expect("found");

    // Assert
    assert_eq!(
        discovery.endpoints,
        DecodedEndpoints::ServerGame(ServerGameEndpoints {
            push: "tcp://127.0.0.1:9000".to_string(),
            subscribe: "tcp://127.0.0.1:9001".to_string(),
            reply: "tcp://127.0.0.1:9002".to_string(),
            agent: Some("tcp://127.0.0.1:9003".to_string()),
        })
    );
    handle.join().unwrap();
}

// Every 127.0.0.0/8 address reaches the loopback interface on Linux only.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_silent_candidates_get_exactly_retries_requests_each() {
    // Arrange: one socket on all addresses counts every request, answers none
    let sink = UdpSocket::bind("0.0.0.0:0").expect("bind sink");
    sink.set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let port = sink.local_addr().unwrap().port();
    let candidates = [
        Ipv4Addr::new(127, 0, 0, 1),
        Ipv4Addr::new(127, 0, 0, 2),
        Ipv4Addr::new(127, 0, 0, 3),
    ];
    let mut scanner = BlockingScanner::new(
        Decoder::proxy_robots(),
        blocking(port, 2, 100),
        Box::new(StaticCandidates::new(candidates)),
    );

    // Act
    let started = Instant::now();
    let result = scanner.scan_all_groups(None).await;
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(result, Ok(None));
    let mut buf = [0u8; 64];
    let mut received = 0;
    while sink.recv_from(&mut buf).is_ok() {
        received += 1;
    }
    assert_eq!(received, 3 * 2);
    assert!(elapsed >= Duration::from_millis(600), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
}

#[tokio::test]
async fn test_monitor_reports_found_once_then_lost() {
    // Arrange: the responder runs two receive cycles (the search and one
    // keepalive), then stops, so the next keepalive goes unanswered.
    let running = Arc::new(AtomicBool::new(true));
    let (addr, handle) = start_responder(&responder_config(vec![9012]), running, Some(2))
        .expect("start responder");
    let scanner = BlockingScanner::new(
        Decoder::proxy_robots(),
        blocking(addr.port(), 1, 300),
        Box::new(StaticCandidates::new([Ipv4Addr::LOCALHOST])),
    );
    let settings = MonitorSettings {
        kind: beacon_core::Kind::ProxyRobots,
        tick_interval: Duration::from_millis(10),
    };
    let (monitor, mut events) = DiscoveryMonitor::new(scanner, settings);

    // Act
    monitor.run(Some(3)).await;

    // Assert
    assert_eq!(events.recv().await, Some(DiscoveryEvent::ProxyRobots { port: 9012 }));
    assert_eq!(events.recv().await, Some(DiscoveryEvent::Lost));
    assert_eq!(events.recv().await, None, "the monitor was dropped after its ticks");
    handle.join().unwrap();
}
