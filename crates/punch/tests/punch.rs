use nat::{Endpoint, Mapping, NatType};
use punch::{PeerInfo, PunchConfig, PunchError, Puncher};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

fn fast_config() -> PunchConfig {
    PunchConfig {
        overall_deadline: Duration::from_millis(800),
        probe_interval: Duration::from_millis(20),
        max_probes: 50,
    }
}

fn mapping_with(nat_type: NatType) -> Mapping {
    Mapping {
        local_endpoint: Endpoint::new("127.0.0.1:1".parse().unwrap()),
        public_endpoint: Endpoint::new("203.0.113.1:1".parse().unwrap()),
        nat_type,
        detected_at: Instant::now(),
    }
}

#[tokio::test]
async fn incompatible_nat_types_fail_before_any_datagram() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let puncher = Puncher::new(socket, Some(mapping_with(NatType::Symmetric)), fast_config());

    // An unreachable address: if the engine actually sent a datagram this
    // would simply be dropped, so reaching Incompatible before any I/O is
    // what this test certifies.
    let peer = PeerInfo::new(Endpoint::new("203.0.113.2:1".parse().unwrap()))
        .with_remote_nat_type(NatType::Symmetric);

    let result = puncher.punch(&peer).await;
    assert!(matches!(result, Err(PunchError::Incompatible)));
}

#[tokio::test]
async fn lan_candidate_short_circuits_phase_b() {
    let lan_peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let lan_peer_addr = lan_peer.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 16];
        if let Ok((size, from)) = lan_peer.recv_from(&mut buf).await {
            if &buf[..size] == b"PING" {
                let _ = lan_peer.send_to(b"PONG", from).await;
            }
        }
    });

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let puncher = Puncher::new(socket, None, fast_config());

    // A public endpoint that would never answer, so success can only have
    // come from the LAN phase.
    let peer = PeerInfo::new(Endpoint::new("203.0.113.3:1".parse().unwrap()))
        .with_local_candidates(vec![Endpoint::new(lan_peer_addr)]);

    let conn = puncher.punch(&peer).await.expect("lan candidate should certify");
    assert_eq!(conn.remote_endpoint.addr(), lan_peer_addr);
    assert!(!conn.is_relayed);
}

#[tokio::test]
async fn simultaneous_punch_certifies_a_path_between_two_engines() {
    let socket_a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let socket_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr_a = socket_a.local_addr().unwrap();
    let addr_b = socket_b.local_addr().unwrap();

    let puncher_a = Puncher::new(socket_a, None, fast_config());
    let puncher_b = Puncher::new(socket_b, None, fast_config());

    let peer_for_a = PeerInfo::new(Endpoint::new(addr_b));
    let peer_for_b = PeerInfo::new(Endpoint::new(addr_a));

    let (result_a, result_b) = tokio::join!(puncher_a.punch(&peer_for_a), puncher_b.punch(&peer_for_b));

    let conn_a = result_a.expect("side a should certify a path");
    let conn_b = result_b.expect("side b should certify a path");

    assert_eq!(conn_a.remote_endpoint.addr(), addr_b);
    assert_eq!(conn_b.remote_endpoint.addr(), addr_a);
}

#[tokio::test]
async fn punch_after_close_fails_without_sending_a_datagram() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let puncher = Puncher::new(socket, None, fast_config());
    puncher.close();
    assert!(puncher.is_closed());

    let peer = PeerInfo::new(Endpoint::new("203.0.113.4:1".parse().unwrap()));
    let result = puncher.punch(&peer).await;
    assert!(matches!(result, Err(PunchError::Closed)));
}
