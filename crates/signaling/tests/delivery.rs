use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use signaling::config::Heartbeat;
use signaling::envelope::{Envelope, EnvelopeType};
use signaling::router::Router;
use signaling::server;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as TMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> std::net::SocketAddr {
    let router = Arc::new(Router::new(0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let app = server::build(router, Heartbeat::default());
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    addr
}

async fn ws_connect(addr: std::net::SocketAddr) -> Client {
    let url = format!("ws://{addr}/ws");
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

fn envelope_to_text(envelope: &Envelope) -> TMessage {
    TMessage::Text(serde_json::to_string(envelope).unwrap().into())
}

async fn next_envelope(stream: &mut Client) -> Envelope {
    loop {
        match stream.next().await.unwrap().unwrap() {
            TMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

/// Joins `room_id` and returns the server-assigned id, read off the ACK's
/// `peer_id` field (the server stamps every outgoing frame's `peer_id`
/// with the id of the connection it concerns).
async fn join(stream: &mut Client, room_id: &str) -> String {
    let mut envelope = Envelope::new(EnvelopeType::Join, 0);
    envelope.room_id = Some(room_id.to_string());
    stream.send(envelope_to_text(&envelope)).await.unwrap();

    let ack = next_envelope(stream).await;
    assert_eq!(ack.kind, EnvelopeType::Ack);
    ack.peer_id.expect("ack carries the caller's assigned id")
}

#[tokio::test]
async fn offer_is_delivered_to_its_target_and_only_its_target() {
    let addr = spawn_server().await;

    let mut a = ws_connect(addr).await;
    let mut b = ws_connect(addr).await;
    let mut c = ws_connect(addr).await;

    let a_id = join(&mut a, "lobby").await;
    let b_id = join(&mut b, "lobby").await;
    let _peer_joined_on_a = next_envelope(&mut a).await;

    let _c_id = join(&mut c, "lobby").await;
    let _peer_joined_c_on_a = next_envelope(&mut a).await;
    let _peer_joined_c_on_b = next_envelope(&mut b).await;

    let mut offer = Envelope::new(EnvelopeType::Offer, 0);
    offer.target_id = Some(b_id.clone());
    offer.payload = Some(serde_json::json!({
        "endpoint": {"ip": "203.0.113.9", "port": 4242},
        "session_id": "s1",
        "initiator_id": a_id,
    }));
    a.send(envelope_to_text(&offer)).await.unwrap();

    let received = next_envelope(&mut b).await;
    assert_eq!(received.kind, EnvelopeType::Offer);
    assert_eq!(received.peer_id.as_deref(), Some(a_id.as_str()));

    let nothing_for_c = tokio::time::timeout(Duration::from_millis(150), next_envelope(&mut c)).await;
    assert!(nothing_for_c.is_err(), "peer C must not receive an envelope addressed to B");
}

#[tokio::test]
async fn offer_to_a_nonexistent_peer_yields_peer_not_found() {
    let addr = spawn_server().await;
    let mut a = ws_connect(addr).await;

    let mut offer = Envelope::new(EnvelopeType::Offer, 0);
    offer.target_id = Some("ghostpeer".to_string());
    a.send(envelope_to_text(&offer)).await.unwrap();

    let received = next_envelope(&mut a).await;
    assert_eq!(received.kind, EnvelopeType::Error);
    assert_eq!(received.payload.unwrap()["code"], "PEER_NOT_FOUND");
}

#[tokio::test]
async fn discover_lists_every_member_of_the_caller_room() {
    let addr = spawn_server().await;
    let mut a = ws_connect(addr).await;
    let mut b = ws_connect(addr).await;

    let a_id = join(&mut a, "lobby").await;
    let b_id = join(&mut b, "lobby").await;
    let _peer_joined_on_a = next_envelope(&mut a).await;

    let discover = Envelope::new(EnvelopeType::Discover, 0);
    a.send(envelope_to_text(&discover)).await.unwrap();

    let list = next_envelope(&mut a).await;
    assert_eq!(list.kind, EnvelopeType::PeerList);
    let peers = list.payload.unwrap()["peers"].as_array().unwrap().clone();
    let ids: Vec<_> = peers.iter().map(|p| p["peer_id"].as_str().unwrap().to_string()).collect();
    assert!(ids.contains(&a_id));
    assert!(ids.contains(&b_id));
}

#[tokio::test]
async fn health_and_stats_endpoints_report_connected_peers() {
    let addr = spawn_server().await;
    let mut a = ws_connect(addr).await;
    let _ = join(&mut a, "lobby").await;

    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let stats: serde_json::Value = client
        .get(format!("http://{addr}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["peers"]["total"], 1);
    assert_eq!(stats["rooms"]["total"], 1);

    let rooms: serde_json::Value = client
        .get(format!("http://{addr}/api/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms["rooms"][0]["room_id"], "lobby");
}
