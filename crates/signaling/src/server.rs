//! The axum-based transport: WebSocket upgrade plus the auxiliary REST
//! introspection surface.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router as AxumRouter,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc::unbounded_channel;

use crate::config::{Config, Heartbeat};
use crate::envelope::Envelope;
use crate::error::SignalingError;
use crate::registry::Peer;
use crate::router::{now_millis, Router};

struct AppState {
    router: Arc<Router>,
    heartbeat: Heartbeat,
    started_at: Instant,
}

/// Constructs the axum router without binding a listener, so tests can
/// drive it directly with an ephemeral port.
pub fn build(router: Arc<Router>, heartbeat: Heartbeat) -> AxumRouter {
    let state = Arc::new(AppState {
        router,
        heartbeat,
        started_at: Instant::now(),
    });

    AxumRouter::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/{id}", get(room_details))
        .with_state(state)
}

pub async fn serve(config: Arc<Config>, router: Arc<Router>) -> anyhow::Result<()> {
    let app = build(router, config.heartbeat);
    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    log::info!("signaling server listening: addr={}", config.server.listen);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    let id = state.router.registry.fresh_peer_id();
    let (tx, mut rx) = unbounded_channel();
    state.router.registry.register(Peer::new(id.clone(), tx));

    let write_timeout = state.heartbeat.write_timeout();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match tokio::time::timeout(write_timeout, sink.send(message)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break,
                Err(_) => {
                    log::warn!("signaling write deadline exceeded, dropping connection");
                    break;
                }
            }
        }
    });

    let mut heartbeat = tokio::time::interval(state.heartbeat.ping_interval());
    heartbeat.tick().await; // first tick fires immediately; the real cadence starts after this one

    loop {
        tokio::select! {
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => handle_text_frame(&state, &id, &text),
                    Some(Ok(Message::Pong(_))) => {
                        if let Some(peer) = state.router.registry.get(&id) {
                            peer.touch();
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                let Some(peer) = state.router.registry.get(&id) else { break };
                if peer.last_seen().elapsed() > state.heartbeat.pong_timeout() {
                    log::info!("peer [{id}] missed heartbeat, disconnecting");
                    break;
                }
                if peer.send(Message::Ping(Vec::new().into())).is_err() {
                    break;
                }
            }
        }
    }

    state.router.disconnect(&id);
    writer.abort();
}

fn handle_text_frame(state: &AppState, sender_id: &str, text: &str) {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => state.router.handle(sender_id, envelope),
        Err(_) => {
            if let Some(peer) = state.router.registry.get(sender_id) {
                let error = Envelope::error(&SignalingError::InvalidMessage, now_millis(), "malformed envelope", None);
                let _ = peer.send(Message::Text(serde_json::to_string(&error).unwrap().into()));
            }
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": now_millis() }))
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "peers": {
            "total": state.router.registry.len(),
            "without_room": state.router.registry.without_room_count(),
        },
        "rooms": {
            "total": state.router.rooms.room_ids().len(),
            "total_peers": state.router.rooms.total_peers(),
        },
        "timestamp": now_millis(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms: Vec<_> = state
        .router
        .rooms
        .room_ids()
        .into_iter()
        .filter_map(|id| state.router.rooms.get(&id).map(|room| room_info(&id, &room)))
        .collect();

    Json(json!({ "rooms": rooms }))
}

async fn room_details(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.router.rooms.get(&id) {
        Some(room) => Json(json!({
            "room_id": id,
            "member_count": room.len(),
            "age_secs": room.created_at().elapsed().as_secs(),
            "members": room.members(),
        }))
        .into_response(),
        None => (axum::http::StatusCode::NOT_FOUND, Json(json!({ "code": "ROOM_NOT_FOUND" })))
            .into_response(),
    }
}

fn room_info(id: &str, room: &crate::room::Room) -> serde_json::Value {
    json!({
        "room_id": id,
        "member_count": room.len(),
        "age_secs": room.created_at().elapsed().as_secs(),
    })
}
