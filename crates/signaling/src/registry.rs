//! The peer map: an opaque identifier to a connection handle. Writes to
//! the transport are serialized by a per-peer lock.

use std::{collections::HashMap, sync::Arc, time::Instant};

use ahash::RandomState;
use axum::extract::ws::Message;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;

use crate::envelope::WireEndpoint;
use crate::error::SignalingError;

struct PeerState {
    display_name: Option<String>,
    endpoint: Option<WireEndpoint>,
    room_id: Option<String>,
    room_joined_at: Option<u64>,
    last_seen: Instant,
}

/// A connected peer. The write half of its transport is a channel sender;
/// the per-peer lock guards only the small mutable fields below, so a
/// frame send never blocks on peer bookkeeping.
pub struct Peer {
    pub id: String,
    sender: UnboundedSender<Message>,
    first_seen: Instant,
    state: Mutex<PeerState>,
}

impl Peer {
    pub fn new(id: String, sender: UnboundedSender<Message>) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            id,
            sender,
            first_seen: now,
            state: Mutex::new(PeerState {
                display_name: None,
                endpoint: None,
                room_id: None,
                room_joined_at: None,
                last_seen: now,
            }),
        })
    }

    pub fn send(&self, message: Message) -> Result<(), SignalingError> {
        self.sender
            .send(message)
            .map_err(|_| SignalingError::Internal("peer transport closed".to_string()))
    }

    pub fn touch(&self) {
        self.state.lock().last_seen = Instant::now();
    }

    pub fn last_seen(&self) -> Instant {
        self.state.lock().last_seen
    }

    pub fn first_seen(&self) -> Instant {
        self.first_seen
    }

    pub fn room_id(&self) -> Option<String> {
        self.state.lock().room_id.clone()
    }

    pub fn set_room_id(&self, room_id: Option<String>) {
        let mut state = self.state.lock();
        if room_id.is_none() {
            state.room_joined_at = None;
        }
        state.room_id = room_id;
    }

    pub fn room_joined_at(&self) -> Option<u64> {
        self.state.lock().room_joined_at
    }

    pub fn set_room_joined_at(&self, timestamp: u64) {
        self.state.lock().room_joined_at = Some(timestamp);
    }

    pub fn display_name(&self) -> Option<String> {
        self.state.lock().display_name.clone()
    }

    pub fn set_display_name(&self, display_name: Option<String>) {
        self.state.lock().display_name = display_name;
    }

    pub fn endpoint(&self) -> Option<WireEndpoint> {
        self.state.lock().endpoint.clone()
    }

    pub fn set_endpoint(&self, endpoint: Option<WireEndpoint>) {
        self.state.lock().endpoint = endpoint;
    }
}

/// `peer_id -> Peer`, guarded by a readers-writer lock: register/unregister
/// take the exclusive lock, lookups take the shared lock.
pub struct Registry {
    peers: RwLock<HashMap<String, Arc<Peer>, RandomState>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::with_capacity_and_hasher(256, RandomState::new())),
        }
    }

    /// An 8 hex-character identifier not already present in the registry.
    pub fn fresh_peer_id(&self) -> String {
        loop {
            let candidate = format!("{:08x}", rand::random::<u32>());
            if !self.peers.read().contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn register(&self, peer: Arc<Peer>) {
        log::info!("peer [{}] connected", peer.id);
        self.peers.write().insert(peer.id.clone(), peer);
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<Peer>> {
        let peer = self.peers.write().remove(id);
        if peer.is_some() {
            log::info!("peer [{id}] disconnected");
        }
        peer
    }

    pub fn get(&self, id: &str) -> Option<Arc<Peer>> {
        self.peers.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn without_room_count(&self) -> usize {
        self.peers.read().values().filter(|p| p.room_id().is_none()).count()
    }

    /// Snapshot of peer ids whose `last_seen` is older than `max_age`. A
    /// copy, so the registry lock is never held while the janitor acts on it.
    pub fn stale_peer_ids(&self, max_age: std::time::Duration) -> Vec<String> {
        self.peers
            .read()
            .values()
            .filter(|p| p.last_seen().elapsed() > max_age)
            .map(|p| p.id.clone())
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
