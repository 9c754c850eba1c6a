//! Room membership: an identifier, a set of member peers, a creation
//! instant, and an optional membership cap. Lock ordering is
//! RoomManager -> Room: a lookup takes the manager's shared lock, then
//! the room's own lock for membership edits.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use ahash::RandomState;
use parking_lot::{Mutex, RwLock};

use crate::error::SignalingError;

pub struct Room {
    pub id: String,
    members: Mutex<HashSet<String>>,
    created_at: Instant,
    /// Updated whenever membership transitions to/from empty.
    last_empty_since: Mutex<Option<Instant>>,
    capacity: usize,
}

impl Room {
    fn new(id: String, capacity: usize) -> Self {
        Self {
            id,
            members: Mutex::new(HashSet::new()),
            created_at: Instant::now(),
            last_empty_since: Mutex::new(Some(Instant::now())),
            capacity,
        }
    }

    pub fn members(&self) -> Vec<String> {
        self.members.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    fn insert(&self, peer_id: &str) -> Result<(), SignalingError> {
        let mut members = self.members.lock();
        if members.contains(peer_id) {
            return Err(SignalingError::AlreadyInRoom);
        }
        if self.capacity != 0 && members.len() >= self.capacity {
            return Err(SignalingError::RoomFull);
        }
        members.insert(peer_id.to_string());
        *self.last_empty_since.lock() = None;
        Ok(())
    }

    fn remove(&self, peer_id: &str) {
        let mut members = self.members.lock();
        members.remove(peer_id);
        if members.is_empty() {
            *self.last_empty_since.lock() = Some(Instant::now());
        }
    }

    /// `None` while occupied; `Some(duration)` for how long it has been empty.
    fn empty_for(&self) -> Option<Duration> {
        self.last_empty_since.lock().map(|since| since.elapsed())
    }
}

/// `room_id -> Room`, guarded by a readers-writer lock at the manager
/// level; per-room membership edits take the room's own lock.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>, RandomState>>,
    default_capacity: usize,
}

impl RoomManager {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::with_capacity_and_hasher(64, RandomState::new())),
            default_capacity,
        }
    }

    fn get_or_create(&self, room_id: &str) -> Arc<Room> {
        if let Some(room) = self.rooms.read().get(room_id) {
            return room.clone();
        }

        self.rooms
            .write()
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Room::new(room_id.to_string(), self.default_capacity)))
            .clone()
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().get(room_id).cloned()
    }

    /// Joins `peer_id` to `room_id`, creating the room on first join.
    pub fn join(&self, room_id: &str, peer_id: &str) -> Result<Arc<Room>, SignalingError> {
        let room = self.get_or_create(room_id);
        room.insert(peer_id)?;
        Ok(room)
    }

    pub fn leave(&self, room_id: &str, peer_id: &str) {
        if let Some(room) = self.get(room_id) {
            room.remove(peer_id);
        }
    }

    pub fn remove_room(&self, room_id: &str) {
        self.rooms.write().remove(room_id);
    }

    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.read().keys().cloned().collect()
    }

    pub fn total_peers(&self) -> usize {
        self.rooms.read().values().map(|r| r.len()).sum()
    }

    /// Rooms that have been continuously empty for longer than `ttl`.
    pub fn expired_room_ids(&self, ttl: Duration) -> Vec<String> {
        self.rooms
            .read()
            .iter()
            .filter(|(_, room)| room.empty_for().is_some_and(|d| d > ttl))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
