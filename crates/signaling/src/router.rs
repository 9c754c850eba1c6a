//! Envelope dispatch: JOIN/LEAVE/OFFER/ANSWER/CANDIDATE/DISCOVER/
//! KEEP_ALIVE, built on a `send_to`/`broadcast` pair over per-peer
//! channels.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::ws::Message;

use crate::envelope::{Envelope, EnvelopeType, PeerListPayload, PeerSummary};
use crate::error::SignalingError;
use crate::registry::Registry;
use crate::room::RoomManager;

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn to_message(envelope: &Envelope) -> Message {
    Message::Text(serde_json::to_string(envelope).expect("envelope always serializes").into())
}

/// Owns the peer registry and the room manager and implements the
/// envelope dispatch contract. One instance is shared (via `Arc`) across
/// all connections.
pub struct Router {
    pub registry: Registry,
    pub rooms: RoomManager,
}

impl Router {
    pub fn new(room_capacity: usize) -> Self {
        Self {
            registry: Registry::new(),
            rooms: RoomManager::new(room_capacity),
        }
    }

    fn send_error(&self, to: &str, error: SignalingError, request_id: Option<String>) {
        if let Some(peer) = self.registry.get(to) {
            let envelope = Envelope::error(&error, now_millis(), error.to_string(), request_id);
            let _ = peer.send(to_message(&envelope));
        }
    }

    /// Dispatches one inbound envelope from `sender_id`. The sender's
    /// identifier is always re-stamped onto outgoing frames; the server
    /// never trusts a client-supplied `peer_id`.
    pub fn handle(&self, sender_id: &str, mut envelope: Envelope) {
        envelope.peer_id = Some(sender_id.to_string());

        match envelope.kind {
            EnvelopeType::Join => self.handle_join(sender_id, envelope),
            EnvelopeType::Leave => self.handle_leave(sender_id, envelope),
            EnvelopeType::Offer | EnvelopeType::Answer | EnvelopeType::Candidate => {
                self.forward(sender_id, envelope)
            }
            EnvelopeType::Discover => self.handle_discover(sender_id, envelope),
            EnvelopeType::KeepAlive => {
                if let Some(peer) = self.registry.get(sender_id) {
                    peer.touch();
                }
            }
            EnvelopeType::PeerJoined
            | EnvelopeType::PeerLeft
            | EnvelopeType::PeerList
            | EnvelopeType::Error
            | EnvelopeType::Ack => {
                self.send_error(sender_id, SignalingError::InvalidMessage, envelope.request_id);
            }
        }
    }

    /// OFFER/ANSWER/CANDIDATE: forwarded verbatim to `target_id`, only to
    /// that peer. A missing target yields `PEER_NOT_FOUND` to the sender.
    fn forward(&self, sender_id: &str, envelope: Envelope) {
        let Some(target_id) = envelope.target_id.clone() else {
            self.send_error(sender_id, SignalingError::InvalidMessage, envelope.request_id);
            return;
        };

        match self.registry.get(&target_id) {
            Some(target) => {
                let _ = target.send(to_message(&envelope));
            }
            None => self.send_error(sender_id, SignalingError::PeerNotFound, envelope.request_id),
        }
    }

    fn handle_join(&self, sender_id: &str, envelope: Envelope) {
        let Some(room_id) = envelope.room_id.clone() else {
            self.send_error(sender_id, SignalingError::InvalidMessage, envelope.request_id);
            return;
        };

        let Some(peer) = self.registry.get(sender_id) else {
            return;
        };

        if peer.room_id().as_deref() == Some(room_id.as_str()) {
            let mut ack = Envelope::ack(now_millis(), envelope.request_id);
            ack.peer_id = Some(sender_id.to_string());
            let _ = peer.send(to_message(&ack));
            return;
        }

        if let Some(previous) = peer.room_id() {
            self.leave_room(sender_id, &previous);
        }

        match self.rooms.join(&room_id, sender_id) {
            Ok(_) => {
                peer.set_room_id(Some(room_id.clone()));
                peer.set_room_joined_at(now_millis());

                let mut joined = Envelope::new(EnvelopeType::PeerJoined, now_millis());
                joined.peer_id = Some(sender_id.to_string());
                joined.room_id = Some(room_id.clone());
                self.broadcast_to_room(&room_id, sender_id, &joined);

                let mut ack = Envelope::ack(now_millis(), envelope.request_id);
                ack.peer_id = Some(sender_id.to_string());
                let _ = peer.send(to_message(&ack));
            }
            Err(error) => self.send_error(sender_id, error, envelope.request_id),
        }
    }

    fn handle_leave(&self, sender_id: &str, envelope: Envelope) {
        let Some(peer) = self.registry.get(sender_id) else {
            return;
        };

        match peer.room_id() {
            Some(room_id) => {
                self.leave_room(sender_id, &room_id);
                peer.set_room_id(None);
                let mut ack = Envelope::ack(now_millis(), envelope.request_id);
                ack.peer_id = Some(sender_id.to_string());
                let _ = peer.send(to_message(&ack));
            }
            None => self.send_error(sender_id, SignalingError::NotInRoom, envelope.request_id),
        }
    }

    fn leave_room(&self, peer_id: &str, room_id: &str) {
        self.rooms.leave(room_id, peer_id);

        let mut left = Envelope::new(EnvelopeType::PeerLeft, now_millis());
        left.peer_id = Some(peer_id.to_string());
        left.room_id = Some(room_id.to_string());
        self.broadcast_to_room(room_id, peer_id, &left);
    }

    fn handle_discover(&self, sender_id: &str, envelope: Envelope) {
        let Some(peer) = self.registry.get(sender_id) else {
            return;
        };

        let Some(room_id) = peer.room_id() else {
            self.send_error(sender_id, SignalingError::NotInRoom, envelope.request_id);
            return;
        };

        let Some(room) = self.rooms.get(&room_id) else {
            self.send_error(sender_id, SignalingError::RoomNotFound, envelope.request_id);
            return;
        };

        let peers = room
            .members()
            .into_iter()
            .filter_map(|id| self.registry.get(&id))
            .map(|member| PeerSummary {
                peer_id: member.id.clone(),
                display_name: member.display_name(),
                endpoint: member.endpoint(),
                joined_at: member.room_joined_at().unwrap_or(0),
            })
            .collect();

        let mut response = Envelope::new(EnvelopeType::PeerList, now_millis());
        response.room_id = Some(room_id.clone());
        response.request_id = envelope.request_id;
        response.payload = Some(serde_json::to_value(PeerListPayload { room_id, peers }).unwrap());
        let _ = peer.send(to_message(&response));
    }

    fn broadcast_to_room(&self, room_id: &str, exclude: &str, envelope: &Envelope) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };

        let message = to_message(envelope);
        for member_id in room.members() {
            if member_id == exclude {
                continue;
            }
            if let Some(member) = self.registry.get(&member_id) {
                let _ = member.send(message.clone());
            }
        }
    }

    /// Removes a disconnected peer from the registry and, if it was in a
    /// room, notifies the remaining members.
    pub fn disconnect(&self, peer_id: &str) {
        if let Some(peer) = self.registry.unregister(peer_id) {
            if let Some(room_id) = peer.room_id() {
                self.leave_room(peer_id, &room_id);
            }
        }
    }
}
