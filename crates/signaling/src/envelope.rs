//! The JSON-over-WebSocket envelope carried between signaling peers.

use serde::{Deserialize, Serialize};

use crate::error::SignalingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvelopeType {
    Join,
    Leave,
    Offer,
    Answer,
    Candidate,
    Discover,
    KeepAlive,
    PeerJoined,
    PeerLeft,
    PeerList,
    Error,
    Ack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Envelope {
    pub fn new(kind: EnvelopeType, timestamp: u64) -> Self {
        Self {
            kind,
            peer_id: None,
            target_id: None,
            room_id: None,
            payload: None,
            timestamp,
            request_id: None,
        }
    }

    pub fn error(code: &SignalingError, timestamp: u64, message: impl Into<String>, request_id: Option<String>) -> Self {
        let mut envelope = Self::new(EnvelopeType::Error, timestamp);
        envelope.payload = Some(serde_json::json!({
            "code": code.code(),
            "message": message.into(),
        }));
        envelope.request_id = request_id;
        envelope
    }

    pub fn ack(timestamp: u64, request_id: Option<String>) -> Self {
        let mut envelope = Self::new(EnvelopeType::Ack, timestamp);
        envelope.request_id = request_id;
        envelope
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEndpoint {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSummary {
    pub peer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<WireEndpoint>,
    pub joined_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerListPayload {
    pub room_id: String,
    pub peers: Vec<PeerSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_optional_fields() {
        let envelope = Envelope::new(EnvelopeType::KeepAlive, 1_700_000_000_000);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("peer_id"));
        assert!(!json.contains("target_id"));
        assert_eq!(json, r#"{"type":"KEEP_ALIVE","timestamp":1700000000000}"#);
    }

    #[test]
    fn envelope_type_matches_wire_names() {
        let kinds = [
            (EnvelopeType::Join, "\"JOIN\""),
            (EnvelopeType::PeerJoined, "\"PEER_JOINED\""),
            (EnvelopeType::Candidate, "\"CANDIDATE\""),
        ];

        for (kind, expected) in kinds {
            assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
        }
    }

    #[test]
    fn offer_envelope_round_trips_through_json() {
        let raw = r#"{
            "type": "OFFER",
            "target_id": "b",
            "payload": {"endpoint": {"ip": "203.0.113.5", "port": 4242}, "session_id": "s1", "initiator_id": "a"},
            "timestamp": 1700000000000
        }"#;

        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.kind, EnvelopeType::Offer);
        assert_eq!(envelope.target_id.as_deref(), Some("b"));
        assert!(envelope.payload.is_some());
    }
}
