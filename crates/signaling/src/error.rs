use std::fmt;

/// Application-level signaling faults, each carrying the wire `code` used
/// in an ERROR envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    InvalidMessage,
    RoomNotFound,
    PeerNotFound,
    NotInRoom,
    AlreadyInRoom,
    RoomFull,
    Unauthorized,
    Internal(String),
}

impl SignalingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessage => "INVALID_MESSAGE",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::PeerNotFound => "PEER_NOT_FOUND",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::AlreadyInRoom => "ALREADY_IN_ROOM",
            Self::RoomFull => "ROOM_FULL",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl std::error::Error for SignalingError {}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            other => write!(f, "{}", other.code()),
        }
    }
}
