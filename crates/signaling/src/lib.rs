//! WebSocket room/peer signaling router (C5): forwards OFFER/ANSWER/
//! CANDIDATE envelopes between peers sharing a room and exposes a small
//! REST introspection surface.

pub mod config;
pub mod envelope;
pub mod error;
pub mod janitor;
pub mod registry;
pub mod room;
pub mod router;
pub mod server;

pub use envelope::{Envelope, EnvelopeType};
pub use error::SignalingError;
pub use router::Router;
