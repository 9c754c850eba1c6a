//! Simultaneous UDP hole punching (C4): given a local [`nat::Mapping`] and
//! a remote peer's candidates, opens a certified bidirectional path.

pub mod engine;
pub mod error;

pub use engine::{punch_with_retry, Connection, PeerInfo, PunchConfig, Puncher};
pub use error::PunchError;
