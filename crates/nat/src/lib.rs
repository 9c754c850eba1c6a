//! STUN-based public endpoint discovery (C2) and NAT behavior
//! classification (C3), plus the [`Endpoint`]/[`Mapping`]/[`NatType`]
//! data model shared with the hole-punching engine.

pub mod classifier;
pub mod client;
pub mod endpoint;
pub mod error;

pub use classifier::{classify, classify_with_retry};
pub use client::{DiscoveryRecord, StunClient};
pub use endpoint::{compatible, Endpoint, Mapping, NatType};
pub use error::{ClassifyError, DiscoveryError};
