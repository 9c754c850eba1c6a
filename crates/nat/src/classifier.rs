//! C3: drives the STUN client against two independent servers to assign a
//! NAT-type variant.

use crate::{
    client::StunClient,
    endpoint::{Mapping, NatType},
    error::ClassifyError,
};

use std::time::{Duration, Instant};

/// Classifies the local NAT's behavior using two STUN servers on distinct
/// addresses.
///
/// 1. Discover against `primary`. If the socket's local IP equals its
///    observed public IP, the host has a direct public address
///    (`OpenInternet`).
/// 2. Otherwise discover against `secondary`. If the observed public
///    endpoint differs between the two servers, the NAT is `Symmetric`.
/// 3. Otherwise, fall through to the conservative `RestrictedCone`
///    classification: `FullCone` and `PortRestrictedCone` cannot be
///    distinguished without a CHANGE-REQUEST round trip, which this
///    toolkit does not implement.
pub fn classify(client: &StunClient, primary: &str, secondary: &str) -> Result<Mapping, ClassifyError> {
    let first = client.discover(primary)?;

    if first.local_endpoint.ip() == first.public_endpoint.ip() {
        return Ok(Mapping {
            local_endpoint: first.local_endpoint,
            public_endpoint: first.public_endpoint,
            nat_type: NatType::OpenInternet,
            detected_at: Instant::now(),
        });
    }

    let second = client.discover(secondary)?;

    let nat_type = if first.public_endpoint != second.public_endpoint {
        NatType::Symmetric
    } else {
        // Conservative fall-through: a production implementer may extend
        // this with CHANGE-REQUEST to separate FullCone / RestrictedCone /
        // PortRestrictedCone; downstream compatibility checks treat this
        // default conservatively.
        NatType::RestrictedCone
    };

    log::info!(
        "classified local NAT as {:?} (local={}, public={})",
        nat_type,
        first.local_endpoint,
        first.public_endpoint
    );

    Ok(Mapping {
        local_endpoint: first.local_endpoint,
        public_endpoint: first.public_endpoint,
        nat_type,
        detected_at: Instant::now(),
    })
}

/// Re-invokes [`classify`] up to `max_attempts` times with the same
/// backoff schedule as [`StunClient::discover_with_retry`].
pub fn classify_with_retry(
    client: &StunClient,
    primary: &str,
    secondary: &str,
    max_attempts: u32,
) -> Result<Mapping, ClassifyError> {
    let mut last_err = None;

    for attempt in 0..max_attempts.max(1) {
        if attempt > 0 {
            let backoff = Duration::from_secs(2u64.saturating_pow(attempt - 1)).min(Duration::from_secs(10));
            std::thread::sleep(backoff);
        }

        match classify(client, primary, secondary) {
            Ok(mapping) => return Ok(mapping),
            Err(e) => {
                log::warn!("NAT classification attempt {} failed: {}", attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(ClassifyError::Exhausted(Box::new(
        last_err.unwrap_or(ClassifyError::Discovery(crate::error::DiscoveryError::Timeout)),
    )))
}
