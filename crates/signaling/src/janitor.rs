//! Periodic stale-peer and empty-room sweep, driven by a fixed-interval
//! ticker.

use std::{sync::Arc, time::Duration};

use tokio::time::interval;

use crate::router::Router;

pub struct JanitorConfig {
    pub sweep_interval: Duration,
    pub peer_stale_timeout: Duration,
    pub empty_room_ttl: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            peer_stale_timeout: Duration::from_secs(90),
            empty_room_ttl: Duration::from_secs(300),
        }
    }
}

/// Runs until the process exits: drops peers that stopped sending
/// `KEEP_ALIVE` (or any frame) longer than `peer_stale_timeout` ago, and
/// removes rooms that have been empty longer than `empty_room_ttl`.
pub async fn run(router: Arc<Router>, config: JanitorConfig) {
    let mut ticker = interval(config.sweep_interval);

    loop {
        ticker.tick().await;

        let stale = router.registry.stale_peer_ids(config.peer_stale_timeout);
        for peer_id in &stale {
            log::info!("janitor: evicting stale peer [{peer_id}]");
            router.disconnect(peer_id);
        }

        let expired_rooms = router.rooms.expired_room_ids(config.empty_room_ttl);
        for room_id in &expired_rooms {
            log::info!("janitor: removing empty room [{room_id}]");
            router.rooms.remove_room(room_id);
        }
    }
}
