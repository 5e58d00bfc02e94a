use crate::core::config::AnnounceConfig;
use crate::core::error::AnnounceError;
use crate::models::announce::{AnnounceRequest, AnnounceResponse};
use crate::models::peer::{AnnounceEvent, PeerRecord};
use crate::stores::peer_registry::PeerRegistry;
use crate::utils::time::current_timestamp;
use crate::validation::params::AnnounceParams;
use rand::Rng;
use std::net::IpAddr;
use tracing::{debug, info};

/// Applies announces to a [`PeerRegistry`] and computes what goes back to the client.
///
/// Holds only policy (interval, numwant limits, tracker id); all swarm state
/// lives in the registry handed to each call.
#[derive(Debug, Clone)]
pub struct AnnounceProcessor {
    config: AnnounceConfig,
    tracker_id: String,
}

impl AnnounceProcessor {
    /// Uses the configured tracker id, or generates one for this instance
    pub fn new(config: AnnounceConfig) -> Self {
        let tracker_id = config
            .tracker_id
            .clone()
            .unwrap_or_else(generate_tracker_id);

        Self { config, tracker_id }
    }

    pub fn tracker_id(&self) -> &str {
        &self.tracker_id
    }

    /// Validate raw parameters and apply the announce
    pub fn process(
        &self,
        registry: &PeerRegistry,
        params: &AnnounceParams,
        observed_ip: IpAddr,
    ) -> Result<AnnounceResponse, AnnounceError> {
        let request = params.validate(&self.config, observed_ip)?;
        Ok(self.announce(registry, &request, current_timestamp()))
    }

    /// Apply a validated announce and build the response.
    ///
    /// The mutation, the counts and the peer selection all happen under the
    /// swarm's lock, so the response reflects this announce.
    pub fn announce(
        &self,
        registry: &PeerRegistry,
        request: &AnnounceRequest,
        now: i64,
    ) -> AnnounceResponse {
        let (stats, peers) = registry.with_swarm(&request.info_hash, |swarm| {
            match request.event {
                AnnounceEvent::Stopped => {
                    if swarm.remove(&request.peer_id).is_some() {
                        info!(
                            info_hash = %request.info_hash,
                            peer_id = %request.peer_id,
                            "Peer stopped and removed"
                        );
                    }
                }
                event => {
                    // A completed announce means the client holds everything
                    let left = if event == AnnounceEvent::Completed { 0 } else { request.left };

                    let peer = PeerRecord::new(
                        request.peer_id.clone(),
                        request.ip,
                        request.port,
                        request.uploaded,
                        request.downloaded,
                        left,
                        event,
                        now,
                    );

                    if swarm.upsert(peer) {
                        info!(
                            info_hash = %request.info_hash,
                            peer_id = %request.peer_id,
                            ip = %request.ip,
                            port = request.port,
                            "Peer added"
                        );
                    } else {
                        debug!(
                            info_hash = %request.info_hash,
                            peer_id = %request.peer_id,
                            event = event.as_str(),
                            "Peer updated"
                        );
                    }
                }
            }

            // Stopped peers get counts only
            let peers = match request.event {
                AnnounceEvent::Stopped => Vec::new(),
                _ => swarm.select_peers(&request.peer_id, request.numwant),
            };

            (swarm.stats(), peers)
        });

        debug!(
            info_hash = %request.info_hash,
            seeders = stats.complete,
            leechers = stats.incomplete,
            peers_returned = peers.len(),
            "Announce processed"
        );

        AnnounceResponse {
            interval: self.config.interval,
            complete: stats.complete,
            incomplete: stats.incomplete,
            tracker_id: self.tracker_id.clone(),
            peers,
        }
    }
}

fn generate_tracker_id() -> String {
    let bytes: [u8; 10] = rand::rng().random();
    hex::encode(bytes)
}
