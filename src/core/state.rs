// Application state (AppState)

use crate::announce::processor::AnnounceProcessor;
use crate::core::config::Config;
use crate::metrics::collector::Metrics;
use crate::stores::peer_registry::PeerRegistry;
use std::sync::Arc;

/// Shared application state
///
/// All fields are wrapped in Arc for cheap cloning into handlers and the
/// cleanup task.
#[derive(Clone)]
pub struct AppState {
    /// Every swarm this tracker knows about
    pub registry: Arc<PeerRegistry>,

    /// Announce policy and tracker id
    pub processor: Arc<AnnounceProcessor>,

    pub metrics: Arc<Metrics>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let processor = AnnounceProcessor::new(config.announce.clone());

        Self {
            registry: Arc::new(PeerRegistry::with_capacity(config.server.torrent_capacity)),
            processor: Arc::new(processor),
            metrics: Arc::new(Metrics::new()),
            config: Arc::new(config),
        }
    }
}
