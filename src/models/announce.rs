use crate::models::peer::{AnnounceEvent, InfoHash, PeerId};
use std::net::IpAddr;

/// A fully validated announce request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    /// `ip` query value if present, otherwise the observed connection address
    pub ip: IpAddr,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: AnnounceEvent,
    /// Already clamped to the configured maximum
    pub numwant: usize,
    pub compact: bool,
    pub no_peer_id: bool,
}

/// Seeder and leecher counts of one swarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwarmStats {
    pub complete: u32,
    pub incomplete: u32,
}

impl SwarmStats {
    #[cfg(test)]
    pub(crate) fn total(&self) -> u32 {
        self.complete + self.incomplete
    }
}

/// Peer entry handed back in an announce response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncePeer {
    pub peer_id: PeerId,
    pub ip: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse {
    pub interval: u32,
    pub complete: u32,
    pub incomplete: u32,
    pub tracker_id: String,
    pub peers: Vec<AnnouncePeer>,
}
