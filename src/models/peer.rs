use std::fmt;
use std::net::IpAddr;

/// Opaque torrent identifier as sent by the client (usually the 20-byte SHA-1 of the info dict)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash(pub Vec<u8>);

/// Opaque client identifier, unique per client within a swarm
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub Vec<u8>);

impl InfoHash {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PeerId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Hex is the only readable form for binary hashes in logs
impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl From<&[u8]> for InfoHash {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&[u8]> for PeerId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Announce event; `None` is a plain keep-alive announce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnounceEvent {
    #[default]
    None,
    Started,
    Stopped,
    Completed,
}

impl AnnounceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnounceEvent::None => "none",
            AnnounceEvent::Started => "started",
            AnnounceEvent::Stopped => "stopped",
            AnnounceEvent::Completed => "completed",
        }
    }
}

/// Last-known state of one peer in one swarm
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerRecord {
    pub peer_id: PeerId,
    /// IP address (IPv4 or IPv6)
    pub ip: IpAddr,
    pub port: u16,
    /// Total bytes uploaded
    pub uploaded: u64,
    /// Total bytes downloaded
    pub downloaded: u64,
    /// Bytes left to download (0 for seeders)
    pub left: u64,
    pub last_event: AnnounceEvent,
    /// Unix timestamp of last announce
    pub last_announce: i64,
}

impl PeerRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        peer_id: PeerId,
        ip: IpAddr,
        port: u16,
        uploaded: u64,
        downloaded: u64,
        left: u64,
        last_event: AnnounceEvent,
        last_announce: i64,
    ) -> Self {
        Self {
            peer_id,
            ip,
            port,
            uploaded,
            downloaded,
            left,
            last_event,
            last_announce,
        }
    }

    /// Whether this peer holds the complete data (left == 0)
    pub fn is_seeder(&self) -> bool {
        self.left == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_seeder_derived_from_left() {
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let leecher = PeerRecord::new(PeerId(b"a".to_vec()), ip, 1, 0, 0, 10, AnnounceEvent::Started, 0);
        let seeder = PeerRecord::new(PeerId(b"b".to_vec()), ip, 1, 0, 0, 0, AnnounceEvent::None, 0);

        assert!(!leecher.is_seeder());
        assert!(seeder.is_seeder());
    }

    #[test]
    fn test_info_hash_display_is_hex() {
        let info_hash = InfoHash(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(info_hash.to_string(), "deadbeef");
    }
}
