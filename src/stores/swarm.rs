use crate::models::announce::{AnnouncePeer, SwarmStats};
use crate::models::peer::{PeerId, PeerRecord};
use crate::utils::time::is_expired;
use rand::seq::IteratorRandom;
use std::collections::HashMap;
use tracing::error;

/// Peers of a single torrent plus their seeder/leecher counts.
///
/// Counts are maintained incrementally on every upsert and removal and are
/// checked against membership afterwards.
#[derive(Debug, Default)]
pub struct Swarm {
    peers: HashMap<PeerId, PeerRecord>,
    complete: u32,
    incomplete: u32,
    /// Set once the swarm has been pruned from the registry
    retired: bool,
}

impl Swarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer or overwrite its previous record.
    ///
    /// Returns `true` when the peer was not part of the swarm before.
    pub fn upsert(&mut self, peer: PeerRecord) -> bool {
        let is_seeder = peer.is_seeder();
        let previous = self.peers.insert(peer.peer_id.clone(), peer);

        if let Some(old) = &previous {
            self.uncount(old.is_seeder());
        }
        self.count(is_seeder);
        self.check_counts();

        previous.is_none()
    }

    /// Remove a peer, no-op if it is not in the swarm
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<PeerRecord> {
        let removed = self.peers.remove(peer_id);

        if let Some(peer) = &removed {
            self.uncount(peer.is_seeder());
        }
        self.check_counts();

        removed
    }

    /// Drop peers whose last announce is more than `timeout` seconds before `now`
    pub fn remove_stale(&mut self, timeout: i64, now: i64) -> usize {
        let before = self.peers.len();
        self.peers
            .retain(|_, peer| !is_expired(peer.last_announce, timeout, now));
        let removed = before - self.peers.len();

        if removed > 0 {
            self.recount();
        }

        removed
    }

    /// Random sample of at most `numwant` peers, never including `exclude`
    pub fn select_peers(&self, exclude: &PeerId, numwant: usize) -> Vec<AnnouncePeer> {
        if numwant == 0 {
            return Vec::new();
        }

        let mut rng = rand::rng();
        self.peers
            .values()
            .filter(|peer| peer.peer_id != *exclude)
            .choose_multiple(&mut rng, numwant)
            .into_iter()
            .map(|peer| AnnouncePeer {
                peer_id: peer.peer_id.clone(),
                ip: peer.ip,
                port: peer.port,
            })
            .collect()
    }

    pub fn stats(&self) -> SwarmStats {
        SwarmStats {
            complete: self.complete,
            incomplete: self.incomplete,
        }
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerRecord> {
        self.peers.get(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired
    }

    fn count(&mut self, is_seeder: bool) {
        if is_seeder {
            self.complete += 1;
        } else {
            self.incomplete += 1;
        }
    }

    fn uncount(&mut self, is_seeder: bool) {
        if is_seeder {
            self.complete = self.complete.saturating_sub(1);
        } else {
            self.incomplete = self.incomplete.saturating_sub(1);
        }
    }

    fn recount(&mut self) {
        let complete = self.peers.values().filter(|peer| peer.is_seeder()).count();
        self.complete = complete as u32;
        self.incomplete = (self.peers.len() - complete) as u32;
    }

    // Fatal in debug builds, healed from membership in release builds
    fn check_counts(&mut self) {
        let counted = self.complete as usize + self.incomplete as usize;
        let members = self.peers.len();
        debug_assert_eq!(counted, members, "swarm counts out of sync with membership");

        if counted != members {
            error!(
                complete = self.complete,
                incomplete = self.incomplete,
                members,
                "Swarm counts out of sync, recomputing"
            );
            self.recount();
        }
    }
}
