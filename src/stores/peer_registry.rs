use crate::models::announce::SwarmStats;
use crate::models::peer::InfoHash;
use crate::stores::swarm::Swarm;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory registry of every swarm the tracker knows about.
///
/// Each swarm sits behind its own lock, so announces for different torrents
/// never contend once the map lookup is done. Swarms are created lazily and
/// pruned once empty.
pub struct PeerRegistry {
    swarms: DashMap<InfoHash, Arc<Mutex<Swarm>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            swarms: DashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            swarms: DashMap::with_capacity(capacity),
        }
    }

    /// Run `f` with exclusive access to the swarm of `info_hash`, creating it if needed.
    ///
    /// The swarm is pruned afterwards if `f` left it empty.
    pub fn with_swarm<R>(&self, info_hash: &InfoHash, f: impl FnOnce(&mut Swarm) -> R) -> R {
        let (result, now_empty) = loop {
            let swarm = Arc::clone(self.swarms.entry(info_hash.clone()).or_default().value());
            let mut guard = swarm.lock();

            // Lost a race with prune, the map no longer points at this swarm
            if guard.is_retired() {
                continue;
            }

            let result = f(&mut guard);
            break (result, guard.is_empty());
        };

        if now_empty {
            self.prune(info_hash);
        }

        result
    }

    /// Current counts for a torrent; unknown torrents report an empty swarm
    #[cfg(test)]
    pub(crate) fn get_stats(&self, info_hash: &InfoHash) -> SwarmStats {
        let swarm = self.swarms.get(info_hash).map(|entry| Arc::clone(entry.value()));
        swarm.map_or_else(SwarmStats::default, |swarm| swarm.lock().stats())
    }

    /// Remove the swarm of `info_hash` if it has no peers left
    pub fn prune(&self, info_hash: &InfoHash) -> bool {
        self.swarms
            .remove_if(info_hash, |_, swarm| {
                let mut guard = swarm.lock();
                if guard.is_empty() {
                    guard.retire();
                    true
                } else {
                    false
                }
            })
            .is_some()
    }

    /// Clean up stale peers that haven't announced within the timeout period
    pub fn cleanup_stale_peers(&self, timeout: i64, now: i64) -> usize {
        let mut removed_count = 0;

        for (info_hash, swarm) in self.snapshot() {
            let now_empty = {
                let mut guard = swarm.lock();
                removed_count += guard.remove_stale(timeout, now);
                guard.is_empty()
            };

            if now_empty {
                self.prune(&info_hash);
            }
        }

        removed_count
    }

    /// Get the total number of active peers across all torrents
    pub fn total_peers(&self) -> usize {
        self.snapshot()
            .into_iter()
            .map(|(_, swarm)| swarm.lock().len())
            .sum()
    }

    /// Seeder and leecher totals across all torrents
    pub fn total_stats(&self) -> SwarmStats {
        self.snapshot()
            .into_iter()
            .fold(SwarmStats::default(), |mut acc, (_, swarm)| {
                let stats = swarm.lock().stats();
                acc.complete += stats.complete;
                acc.incomplete += stats.incomplete;
                acc
            })
    }

    /// Get the number of torrents with active peers
    pub fn active_torrents(&self) -> usize {
        self.swarms.len()
    }

    // Lock order is map shard then swarm; callers lock swarms only after the shard is released
    fn snapshot(&self) -> Vec<(InfoHash, Arc<Mutex<Swarm>>)> {
        self.swarms
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer::{AnnounceEvent, PeerId, PeerRecord};
    use std::net::{IpAddr, Ipv4Addr};

    fn create_test_peer(id: u8, left: u64, last_announce: i64) -> PeerRecord {
        PeerRecord::new(
            PeerId(vec![id; 20]),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
            6881,
            0,
            0,
            left,
            AnnounceEvent::Started,
            last_announce,
        )
    }

    #[test]
    fn test_swarm_created_lazily() {
        let registry = PeerRegistry::new();
        let info_hash = InfoHash(vec![1; 20]);

        assert_eq!(registry.active_torrents(), 0);
        assert_eq!(registry.get_stats(&info_hash), SwarmStats::default());

        registry.with_swarm(&info_hash, |swarm| swarm.upsert(create_test_peer(1, 10, 0)));

        assert_eq!(registry.active_torrents(), 1);
        assert_eq!(registry.get_stats(&info_hash), SwarmStats { complete: 0, incomplete: 1 });
    }

    #[test]
    fn test_empty_swarm_is_pruned() {
        let registry = PeerRegistry::new();
        let info_hash = InfoHash(vec![1; 20]);

        registry.with_swarm(&info_hash, |swarm| swarm.upsert(create_test_peer(1, 10, 0)));
        registry.with_swarm(&info_hash, |swarm| swarm.remove(&PeerId(vec![1; 20])));

        assert_eq!(registry.active_torrents(), 0);

        // Looking at a torrent nobody announced must not leave an entry behind
        let len = registry.with_swarm(&info_hash, |swarm| swarm.len());
        assert_eq!(len, 0);
        assert_eq!(registry.active_torrents(), 0);
    }

    #[test]
    fn test_prune_keeps_populated_swarm() {
        let registry = PeerRegistry::new();
        let info_hash = InfoHash(vec![1; 20]);

        registry.with_swarm(&info_hash, |swarm| swarm.upsert(create_test_peer(1, 10, 0)));

        assert!(!registry.prune(&info_hash));
        assert_eq!(registry.total_peers(), 1);
    }

    #[test]
    fn test_cleanup_stale_peers() {
        let registry = PeerRegistry::new();
        let hash1 = InfoHash(vec![1; 20]);
        let hash2 = InfoHash(vec![2; 20]);
        let now = 10_000;

        registry.with_swarm(&hash1, |swarm| {
            swarm.upsert(create_test_peer(1, 0, now - 100));
            swarm.upsert(create_test_peer(2, 10, now - 2000));
        });
        registry.with_swarm(&hash2, |swarm| {
            swarm.upsert(create_test_peer(3, 0, now - 5000));
        });

        let removed = registry.cleanup_stale_peers(1000, now);
        assert_eq!(removed, 2);

        assert_eq!(registry.get_stats(&hash1), SwarmStats { complete: 1, incomplete: 0 });
        assert_eq!(registry.active_torrents(), 1);
        assert_eq!(registry.total_peers(), 1);
    }

    #[test]
    fn test_cleanup_no_stale_peers() {
        let registry = PeerRegistry::new();
        let info_hash = InfoHash(vec![1; 20]);
        let now = 10_000;

        registry.with_swarm(&info_hash, |swarm| {
            swarm.upsert(create_test_peer(1, 0, now - 100));
            swarm.upsert(create_test_peer(2, 10, now - 200));
        });

        assert_eq!(registry.cleanup_stale_peers(1000, now), 0);
        assert_eq!(registry.get_stats(&info_hash), SwarmStats { complete: 1, incomplete: 1 });
    }

    #[test]
    fn test_totals_across_torrents() {
        let registry = PeerRegistry::new();

        for i in 0u8..3 {
            registry.with_swarm(&InfoHash(vec![1; 20]), |swarm| swarm.upsert(create_test_peer(i, 10, 0)));
        }
        for i in 3u8..5 {
            registry.with_swarm(&InfoHash(vec![2; 20]), |swarm| swarm.upsert(create_test_peer(i, 0, 0)));
        }

        assert_eq!(registry.total_peers(), 5);
        assert_eq!(registry.active_torrents(), 2);
        assert_eq!(registry.total_stats(), SwarmStats { complete: 2, incomplete: 3 });
    }

    #[test]
    fn test_concurrent_first_announces_share_one_swarm() {
        let registry = PeerRegistry::new();
        let info_hash = InfoHash(vec![7; 20]);

        std::thread::scope(|scope| {
            for i in 0u8..32 {
                let registry = &registry;
                let info_hash = &info_hash;
                scope.spawn(move || {
                    registry.with_swarm(info_hash, |swarm| swarm.upsert(create_test_peer(i, 10, 0)));
                });
            }
        });

        assert_eq!(registry.active_torrents(), 1);
        assert_eq!(registry.get_stats(&info_hash).total(), 32);
    }

    #[test]
    fn test_concurrent_join_and_leave_loses_no_update() {
        let registry = PeerRegistry::new();
        let info_hash = InfoHash(vec![8; 20]);

        // One peer churns (join/leave, pruning the swarm each time) while others join
        std::thread::scope(|scope| {
            let registry = &registry;
            let info_hash = &info_hash;
            scope.spawn(move || {
                for _ in 0..200 {
                    registry.with_swarm(info_hash, |swarm| swarm.upsert(create_test_peer(255, 10, 0)));
                    registry.with_swarm(info_hash, |swarm| swarm.remove(&PeerId(vec![255; 20])));
                }
            });
            for i in 0u8..16 {
                scope.spawn(move || {
                    registry.with_swarm(info_hash, |swarm| swarm.upsert(create_test_peer(i, 10, 0)));
                });
            }
        });

        assert_eq!(registry.get_stats(&info_hash).total(), 16);
        assert_eq!(registry.total_peers(), 16);
    }
}
