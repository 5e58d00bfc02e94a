use crate::stores::peer_registry::PeerRegistry;
use crate::utils::time::{current_timestamp, elapsed_seconds};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub total_announces: AtomicU64,
    pub successful_announces: AtomicU64,
    pub failed_announces: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_announces: u64,
    pub successful_announces: u64,
    pub failed_announces: u64,
    pub success_rate: f64,
    pub active_peers: usize,
    pub active_torrents: usize,
    pub seeders: u32,
    pub leechers: u32,
    pub uptime_seconds: i64,
    pub requests_per_second: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_announces: AtomicU64::new(0),
            successful_announces: AtomicU64::new(0),
            failed_announces: AtomicU64::new(0),
            start_time: current_timestamp(),
        }
    }

    pub fn increment_announces(&self) {
        self.total_announces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_successful(&self) {
        self.successful_announces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed_announces.fetch_add(1, Ordering::Relaxed);
    }

    /// Combines the request counters with a live walk of the registry and
    /// derives success_rate, uptime_seconds and requests_per_second.
    pub fn get_snapshot(&self, registry: &PeerRegistry) -> MetricsSnapshot {
        let total_announces = self.total_announces.load(Ordering::Relaxed);
        let successful_announces = self.successful_announces.load(Ordering::Relaxed);
        let failed_announces = self.failed_announces.load(Ordering::Relaxed);

        let success_rate = if total_announces > 0 {
            (successful_announces as f64 / total_announces as f64) * 100.0
        } else {
            0.0
        };

        let uptime_seconds = elapsed_seconds(self.start_time, current_timestamp());

        let requests_per_second = if uptime_seconds > 0 {
            total_announces as f64 / uptime_seconds as f64
        } else {
            0.0
        };

        let totals = registry.total_stats();

        MetricsSnapshot {
            total_announces,
            successful_announces,
            failed_announces,
            success_rate,
            active_peers: registry.total_peers(),
            active_torrents: registry.active_torrents(),
            seeders: totals.complete,
            leechers: totals.incomplete,
            uptime_seconds,
            requests_per_second,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
