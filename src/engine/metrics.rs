// src/engine/metrics.rs
//
// Engine observability. Counts per-subsystem activity; export via logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub samples_ingested: Arc<AtomicU64>,
    pub alerts_emitted: Arc<AtomicU64>,
    pub zone_entries: Arc<AtomicU64>,
    pub zone_exits: Arc<AtomicU64>,
    pub visibility_entries: Arc<AtomicU64>,
    pub visibility_exits: Arc<AtomicU64>,
    pub catalog_reloads: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            samples_ingested: Arc::new(AtomicU64::new(0)),
            alerts_emitted: Arc::new(AtomicU64::new(0)),
            zone_entries: Arc::new(AtomicU64::new(0)),
            zone_exits: Arc::new(AtomicU64::new(0)),
            visibility_entries: Arc::new(AtomicU64::new(0)),
            visibility_exits: Arc::new(AtomicU64::new(0)),
            catalog_reloads: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn sample_rate_hz(&self) -> f64 {
        let samples = self.samples_ingested.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            samples as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            alerts_emitted: self.alerts_emitted.load(Ordering::Relaxed),
            zone_entries: self.zone_entries.load(Ordering::Relaxed),
            zone_exits: self.zone_exits.load(Ordering::Relaxed),
            visibility_entries: self.visibility_entries.load(Ordering::Relaxed),
            visibility_exits: self.visibility_exits.load(Ordering::Relaxed),
            catalog_reloads: self.catalog_reloads.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub samples_ingested: u64,
    pub alerts_emitted: u64,
    pub zone_entries: u64,
    pub zone_exits: u64,
    pub visibility_entries: u64,
    pub visibility_exits: u64,
    pub catalog_reloads: u64,
    pub elapsed_secs: f64,
}
