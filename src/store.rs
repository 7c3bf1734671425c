//! Per-service bounded observation history and the fleet aggregator.

use crate::model::{AggregateResult, LatencySummary, Observation, ServiceSnapshot};
use crate::status::aggregate_status;
use std::collections::{HashMap, VecDeque};

/// Mapping from service name to a bounded ordered sequence. Single-writer
/// (the orchestrator); readers obtain snapshots via [`Self::history`] /
/// [`Self::latest`].
#[derive(Debug)]
pub struct ObservationStore {
    capacity: usize,
    series: HashMap<String, VecDeque<Observation>>,
}

impl ObservationStore {
    /// `capacity` must be > 0.
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), series: HashMap::new() }
    }

    /// Appends `obs`; drops the oldest entry for that service on overflow.
    pub fn add(&mut self, obs: Observation) {
        let queue = self.series.entry(obs.service_name.clone()).or_default();
        queue.push_back(obs);
        while queue.len() > self.capacity {
            queue.pop_front();
        }
    }

    /// Copy of the full retained sequence for `name`, oldest first.
    pub fn history(&self, name: &str) -> Vec<Observation> {
        self.series.get(name).map(|q| q.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn latest(&self, name: &str) -> Option<Observation> {
        self.series.get(name).and_then(|q| q.back().cloned())
    }

    /// Names of every service with at least one observation.
    pub fn service_names(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }
}

/// Builds a snapshot from the latest observation per service, computes
/// fleet status, and summarizes latency percentiles over the latest
/// finite latencies.
pub fn aggregate(store: &ObservationStore, started_at: u64, completed_at: u64) -> AggregateResult {
    let mut results: Vec<ServiceSnapshot> = Vec::new();
    for name in store.service_names() {
        if let Some(latest) = store.latest(&name) {
            let age_ms = completed_at.saturating_sub(latest.checked_at);
            results.push(ServiceSnapshot { observation: latest, age_ms });
        }
    }
    results.sort_by(|a, b| a.observation.service_name.cmp(&b.observation.service_name));

    let status = aggregate_status(results.iter().map(|r| r.observation.status));

    let mut latencies: Vec<f64> =
        results.iter().filter_map(|r| r.observation.latency_ms).filter(|v| v.is_finite()).collect();
    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let latency = LatencySummary {
        p50: percentile(&latencies, 0.50),
        p95: percentile(&latencies, 0.95),
        p99: percentile(&latencies, 0.99),
    };

    AggregateResult { status, results, started_at, completed_at, latency }
}

/// Sorted-ascending input assumed. Linear interpolation between neighbors
/// at position `p * (n - 1)`.
fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
