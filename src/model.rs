//! The data model shared by the orchestrator, store, and aggregator.

use crate::status::{MissingStatusPolicy, Status};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Case-insensitive header name/value overlay.
pub type Headers = BTreeMap<String, String>;

/// Immutable description of one probed service. Owned canonically by the
/// orchestrator's service list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Service {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub expect_status: Option<Status>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Process-wide parameters, immutable after construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Parameters {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub missing_status_policy: MissingStatusPolicy,
}

fn default_interval_ms() -> u64 {
    15_000
}
fn default_timeout_ms() -> u64 {
    3_000
}
fn default_retries() -> usize {
    1
}
fn default_concurrency() -> usize {
    10
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            concurrency: default_concurrency(),
            headers: Headers::new(),
            proxy: None,
            insecure: false,
            debug: false,
            missing_status_policy: MissingStatusPolicy::default(),
        }
    }
}

/// Latency sub-measurements, when available. Only `total_ms` is required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    pub total_ms: f64,
    pub ttfb_ms: Option<f64>,
    pub dns_ms: Option<f64>,
    pub tcp_ms: Option<f64>,
    pub tls_ms: Option<f64>,
}

/// One probe's outcome record, created by the orchestrator and owned by the
/// [`crate::store::ObservationStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub service_name: String,
    pub status: Status,
    pub http_status: Option<u16>,
    pub latency_ms: Option<f64>,
    pub timings: Option<Timings>,
    /// Wall-clock epoch milliseconds at the moment the probe started.
    pub checked_at: u64,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: Option<String>,
    pub region: Option<String>,
    pub url: Option<String>,
}

/// Per-service metadata attached to a fleet snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub observation: Observation,
    pub age_ms: u64,
}

/// p50/p95/p99 latency summary; empty when no finite latencies exist.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencySummary {
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

/// A cycle's derived summary: fleet status, per-service snapshots, and
/// latency percentiles.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub status: Status,
    pub results: Vec<ServiceSnapshot>,
    pub started_at: u64,
    pub completed_at: u64,
    pub latency: LatencySummary,
}
