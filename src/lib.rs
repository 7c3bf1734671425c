#![forbid(unsafe_code)]

//! # healthwatch
//!
//! The probe pipeline for a parallel health-probe supervisor: a jittered
//! scheduler, per-service retry and backoff, a concurrency gate, a keep-alive
//! HTTP layer with proxy support, a response normalizer, and a bounded
//! observation store with a percentile aggregator.
//!
//! Configuration parsing, CLI argument handling, TUI rendering, and output
//! serialization live outside this crate — it consumes a validated service
//! list and parameter bundle and produces `AggregateResult` snapshots plus
//! per-service observation history for those surfaces to render.
//!
//! ## Quick start
//!
//! ```no_run
//! use healthwatch::{Orchestrator, OrchestratorConfig, Parameters, Service};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() {
//!     let services = vec![Service {
//!         name: "api".to_string(),
//!         url: "https://api.example.com/health".to_string(),
//!         expect_status: None,
//!         tags: Default::default(),
//!         headers: Default::default(),
//!         proxy: None,
//!         timeout_ms: None,
//!     }];
//!
//!     let orchestrator = Orchestrator::new(
//!         OrchestratorConfig { services, params: Parameters::default(), history_capacity: 50 },
//!         std::env::vars().collect::<HashMap<_, _>>(),
//!     )
//!     .expect("valid configuration");
//!
//!     let mut aggregates = orchestrator.subscribe();
//!     orchestrator.start();
//!
//!     if let Ok(result) = aggregates.recv().await {
//!         println!("fleet status: {:?}", result.status);
//!     }
//!     orchestrator.shutdown();
//! }
//! ```

mod backoff;
mod clock;
mod duration;
mod error;
mod gate;
mod http;
mod model;
mod normalize;
mod orchestrator;
mod redact;
mod retry;
mod scheduler;
mod sleeper;
mod status;
mod store;

pub use backoff::{BackoffError, ExponentialBackoff, ExponentialBackoffBuilder, ServiceBackoff};
pub use clock::{Clock, FakeClock, SystemClock};
pub use duration::parse_duration;
pub use error::HealthError;
pub use gate::ConcurrencyGate;
pub use http::{
    http_request, CancelHandle, CancelSignal, DebugRecord, DebugSink, HttpRequestSpec,
    HttpResponseData, KeepAlivePool, KeepAlivePoolConfig, NullDebugSink, ProxyAgentCache,
    TracingDebugSink,
};
pub use model::{
    AggregateResult, Headers, LatencySummary, Observation, Parameters, Service, ServiceSnapshot,
    Timings,
};
pub use normalize::{normalize_status, resolve_latency, ResolvedLatency};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use redact::{redact_map, redact_url_credentials, REDACTED};
pub use retry::{retry, RetryConfig};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use status::{aggregate_status, MissingStatusPolicy, Status};
pub use store::{aggregate, ObservationStore};
