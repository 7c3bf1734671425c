//! The probe orchestrator: ties the scheduler, concurrency gate, retry
//! harness, HTTP layer, normalizer, and observation store together into the
//! Drives one probe cycle per scheduler tick.

use crate::backoff::{ExponentialBackoff, ServiceBackoff};
use crate::clock::{Clock, SystemClock};
use crate::error::HealthError;
use crate::gate::ConcurrencyGate;
use crate::http::{
    http_request, DebugSink, HttpRequestSpec, KeepAlivePool, KeepAlivePoolConfig, NullDebugSink,
    ProxyAgentCache, TracingDebugSink,
};
use crate::model::{AggregateResult, Headers, Observation, Parameters, Service};
use crate::normalize::{normalize_status, resolve_latency};
use crate::retry::{retry, RetryConfig};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::status::Status;
use crate::store::{aggregate, ObservationStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Inputs to [`Orchestrator::new`].
pub struct OrchestratorConfig {
    pub services: Vec<Service>,
    pub params: Parameters,
    /// Per-service observation history capacity.
    pub history_capacity: usize,
}

/// Default initial delay / growth factor for the within-cycle retry
/// harness's backoff. `Parameters` only exposes a retry *count*; these
/// constants match the defaults documented for `ExponentialBackoff`
/// itself and are not separately configurable at this layer.
const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(200);
const RETRY_FACTOR: f64 = 2.0;

/// Default service-backoff ladder ceiling and growth factor.
const SERVICE_BACKOFF_MAX_MULTIPLIER: u32 = 4;
const SERVICE_BACKOFF_GROWTH_FACTOR: u32 = 2;

/// Owns the canonical service list and every piece of shared mutable state
/// (`ObservationStore`, `ServiceBackoff`, per-service countdowns). Only this
/// type's own cycle method mutates them, under a lock held only across the
/// cycle-boundary bookkeeping, never across I/O.
pub struct Orchestrator {
    services: Vec<Service>,
    params: Parameters,
    pool: KeepAlivePool,
    proxy_cache: ProxyAgentCache,
    debug_sink: Arc<dyn DebugSink>,
    gate: ConcurrencyGate,
    store: Mutex<ObservationStore>,
    service_backoff: ServiceBackoff,
    countdown: Mutex<HashMap<String, u32>>,
    clock: Arc<dyn Clock>,
    cycle_running: AtomicBool,
    aggregate_tx: broadcast::Sender<AggregateResult>,
    env: HashMap<String, String>,
    scheduler: Scheduler,
    self_handle: std::sync::OnceLock<std::sync::Weak<Orchestrator>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, env: HashMap<String, String>) -> Result<Arc<Self>, HealthError> {
        Self::new_with_clock(config, env, Arc::new(SystemClock))
    }

    pub fn new_with_clock(
        config: OrchestratorConfig,
        env: HashMap<String, String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, HealthError> {
        let params = config.params;
        let pool_config = KeepAlivePoolConfig {
            insecure: params.insecure,
            connect_timeout: Duration::from_millis(params.timeout_ms),
            ..KeepAlivePoolConfig::default()
        };
        let pool = KeepAlivePool::new(pool_config)?;
        let proxy_cache = ProxyAgentCache::new(Duration::from_millis(params.timeout_ms));
        let debug_sink: Arc<dyn DebugSink> =
            if params.debug { Arc::new(TracingDebugSink) } else { Arc::new(NullDebugSink) };
        let gate =
            if params.concurrency == 0 { ConcurrencyGate::unlimited() } else { ConcurrencyGate::new(params.concurrency) };
        let scheduler = Scheduler::new(SchedulerConfig {
            interval: Duration::from_millis(params.interval_ms),
            ..SchedulerConfig::default()
        });
        let (aggregate_tx, _) = broadcast::channel(16);

        let orchestrator = Arc::new(Self {
            services: config.services,
            params,
            pool,
            proxy_cache,
            debug_sink,
            gate,
            store: Mutex::new(ObservationStore::new(config.history_capacity)),
            service_backoff: ServiceBackoff::new(SERVICE_BACKOFF_MAX_MULTIPLIER, SERVICE_BACKOFF_GROWTH_FACTOR),
            countdown: Mutex::new(HashMap::new()),
            clock,
            cycle_running: AtomicBool::new(false),
            aggregate_tx,
            env,
            scheduler,
            self_handle: std::sync::OnceLock::new(),
        });
        let _ = orchestrator.self_handle.set(Arc::downgrade(&orchestrator));

        let handler_orchestrator = orchestrator.clone();
        orchestrator.scheduler.on_tick(move || {
            let orchestrator = handler_orchestrator.clone();
            Box::pin(async move {
                orchestrator.run_cycle().await;
            })
        });

        Ok(orchestrator)
    }

    /// Recovers an owned `Arc` handle to this orchestrator from `&self`, for
    /// spawning `'static` probe tasks. Always succeeds: the only way to
    /// obtain an `Orchestrator` is [`Orchestrator::new`], which sets this
    /// handle before ever handing out a reference.
    fn arc_self(&self) -> Arc<Self> {
        self.self_handle
            .get()
            .and_then(std::sync::Weak::upgrade)
            .expect("orchestrator is always constructed via Arc::new")
    }

    pub fn start(&self) {
        self.scheduler.start();
    }

    pub fn pause(&self) {
        self.scheduler.pause();
    }

    pub fn resume(&self) {
        self.scheduler.resume();
    }

    /// Stops the scheduler and closes the keep-alive pool. Idempotent.
    pub fn shutdown(&self) {
        self.scheduler.stop();
        self.pool.close();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AggregateResult> {
        self.aggregate_tx.subscribe()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Runs exactly one cycle regardless of the scheduler's state, for the
    /// one-shot `check` surface. Bypasses the overlap guard since nothing
    /// else should be running concurrently in that mode.
    pub async fn run_once(&self) -> AggregateResult {
        self.run_cycle().await.unwrap_or_else(|| {
            let now = self.clock.now_millis();
            let store = self.store.lock().unwrap_or_else(|p| p.into_inner());
            aggregate(&store, now, now)
        })
    }

    /// One probe cycle: §4.8. Returns `None` if a cycle was already
    /// in-flight (coalesced per §5's overlap prohibition).
    async fn run_cycle(&self) -> Option<AggregateResult> {
        if self.cycle_running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            tracing::warn!("previous cycle still running; coalescing this tick");
            return None;
        }

        let started_at = self.clock.now_millis();
        tracing::info!(started_at, "probe cycle starting");

        let eligible: Vec<Service> = {
            let mut countdown = self.countdown.lock().unwrap_or_else(|p| p.into_inner());
            self.services.iter().filter(|svc| is_probe_due(&mut countdown, &svc.name)).cloned().collect()
        };

        let mut join_set = JoinSet::new();
        for service in eligible {
            let orchestrator = self.arc_self();
            join_set.spawn(async move { orchestrator.probe_through_gate(service).await });
        }

        let mut observations = Vec::with_capacity(join_set.len());
        while let Some(outcome) = join_set.join_next().await {
            match outcome {
                Ok(obs) => observations.push(obs),
                Err(join_err) => tracing::warn!(error = %join_err, "probe task panicked"),
            }
        }

        {
            let mut store = self.store.lock().unwrap_or_else(|p| p.into_inner());
            let mut countdown = self.countdown.lock().unwrap_or_else(|p| p.into_inner());
            for obs in &observations {
                store.add(obs.clone());
                apply_backoff_transition(&self.service_backoff, &mut countdown, obs);
            }
        }

        let completed_at = self.clock.now_millis();
        let result = {
            let store = self.store.lock().unwrap_or_else(|p| p.into_inner());
            aggregate(&store, started_at, completed_at)
        };
        tracing::info!(
            status = %result.status,
            services = result.results.len(),
            duration_ms = completed_at.saturating_sub(started_at),
            "probe cycle finished"
        );
        let _ = self.aggregate_tx.send(result.clone());

        self.cycle_running.store(false, Ordering::SeqCst);
        Some(result)
    }

    async fn probe_through_gate(self: Arc<Self>, service: Service) -> Observation {
        let orchestrator = self.clone();
        self.gate.run(move || orchestrator.run_probe_job(service)).await
    }

    async fn run_probe_job(self: Arc<Self>, service: Service) -> Observation {
        let checked_at = self.clock.now_millis();
        let timeout = Duration::from_millis(service.timeout_ms.unwrap_or(self.params.timeout_ms));
        let headers = merge_headers(&self.params.headers, &service.headers);

        let backoff =
            ExponentialBackoff::builder(RETRY_INITIAL_DELAY).factor(RETRY_FACTOR).build().expect(
                "fixed retry backoff constants are always valid",
            );
        let retry_config = RetryConfig::new(self.params.retries, backoff);

        let job_self = self.clone();
        let job_service = service.clone();
        let result = retry(&retry_config, move |attempt| {
            let job_self = job_self.clone();
            let job_service = job_service.clone();
            let headers = headers.clone();
            async move { job_self.attempt_probe(&job_service, attempt, timeout, &headers).await }
        })
        .await;

        match result {
            Ok(observation) => observation,
            Err(err) => Observation {
                service_name: service.name.clone(),
                status: Status::Down,
                http_status: None,
                latency_ms: None,
                timings: None,
                checked_at,
                payload: None,
                error: Some(err.to_string()),
                version: None,
                region: None,
                url: Some(service.url.clone()),
            },
        }
    }

    async fn attempt_probe(
        &self,
        service: &Service,
        attempt: usize,
        timeout: Duration,
        headers: &Headers,
    ) -> Result<Observation, HealthError> {
        let checked_at = self.clock.now_millis();
        let started = Instant::now();

        let spec = HttpRequestSpec {
            url: &service.url,
            method: "GET",
            headers,
            body: None,
            timeout: Some(timeout),
            cancel: None,
            proxy: service.proxy.as_deref().or(self.params.proxy.as_deref()),
            insecure: self.params.insecure,
            pool: Some(&self.pool),
            proxy_cache: Some(&self.proxy_cache),
            env: &self.env,
            debug_sink: Some(self.debug_sink.as_ref()),
        };

        let response =
            http_request(spec).await.map_err(|e| promote_to_service_probe(service, attempt, e))?;
        let measured_latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let body_text = String::from_utf8_lossy(&response.body).into_owned();
        let payload: Option<Value> = if body_text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&body_text).map_err(|e| HealthError::ServiceProbe {
                service_name: service.name.clone(),
                attempt,
                url: service.url.clone(),
                expectation: service.expect_status.map(|s| s.to_string()),
                cause: format!("invalid JSON body: {e}"),
            })?
        };

        let status =
            normalize_status(Some(response.status_code), payload.as_ref(), self.params.missing_status_policy);

        if let Some(expected) = service.expect_status {
            if status != expected {
                return Err(HealthError::ServiceExpectation {
                    service_name: service.name.clone(),
                    attempt,
                    url: service.url.clone(),
                    expected: expected.to_string(),
                    actual: status.to_string(),
                });
            }
        }

        let resolved = resolve_latency(payload.as_ref(), Some(measured_latency_ms));
        let version = payload.as_ref().and_then(|p| p.get("version")).and_then(Value::as_str).map(str::to_string);
        let region = payload.as_ref().and_then(|p| p.get("region")).and_then(Value::as_str).map(str::to_string);

        Ok(Observation {
            service_name: service.name.clone(),
            status,
            http_status: Some(response.status_code),
            latency_ms: Some(resolved.latency_ms),
            timings: resolved.timings,
            checked_at,
            payload,
            error: None,
            version,
            region,
            url: Some(service.url.clone()),
        })
    }
}

/// Service headers overlay the run's default headers (service wins on
/// name collision).
fn merge_headers(defaults: &Headers, service_overrides: &Headers) -> Headers {
    let mut merged = defaults.clone();
    merged.extend(service_overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Wraps a lower-layer error (timeout/transport/protocol) with per-service
/// context, as required by §7's `ServiceProbeError`. Leaves errors that
/// already carry that context, or cancellations, unchanged.
fn promote_to_service_probe(service: &Service, attempt: usize, err: HealthError) -> HealthError {
    match err {
        HealthError::Cancelled { .. }
        | HealthError::ServiceProbe { .. }
        | HealthError::ServiceExpectation { .. } => err,
        other => HealthError::ServiceProbe {
            service_name: service.name.clone(),
            attempt,
            url: service.url.clone(),
            expectation: service.expect_status.map(|s| s.to_string()),
            cause: other.to_string(),
        },
    }
}

/// Decrements `name`'s countdown and reports whether it has reached zero
/// (i.e. whether this tick should actually probe it). Spec §4.8's "per
/// service interval widening".
fn is_probe_due(countdown: &mut HashMap<String, u32>, name: &str) -> bool {
    let remaining = countdown.get(name).copied().unwrap_or(0);
    if remaining > 0 {
        countdown.insert(name.to_string(), remaining - 1);
        false
    } else {
        true
    }
}

/// Applies one observation's outcome to the service-backoff ladder and the
/// per-service countdown. Only `down` escalates the multiplier; `degraded`
/// keeps the existing multiplier (and re-arms the countdown against it);
/// `ok` resets both.
fn apply_backoff_transition(service_backoff: &ServiceBackoff, countdown: &mut HashMap<String, u32>, obs: &Observation) {
    match obs.status {
        Status::Down => {
            let multiplier = service_backoff.record_failure(&obs.service_name);
            countdown.insert(obs.service_name.clone(), multiplier.saturating_sub(1));
        }
        Status::Degraded => {
            let multiplier = service_backoff.get_multiplier(&obs.service_name);
            if multiplier > 1 {
                countdown.insert(obs.service_name.clone(), multiplier - 1);
            }
        }
        Status::Ok => {
            service_backoff.record_success(&obs.service_name);
            countdown.remove(&obs.service_name);
        }
    }
}
