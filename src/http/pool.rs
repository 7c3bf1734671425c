//! Long-lived keep-alive client pool: one `reqwest::Client` for plain HTTP,
//! one for HTTPS, both built once at startup and reused for every direct
//! (non-proxied) request.

use crate::error::HealthError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for [`KeepAlivePool::new`].
#[derive(Debug, Clone, Copy)]
pub struct KeepAlivePoolConfig {
    /// Max idle connections kept open per host.
    pub connections: usize,
    pub connect_timeout: Duration,
    /// How long an idle connection is kept before being closed.
    pub keep_alive_timeout: Duration,
    /// Upper bound on a connection's total idle lifetime, closed even if it
    /// keeps getting reused right up to `keep_alive_timeout`. `reqwest`
    /// only exposes a single idle-timeout knob, so this field is carried in
    /// configuration and surfaced to callers but has no distinct effect on
    /// the underlying pool; see DESIGN.md.
    pub keep_alive_max_timeout: Duration,
    /// Skip TLS certificate verification on the HTTPS client. Has no effect
    /// on the HTTP client.
    pub insecure: bool,
}

impl Default for KeepAlivePoolConfig {
    fn default() -> Self {
        Self {
            connections: 10,
            connect_timeout: Duration::from_secs(10),
            keep_alive_timeout: Duration::from_secs(90),
            keep_alive_max_timeout: Duration::from_secs(300),
            insecure: false,
        }
    }
}

/// Two long-lived `reqwest::Client`s, one per scheme, shared across every
/// direct probe. `reqwest::Client` is internally reference-counted and
/// cheap to clone; cloning here just bumps that refcount.
#[derive(Clone)]
pub struct KeepAlivePool {
    http_client: reqwest::Client,
    https_client: reqwest::Client,
    closed: Arc<AtomicBool>,
}

impl KeepAlivePool {
    pub fn new(config: KeepAlivePoolConfig) -> Result<Self, HealthError> {
        let build = |accept_invalid_certs: bool| {
            reqwest::Client::builder()
                .pool_max_idle_per_host(config.connections.max(1))
                .pool_idle_timeout(config.keep_alive_timeout)
                .connect_timeout(config.connect_timeout)
                .danger_accept_invalid_certs(accept_invalid_certs)
                .no_proxy()
                .build()
        };
        let http_client = build(false)
            .map_err(|e| HealthError::internal(format!("failed to build HTTP client: {e}")))?;
        let https_client = build(config.insecure)
            .map_err(|e| HealthError::internal(format!("failed to build HTTPS client: {e}")))?;
        Ok(Self { http_client, https_client, closed: Arc::new(AtomicBool::new(false)) })
    }

    /// Picks the client matching `scheme` ("http" vs anything else, treated
    /// as "https"). Callers are expected to have already rejected
    /// unsupported schemes.
    pub fn client_for_scheme(&self, scheme: &str) -> reqwest::Client {
        if scheme.eq_ignore_ascii_case("http") {
            self.http_client.clone()
        } else {
            self.https_client.clone()
        }
    }

    /// Marks the pool closed. Idempotent. `reqwest` has no explicit drain
    /// API: open connections are released as outstanding requests complete
    /// and the clients are dropped. This flag exists so callers (the
    /// orchestrator's shutdown path) can refuse to start new probes after
    /// a shutdown signal without needing a real handle-draining mechanism.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Alias for [`Self::close`].
    pub fn destroy(&self) {
        self.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
