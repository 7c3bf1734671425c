//! Proxy resolution and the per-proxy client cache.

use crate::error::HealthError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Resolves the proxy URI to use for one request.
///
/// Precedence: an explicit per-service or per-run `proxy` setting always
/// wins. Otherwise falls back to the environment, scheme-appropriate first
/// (`HTTPS_PROXY` before `HTTP_PROXY` for an `https` URL; `HTTP_PROXY` only
/// for `http`). A present-but-blank value (after trimming) is treated as
/// absent at every step, matching the common shell convention of clearing
/// a proxy var by setting it to the empty string.
pub fn resolve_proxy(explicit: Option<&str>, scheme: &str, env: &HashMap<String, String>) -> Option<String> {
    if let Some(candidate) = explicit {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    let keys: &[&str] = if scheme.eq_ignore_ascii_case("https") {
        &["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]
    } else {
        &["HTTP_PROXY", "http_proxy"]
    };
    for key in keys {
        if let Some(value) = env.get(*key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProxyKey {
    proxy_uri: String,
    reject_unauthorized: bool,
}

/// Caches one `reqwest::Client` per distinct `(proxy_uri, reject_unauthorized)`
/// pair so repeated probes through the same proxy reuse its connection pool
/// instead of building a fresh client (and TCP/TLS handshake) every cycle.
///
/// Insertion is guarded by a single map-wide lock rather than a per-key
/// once-guard: proxy agents are built rarely (once per distinct proxy seen),
/// so contention is a non-issue and the simpler lock avoids a second level
/// of bookkeeping.
pub struct ProxyAgentCache {
    connect_timeout: Duration,
    cache: Mutex<HashMap<ProxyKey, reqwest::Client>>,
}

impl ProxyAgentCache {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn get_or_create(
        &self,
        proxy_uri: &str,
        reject_unauthorized: bool,
    ) -> Result<reqwest::Client, HealthError> {
        let key = ProxyKey { proxy_uri: proxy_uri.to_string(), reject_unauthorized };
        let mut guard = self.cache.lock().await;
        if let Some(existing) = guard.get(&key) {
            return Ok(existing.clone());
        }
        let proxy = reqwest::Proxy::all(proxy_uri)
            .map_err(|e| HealthError::internal(format!("invalid proxy URI: {e}")))?;
        let client = reqwest::Client::builder()
            .proxy(proxy)
            .danger_accept_invalid_certs(!reject_unauthorized)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| HealthError::internal(format!("failed to build proxy client: {e}")))?;
        guard.insert(key, client.clone());
        Ok(client)
    }

    pub async fn cached_agent_count(&self) -> usize {
        self.cache.lock().await.len()
    }
}
