//! The HTTP request layer: protocol gate, dispatcher selection, timeout and
//! cancellation racing, and debug instrumentation around a single request.

use crate::error::HealthError;
use crate::http::cancel::CancelSignal;
use crate::http::debug::{DebugRecord, DebugSink};
use crate::http::pool::KeepAlivePool;
use crate::http::proxy::{resolve_proxy, ProxyAgentCache};
use crate::model::Headers;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One request's description. Borrows its collaborators so callers can
/// reuse the same pool/cache/sink across many calls.
pub struct HttpRequestSpec<'a> {
    pub url: &'a str,
    pub method: &'a str,
    pub headers: &'a Headers,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelSignal>,
    /// Explicit proxy override, highest precedence.
    pub proxy: Option<&'a str>,
    pub insecure: bool,
    pub pool: Option<&'a KeepAlivePool>,
    pub proxy_cache: Option<&'a ProxyAgentCache>,
    pub env: &'a HashMap<String, String>,
    pub debug_sink: Option<&'a dyn DebugSink>,
}

/// Result of a successful request: status, headers, and the raw body.
#[derive(Debug, Clone)]
pub struct HttpResponseData {
    pub status_code: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: Vec<u8>,
}

/// Performs one HTTP request: resolves the client (pooled, proxied, or
/// ephemeral), races it against an optional timeout and cancellation
/// signal, and reports the outcome to the debug sink.
pub async fn http_request(spec: HttpRequestSpec<'_>) -> Result<HttpResponseData, HealthError> {
    let parsed = url::Url::parse(spec.url)
        .map_err(|e| HealthError::Transport { message: format!("invalid URL: {e}") })?;
    let scheme = parsed.scheme().to_string();
    if scheme != "http" && scheme != "https" {
        return Err(HealthError::UnsupportedProtocol { scheme });
    }

    let resolved_proxy = resolve_proxy(spec.proxy, &scheme, spec.env);
    let reject_unauthorized = !spec.insecure;

    let client = match (&resolved_proxy, spec.proxy_cache) {
        (Some(proxy_uri), Some(cache)) => cache.get_or_create(proxy_uri, reject_unauthorized).await?,
        (Some(proxy_uri), None) => {
            // No cache supplied: build an ephemeral single-use client rather
            // than fail the probe over a missing cache.
            let proxy = reqwest::Proxy::all(proxy_uri.as_str())
                .map_err(|e| HealthError::Transport { message: format!("invalid proxy URI: {e}") })?;
            reqwest::Client::builder()
                .proxy(proxy)
                .danger_accept_invalid_certs(!reject_unauthorized)
                .build()
                .map_err(|e| HealthError::internal(format!("failed to build proxy client: {e}")))?
        }
        (None, _) => match spec.pool {
            Some(pool) => pool.client_for_scheme(&scheme),
            None => reqwest::Client::builder()
                .danger_accept_invalid_certs(scheme == "https" && spec.insecure)
                .build()
                .map_err(|e| HealthError::internal(format!("failed to build ephemeral client: {e}")))?,
        },
    };

    let method = reqwest::Method::from_bytes(spec.method.as_bytes())
        .map_err(|_| HealthError::Transport { message: format!("invalid HTTP method: {}", spec.method) })?;

    let mut header_bytes = 0usize;
    let mut builder = client.request(method.clone(), parsed.clone());
    for (name, value) in spec.headers {
        header_bytes += name.len() + value.len() + 4; // `Name: value\r\n`
        builder = builder.header(name, value);
    }
    if let Some(body) = spec.body.clone() {
        builder = builder.body(body);
    }

    let start = Instant::now();
    let outcome = race(builder.send(), spec.timeout, spec.cancel.as_ref()).await;

    let result = match outcome {
        RaceOutcome::Resolved(Ok(response)) => {
            let ttfb_ms = start.elapsed().as_secs_f64() * 1000.0;
            let status_code = response.status().as_u16();
            let remote_addr = response.remote_addr().map(|a| a.to_string());
            let content_length = response.content_length();
            let headers = response.headers().clone();
            match race(response.bytes(), remaining(spec.timeout, start), spec.cancel.as_ref()).await {
                RaceOutcome::Resolved(Ok(bytes)) => {
                    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
                    emit_debug(
                        spec.debug_sink,
                        spec.url,
                        resolved_proxy.as_deref(),
                        &method,
                        Some(status_code),
                        total_ms,
                        Some(ttfb_ms),
                        header_bytes,
                        content_length,
                        remote_addr,
                        None,
                    );
                    Ok(HttpResponseData { status_code, headers, body: bytes.to_vec() })
                }
                RaceOutcome::Resolved(Err(e)) => {
                    Err(HealthError::Transport { message: format!("error reading response body: {e}") })
                }
                RaceOutcome::TimedOut(timeout) => Err(HealthError::request_timeout(timeout)),
                RaceOutcome::Cancelled(reason) => Err(HealthError::Cancelled { reason }),
            }
        }
        RaceOutcome::Resolved(Err(e)) => Err(HealthError::Transport { message: e.to_string() }),
        RaceOutcome::TimedOut(timeout) => Err(HealthError::request_timeout(timeout)),
        RaceOutcome::Cancelled(reason) => Err(HealthError::Cancelled { reason }),
    };

    if let Err(err) = &result {
        let total_ms = start.elapsed().as_secs_f64() * 1000.0;
        emit_debug(
            spec.debug_sink,
            spec.url,
            resolved_proxy.as_deref(),
            &method,
            None,
            total_ms,
            None,
            header_bytes,
            None,
            None,
            Some(err.to_string()),
        );
    }

    result
}

#[allow(clippy::too_many_arguments)]
fn emit_debug(
    sink: Option<&dyn DebugSink>,
    url: &str,
    proxy: Option<&str>,
    method: &reqwest::Method,
    status_code: Option<u16>,
    total_ms: f64,
    ttfb_ms: Option<f64>,
    request_header_bytes: usize,
    response_content_length: Option<u64>,
    remote_addr: Option<String>,
    error: Option<String>,
) {
    if let Some(sink) = sink {
        sink.record(DebugRecord {
            url: url.to_string(),
            proxy: proxy.map(str::to_string),
            method: method.to_string(),
            status_code,
            total_ms,
            ttfb_ms,
            dns_ms: None,
            tcp_ms: None,
            tls_ms: None,
            request_header_bytes,
            response_content_length,
            remote_addr,
            error,
        });
    }
}

enum RaceOutcome<T> {
    Resolved(T),
    TimedOut(Duration),
    Cancelled(String),
}

/// Races `fut` against an optional timeout and an optional cancellation
/// signal; whichever resolves first wins. An external cancellation is
/// checked with priority over the timeout, so it always reports its own
/// reason rather than being swallowed by a simultaneous deadline.
async fn race<T>(
    fut: impl std::future::Future<Output = T>,
    timeout: Option<Duration>,
    cancel: Option<&CancelSignal>,
) -> RaceOutcome<T> {
    tokio::pin!(fut);
    match (timeout, cancel) {
        (Some(d), Some(sig)) => {
            tokio::select! {
                biased;
                reason = sig.cancelled() => RaceOutcome::Cancelled(reason),
                _ = tokio::time::sleep(d) => RaceOutcome::TimedOut(d),
                value = &mut fut => RaceOutcome::Resolved(value),
            }
        }
        (Some(d), None) => {
            tokio::select! {
                _ = tokio::time::sleep(d) => RaceOutcome::TimedOut(d),
                value = &mut fut => RaceOutcome::Resolved(value),
            }
        }
        (None, Some(sig)) => {
            tokio::select! {
                biased;
                reason = sig.cancelled() => RaceOutcome::Cancelled(reason),
                value = &mut fut => RaceOutcome::Resolved(value),
            }
        }
        (None, None) => RaceOutcome::Resolved(fut.await),
    }
}

/// Remaining time until `timeout` elapses from `start`, `None` if no
/// timeout was configured. Used to bound the body-read phase by the same
/// overall deadline as the initial send.
fn remaining(timeout: Option<Duration>, start: Instant) -> Option<Duration> {
    timeout.map(|d| d.saturating_sub(start.elapsed()))
}
