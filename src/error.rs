//! Error taxonomy for the probe pipeline.
//!
//! Mirrors the tagged-variant style used throughout this crate's policies:
//! a closed enum, `is_*` predicates, and a single `exit_code` mapping
//! consumed by the CLI collaborator (never referenced here). Uses
//! `thiserror`'s derive for `Display`/`Error`, the same crate the rest of
//! this workspace leans on for its error types (see `healthwatch-cli`'s
//! `CliError`).

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the probe pipeline.
#[derive(Debug, Clone, Error)]
pub enum HealthError {
    /// Unknown flag, unknown command, malformed duration, missing env
    /// placeholder, or config schema violation. Exit code 3.
    #[error("{message}")]
    Usage { message: String },
    /// A single service's probe failed; never aborts the cycle.
    #[error(
        "{cause} (service={service_name}, attempt={attempt}, url={url}, expected={})",
        expectation.as_deref().unwrap_or("none")
    )]
    ServiceProbe {
        service_name: String,
        attempt: usize,
        url: String,
        expectation: Option<String>,
        cause: String,
    },
    /// The probe succeeded but produced a status different from the
    /// service's `expectStatus`.
    #[error("Expected {expected}, received {actual} (service={service_name}, attempt={attempt}, url={url})")]
    ServiceExpectation {
        service_name: String,
        attempt: usize,
        url: String,
        expected: String,
        actual: String,
    },
    /// Internal request timeout, always promoted to `ServiceProbe` at the
    /// cycle boundary; surfaced on its own only from the HTTP layer.
    #[error("request timed out after {timeout_ms}ms")]
    RequestTimeout { timeout_ms: u64 },
    /// Request was cancelled by an external signal before completion.
    #[error("cancelled: {reason}")]
    Cancelled { reason: String },
    /// The URL scheme was neither `http` nor `https`.
    #[error("unsupported protocol: {scheme}")]
    UnsupportedProtocol { scheme: String },
    /// Connection, DNS, or protocol-level failure below the probe layer;
    /// promoted to `ServiceProbe` at the cycle boundary like `RequestTimeout`.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// An invariant inside the core was violated. Exit code 4.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl HealthError {
    pub fn usage(message: impl Into<String>) -> Self {
        HealthError::Usage { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        HealthError::Internal { message: message.into() }
    }

    /// Process exit code: `ok=0, degraded=1, down=2`, reserved
    /// `3=usage, 4=internal`. Only usage/internal map directly; the rest
    /// are per-service and never escape to the process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            HealthError::Usage { .. } => 3,
            HealthError::Internal { .. } => 4,
            _ => 1,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, HealthError::Usage { .. })
    }

    pub fn is_service_probe(&self) -> bool {
        matches!(self, HealthError::ServiceProbe { .. })
    }

    pub fn is_service_expectation(&self) -> bool {
        matches!(self, HealthError::ServiceExpectation { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HealthError::RequestTimeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, HealthError::Cancelled { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, HealthError::Internal { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, HealthError::Transport { .. })
    }

    /// Service name carried by probe-scoped variants, if any.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            HealthError::ServiceProbe { service_name, .. }
            | HealthError::ServiceExpectation { service_name, .. } => Some(service_name),
            _ => None,
        }
    }

    pub fn request_timeout(timeout: Duration) -> Self {
        HealthError::RequestTimeout { timeout_ms: timeout.as_millis() as u64 }
    }
}
