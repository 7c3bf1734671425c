//! Probe normalizer: maps `{httpStatus, payload, policy}` to a normalized
//! status, and resolves latency preferring the payload's self-reported
//! timings over our own measurement.

use crate::model::Timings;
use crate::status::{MissingStatusPolicy, Status};
use serde_json::Value;

/// Maps a raw payload status field onto [`Status`].
pub fn normalize_status(
    http_status: Option<u16>,
    payload: Option<&Value>,
    policy: MissingStatusPolicy,
) -> Status {
    let in_2xx = matches!(http_status, Some(code) if (200..=299).contains(&code));
    if !in_2xx {
        return Status::Down;
    }
    if let Some(status_str) = payload.and_then(|p| p.get("status")).and_then(Value::as_str) {
        if let Some(status) = Status::parse(status_str) {
            return status;
        }
    }
    policy.resolve()
}

/// Result of [`resolve_latency`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLatency {
    pub latency_ms: f64,
    pub timings: Option<Timings>,
}

/// Resolves the observed latency, preferring the payload's own reported
/// `timings.total_ms` over the locally measured round-trip time.
pub fn resolve_latency(payload: Option<&Value>, measured_latency_ms: Option<f64>) -> ResolvedLatency {
    if let Some(timings_value) = payload.and_then(|p| p.get("timings")) {
        if let Some(total_ms) = numeric(timings_value.get("total_ms")) {
            if total_ms.is_finite() {
                let timings = Timings {
                    total_ms,
                    ttfb_ms: numeric(timings_value.get("ttfb_ms")),
                    dns_ms: numeric(timings_value.get("dns_ms")),
                    tcp_ms: numeric(timings_value.get("tcp_ms")),
                    tls_ms: numeric(timings_value.get("tls_ms")),
                };
                return ResolvedLatency { latency_ms: total_ms, timings: Some(timings) };
            }
        }
    }
    if let Some(measured) = measured_latency_ms {
        if measured.is_finite() {
            return ResolvedLatency { latency_ms: measured, timings: None };
        }
    }
    ResolvedLatency { latency_ms: 0.0, timings: None }
}

/// Coerces a JSON value into a finite number, accepting both JSON numbers
/// and numeric strings (the payload is produced by arbitrary third-party
/// services and may not be strictly typed).
fn numeric(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_2xx_is_down_regardless_of_payload() {
        let payload = json!({"status": "ok"});
        assert_eq!(
            normalize_status(Some(500), Some(&payload), MissingStatusPolicy::Down),
            Status::Down
        );
        assert_eq!(normalize_status(None, Some(&payload), MissingStatusPolicy::Down), Status::Down);
    }

    #[test]
    fn payload_status_wins_when_2xx() {
        for (raw, expected) in [("ok", Status::Ok), ("DEGRADED", Status::Degraded), (" Down ", Status::Down)]
        {
            let payload = json!({"status": raw});
            assert_eq!(normalize_status(Some(200), Some(&payload), MissingStatusPolicy::Degraded), expected);
        }
    }

    #[test]
    fn missing_status_field_falls_back_to_policy() {
        let payload = json!({"version": "2.0.0"});
        assert_eq!(
            normalize_status(Some(200), Some(&payload), MissingStatusPolicy::Degraded),
            Status::Degraded
        );
        assert_eq!(normalize_status(Some(200), Some(&payload), MissingStatusPolicy::Down), Status::Down);
    }

    #[test]
    fn missing_payload_falls_back_to_policy() {
        assert_eq!(normalize_status(Some(204), None, MissingStatusPolicy::Degraded), Status::Degraded);
    }

    #[test]
    fn unrecognized_status_value_falls_back_to_policy() {
        let payload = json!({"status": "weird"});
        assert_eq!(normalize_status(Some(200), Some(&payload), MissingStatusPolicy::Down), Status::Down);
    }

    #[test]
    fn boundary_http_statuses() {
        assert_eq!(normalize_status(Some(199), None, MissingStatusPolicy::Down), Status::Down);
        assert_eq!(normalize_status(Some(300), None, MissingStatusPolicy::Down), Status::Down);
        assert_eq!(normalize_status(Some(200), None, MissingStatusPolicy::Degraded), Status::Degraded);
        assert_eq!(normalize_status(Some(299), None, MissingStatusPolicy::Degraded), Status::Degraded);
    }

    #[test]
    fn latency_prefers_payload_total_ms_over_measured() {
        let payload = json!({"timings": {"total_ms": 110, "ttfb_ms": 12}});
        let resolved = resolve_latency(Some(&payload), Some(9999.0));
        assert_eq!(resolved.latency_ms, 110.0);
        assert_eq!(resolved.timings.unwrap().ttfb_ms, Some(12.0));
    }

    #[test]
    fn latency_accepts_numeric_string_total_ms() {
        let payload = json!({"timings": {"total_ms": "42.5"}});
        let resolved = resolve_latency(Some(&payload), None);
        assert_eq!(resolved.latency_ms, 42.5);
    }

    #[test]
    fn latency_falls_back_to_measured_when_payload_missing() {
        let resolved = resolve_latency(None, Some(55.0));
        assert_eq!(resolved.latency_ms, 55.0);
        assert!(resolved.timings.is_none());
    }

    #[test]
    fn latency_defaults_to_zero_when_nothing_available() {
        let resolved = resolve_latency(None, None);
        assert_eq!(resolved.latency_ms, 0.0);
    }

    #[test]
    fn non_finite_measured_latency_is_ignored() {
        let resolved = resolve_latency(None, Some(f64::NAN));
        assert_eq!(resolved.latency_ms, 0.0);
    }
}
