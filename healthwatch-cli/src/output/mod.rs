//! Output serializers: JSON, NDJSON, and the Prometheus textfile format.
//! All three consume an `AggregateResult` from the core; none of them
//! touch the probe pipeline itself.

pub mod json;
pub mod ndjson;
pub mod prometheus;

use healthwatch::AggregateResult;
use serde::Serialize;

/// The shape shared by the JSON and NDJSON result entries.
#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Converts epoch milliseconds into an ISO-8601 UTC timestamp.
pub fn iso8601(epoch_millis: u64) -> String {
    let secs = (epoch_millis / 1000) as i64;
    let nanos = ((epoch_millis % 1000) * 1_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn result_entries(aggregate: &AggregateResult) -> Vec<ResultEntry> {
    aggregate
        .results
        .iter()
        .map(|snapshot| {
            let obs = &snapshot.observation;
            ResultEntry {
                name: obs.service_name.clone(),
                status: obs.status.to_string(),
                latency_ms: obs.latency_ms,
                version: obs.version.clone(),
                region: obs.region.clone(),
                checked_at: Some(iso8601(obs.checked_at)),
                url: obs.url.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso8601_renders_millisecond_precision_utc() {
        let rendered = iso8601(1_700_000_000_123);
        assert!(rendered.ends_with('Z'));
        assert!(rendered.contains('.'));
    }
}
