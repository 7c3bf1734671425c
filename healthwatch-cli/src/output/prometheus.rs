//! The Prometheus textfile exporter format, hand-rendered (not via the
//! `prometheus` crate's registry/encoder) because the exact byte layout —
//! comment ordering, label set, and trailing newline — is part of the
//! contract this output must validate against `promtool check metrics`.

use healthwatch::AggregateResult;

/// Renders `aggregate` as a complete Prometheus textfile: `health_status`
/// per service, `health_latency_ms` for services with known latency, and
/// a single `health_scrape_timestamp_ms` gauge. UTF-8, LF-terminated,
/// trailing newline required.
pub fn render(aggregate: &AggregateResult) -> String {
    let mut out = String::new();
    out.push_str("# HELP health_status 1=ok, 0.5=degraded, 0=down\n");
    out.push_str("# TYPE health_status gauge\n");
    for snapshot in &aggregate.results {
        let obs = &snapshot.observation;
        out.push_str(&format!(
            "health_status{{{}}} {}\n",
            label_set(&obs.service_name, obs.region.as_deref()),
            gauge_value(obs.status.as_gauge())
        ));
    }

    let with_latency: Vec<_> = aggregate.results.iter().filter(|s| s.observation.latency_ms.is_some()).collect();
    if !with_latency.is_empty() {
        out.push_str("# HELP health_latency_ms last observed latency\n");
        out.push_str("# TYPE health_latency_ms gauge\n");
        for snapshot in with_latency {
            let obs = &snapshot.observation;
            out.push_str(&format!(
                "health_latency_ms{{{}}} {}\n",
                label_set(&obs.service_name, obs.region.as_deref()),
                format_number(obs.latency_ms.expect("filtered to Some above"))
            ));
        }
    }

    out.push_str("# HELP health_scrape_timestamp_ms unix epoch ms\n");
    out.push_str("# TYPE health_scrape_timestamp_ms gauge\n");
    out.push_str(&format!("health_scrape_timestamp_ms {}\n", aggregate.completed_at));
    out
}

fn label_set(service: &str, region: Option<&str>) -> String {
    match region {
        Some(region) => format!("service=\"{}\",region=\"{}\"", escape_label(service), escape_label(region)),
        None => format!("service=\"{}\"", escape_label(service)),
    }
}

/// Escapes a label value per the Prometheus exposition format: backslash,
/// newline, then double quote, in that order (each pass must not touch
/// the escape sequences introduced by the previous one).
fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n").replace('"', "\\\"")
}

fn gauge_value(value: f64) -> &'static str {
    if value >= 1.0 {
        "1"
    } else if value <= 0.0 {
        "0"
    } else {
        "0.5"
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthwatch::{LatencySummary, Observation, ServiceSnapshot, Status};

    fn snapshot(name: &str, status: Status, latency_ms: Option<f64>, region: Option<&str>) -> ServiceSnapshot {
        ServiceSnapshot {
            observation: Observation {
                service_name: name.to_string(),
                status,
                http_status: Some(200),
                latency_ms,
                timings: None,
                checked_at: 0,
                payload: None,
                error: None,
                version: None,
                region: region.map(str::to_string),
                url: None,
            },
            age_ms: 0,
        }
    }

    #[test]
    fn renders_fleet_mixed_scenario() {
        let aggregate = AggregateResult {
            status: Status::Down,
            results: vec![
                snapshot("api", Status::Ok, Some(12.0), None),
                snapshot("auth", Status::Degraded, Some(30.0), None),
                snapshot("search", Status::Down, None, None),
            ],
            started_at: 0,
            completed_at: 1_700_000_000_000,
            latency: LatencySummary::default(),
        };
        let rendered = render(&aggregate);
        assert!(rendered.contains("health_status{service=\"api\"} 1\n"));
        assert!(rendered.contains("health_status{service=\"auth\"} 0.5\n"));
        assert!(rendered.contains("health_status{service=\"search\"} 0\n"));
        assert!(rendered.contains("health_latency_ms{service=\"api\"} 12\n"));
        assert!(rendered.contains("health_latency_ms{service=\"auth\"} 30\n"));
        assert!(!rendered.contains("health_latency_ms{service=\"search\""));
        assert!(rendered.contains("health_scrape_timestamp_ms 1700000000000\n"));
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn latency_block_omitted_entirely_when_no_service_has_latency() {
        let aggregate = AggregateResult {
            status: Status::Down,
            results: vec![snapshot("search", Status::Down, None, None)],
            started_at: 0,
            completed_at: 0,
            latency: LatencySummary::default(),
        };
        assert!(!render(&aggregate).contains("health_latency_ms"));
    }

    #[test]
    fn region_label_included_when_present() {
        let aggregate = AggregateResult {
            status: Status::Ok,
            results: vec![snapshot("api", Status::Ok, Some(1.0), Some("us-east-1"))],
            started_at: 0,
            completed_at: 0,
            latency: LatencySummary::default(),
        };
        let rendered = render(&aggregate);
        assert!(rendered.contains("service=\"api\",region=\"us-east-1\""));
    }

    #[test]
    fn escapes_quotes_and_backslashes_in_label_values() {
        assert_eq!(escape_label(r#"weird"name\path"#), r#"weird\"name\\path"#);
    }
}
