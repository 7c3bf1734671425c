//! JSON output: `{aggregate, checked_at, results[]}`, 2-space indent, with
//! a trailing newline.

use super::{iso8601, result_entries};
use healthwatch::AggregateResult;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct JsonReport {
    aggregate: String,
    checked_at: String,
    results: Vec<super::ResultEntry>,
}

/// Renders `aggregate` as a pretty-printed JSON document with a trailing
/// newline.
pub fn render(aggregate: &AggregateResult) -> String {
    let report = JsonReport {
        aggregate: aggregate.status.to_string(),
        checked_at: iso8601(aggregate.completed_at),
        results: result_entries(aggregate),
    };
    let mut body = serde_json::to_string_pretty(&report).expect("report is always serializable");
    body.push('\n');
    body
}
