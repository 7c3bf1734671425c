//! NDJSON output: one result object per line (the JSON shape minus
//! `aggregate`), trailing newline, empty when there are no results.

use super::result_entries;
use healthwatch::AggregateResult;

pub fn render(aggregate: &AggregateResult) -> String {
    let entries = result_entries(aggregate);
    if entries.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for entry in &entries {
        out.push_str(&serde_json::to_string(entry).expect("entry is always serializable"));
        out.push('\n');
    }
    out
}
