//! Duration string parsing (`500ms`, `3s`, `1m`).

use std::time::Duration;

/// Parses a duration string matching `^\d+(ms|s|m)$`.
///
/// Returns `None` on any malformed input; the caller (the config
/// collaborator) is responsible for turning that into a usage error with
/// a JSON-pointer-style path.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let unit_len = if input.ends_with("ms") {
        2
    } else if input.ends_with('s') || input.ends_with('m') {
        1
    } else {
        return None;
    };
    if input.len() <= unit_len {
        return None;
    }
    let (digits, unit) = input.split_at(input.len() - unit_len);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        _ => None,
    }
}
