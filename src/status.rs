//! The normalized status vocabulary and missing-status policy.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Normalized probe outcome, with total ordering `Ok < Degraded < Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Degraded,
    Down,
}

impl Status {
    /// Parses a status string case-insensitively after trimming, matching
    /// `ok|degraded|down`. Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Status> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ok" => Some(Status::Ok),
            "degraded" => Some(Status::Degraded),
            "down" => Some(Status::Down),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Degraded => 1,
            Status::Down => 2,
        }
    }

    /// Prometheus textfile encoding: `1=ok, 0.5=degraded, 0=down`.
    pub fn as_gauge(self) -> f64 {
        match self {
            Status::Ok => 1.0,
            Status::Degraded => 0.5,
            Status::Down => 0.0,
        }
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "ok",
            Status::Degraded => "degraded",
            Status::Down => "down",
        };
        write!(f, "{s}")
    }
}

/// Default outcome when a 2xx response lacks a recognizable `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingStatusPolicy {
    Degraded,
    Down,
}

impl MissingStatusPolicy {
    pub fn parse(input: &str) -> Option<MissingStatusPolicy> {
        match input.trim().to_ascii_lowercase().as_str() {
            "degraded" => Some(MissingStatusPolicy::Degraded),
            "down" => Some(MissingStatusPolicy::Down),
            _ => None,
        }
    }

    pub fn resolve(self) -> Status {
        match self {
            MissingStatusPolicy::Degraded => Status::Degraded,
            MissingStatusPolicy::Down => Status::Down,
        }
    }
}

impl Default for MissingStatusPolicy {
    fn default() -> Self {
        MissingStatusPolicy::Down
    }
}

/// Aggregate status across a set of results: `down` if any is down, else
/// `degraded` if any is degraded, else `ok`. Holds under permutation since
/// it is simply the maximum by the total ordering above.
pub fn aggregate_status<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
    statuses.into_iter().max().unwrap_or(Status::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total() {
        assert!(Status::Ok < Status::Degraded);
        assert!(Status::Degraded < Status::Down);
        assert!(Status::Ok < Status::Down);
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Status::parse(" OK "), Some(Status::Ok));
        assert_eq!(Status::parse("Degraded"), Some(Status::Degraded));
        assert_eq!(Status::parse("DOWN"), Some(Status::Down));
        assert_eq!(Status::parse("unknown"), None);
    }

    #[test]
    fn aggregate_monotonicity_any_down() {
        assert_eq!(
            aggregate_status([Status::Ok, Status::Down, Status::Degraded]),
            Status::Down
        );
    }

    #[test]
    fn aggregate_monotonicity_degraded_without_down() {
        assert_eq!(aggregate_status([Status::Ok, Status::Degraded]), Status::Degraded);
    }

    #[test]
    fn aggregate_monotonicity_all_ok() {
        assert_eq!(aggregate_status([Status::Ok, Status::Ok]), Status::Ok);
    }

    #[test]
    fn aggregate_empty_is_ok() {
        assert_eq!(aggregate_status(std::iter::empty()), Status::Ok);
    }

    #[test]
    fn aggregate_holds_under_permutation() {
        let a = aggregate_status([Status::Down, Status::Ok, Status::Degraded]);
        let b = aggregate_status([Status::Degraded, Status::Down, Status::Ok]);
        assert_eq!(a, b);
    }

    #[test]
    fn gauge_values() {
        assert_eq!(Status::Ok.as_gauge(), 1.0);
        assert_eq!(Status::Degraded.as_gauge(), 0.5);
        assert_eq!(Status::Down.as_gauge(), 0.0);
    }
}
