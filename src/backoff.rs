//! Exponential backoff with jitter, and the per-service failure escalator.

use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Configuration errors for [`ExponentialBackoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffError {
    InvalidInitialDelay,
    InvalidFactor,
    InvalidJitterRange,
}

impl std::fmt::Display for BackoffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffError::InvalidInitialDelay => write!(f, "initial_delay_ms must be > 0"),
            BackoffError::InvalidFactor => write!(f, "factor must be > 1"),
            BackoffError::InvalidJitterRange => {
                write!(f, "jitter_min must be in [0, jitter_max) and jitter_max < 1")
            }
        }
    }
}

impl std::error::Error for BackoffError {}

/// Stateless parameter bundle plus a per-instance attempt counter.
///
/// `next_delay()` returns `round(clamp(initial * factor^n * (1 ± jitter), 1,
/// max_delay))` where `n` is a zero-indexed counter incremented on each
/// call. Each returned delay is always ≥ 1ms.
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay_ms: u64,
    factor: f64,
    max_delay_ms: Option<u64>,
    jitter_min: f64,
    jitter_max: f64,
    attempt: AtomicU32,
}

impl Clone for ExponentialBackoff {
    fn clone(&self) -> Self {
        Self {
            initial_delay_ms: self.initial_delay_ms,
            factor: self.factor,
            max_delay_ms: self.max_delay_ms,
            jitter_min: self.jitter_min,
            jitter_max: self.jitter_max,
            attempt: AtomicU32::new(self.attempt.load(Ordering::SeqCst)),
        }
    }
}

impl ExponentialBackoff {
    pub fn builder(initial_delay: Duration) -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::new(initial_delay)
    }

    /// Returns the next delay and advances the internal attempt counter.
    pub fn next_delay(&self) -> Duration {
        let n = self.attempt.fetch_add(1, Ordering::SeqCst);
        let base = self.initial_delay_ms as f64 * self.factor.powi(n as i32);

        let magnitude = if self.jitter_max > 0.0 {
            self.jitter_min
                + (self.jitter_max - self.jitter_min) * rand::thread_rng().gen::<f64>()
        } else {
            0.0
        };
        let sign: f64 = if rand::thread_rng().gen_bool(0.5) { 1.0 } else { -1.0 };
        let jittered = base * (1.0 + sign * magnitude);

        let max = self.max_delay_ms.map(|m| m as f64).unwrap_or(f64::MAX);
        let clamped = jittered.clamp(1.0, max);
        Duration::from_millis(clamped.round() as u64)
    }

    /// Zeroes the internal attempt counter.
    pub fn reset(&self) {
        self.attempt.store(0, Ordering::SeqCst);
    }
}

pub struct ExponentialBackoffBuilder {
    initial_delay_ms: u64,
    factor: f64,
    max_delay_ms: Option<u64>,
    jitter_min: f64,
    jitter_max: f64,
}

impl ExponentialBackoffBuilder {
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay_ms: initial_delay.as_millis() as u64,
            factor: 2.0,
            max_delay_ms: None,
            jitter_min: 0.0,
            jitter_max: 0.0,
        }
    }

    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn max_delay(mut self, max: Duration) -> Self {
        self.max_delay_ms = Some(max.as_millis() as u64);
        self
    }

    pub fn jitter(mut self, jitter_min: f64, jitter_max: f64) -> Self {
        self.jitter_min = jitter_min;
        self.jitter_max = jitter_max;
        self
    }

    pub fn build(self) -> Result<ExponentialBackoff, BackoffError> {
        if self.initial_delay_ms == 0 {
            return Err(BackoffError::InvalidInitialDelay);
        }
        if self.factor <= 1.0 {
            return Err(BackoffError::InvalidFactor);
        }
        if self.jitter_min < 0.0 || self.jitter_max >= 1.0 || self.jitter_min > self.jitter_max {
            return Err(BackoffError::InvalidJitterRange);
        }
        Ok(ExponentialBackoff {
            initial_delay_ms: self.initial_delay_ms,
            factor: self.factor,
            max_delay_ms: self.max_delay_ms,
            jitter_min: self.jitter_min,
            jitter_max: self.jitter_max,
            attempt: AtomicU32::new(0),
        })
    }
}

/// Per-service multiplier escalator. Maps a service name to an index into
/// the precomputed ladder `[1, g, g^2, ...]` clamped by `max_multiplier`.
/// Entries are created on first failure and removed on success.
#[derive(Debug)]
pub struct ServiceBackoff {
    levels: Vec<u32>,
    index: std::sync::Mutex<HashMap<String, usize>>,
}

impl ServiceBackoff {
    /// `growth_factor` must be ≥ 1; `max_multiplier` is the ceiling of the
    /// ladder. The ladder is `[1, g, g^2, ...]` truncated at the first
    /// value ≥ `max_multiplier`, with that final rung clamped down to
    /// exactly `max_multiplier`.
    pub fn new(max_multiplier: u32, growth_factor: u32) -> Self {
        let mut levels = vec![1u32];
        loop {
            let last = *levels.last().unwrap();
            if last >= max_multiplier {
                break;
            }
            let next = last.saturating_mul(growth_factor).min(max_multiplier);
            levels.push(next);
            if next >= max_multiplier {
                break;
            }
        }
        Self { levels, index: std::sync::Mutex::new(HashMap::new()) }
    }

    /// Advances the level index for `name` up to the ladder ceiling and
    /// returns the new multiplier. Idempotent once at the ceiling.
    pub fn record_failure(&self, name: &str) -> u32 {
        let mut index = self.index.lock().unwrap_or_else(|p| p.into_inner());
        let level = index.entry(name.to_string()).or_insert(0);
        if *level + 1 < self.levels.len() {
            *level += 1;
        }
        self.levels[*level]
    }

    /// Deletes the entry for `name`, resetting its multiplier to 1.
    pub fn record_success(&self, name: &str) {
        self.index.lock().unwrap_or_else(|p| p.into_inner()).remove(name);
    }

    /// Returns 1 when `name` has no recorded failures.
    pub fn get_multiplier(&self, name: &str) -> u32 {
        let index = self.index.lock().unwrap_or_else(|p| p.into_inner());
        index.get(name).map(|&level| self.levels[level]).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_initial_delay() {
        assert_eq!(
            ExponentialBackoff::builder(Duration::from_millis(0)).build().unwrap_err(),
            BackoffError::InvalidInitialDelay
        );
    }

    #[test]
    fn builder_rejects_factor_le_one() {
        assert_eq!(
            ExponentialBackoff::builder(Duration::from_millis(100))
                .factor(1.0)
                .build()
                .unwrap_err(),
            BackoffError::InvalidFactor
        );
    }

    #[test]
    fn no_jitter_grows_exactly_exponentially() {
        let backoff = ExponentialBackoff::builder(Duration::from_millis(200))
            .factor(2.0)
            .build()
            .unwrap();
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn reset_zeroes_counter() {
        let backoff = ExponentialBackoff::builder(Duration::from_millis(100)).build().unwrap();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn respects_max_delay() {
        let backoff = ExponentialBackoff::builder(Duration::from_millis(100))
            .factor(2.0)
            .max_delay(Duration::from_millis(300))
            .build()
            .unwrap();
        backoff.next_delay(); // 100
        backoff.next_delay(); // 200
        assert_eq!(backoff.next_delay(), Duration::from_millis(300)); // would be 400, capped
    }

    #[test]
    fn jitter_envelope_never_below_one_ms() {
        let backoff = ExponentialBackoff::builder(Duration::from_millis(1))
            .factor(2.0)
            .jitter(0.0, 0.99)
            .build()
            .unwrap();
        for _ in 0..200 {
            assert!(backoff.next_delay() >= Duration::from_millis(1));
        }
    }

    #[test]
    fn jitter_stays_within_envelope() {
        let backoff = ExponentialBackoff::builder(Duration::from_millis(1000))
            .factor(1.0001) // keep n=0 effectively constant for this check
            .jitter(0.1, 0.2)
            .build()
            .unwrap();
        let delay = backoff.next_delay().as_millis() as f64;
        assert!(delay >= 1000.0 * (1.0 - 0.2) - 1.0);
        assert!(delay <= 1000.0 * (1.0 + 0.2) + 1.0);
    }

    #[test]
    fn ladder_values_for_max_four_growth_two() {
        let backoff = ServiceBackoff::new(4, 2);
        assert_eq!(backoff.get_multiplier("svc"), 1);
        assert_eq!(backoff.record_failure("svc"), 2);
        assert_eq!(backoff.record_failure("svc"), 4);
        // Idempotent at the ceiling.
        assert_eq!(backoff.record_failure("svc"), 4);
    }

    #[test]
    fn success_resets_multiplier() {
        let backoff = ServiceBackoff::new(4, 2);
        backoff.record_failure("svc");
        backoff.record_failure("svc");
        assert_eq!(backoff.get_multiplier("svc"), 4);
        backoff.record_success("svc");
        assert_eq!(backoff.get_multiplier("svc"), 1);
    }

    #[test]
    fn absent_service_has_multiplier_one() {
        let backoff = ServiceBackoff::new(8, 2);
        assert_eq!(backoff.get_multiplier("never-seen"), 1);
    }

    #[test]
    fn entries_are_independent_per_service() {
        let backoff = ServiceBackoff::new(4, 2);
        backoff.record_failure("a");
        assert_eq!(backoff.get_multiplier("a"), 2);
        assert_eq!(backoff.get_multiplier("b"), 1);
    }
}
