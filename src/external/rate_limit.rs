// src/external/rate_limit.rs
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN_MS: u64 = 1_000;

/// Per-provider cooldown gate.
/// - First call for a name always passes.
/// - Inside the cooldown further calls are rejected and NOT recorded.
/// - No bursts, no queueing: the boolean is the whole signal.
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    last_call: Mutex<HashMap<String, Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_COOLDOWN_MS))
    }
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn check_and_record(&self, provider: &str) -> bool {
        self.check_and_record_at(provider, Instant::now())
    }

    /// Same as [`check_and_record`](Self::check_and_record) with an explicit clock.
    pub fn check_and_record_at(&self, provider: &str, now: Instant) -> bool {
        let mut last = self.last_call.lock();
        if let Some(prev) = last.get(provider) {
            if now.saturating_duration_since(*prev) < self.cooldown {
                return false;
            }
        }
        last.insert(provider.to_string(), now);
        true
    }

    pub fn tracked(&self) -> usize {
        self.last_call.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_passes_second_inside_cooldown_blocked() {
        let rl = RateLimiter::default();
        let t0 = Instant::now();
        assert!(rl.check_and_record_at("Adzuna", t0));
        assert!(!rl.check_and_record_at("Adzuna", t0 + Duration::from_millis(999)));
    }

    #[test]
    fn rejected_call_does_not_extend_cooldown() {
        let rl = RateLimiter::default();
        let t0 = Instant::now();
        assert!(rl.check_and_record_at("Jooble", t0));
        assert!(!rl.check_and_record_at("Jooble", t0 + Duration::from_millis(600)));
        assert!(rl.check_and_record_at("Jooble", t0 + Duration::from_millis(1_000)));
    }

    #[test]
    fn names_are_independent() {
        let rl = RateLimiter::default();
        let t0 = Instant::now();
        assert!(rl.check_and_record_at("Reed", t0));
        assert!(rl.check_and_record_at("USAJobs", t0));
        assert_eq!(rl.tracked(), 2);
    }
}
