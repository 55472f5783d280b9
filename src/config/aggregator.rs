// src/config/aggregator.rs
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::external::geocode::DEFAULT_GEOCODER_URL;
use crate::external::rate_limit::DEFAULT_COOLDOWN_MS;

pub const ENV_GEOCODER_URL: &str = "GEOCODER_URL";
pub const ENV_USER_AGENT: &str = "HTTP_USER_AGENT";
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "PROVIDER_TIMEOUT_MS";
pub const ENV_RATE_LIMIT_COOLDOWN_MS: &str = "RATE_LIMIT_COOLDOWN_MS";
pub const ENV_SERVICES_MOCK_FLOOR: &str = "SERVICES_MOCK_FLOOR";
pub const ENV_JOBS_MOCK_FLOOR: &str = "JOBS_MOCK_FLOOR";
pub const ENV_MOCK_JOBS_PER_PROVIDER: &str = "MOCK_JOBS_PER_PROVIDER";
pub const ENV_MIN_PROVIDER_RESULTS: &str = "MIN_PROVIDER_RESULTS";

fn default_user_agent() -> String {
    format!("outreach-aggregator/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatorConfig {
    pub geocoder_url: String,
    pub user_agent: String,
    pub provider_timeout_ms: u64,
    pub rate_limit_cooldown_ms: u64,
    /// Services are topped up with mock listings below this count.
    pub services_mock_floor: usize,
    /// Jobs top-up floor. 0 keeps the top-up disabled for jobs.
    pub jobs_mock_floor: usize,
    pub mock_jobs_per_provider: usize,
    /// A provider returning fewer results than this is replaced by mock data.
    pub min_provider_results: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: default_user_agent(),
            provider_timeout_ms: 8_000,
            rate_limit_cooldown_ms: DEFAULT_COOLDOWN_MS,
            services_mock_floor: 10,
            jobs_mock_floor: 0,
            mock_jobs_per_provider: 6,
            min_provider_results: 1,
        }
    }
}

impl AggregatorConfig {
    /// Defaults overridden by env; unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let text = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            geocoder_url: text(ENV_GEOCODER_URL, d.geocoder_url),
            user_agent: text(ENV_USER_AGENT, d.user_agent),
            provider_timeout_ms: parse_or(lookup(ENV_PROVIDER_TIMEOUT_MS), d.provider_timeout_ms)
                .max(1),
            rate_limit_cooldown_ms: parse_or(
                lookup(ENV_RATE_LIMIT_COOLDOWN_MS),
                d.rate_limit_cooldown_ms,
            ),
            services_mock_floor: parse_or(lookup(ENV_SERVICES_MOCK_FLOOR), d.services_mock_floor),
            jobs_mock_floor: parse_or(lookup(ENV_JOBS_MOCK_FLOOR), d.jobs_mock_floor),
            mock_jobs_per_provider: parse_or(
                lookup(ENV_MOCK_JOBS_PER_PROVIDER),
                d.mock_jobs_per_provider,
            ),
            min_provider_results: parse_or(
                lookup(ENV_MIN_PROVIDER_RESULTS),
                d.min_provider_results,
            ),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, fallback: T) -> T {
    raw.and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(fallback)
}
