// src/external/mod.rs
//! Location-aware aggregation of third-party job and social-service listings.
//!
//! One call resolves the caller's coordinates to a country, fans out to the
//! providers registered for it, substitutes mock data for anything that
//! fails, and hands back a [`Bundle`]. Only systemic problems (a provider
//! kind with no adapter wired in) surface as errors.

pub mod geocode;
pub mod mock;
pub mod normalize;
pub mod providers;
pub mod rate_limit;
pub mod registry;
pub mod types;

use anyhow::{Context, Result};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::AggregatorConfig;
use crate::external::geocode::{GeocodingCache, NominatimGeocoder, ReverseGeocoder};
use crate::external::mock::MockGenerator;
use crate::external::providers::{
    build_http_client, fetch_jobs_or_mock, fetch_services_or_mock, AdapterTable, FallbackPolicy,
    FetchContext, ProviderAdapter,
};
use crate::external::rate_limit::RateLimiter;
use crate::external::registry::{ProviderDescriptor, ProviderRegistry};
use crate::external::types::{Bundle, JobRecord, Location, ServiceRecord};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "external_provider_errors_total",
            "Provider calls that failed or timed out."
        );
        describe_counter!(
            "external_mock_fallback_total",
            "Provider results replaced by mock data, by reason."
        );
        describe_counter!(
            "external_rate_limited_total",
            "Provider calls skipped by the per-provider cooldown."
        );
        describe_counter!(
            "external_records_total",
            "Records returned by aggregation, by category."
        );
        describe_counter!("geocode_cache_hits_total", "Reverse geocode cache hits.");
        describe_counter!("geocode_cache_misses_total", "Reverse geocode cache misses.");
        describe_counter!(
            "geocode_failures_total",
            "Reverse geocode lookups that fell back to the default location."
        );
        describe_histogram!(
            "external_provider_fetch_ms",
            "Provider call latency in milliseconds."
        );
    });
}

/// Short stable hash for log fields that must not carry raw input.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Append `generate(shortfall)` when `records` is below `floor`.
pub fn top_up<T>(records: &mut Vec<T>, floor: usize, generate: impl FnOnce(usize) -> Vec<T>) {
    if records.len() < floor {
        let missing = floor - records.len();
        records.extend(generate(missing));
    }
}

pub struct AggregationManager {
    config: AggregatorConfig,
    registry: Arc<ProviderRegistry>,
    adapters: AdapterTable,
    geocoding: GeocodingCache,
    limiter: RateLimiter,
    mock: MockGenerator,
}

impl AggregationManager {
    pub fn new(
        config: AggregatorConfig,
        registry: Arc<ProviderRegistry>,
        adapters: AdapterTable,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_cooldown());
        Self {
            config,
            registry,
            adapters,
            geocoding: GeocodingCache::new(geocoder),
            limiter,
            mock: MockGenerator::default(),
        }
    }

    /// Production wiring: Nominatim plus the real HTTP adapters.
    pub fn from_config(config: AggregatorConfig, registry: Arc<ProviderRegistry>) -> Result<Self> {
        let geocoder = NominatimGeocoder::new(
            config.geocoder_url.clone(),
            &config.user_agent,
            config.provider_timeout(),
        )
        .context("initializing reverse geocoder")?;
        let client = build_http_client(&config.user_agent, config.provider_timeout())
            .context("initializing provider client")?;
        Ok(Self::new(
            config,
            registry,
            AdapterTable::http(client),
            Arc::new(geocoder),
        ))
    }

    pub fn with_mock_generator(mut self, mock: MockGenerator) -> Self {
        self.mock = mock;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn geocoding_cache(&self) -> &GeocodingCache {
        &self.geocoding
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            timeout: self.config.provider_timeout(),
            min_results: self.config.min_provider_results,
            mock_count: self.config.mock_jobs_per_provider,
        }
    }

    /// Drop inactive and rate-limited providers, pairing the rest with adapters.
    fn dispatch_plan<'a>(
        &self,
        providers: &'a [ProviderDescriptor],
    ) -> Result<Vec<(&'a ProviderDescriptor, Arc<dyn ProviderAdapter>)>> {
        let mut plan = Vec::with_capacity(providers.len());
        for desc in providers {
            if !desc.active {
                tracing::debug!(
                    target: "aggregate",
                    provider = %desc.name,
                    "provider inactive; skipped"
                );
                continue;
            }
            let adapter = self.adapters.get(desc.kind)?;
            if !self.limiter.check_and_record(&desc.name) {
                tracing::info!(
                    target: "aggregate",
                    provider = %desc.name,
                    cooldown_ms = self.limiter.cooldown().as_millis() as u64,
                    "provider rate limited; skipped"
                );
                counter!("external_rate_limited_total").increment(1);
                continue;
            }
            plan.push((desc, adapter));
        }
        Ok(plan)
    }

    async fn context(&self, lat: f64, lng: f64, radius_km: u32) -> FetchContext {
        let location = self.geocoding.resolve(lat, lng).await;
        FetchContext {
            location,
            radius_km,
            origin: (lat, lng),
        }
    }

    fn finish<T>(&self, category: &'static str, records: Vec<T>, ctx: FetchContext) -> Bundle<T> {
        counter!("external_records_total", "category" => category).increment(records.len() as u64);
        tracing::info!(
            target: "aggregate",
            category,
            origin = %anon_hash(&GeocodingCache::cache_key(ctx.origin.0, ctx.origin.1)),
            country = %ctx.location.country,
            records = records.len(),
            "aggregation finished"
        );
        Bundle::new(records, ctx.location)
    }

    /// Jobs near `(lat, lng)` from every provider registered for the resolved country.
    pub async fn fetch_external_jobs(
        &self,
        lat: f64,
        lng: f64,
        radius_km: u32,
    ) -> Result<Bundle<JobRecord>> {
        ensure_metrics_described();
        let ctx = self.context(lat, lng, radius_km).await;
        let set = self.registry.providers_for(&ctx.location.country);
        let plan = self.dispatch_plan(&set.job_providers)?;
        let policy = self.policy();

        let batches = join_all(plan.iter().map(|(desc, adapter)| {
            fetch_jobs_or_mock(adapter.as_ref(), desc, &ctx, &self.mock, policy)
        }))
        .await;
        let mut records: Vec<JobRecord> = batches.into_iter().flatten().collect();
        top_up(&mut records, self.config.jobs_mock_floor, |n| {
            self.mock.generate_jobs(&ctx.location, Some(ctx.origin), n)
        });
        Ok(self.finish("jobs", records, ctx))
    }

    /// Social services near `(lat, lng)`, topped up with mock entries below the floor.
    pub async fn fetch_social_services(
        &self,
        lat: f64,
        lng: f64,
        radius_km: u32,
    ) -> Result<Bundle<ServiceRecord>> {
        ensure_metrics_described();
        let ctx = self.context(lat, lng, radius_km).await;
        let set = self.registry.providers_for(&ctx.location.country);
        let plan = self.dispatch_plan(&set.service_providers)?;
        let policy = self.policy();

        let batches = join_all(plan.iter().map(|(desc, adapter)| {
            fetch_services_or_mock(adapter.as_ref(), desc, &ctx, &self.mock, policy)
        }))
        .await;
        let mut records: Vec<ServiceRecord> = batches.into_iter().flatten().collect();
        top_up(&mut records, self.config.services_mock_floor, |n| {
            self.mock.generate_services(&ctx.location, Some(ctx.origin), n)
        });
        Ok(self.finish("services", records, ctx))
    }

    /// Location resolution only; shared cache with the fetch paths.
    pub async fn resolve_location(&self, lat: f64, lng: f64) -> Location {
        self.geocoding.resolve(lat, lng).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_up_fills_exact_shortfall() {
        let mut v = vec![1, 2, 3];
        top_up(&mut v, 10, |n| vec![0; n]);
        assert_eq!(v.len(), 10);

        let mut full = vec![1; 12];
        top_up(&mut full, 10, |_| panic!("must not generate"));
        assert_eq!(full.len(), 12);

        let mut empty: Vec<u8> = Vec::new();
        top_up(&mut empty, 0, |_| panic!("zero floor never generates"));
        assert!(empty.is_empty());
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("35.1856,33.3823");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("35.1856,33.3823"));
        assert_ne!(a, anon_hash("35.1856,33.3824"));
    }
}
