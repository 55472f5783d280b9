// src/external/providers/mod.rs
//! Provider adapters and the fail-closed wrapper around them.
//!
//! Adapters only know how to talk to one API shape and map it into drafts;
//! [`JobDraft`]/[`ServiceDraft`] apply the shared normalization so every
//! record leaves this module fully populated.

pub mod adzuna;
pub mod jooble;
pub mod open_referral;
pub mod reed;
pub mod usajobs;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::external::mock::MockGenerator;
use crate::external::normalize::{
    clean_description, extract_benefits, extract_email, extract_requirements,
    format_compensation, is_target_audience_friendly, map_employment_type, or_default,
    urgency_for,
};
use crate::external::registry::{AdapterKind, ProviderDescriptor};
use crate::external::types::{JobRecord, Location, ServiceRecord};

const KM_TO_MILES: f64 = 0.621_371;

/// Per-request inputs every adapter sees.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub location: Location,
    pub radius_km: u32,
    pub origin: (f64, f64),
}

impl FetchContext {
    pub fn radius_miles(&self) -> u32 {
        ((self.radius_km as f64) * KM_TO_MILES).round().max(1.0) as u32
    }

    /// Replace `{city}`, `{country}`, `{state}`, `{radius}`, `{radius_miles}`.
    pub fn render(&self, template: &str) -> String {
        let out = template
            .replace("{city}", &self.location.city)
            .replace("{country}", &self.location.country)
            .replace("{state}", self.location.state.as_deref().unwrap_or_default())
            .replace("{radius}", &self.radius_km.to_string())
            .replace("{radius_miles}", &self.radius_miles().to_string());
        out.trim().trim_end_matches([',', ' ']).to_string()
    }

    /// Rendered query params of `desc`, minus keys the adapter consumes itself.
    pub fn query(&self, desc: &ProviderDescriptor, skip: &[&str]) -> Vec<(String, String)> {
        desc.query_params
            .iter()
            .filter(|(k, _)| !skip.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), self.render(v)))
            .collect()
    }
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn fetch_jobs(
        &self,
        desc: &ProviderDescriptor,
        _ctx: &FetchContext,
    ) -> Result<Vec<JobRecord>> {
        bail!("{} does not serve job listings ({})", self.name(), desc.name)
    }

    async fn fetch_services(
        &self,
        desc: &ProviderDescriptor,
        _ctx: &FetchContext,
    ) -> Result<Vec<ServiceRecord>> {
        bail!("{} does not serve service listings ({})", self.name(), desc.name)
    }

    fn name(&self) -> &'static str;
}

/// Dispatch table from [`AdapterKind`] to its adapter.
#[derive(Clone, Default)]
pub struct AdapterTable {
    adapters: HashMap<AdapterKind, Arc<dyn ProviderAdapter>>,
}

impl AdapterTable {
    /// All real HTTP adapters sharing one client.
    pub fn http(client: reqwest::Client) -> Self {
        Self::default()
            .with(AdapterKind::Adzuna, Arc::new(adzuna::AdzunaAdapter::new(client.clone())))
            .with(AdapterKind::Jooble, Arc::new(jooble::JoobleAdapter::new(client.clone())))
            .with(AdapterKind::UsaJobs, Arc::new(usajobs::UsaJobsAdapter::new(client.clone())))
            .with(AdapterKind::Reed, Arc::new(reed::ReedAdapter::new(client.clone())))
            .with(
                AdapterKind::OpenReferral,
                Arc::new(open_referral::OpenReferralAdapter::new(client)),
            )
    }

    pub fn with(mut self, kind: AdapterKind, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(kind, adapter);
        self
    }

    /// A missing kind is a wiring bug, not a provider outage.
    pub fn get(&self, kind: AdapterKind) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| anyhow!("no adapter registered for {kind:?}"))
    }
}

pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow!("building provider http client: {e}"))
}

/// Explicit JSON `null` reads as `T::default()`. Pair with `#[serde(default)]`
/// so a missing key behaves the same.
pub(crate) fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Knobs for the fail-closed wrapper.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    pub timeout: Duration,
    pub min_results: usize,
    pub mock_count: usize,
}

/// Run one provider call; any failure, timeout, missing credential or short
/// result set is replaced with `fallback()`.
pub async fn fail_closed<T, Fut, F>(
    desc: &ProviderDescriptor,
    policy: FallbackPolicy,
    call: Fut,
    fallback: F,
) -> Vec<T>
where
    Fut: Future<Output = Result<Vec<T>>>,
    F: FnOnce(usize) -> Vec<T>,
{
    if !desc.is_dispatchable() {
        tracing::debug!(
            target: "providers",
            provider = %desc.name,
            active = desc.active,
            "provider not dispatchable (inactive or no credential); using mock data"
        );
        counter!("external_mock_fallback_total", "reason" => "uncredentialed").increment(1);
        return fallback(policy.mock_count);
    }

    let t0 = Instant::now();
    let outcome = tokio::time::timeout(policy.timeout, call).await;
    histogram!("external_provider_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    let reason = match outcome {
        Ok(Ok(records)) if records.len() >= policy.min_results => return records,
        Ok(Ok(records)) => {
            tracing::info!(
                target: "providers",
                provider = %desc.name,
                got = records.len(),
                min = policy.min_results,
                "provider returned too few results; using mock data"
            );
            "short"
        }
        Ok(Err(e)) => {
            tracing::warn!(
                target: "providers",
                provider = %desc.name,
                error = ?e,
                "provider error"
            );
            counter!("external_provider_errors_total").increment(1);
            "error"
        }
        Err(_) => {
            tracing::warn!(
                target: "providers",
                provider = %desc.name,
                timeout_ms = policy.timeout.as_millis() as u64,
                "provider timed out"
            );
            counter!("external_provider_errors_total").increment(1);
            "timeout"
        }
    };
    counter!("external_mock_fallback_total", "reason" => reason).increment(1);
    fallback(policy.mock_count)
}

/// Loosely-typed job fields as an adapter found them.
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub title: Option<String>,
    pub company: Option<String>,
    pub employment: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    /// Provider-formatted pay text, used as-is when non-empty.
    pub salary_text: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub posted: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl JobDraft {
    pub fn into_record(self, provider: &str, ctx: &FetchContext, now: DateTime<Utc>) -> JobRecord {
        let description = clean_description(self.description.as_deref().unwrap_or_default());
        let posted = self.posted.unwrap_or(now);
        let compensation = match self.salary_text.map(|s| s.trim().to_string()) {
            Some(s) if !s.is_empty() => s,
            _ => format_compensation(&ctx.location.country, self.salary_min, self.salary_max),
        };
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| extract_email(&description));

        JobRecord {
            title: or_default(self.title.map(|t| clean_description(&t)), "Untitled position"),
            company: or_default(self.company, "Employer not listed"),
            employment_type: map_employment_type(self.employment.as_deref()),
            compensation,
            location: or_default(self.location, &ctx.location.label()),
            requirements: extract_requirements(&description),
            benefits: extract_benefits(&description),
            is_target_audience_friendly: is_target_audience_friendly(&description),
            urgency: urgency_for(&description, posted, now),
            description,
            contact_phone: or_default(self.phone, ""),
            contact_email: email,
            application_url: or_default(self.url, ""),
            is_active: true,
            posted_date: posted,
            provider: provider.to_string(),
            external: true,
            latitude: self.latitude.filter(|v| v.is_finite()),
            longitude: self.longitude.filter(|v| v.is_finite()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceDraft {
    pub name: Option<String>,
    pub service_type: Option<String>,
    pub cost: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub eligibility: Option<String>,
    pub offered: Vec<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
    pub posted: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ServiceDraft {
    pub fn into_record(
        self,
        provider: &str,
        ctx: &FetchContext,
        now: DateTime<Utc>,
    ) -> ServiceRecord {
        let description = clean_description(self.description.as_deref().unwrap_or_default());
        let requirements = match self.eligibility.map(|e| clean_description(&e)) {
            Some(e) if !e.is_empty() => vec![e],
            _ => vec!["Open to all".to_string()],
        };
        let mut benefits: Vec<String> = self
            .offered
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if benefits.is_empty() {
            benefits = extract_benefits(&description);
        }
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| extract_email(&description));

        ServiceRecord {
            name: or_default(self.name, "Unnamed service"),
            service_type: or_default(self.service_type, "Social Service"),
            cost: or_default(self.cost, "Free"),
            location: or_default(self.location, &ctx.location.label()),
            is_target_audience_friendly: true,
            description,
            requirements,
            benefits,
            contact_phone: or_default(self.phone, ""),
            contact_email: email,
            application_url: or_default(self.url, ""),
            is_active: self.active.unwrap_or(true),
            posted_date: self.posted.unwrap_or(now),
            provider: provider.to_string(),
            external: true,
            latitude: self.latitude.filter(|v| v.is_finite()),
            longitude: self.longitude.filter(|v| v.is_finite()),
        }
    }
}

/// Convenience used by the manager: fail-closed job fetch with mock fallback.
pub async fn fetch_jobs_or_mock(
    adapter: &dyn ProviderAdapter,
    desc: &ProviderDescriptor,
    ctx: &FetchContext,
    mock: &MockGenerator,
    policy: FallbackPolicy,
) -> Vec<JobRecord> {
    fail_closed(desc, policy, adapter.fetch_jobs(desc, ctx), |n| {
        mock.generate_jobs(&ctx.location, Some(ctx.origin), n)
    })
    .await
}

/// Convenience used by the manager: fail-closed service fetch with mock fallback.
pub async fn fetch_services_or_mock(
    adapter: &dyn ProviderAdapter,
    desc: &ProviderDescriptor,
    ctx: &FetchContext,
    mock: &MockGenerator,
    policy: FallbackPolicy,
) -> Vec<ServiceRecord> {
    fail_closed(desc, policy, adapter.fetch_services(desc, ctx), |n| {
        mock.generate_services(&ctx.location, Some(ctx.origin), n)
    })
    .await
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::BTreeMap;

    pub fn ctx(country: &str, city: &str) -> FetchContext {
        FetchContext {
            location: Location {
                country: country.into(),
                city: city.into(),
                state: None,
                postcode: None,
            },
            radius_km: 25,
            origin: (35.1856, 33.3823),
        }
    }

    pub fn desc(kind: AdapterKind, endpoint: &str, params: &[(&str, &str)]) -> ProviderDescriptor {
        ProviderDescriptor {
            name: format!("{kind:?}"),
            kind,
            endpoint: endpoint.into(),
            credential: Some("secret".into()),
            active: true,
            query_params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn render_fills_placeholders_and_trims_empty_state() {
        let c = ctx("Cyprus", "Nicosia");
        assert_eq!(c.render("{city}, {state}"), "Nicosia");
        assert_eq!(c.render("{city}, {country}"), "Nicosia, Cyprus");
        assert_eq!(c.render("{radius}/{radius_miles}"), "25/16");
    }

    #[test]
    fn empty_draft_is_fully_backfilled() {
        let c = ctx("United Kingdom", "Leeds");
        let rec = JobDraft::default().into_record("Reed", &c, Utc::now());
        assert_eq!(rec.title, "Untitled position");
        assert_eq!(rec.location, "Leeds, United Kingdom");
        assert_eq!(rec.compensation, "Salary not specified");
        assert_eq!(rec.requirements.len(), 2);
        assert!(rec.external && rec.is_active);
        assert!(!rec.is_target_audience_friendly);
    }

    #[tokio::test]
    async fn uncredentialed_descriptor_never_runs_the_call() {
        let mut d = desc(AdapterKind::Jooble, "http://unused", &[]);
        d.credential = None;
        let policy = FallbackPolicy {
            timeout: Duration::from_secs(1),
            min_results: 1,
            mock_count: 3,
        };
        let polled = std::sync::atomic::AtomicBool::new(false);
        let call = async {
            polled.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(vec![1u8; 5])
        };
        let out = fail_closed(&d, policy, call, |n| vec![0u8; n]).await;
        assert_eq!(out, vec![0, 0, 0]);
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let d = desc(AdapterKind::Jooble, "http://unused", &[]);
        let policy = FallbackPolicy {
            timeout: Duration::from_millis(20),
            min_results: 1,
            mock_count: 2,
        };
        let call = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1u8; 10])
        };
        let out = fail_closed(&d, policy, call, |n| vec![0u8; n]).await;
        assert_eq!(out, vec![0, 0]);
    }

    #[tokio::test]
    async fn short_result_is_topped_with_fallback() {
        let d = desc(AdapterKind::Jooble, "http://unused", &[]);
        let policy = FallbackPolicy {
            timeout: Duration::from_secs(1),
            min_results: 2,
            mock_count: 4,
        };
        let out = fail_closed(&d, policy, async { Ok(vec![9u8]) }, |n| vec![0u8; n]).await;
        assert_eq!(out.len(), 4);
    }
}
