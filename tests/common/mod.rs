// tests/common/mod.rs
//
// Shared fakes for integration tests: a scripted reverse geocoder, a
// scripted provider adapter, and helpers to build registries/managers.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use outreach_aggregator::config::AggregatorConfig;
use outreach_aggregator::external::geocode::ReverseGeocoder;
use outreach_aggregator::external::providers::{
    AdapterTable, FetchContext, JobDraft, ProviderAdapter, ServiceDraft,
};
use outreach_aggregator::external::registry::{
    AdapterKind, ProviderDescriptor, ProviderRegistry, ProviderSet,
};
use outreach_aggregator::external::types::{JobRecord, Location, ServiceRecord};
use outreach_aggregator::external::AggregationManager;

pub fn location(country: &str, city: &str) -> Location {
    Location {
        country: country.into(),
        city: city.into(),
        state: None,
        postcode: None,
    }
}

/// Geocoder returning a fixed answer (or failing) and counting calls.
pub struct ScriptedGeocoder {
    pub answer: Option<Location>,
    pub calls: AtomicUsize,
}

impl ScriptedGeocoder {
    pub fn resolving(loc: Location) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(loc),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseGeocoder for ScriptedGeocoder {
    async fn reverse(&self, _lat: f64, _lng: f64) -> Result<Location> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| anyhow!("scripted geocoder failure"))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Return this many fully-populated records.
    Records(usize),
    Fail,
    Hang,
}

/// Adapter that follows a script and counts how often it was called.
pub struct ScriptedAdapter {
    pub behaviour: Behaviour,
    pub calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn run<T>(&self, make: impl Fn(usize) -> T) -> Result<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Records(n) => Ok((0..n).map(make).collect()),
            Behaviour::Fail => Err(anyhow!("scripted provider outage")),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn fetch_jobs(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<JobRecord>> {
        self.run(|i| {
            JobDraft {
                title: Some(format!("{} job {i}", desc.name)),
                ..JobDraft::default()
            }
            .into_record(&desc.name, ctx, Utc::now())
        })
        .await
    }

    async fn fetch_services(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<ServiceRecord>> {
        self.run(|i| {
            ServiceDraft {
                name: Some(format!("{} service {i}", desc.name)),
                ..ServiceDraft::default()
            }
            .into_record(&desc.name, ctx, Utc::now())
        })
        .await
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn descriptor(name: &str, kind: AdapterKind, active: bool) -> ProviderDescriptor {
    ProviderDescriptor {
        name: name.into(),
        kind,
        endpoint: "http://127.0.0.1:9".into(),
        credential: Some("test-key".into()),
        active,
        query_params: BTreeMap::new(),
    }
}

pub fn registry(entries: Vec<(&str, ProviderSet)>) -> Arc<ProviderRegistry> {
    let map: HashMap<String, ProviderSet> = entries
        .into_iter()
        .map(|(c, s)| (c.to_string(), s))
        .collect();
    Arc::new(ProviderRegistry::from_countries(map).expect("valid test registry"))
}

/// Zero cooldown and a short timeout so tests stay fast and independent.
pub fn test_config() -> AggregatorConfig {
    AggregatorConfig {
        provider_timeout_ms: 200,
        rate_limit_cooldown_ms: 0,
        ..AggregatorConfig::default()
    }
}

pub fn manager(
    cfg: AggregatorConfig,
    registry: Arc<ProviderRegistry>,
    adapters: AdapterTable,
    geocoder: Arc<dyn ReverseGeocoder>,
) -> AggregationManager {
    AggregationManager::new(cfg, registry, adapters, geocoder)
        .with_mock_generator(outreach_aggregator::external::mock::MockGenerator::seeded(42))
}
