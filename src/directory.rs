// src/directory.rs
//! Locally stored listings and merging them with aggregated ones.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::distance::{distance_from, sort_by_distance, sort_by_posted_desc};
use crate::external::types::{JobRecord, Listing, ServiceRecord};

pub const ENV_LOCAL_DIRECTORY_PATH: &str = "LOCAL_DIRECTORY_PATH";
pub const DEFAULT_LOCAL_DIRECTORY_PATH: &str = "config/local_directory.json";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectoryFilter {
    pub origin: Option<(f64, f64)>,
    pub radius_km: Option<f64>,
}

impl DirectoryFilter {
    pub fn near(origin: (f64, f64), radius_km: f64) -> Self {
        Self {
            origin: Some(origin),
            radius_km: Some(radius_km),
        }
    }

    /// Active records only; records with coordinates must fall inside the radius.
    pub fn accepts<T: Listing>(&self, record: &T) -> bool {
        if !record.is_active() {
            return false;
        }
        match (self.origin, self.radius_km) {
            (Some(origin), Some(radius)) => {
                distance_from(origin, record).map_or(true, |d| d <= radius)
            }
            _ => true,
        }
    }
}

#[async_trait]
pub trait LocalDirectory: Send + Sync {
    async fn jobs(&self, filter: &DirectoryFilter) -> Result<Vec<JobRecord>>;
    async fn services(&self, filter: &DirectoryFilter) -> Result<Vec<ServiceRecord>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    jobs: Vec<JobRecord>,
    #[serde(default)]
    services: Vec<ServiceRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    jobs: RwLock<Vec<JobRecord>>,
    services: RwLock<Vec<ServiceRecord>>,
}

impl InMemoryDirectory {
    pub fn new(mut jobs: Vec<JobRecord>, mut services: Vec<ServiceRecord>) -> Self {
        jobs.iter_mut().for_each(|j| j.set_external(false));
        services.iter_mut().for_each(|s| s.set_external(false));
        Self {
            jobs: RwLock::new(jobs),
            services: RwLock::new(services),
        }
    }

    /// JSON file shaped `{"jobs": [...], "services": [...]}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading local directory from {}", path.display()))?;
        let file: DirectoryFile = serde_json::from_str(&content)
            .with_context(|| format!("parsing local directory {}", path.display()))?;
        Ok(Self::new(file.jobs, file.services))
    }

    /// `$LOCAL_DIRECTORY_PATH`, then `config/local_directory.json`, else empty.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_LOCAL_DIRECTORY_PATH) {
            return Self::from_file(&PathBuf::from(p));
        }
        let fallback = Path::new(DEFAULT_LOCAL_DIRECTORY_PATH);
        if fallback.exists() {
            return Self::from_file(fallback);
        }
        tracing::info!(target: "api", "no local directory file; starting empty");
        Ok(Self::default())
    }

    pub fn insert_job(&self, mut job: JobRecord) {
        job.external = false;
        self.jobs.write().push(job);
    }

    pub fn insert_service(&self, mut service: ServiceRecord) {
        service.external = false;
        self.services.write().push(service);
    }
}

#[async_trait]
impl LocalDirectory for InMemoryDirectory {
    async fn jobs(&self, filter: &DirectoryFilter) -> Result<Vec<JobRecord>> {
        Ok(self
            .jobs
            .read()
            .iter()
            .filter(|j| filter.accepts(*j))
            .cloned()
            .collect())
    }

    async fn services(&self, filter: &DirectoryFilter) -> Result<Vec<ServiceRecord>> {
        Ok(self
            .services
            .read()
            .iter()
            .filter(|s| filter.accepts(*s))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Date,
    Distance,
}

/// Local records first (tagged `external=false`), then external ones, then a
/// stable sort. Distance sorting needs an origin; without one it sorts by date.
pub fn merge_listings<T: Listing>(
    local: Vec<T>,
    external: Vec<T>,
    origin: Option<(f64, f64)>,
    sort: SortOrder,
) -> Vec<T> {
    let mut out: Vec<T> = local
        .into_iter()
        .map(|mut r| {
            r.set_external(false);
            r
        })
        .chain(external)
        .collect();
    match (sort, origin) {
        (SortOrder::Distance, Some(o)) => sort_by_distance(&mut out, o),
        _ => sort_by_posted_desc(&mut out),
    }
    out
}
