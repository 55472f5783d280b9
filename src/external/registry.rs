// src/external/registry.rs
//! # Provider Registry
//!
//! Static country → provider table for job boards and social-service
//! directories.
//!
//! - Loaded once at startup from TOML, or from the built-in `default_seed()`.
//! - Exact country-name lookup, falling back to the `"Global"` entry.
//! - Credentials never live in the table itself: each descriptor names an
//!   environment variable that is resolved at load time.
//! - Query parameter values may reference the environment as `env:NAME` and
//!   may contain `{city}`, `{country}`, `{state}`, `{radius}` and
//!   `{radius_miles}` placeholders rendered per request.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::external::types::GLOBAL_COUNTRY;

pub const ENV_REGISTRY_PATH: &str = "PROVIDER_REGISTRY_PATH";
pub const DEFAULT_REGISTRY_PATH: &str = "config/providers.toml";

/// Which adapter understands a provider's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Adzuna,
    Jooble,
    #[serde(rename = "usajobs")]
    UsaJobs,
    Reed,
    OpenReferral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: AdapterKind,
    pub endpoint: String,
    pub credential: Option<String>,
    pub active: bool,
    pub query_params: BTreeMap<String, String>,
}

impl ProviderDescriptor {
    /// True when the descriptor may be sent to its real endpoint.
    pub fn is_dispatchable(&self) -> bool {
        self.active && self.credential.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query_params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSet {
    pub job_providers: Vec<ProviderDescriptor>,
    pub service_providers: Vec<ProviderDescriptor>,
}

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    countries: HashMap<String, ProviderSet>,
    global: ProviderSet,
}

// ---- file format ----

#[derive(Debug, Deserialize)]
struct RegistryFile {
    countries: HashMap<String, CountryFile>,
}

#[derive(Debug, Deserialize)]
struct CountryFile {
    #[serde(default)]
    jobs: Vec<DescriptorFile>,
    #[serde(default)]
    services: Vec<DescriptorFile>,
}

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    name: String,
    kind: AdapterKind,
    endpoint: String,
    #[serde(default)]
    credential_env: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    query_params: BTreeMap<String, String>,
}

fn default_active() -> bool {
    true
}

impl ProviderRegistry {
    /// Build from a ready table. A usable `"Global"` entry is mandatory.
    pub fn from_countries(mut countries: HashMap<String, ProviderSet>) -> Result<Self> {
        for (country, set) in &countries {
            check_unique_names(country, "jobs", &set.job_providers)?;
            check_unique_names(country, "services", &set.service_providers)?;
        }
        let global = countries
            .remove(GLOBAL_COUNTRY)
            .ok_or_else(|| anyhow!("provider registry has no \"{GLOBAL_COUNTRY}\" entry"))?;
        Ok(Self { countries, global })
    }

    /// Exact country match, else the Global entry.
    pub fn providers_for(&self, country: &str) -> &ProviderSet {
        self.countries.get(country).unwrap_or(&self.global)
    }

    /// Countries with a dedicated entry (Global excluded).
    pub fn countries(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.countries.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }

    /// Load from an explicit TOML path, resolving credentials from the process env.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading provider registry from {}", path.display()))?;
        Self::parse_toml(&content, env_lookup)
    }

    /// 1) $PROVIDER_REGISTRY_PATH
    /// 2) config/providers.toml
    /// 3) built-in seed
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_REGISTRY_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_REGISTRY_PATH} points to non-existent path"));
        }
        let file = PathBuf::from(DEFAULT_REGISTRY_PATH);
        if file.exists() {
            return Self::load_from(&file);
        }
        Ok(Self::default_seed())
    }

    /// Parse the TOML table with a custom env lookup (tests pass a closure).
    pub fn parse_toml<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: RegistryFile = toml::from_str(content).context("parsing provider registry toml")?;
        let countries = file
            .countries
            .into_iter()
            .map(|(country, cf)| {
                let set = ProviderSet {
                    job_providers: cf.jobs.into_iter().map(|d| resolve(d, &lookup)).collect(),
                    service_providers: cf
                        .services
                        .into_iter()
                        .map(|d| resolve(d, &lookup))
                        .collect(),
                };
                (country, set)
            })
            .collect();
        Self::from_countries(countries)
    }

    /// Built-in table, credentials from the process env.
    pub fn default_seed() -> Self {
        Self::default_seed_with(env_lookup)
    }

    /// Built-in table with a custom env lookup.
    pub fn default_seed_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let adzuna = |cc: &str| DescriptorFile {
            name: "Adzuna".into(),
            kind: AdapterKind::Adzuna,
            endpoint: "https://api.adzuna.com/v1/api/jobs".into(),
            credential_env: Some("ADZUNA_APP_KEY".into()),
            active: true,
            query_params: params(&[
                ("country_code", cc),
                ("app_id", "env:ADZUNA_APP_ID"),
                ("what", "entry level"),
                ("where", "{city}"),
                ("distance", "{radius}"),
                ("results_per_page", "20"),
            ]),
        };
        let jooble = |location: &str| DescriptorFile {
            name: "Jooble".into(),
            kind: AdapterKind::Jooble,
            endpoint: "https://jooble.org/api".into(),
            credential_env: Some("JOOBLE_API_KEY".into()),
            active: true,
            query_params: params(&[
                ("keywords", "no experience"),
                ("location", location),
                ("radius", "{radius}"),
                ("page", "1"),
            ]),
        };
        let usajobs = DescriptorFile {
            name: "USAJobs".into(),
            kind: AdapterKind::UsaJobs,
            endpoint: "https://data.usajobs.gov/api/search".into(),
            credential_env: Some("USAJOBS_API_KEY".into()),
            active: true,
            query_params: params(&[
                ("user_agent", "env:USAJOBS_EMAIL"),
                ("LocationName", "{city}, {state}"),
                ("Radius", "{radius_miles}"),
                ("ResultsPerPage", "25"),
            ]),
        };
        let reed = DescriptorFile {
            name: "Reed".into(),
            kind: AdapterKind::Reed,
            endpoint: "https://www.reed.co.uk/api/1.0/search".into(),
            credential_env: Some("REED_API_KEY".into()),
            active: true,
            query_params: params(&[
                ("keywords", "entry level"),
                ("locationName", "{city}"),
                ("distanceFromLocation", "{radius_miles}"),
                ("resultsToTake", "25"),
            ]),
        };
        let referral = |name: &str, endpoint: &str, env: &str, active: bool| DescriptorFile {
            name: name.into(),
            kind: AdapterKind::OpenReferral,
            endpoint: endpoint.into(),
            credential_env: Some(env.into()),
            active,
            query_params: params(&[
                ("text", "homeless"),
                ("location", "{city}"),
                ("proximity", "{radius}"),
                ("per_page", "25"),
            ]),
        };

        let table: Vec<(&str, Vec<DescriptorFile>, Vec<DescriptorFile>)> = vec![
            (
                "United States",
                vec![adzuna("us"), usajobs, jooble("{city}, {state}")],
                vec![
                    referral("211", "https://api.211.org/hsds", "API_211_KEY", false),
                    referral(
                        "FindHelp",
                        "https://api.findhelp.org/hsds",
                        "FINDHELP_API_KEY",
                        false,
                    ),
                ],
            ),
            (
                "United Kingdom",
                vec![adzuna("gb"), reed],
                vec![referral(
                    "OpenReferralUK",
                    "https://api.openreferraluk.org",
                    "OPEN_REFERRAL_UK_KEY",
                    true,
                )],
            ),
            (
                "Canada",
                vec![adzuna("ca"), jooble("{city}, Canada")],
                vec![referral("211 Canada", "https://api.211.ca/hsds", "API_211_CA_KEY", false)],
            ),
            (
                "Australia",
                vec![adzuna("au"), jooble("{city}, Australia")],
                vec![referral(
                    "Ask Izzy",
                    "https://api.askizzy.org.au/hsds",
                    "ASK_IZZY_KEY",
                    false,
                )],
            ),
            (
                "Cyprus",
                vec![jooble("{city}, Cyprus")],
                vec![referral(
                    "Cyprus Social Welfare",
                    "https://api.mlsi.gov.cy/hsds",
                    "CY_WELFARE_KEY",
                    false,
                )],
            ),
            (
                GLOBAL_COUNTRY,
                vec![jooble("{city}, {country}")],
                vec![referral(
                    "Open Referral",
                    "https://api.openreferral.org/hsds",
                    "OPEN_REFERRAL_KEY",
                    false,
                )],
            ),
        ];

        let mut countries: HashMap<String, ProviderSet> = table
            .into_iter()
            .map(|(country, jobs, services)| {
                (
                    country.to_string(),
                    ProviderSet {
                        job_providers: jobs.into_iter().map(|d| resolve(d, &lookup)).collect(),
                        service_providers: services
                            .into_iter()
                            .map(|d| resolve(d, &lookup))
                            .collect(),
                    },
                )
            })
            .collect();
        let global = countries.remove(GLOBAL_COUNTRY).unwrap_or_default();
        Self { countries, global }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn resolve<F>(d: DescriptorFile, lookup: &F) -> ProviderDescriptor
where
    F: Fn(&str) -> Option<String>,
{
    let credential = d
        .credential_env
        .as_deref()
        .and_then(lookup)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let query_params = d
        .query_params
        .into_iter()
        .map(|(k, v)| {
            let v = match v.strip_prefix("env:") {
                Some(name) => lookup(name).unwrap_or_default(),
                None => v,
            };
            (k, v)
        })
        .collect();
    ProviderDescriptor {
        name: d.name,
        kind: d.kind,
        endpoint: d.endpoint,
        credential,
        active: d.active,
        query_params,
    }
}

fn check_unique_names(country: &str, list: &str, providers: &[ProviderDescriptor]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for p in providers {
        if !seen.insert(p.name.as_str()) {
            bail!("duplicate provider '{}' in {country}/{list}", p.name);
        }
    }
    Ok(())
}
