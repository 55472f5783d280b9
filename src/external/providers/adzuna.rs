// src/external/providers/adzuna.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{FetchContext, JobDraft, ProviderAdapter};
use crate::external::normalize::parse_posted;
use crate::external::registry::ProviderDescriptor;
use crate::external::types::JobRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResp {
    #[serde(deserialize_with = "super::null_as_default")]
    results: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Item {
    title: Option<String>,
    description: Option<String>,
    company: Option<Named>,
    location: Option<Named>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_type: Option<String>,
    contract_time: Option<String>,
    redirect_url: Option<String>,
    created: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    display_name: Option<String>,
}

/// `contract` wins; otherwise full/part time from `contract_time`.
fn employment_of(it: &Item) -> Option<String> {
    match it.contract_type.as_deref() {
        Some(t) if t.eq_ignore_ascii_case("contract") => Some(t.to_string()),
        other => it
            .contract_time
            .clone()
            .or_else(|| other.map(str::to_string)),
    }
}

/// Parse an Adzuna search body into canonical records.
pub fn parse_jobs(
    body: &[u8],
    provider: &str,
    ctx: &FetchContext,
    now: DateTime<Utc>,
) -> Result<Vec<JobRecord>> {
    let resp: SearchResp = serde_json::from_slice(body).context("parsing adzuna json")?;
    Ok(resp
        .results
        .into_iter()
        .map(|it| {
            let employment = employment_of(&it);
            JobDraft {
                title: it.title,
                company: it.company.and_then(|c| c.display_name),
                employment,
                salary_min: it.salary_min,
                salary_max: it.salary_max,
                location: it.location.and_then(|l| l.display_name),
                description: it.description,
                url: it.redirect_url,
                posted: Some(parse_posted(it.created.as_deref(), now)),
                latitude: it.latitude,
                longitude: it.longitude,
                ..JobDraft::default()
            }
            .into_record(provider, ctx, now)
        })
        .collect())
}

pub struct AdzunaAdapter {
    client: reqwest::Client,
}

impl AdzunaAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for AdzunaAdapter {
    async fn fetch_jobs(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<JobRecord>> {
        let app_key = desc
            .credential
            .as_deref()
            .ok_or_else(|| anyhow!("adzuna: missing app key"))?;
        let app_id = desc
            .param("app_id")
            .ok_or_else(|| anyhow!("adzuna: missing app_id"))?;
        let cc = desc.param("country_code").unwrap_or("gb");
        let url = format!("{}/{}/search/1", desc.endpoint.trim_end_matches('/'), cc);

        let mut query = ctx.query(desc, &["app_id", "country_code"]);
        query.push(("app_id".into(), app_id.to_string()));
        query.push(("app_key".into(), app_key.to_string()));
        query.push(("content-type".into(), "application/json".into()));

        let body = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("adzuna http get()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("adzuna http status")?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("adzuna http body")?;
        parse_jobs(&body, &desc.name, ctx, Utc::now())
    }

    fn name(&self) -> &'static str {
        "adzuna"
    }
}
