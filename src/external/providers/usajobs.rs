// src/external/providers/usajobs.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::{FetchContext, JobDraft, ProviderAdapter};
use crate::external::registry::ProviderDescriptor;
use crate::external::types::JobRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct SearchResp {
    #[serde(deserialize_with = "super::null_as_default")]
    search_result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct SearchResult {
    #[serde(deserialize_with = "super::null_as_default")]
    search_result_items: Vec<ResultItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ResultItem {
    #[serde(deserialize_with = "super::null_as_default")]
    matched_object_descriptor: Descriptor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Descriptor {
    position_title: Option<String>,
    organization_name: Option<String>,
    #[serde(rename = "PositionURI")]
    position_uri: Option<String>,
    position_location_display: Option<String>,
    #[serde(deserialize_with = "super::null_as_default")]
    position_location: Vec<PositionLocation>,
    #[serde(deserialize_with = "super::null_as_default")]
    position_remuneration: Vec<Remuneration>,
    #[serde(deserialize_with = "super::null_as_default")]
    position_schedule: Vec<Named>,
    qualification_summary: Option<String>,
    publication_start_date: Option<String>,
    #[serde(deserialize_with = "super::null_as_default")]
    user_area: UserArea,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct PositionLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Remuneration {
    minimum_range: Option<String>,
    maximum_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct UserArea {
    #[serde(deserialize_with = "super::null_as_default")]
    details: Details,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Details {
    job_summary: Option<String>,
}

fn parse_amount(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.replace(',', "").trim().parse::<f64>().ok())
}

/// USAJOBS dates come without an offset, e.g. `2025-09-01T00:00:00.0000`.
fn parse_publication(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.map(str::trim)
        .and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|n| n.and_utc())
                })
        })
        .unwrap_or(now)
}

pub fn parse_jobs(
    body: &[u8],
    provider: &str,
    ctx: &FetchContext,
    now: DateTime<Utc>,
) -> Result<Vec<JobRecord>> {
    let resp: SearchResp = serde_json::from_slice(body).context("parsing usajobs json")?;
    Ok(resp
        .search_result
        .search_result_items
        .into_iter()
        .map(|item| {
            let d = item.matched_object_descriptor;
            let pay = d.position_remuneration.first();
            let coords = d.position_location.first();
            let description = match (d.user_area.details.job_summary, d.qualification_summary) {
                (Some(s), Some(q)) => Some(format!("{s} {q}")),
                (s, q) => s.or(q),
            };
            JobDraft {
                title: d.position_title,
                company: d.organization_name,
                employment: d.position_schedule.into_iter().find_map(|s| s.name),
                salary_min: pay.and_then(|p| parse_amount(p.minimum_range.as_deref())),
                salary_max: pay.and_then(|p| parse_amount(p.maximum_range.as_deref())),
                location: d.position_location_display,
                description,
                url: d.position_uri,
                posted: Some(parse_publication(d.publication_start_date.as_deref(), now)),
                latitude: coords.and_then(|c| c.latitude),
                longitude: coords.and_then(|c| c.longitude),
                ..JobDraft::default()
            }
            .into_record(provider, ctx, now)
        })
        .collect())
}

pub struct UsaJobsAdapter {
    client: reqwest::Client,
}

impl UsaJobsAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for UsaJobsAdapter {
    async fn fetch_jobs(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<JobRecord>> {
        let key = desc
            .credential
            .as_deref()
            .ok_or_else(|| anyhow!("usajobs: missing authorization key"))?;
        // USAJOBS identifies callers by the e-mail sent as User-Agent.
        let email = desc
            .param("user_agent")
            .ok_or_else(|| anyhow!("usajobs: missing registered e-mail"))?;

        let body = self
            .client
            .get(&desc.endpoint)
            .header("Authorization-Key", key)
            .header(reqwest::header::USER_AGENT, email)
            .query(&ctx.query(desc, &["user_agent"]))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("usajobs http get()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("usajobs http status")?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("usajobs http body")?;
        parse_jobs(&body, &desc.name, ctx, Utc::now())
    }

    fn name(&self) -> &'static str {
        "usajobs"
    }
}
