// src/external/providers/reed.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::{FetchContext, JobDraft, ProviderAdapter};
use crate::external::registry::ProviderDescriptor;
use crate::external::types::JobRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResp {
    #[serde(deserialize_with = "super::null_as_default")]
    results: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Item {
    employer_name: Option<String>,
    job_title: Option<String>,
    location_name: Option<String>,
    minimum_salary: Option<f64>,
    maximum_salary: Option<f64>,
    date: Option<String>,
    job_description: Option<String>,
    job_url: Option<String>,
}

/// Reed dates are `dd/mm/yyyy`.
fn parse_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
        .unwrap_or(now)
}

pub fn parse_jobs(
    body: &[u8],
    provider: &str,
    ctx: &FetchContext,
    now: DateTime<Utc>,
) -> Result<Vec<JobRecord>> {
    let resp: SearchResp = serde_json::from_slice(body).context("parsing reed json")?;
    Ok(resp
        .results
        .into_iter()
        .map(|it| {
            JobDraft {
                title: it.job_title,
                company: it.employer_name,
                salary_min: it.minimum_salary,
                salary_max: it.maximum_salary,
                location: it.location_name,
                description: it.job_description,
                url: it.job_url,
                posted: Some(parse_date(it.date.as_deref(), now)),
                ..JobDraft::default()
            }
            .into_record(provider, ctx, now)
        })
        .collect())
}

pub struct ReedAdapter {
    client: reqwest::Client,
}

impl ReedAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for ReedAdapter {
    async fn fetch_jobs(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<JobRecord>> {
        let key = desc
            .credential
            .as_deref()
            .ok_or_else(|| anyhow!("reed: missing api key"))?;

        let body = self
            .client
            .get(&desc.endpoint)
            .basic_auth(key, Some(""))
            .query(&ctx.query(desc, &[]))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("reed http get()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("reed http status")?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("reed http body")?;
        parse_jobs(&body, &desc.name, ctx, Utc::now())
    }

    fn name(&self) -> &'static str {
        "reed"
    }
}
