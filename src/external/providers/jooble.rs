// src/external/providers/jooble.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{FetchContext, JobDraft, ProviderAdapter};
use crate::external::registry::ProviderDescriptor;
use crate::external::types::JobRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResp {
    #[serde(deserialize_with = "super::null_as_default")]
    jobs: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Item {
    title: Option<String>,
    location: Option<String>,
    snippet: Option<String>,
    salary: Option<String>,
    #[serde(rename = "type")]
    job_type: Option<String>,
    link: Option<String>,
    company: Option<String>,
    updated: Option<String>,
}

/// Jooble sends `2025-09-01T00:00:00.0000000`, sometimes with an offset.
fn parse_updated(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|n| n.and_utc())
        .unwrap_or(now)
}

pub fn parse_jobs(
    body: &[u8],
    provider: &str,
    ctx: &FetchContext,
    now: DateTime<Utc>,
) -> Result<Vec<JobRecord>> {
    let resp: SearchResp = serde_json::from_slice(body).context("parsing jooble json")?;
    Ok(resp
        .jobs
        .into_iter()
        .map(|it| {
            JobDraft {
                title: it.title,
                company: it.company,
                employment: it.job_type,
                salary_text: it.salary,
                location: it.location,
                description: it.snippet,
                url: it.link,
                posted: Some(parse_updated(it.updated.as_deref(), now)),
                ..JobDraft::default()
            }
            .into_record(provider, ctx, now)
        })
        .collect())
}

pub struct JoobleAdapter {
    client: reqwest::Client,
}

impl JoobleAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for JoobleAdapter {
    async fn fetch_jobs(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<JobRecord>> {
        let key = desc
            .credential
            .as_deref()
            .ok_or_else(|| anyhow!("jooble: missing api key"))?;
        let url = format!("{}/{}", desc.endpoint.trim_end_matches('/'), key);
        // Jooble takes its search as a JSON body, all values as strings.
        let payload: BTreeMap<String, String> = ctx.query(desc, &[]).into_iter().collect();

        let body = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("jooble http post()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("jooble http status")?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("jooble http body")?;
        parse_jobs(&body, &desc.name, ctx, Utc::now())
    }

    fn name(&self) -> &'static str {
        "jooble"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::providers::test_support::ctx;
    use crate::external::types::EmploymentType;
    use chrono::TimeZone;

    #[test]
    fn provider_salary_text_is_kept() {
        let body = br#"{"totalCount":1,"jobs":[{
            "title":"Cleaner","company":"Sparkle","salary":"\u20ac900 per month",
            "type":"Temporary","snippet":"Immediate start&nbsp;in Nicosia",
            "link":"https://jooble.example/1","updated":"2025-09-01T08:30:00.0000000"
        }]}"#;
        let c = ctx("Cyprus", "Nicosia");
        let jobs = parse_jobs(body, "Jooble", &c, Utc::now()).unwrap();
        let j = &jobs[0];
        assert_eq!(j.compensation, "€900 per month");
        assert_eq!(j.employment_type, EmploymentType::Contract);
        assert_eq!(j.description, "Immediate start in Nicosia");
        assert!(j.is_target_audience_friendly);
        assert_eq!(
            j.posted_date,
            Utc.with_ymd_and_hms(2025, 9, 1, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn bad_timestamp_falls_back_to_now() {
        let now = Utc::now();
        assert_eq!(parse_updated(Some("yesterday"), now), now);
        assert_eq!(parse_updated(None, now), now);
    }

    #[test]
    fn null_jobs_is_empty() {
        let body = br#"{"totalCount":0,"jobs":null}"#;
        let jobs = parse_jobs(body, "Jooble", &ctx("Cyprus", "Nicosia"), Utc::now()).unwrap();
        assert!(jobs.is_empty());
    }
}
