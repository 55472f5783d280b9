// src/external/providers/open_referral.rs
//! Open Referral (HSDS 3.0) `GET /services` adapter. Most social-service
//! directories we know of publish this shape.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{FetchContext, ProviderAdapter, ServiceDraft};
use crate::external::normalize::parse_posted;
use crate::external::registry::ProviderDescriptor;
use crate::external::types::ServiceRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Page {
    #[serde(deserialize_with = "super::null_as_default")]
    contents: Vec<Service>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Service {
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    email: Option<String>,
    status: Option<String>,
    eligibility_description: Option<String>,
    fees_description: Option<String>,
    last_modified: Option<String>,
    organization: Option<Organization>,
    #[serde(deserialize_with = "super::null_as_default")]
    phones: Vec<Phone>,
    #[serde(deserialize_with = "super::null_as_default")]
    service_at_locations: Vec<ServiceAtLocation>,
    #[serde(deserialize_with = "super::null_as_default")]
    attributes: Vec<Attribute>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Organization {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Phone {
    number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceAtLocation {
    location: Option<Place>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Place {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(deserialize_with = "super::null_as_default")]
    addresses: Vec<Address>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Address {
    address_1: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Attribute {
    taxonomy_term: Option<Term>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Term {
    name: Option<String>,
}

fn address_line(place: &Place) -> Option<String> {
    let a = place.addresses.first()?;
    let parts: Vec<&str> = [a.address_1.as_deref(), a.city.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub fn parse_services(
    body: &[u8],
    provider: &str,
    ctx: &FetchContext,
    now: DateTime<Utc>,
) -> Result<Vec<ServiceRecord>> {
    let page: Page = serde_json::from_slice(body).context("parsing open referral json")?;
    Ok(page
        .contents
        .into_iter()
        .map(|s| {
            let place = s.service_at_locations.into_iter().find_map(|sal| sal.location);
            let terms: Vec<String> = s
                .attributes
                .into_iter()
                .filter_map(|a| a.taxonomy_term.and_then(|t| t.name))
                .collect();
            let name = s
                .name
                .or_else(|| s.organization.as_ref().and_then(|o| o.name.clone()));
            ServiceDraft {
                name,
                service_type: terms.first().cloned(),
                cost: s.fees_description,
                location: place.as_ref().and_then(address_line),
                description: s.description,
                eligibility: s.eligibility_description,
                offered: terms,
                url: s.url,
                email: s.email,
                phone: s.phones.into_iter().find_map(|p| p.number),
                active: s.status.map(|st| st.eq_ignore_ascii_case("active")),
                posted: Some(parse_posted(s.last_modified.as_deref(), now)),
                latitude: place.as_ref().and_then(|p| p.latitude),
                longitude: place.as_ref().and_then(|p| p.longitude),
            }
            .into_record(provider, ctx, now)
        })
        .collect())
}

pub struct OpenReferralAdapter {
    client: reqwest::Client,
}

impl OpenReferralAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for OpenReferralAdapter {
    async fn fetch_services(
        &self,
        desc: &ProviderDescriptor,
        ctx: &FetchContext,
    ) -> Result<Vec<ServiceRecord>> {
        let key = desc
            .credential
            .as_deref()
            .ok_or_else(|| anyhow!("open referral: missing api key"))?;
        let url = format!("{}/services", desc.endpoint.trim_end_matches('/'));
        let mut query = ctx.query(desc, &[]);
        query.push(("lat".into(), ctx.origin.0.to_string()));
        query.push(("long".into(), ctx.origin.1.to_string()));

        let body = self
            .client
            .get(&url)
            .header("x-api-key", key)
            .query(&query)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("open referral http get()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("open referral http status")?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("open referral http body")?;
        parse_services(&body, &desc.name, ctx, Utc::now())
    }

    fn name(&self) -> &'static str {
        "open_referral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::providers::test_support::ctx;

    #[test]
    fn maps_hsds_service() {
        let body = br#"{"total_items":1,"contents":[{
            "name":"St Anne's Day Centre",
            "description":"<p>Hot meals &amp; showers</p>",
            "status":"active",
            "eligibility_description":"Adults 18+",
            "phones":[{"number":"0113 000 0000"}],
            "service_at_locations":[{"location":{"latitude":53.79,"longitude":-1.54,
                "addresses":[{"address_1":"6 Crown St","city":"Leeds"}]}}],
            "attributes":[{"taxonomy_term":{"name":"Day Centre"}},{"taxonomy_term":{"name":"Food"}}]
        }]}"#;
        let c = ctx("United Kingdom", "Leeds");
        let out = parse_services(body, "OpenReferralUK", &c, Utc::now()).unwrap();
        let s = &out[0];
        assert_eq!(s.service_type, "Day Centre");
        assert_eq!(s.description, "Hot meals & showers");
        assert_eq!(s.location, "6 Crown St, Leeds");
        assert_eq!(s.requirements, vec!["Adults 18+".to_string()]);
        assert_eq!(s.benefits, vec!["Day Centre".to_string(), "Food".to_string()]);
        assert_eq!(s.contact_phone, "0113 000 0000");
        assert_eq!(s.cost, "Free");
        assert!(s.is_active && s.external);
    }

    #[test]
    fn organization_name_backfills_service_name() {
        let body = br#"{"contents":[{"organization":{"name":"Shelter Org"},"status":"inactive"}]}"#;
        let out = parse_services(body, "x", &ctx("Global", "Unknown"), Utc::now()).unwrap();
        assert_eq!(out[0].name, "Shelter Org");
        assert!(!out[0].is_active);
        assert_eq!(out[0].service_type, "Social Service");
    }

    #[test]
    fn null_collections_keep_the_rest_of_the_page() {
        let body = br#"{"contents":[
            {"name":"Soup Run","status":"active","phones":[{"number":"020 7000 0000"}]},
            {"name":"Drop-in","phones":null,"service_at_locations":null,"attributes":null}
        ]}"#;
        let c = ctx("United Kingdom", "London");
        let out = parse_services(body, "OpenReferralUK", &c, Utc::now()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].contact_phone, "020 7000 0000");
        assert_eq!(out[1].name, "Drop-in");
        assert_eq!(out[1].location, "London, United Kingdom");
    }

    #[test]
    fn null_contents_is_an_empty_page() {
        let body = br#"{"contents":null}"#;
        let out = parse_services(body, "x", &ctx("Global", "Unknown"), Utc::now()).unwrap();
        assert!(out.is_empty());
    }
}
