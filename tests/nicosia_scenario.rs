// tests/nicosia_scenario.rs
//
// Request at Nicosia (35.1856, 33.3823) through the built-in registry and
// the real HTTP adapters. Geocoding is served by a wiremock Nominatim.
//
// - without a Jooble key every job is mock data tagged "Enhanced_Mock"
// - with a key the Jooble adapter is called with the Cyprus location

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_config;
use outreach_aggregator::external::geocode::NominatimGeocoder;
use outreach_aggregator::external::mock::{MockGenerator, MOCK_PROVIDER};
use outreach_aggregator::external::providers::{build_http_client, AdapterTable};
use outreach_aggregator::external::registry::ProviderRegistry;
use outreach_aggregator::external::AggregationManager;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NICOSIA: (f64, f64) = (35.1856, 33.3823);

async fn nominatim() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(query_param("lat", "35.1856"))
        .and(query_param("lon", "33.3823"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "display_name": "Nicosia, Nicosia District, Cyprus",
            "address": {
                "city": "Nicosia",
                "state": "Nicosia District",
                "postcode": "1010",
                "country": "Cyprus",
                "country_code": "cy"
            }
        })))
        .mount(&server)
        .await;
    server
}

fn manager_with(registry: ProviderRegistry, geocoder_url: &str) -> AggregationManager {
    let geocoder =
        NominatimGeocoder::new(geocoder_url, "outreach-aggregator-tests", Duration::from_secs(5))
            .expect("geocoder");
    let client =
        build_http_client("outreach-aggregator-tests", Duration::from_secs(5)).expect("client");
    AggregationManager::new(
        test_config(),
        Arc::new(registry),
        AdapterTable::http(client),
        Arc::new(geocoder),
    )
    .with_mock_generator(MockGenerator::seeded(2025))
}

#[tokio::test]
async fn nicosia_without_credentials_is_all_mock() {
    let geo = nominatim().await;
    let m = manager_with(ProviderRegistry::default_seed_with(|_| None), &geo.uri());

    let bundle = m
        .fetch_external_jobs(NICOSIA.0, NICOSIA.1, 25)
        .await
        .expect("bundle");

    assert_eq!(bundle.location.country, "Cyprus");
    assert_eq!(bundle.location.city, "Nicosia");
    assert_eq!(bundle.source, "external_apis");
    assert!(!bundle.records.is_empty());
    for job in &bundle.records {
        assert_eq!(job.provider, MOCK_PROVIDER);
        assert!(job.external);
        assert!(job.compensation.contains('€') && job.compensation.ends_with("per month"));
        assert_eq!(job.location, "Nicosia, Cyprus");
    }

    let services = m
        .fetch_social_services(NICOSIA.0, NICOSIA.1, 25)
        .await
        .expect("services");
    assert_eq!(services.records.len(), 10);
    assert!(services.records.iter().all(|s| s.external));
}

#[tokio::test]
async fn nicosia_with_jooble_key_uses_cyprus_provider() {
    let geo = nominatim().await;
    let jooble = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jooble-key"))
        .and(body_json(json!({
            "keywords": "no experience",
            "location": "Nicosia, Cyprus",
            "page": "1",
            "radius": "25"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {
                    "title": "Barista",
                    "company": "Ledra Coffee",
                    "snippet": "Entry level, training provided."
                },
                {"title": "Porter", "company": "Cyprus Hotels"}
            ]
        })))
        .expect(1)
        .mount(&jooble)
        .await;

    let toml = format!(
        r#"
[[countries.Cyprus.jobs]]
name = "Jooble"
kind = "jooble"
endpoint = "{}"
credential_env = "JOOBLE_API_KEY"

[countries.Cyprus.jobs.query_params]
keywords = "no experience"
location = "{{city}}, Cyprus"
radius = "{{radius}}"
page = "1"

[countries.Global]
jobs = []
"#,
        jooble.uri()
    );
    let registry = ProviderRegistry::parse_toml(&toml, |name| {
        (name == "JOOBLE_API_KEY").then(|| "jooble-key".to_string())
    })
    .expect("registry");
    let m = manager_with(registry, &geo.uri());

    let bundle = m
        .fetch_external_jobs(NICOSIA.0, NICOSIA.1, 25)
        .await
        .expect("bundle");

    assert_eq!(bundle.location.country, "Cyprus");
    assert_eq!(bundle.records.len(), 2);
    assert!(bundle
        .records
        .iter()
        .all(|j| j.provider == "Jooble" && j.external));
    assert!(bundle.records[0].is_target_audience_friendly);
}
