// src/external/geocode.rs
//! Reverse geocoding behind a process-lifetime cache.
//!
//! Only successful lookups are cached. A failed lookup yields
//! [`Location::default`] and is retried on the next call for the same key.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::external::anon_hash;
use crate::external::types::{Location, UNKNOWN_CITY};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Location>;
    fn name(&self) -> &'static str;
}

/// OpenStreetMap Nominatim `reverse` endpoint.
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ReverseResp {
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    country: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building geocoder http client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn location_from(addr: Address) -> Result<Location> {
        let country = addr
            .country
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("reverse geocode response has no country"))?;
        let city = addr
            .city
            .or(addr.town)
            .or(addr.village)
            .unwrap_or_else(|| UNKNOWN_CITY.to_string());
        Ok(Location {
            country,
            city,
            state: addr.state,
            postcode: addr.postcode,
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Location> {
        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("zoom", "10".to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("nominatim http get()")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("nominatim http status")?;
        let body: ReverseResp = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("parsing nominatim json")?;
        let addr = body
            .address
            .ok_or_else(|| anyhow!("reverse geocode response has no address"))?;
        Self::location_from(addr)
    }

    fn name(&self) -> &'static str {
        "nominatim"
    }
}

/// Coordinate-keyed cache in front of a [`ReverseGeocoder`].
pub struct GeocodingCache {
    geocoder: Arc<dyn ReverseGeocoder>,
    entries: Mutex<HashMap<String, Location>>,
}

impl GeocodingCache {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self {
            geocoder,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Raw values joined as-is; no rounding, so nearby points are distinct keys.
    pub fn cache_key(lat: f64, lng: f64) -> String {
        format!("{lat},{lng}")
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn resolve(&self, lat: f64, lng: f64) -> Location {
        let key = Self::cache_key(lat, lng);
        let cached = self.entries.lock().get(&key).cloned();
        if let Some(hit) = cached {
            counter!("geocode_cache_hits_total").increment(1);
            return hit;
        }
        counter!("geocode_cache_misses_total").increment(1);

        // Lock is not held across the lookup; two concurrent misses may both call out.
        match self.geocoder.reverse(lat, lng).await {
            Ok(loc) => {
                tracing::debug!(
                    target: "geocode",
                    key = %anon_hash(&key),
                    country = %loc.country,
                    city = %loc.city,
                    "reverse geocode resolved"
                );
                self.entries.lock().insert(key, loc.clone());
                loc
            }
            Err(e) => {
                counter!("geocode_failures_total").increment(1);
                tracing::warn!(
                    target: "geocode",
                    key = %anon_hash(&key),
                    geocoder = self.geocoder.name(),
                    error = ?e,
                    "reverse geocode failed; using default location"
                );
                Location::default()
            }
        }
    }
}
