// src/external/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Country used when geocoding fails or a country has no dedicated providers.
pub const GLOBAL_COUNTRY: &str = "Global";
pub const UNKNOWN_CITY: &str = "Unknown";

/// Tag placed on every bundle produced by the aggregation layer.
pub const EXTERNAL_SOURCE: &str = "external_apis";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub city: String,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            country: GLOBAL_COUNTRY.to_string(),
            city: UNKNOWN_CITY.to_string(),
            state: None,
            postcode: None,
        }
    }
}

impl Location {
    /// "Nicosia, Cyprus" style label used in record locations and messages.
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
}

/// Canonical job listing, whatever provider it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub employment_type: EmploymentType,
    pub compensation: String,
    pub location: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub contact_phone: String,
    pub contact_email: String,
    pub application_url: String,
    pub is_target_audience_friendly: bool,
    pub is_active: bool,
    pub posted_date: DateTime<Utc>,
    pub provider: String,
    pub external: bool,
    pub urgency: Urgency,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Canonical social-service listing. Same shape as [`JobRecord`] with
/// `name`/`type`/`cost` in place of `title`/`company`/`compensation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub cost: String,
    pub location: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub contact_phone: String,
    pub contact_email: String,
    pub application_url: String,
    pub is_target_audience_friendly: bool,
    pub is_active: bool,
    pub posted_date: DateTime<Utc>,
    pub provider: String,
    pub external: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Result of one aggregation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle<T> {
    pub records: Vec<T>,
    pub location: Location,
    pub source: String,
}

impl<T> Bundle<T> {
    pub fn new(records: Vec<T>, location: Location) -> Self {
        Self {
            records,
            location,
            source: EXTERNAL_SOURCE.to_string(),
        }
    }
}

/// Common view over jobs and services used by merging and sorting.
pub trait Listing {
    fn posted_date(&self) -> DateTime<Utc>;
    fn coordinates(&self) -> Option<(f64, f64)>;
    fn is_active(&self) -> bool;
    fn set_external(&mut self, external: bool);
}

impl Listing for JobRecord {
    fn posted_date(&self) -> DateTime<Utc> {
        self.posted_date
    }
    fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn set_external(&mut self, external: bool) {
        self.external = external;
    }
}

impl Listing for ServiceRecord {
    fn posted_date(&self) -> DateTime<Utc> {
        self.posted_date
    }
    fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn set_external(&mut self, external: bool) {
        self.external = external;
    }
}
