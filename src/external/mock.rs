// src/external/mock.rs
//! Fallback listings used whenever a provider cannot deliver real data.
//!
//! Shape is fixed (template pools), content is random. The random source is
//! owned by the generator, so tests can build one from a seed.

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::external::normalize::{
    extract_benefits, extract_requirements, format_compensation, salary_format_for,
};
use crate::external::types::{EmploymentType, JobRecord, Location, ServiceRecord, Urgency};

/// Provider tag carried by every generated record.
pub const MOCK_PROVIDER: &str = "Enhanced_Mock";

const JOB_TITLES: &[&str] = &[
    "Warehouse Associate",
    "Kitchen Porter",
    "Cleaner",
    "Delivery Driver",
    "Retail Assistant",
    "Construction Labourer",
    "Dishwasher",
    "Landscaping Crew Member",
    "Moving Helper",
    "Hotel Housekeeper",
    "Car Wash Attendant",
    "Recycling Sorter",
];

const COMPANIES: &[&str] = &[
    "City Logistics",
    "Fresh Start Catering",
    "BrightClean Services",
    "GreenWay Landscaping",
    "Harbor Hotels",
    "QuickMove Removals",
    "Metro Build Co",
    "Second Chance Staffing",
];

const JOB_BLURBS: &[&str] = &[
    "Help keep our site running smoothly. Lifting and physical work involved.",
    "Join a friendly team serving hundreds of customers a day with great customer service.",
    "Shift work with flexible hours and a free meal every shift.",
    "Steady work with weekly pay and paid holiday.",
    "Outdoor role, transport to site provided from the city centre.",
];

const FRIENDLY_TAIL: &str = " No experience needed, training provided, immediate start available.";

const EMPLOYMENT: &[EmploymentType] = &[
    EmploymentType::FullTime,
    EmploymentType::PartTime,
    EmploymentType::Contract,
];

const URGENCY: &[Urgency] = &[Urgency::Low, Urgency::Medium, Urgency::High];

const SERVICE_TYPES: &[&str] = &[
    "Emergency Shelter",
    "Food Bank",
    "Medical Clinic",
    "Mental Health Support",
    "Addiction Recovery",
    "Job Training",
    "Legal Aid",
    "Day Centre",
    "Showers & Laundry",
    "Housing Assistance",
];

const ORG_NAMES: &[&str] = &[
    "Hope",
    "Harbor",
    "New Start",
    "Open Door",
    "Community",
    "Safe Haven",
    "Lighthouse",
    "Common Ground",
];

const SERVICE_BLURBS: &[&str] = &[
    "Walk-in support for anyone in need. Free meals served daily.",
    "Confidential help with housing applications and benefits.",
    "Drop in for a hot shower, clean clothes and a safe place to rest.",
    "Nurses and volunteers offering basic health checks and referrals.",
    "Support workers help with ID documents, training and job search.",
];

const MAX_POSTED_AGE_HOURS: i64 = 7 * 24;
const COORD_JITTER_DEG: f64 = 0.05;

pub struct MockGenerator {
    rng: Mutex<StdRng>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl MockGenerator {
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reproducible output for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate_jobs(
        &self,
        location: &Location,
        origin: Option<(f64, f64)>,
        count: usize,
    ) -> Vec<JobRecord> {
        let mut rng = self.rng.lock();
        let now = Utc::now();
        let per_month = salary_format_for(&location.country).period == "per month";

        (0..count)
            .map(|i| {
                let title = pick(&mut *rng, JOB_TITLES);
                let company = pick(&mut *rng, COMPANIES);
                let friendly = rng.random_bool(0.7);
                let mut description = pick(&mut *rng, JOB_BLURBS).to_string();
                if friendly {
                    description.push_str(FRIENDLY_TAIL);
                }

                let lo: f64 = rng.random_range(20_000.0..30_000.0);
                let hi = lo + rng.random_range(2_000.0..8_000.0);
                let (lo, hi) = if per_month { (lo / 12.0, hi / 12.0) } else { (lo, hi) };

                let (latitude, longitude) = jitter(&mut *rng, origin);
                let age = Duration::hours(rng.random_range(0..=MAX_POSTED_AGE_HOURS));

                JobRecord {
                    title: title.to_string(),
                    company: company.to_string(),
                    employment_type: *EMPLOYMENT.choose(&mut *rng).unwrap_or(&EMPLOYMENT[0]),
                    compensation: format_compensation(&location.country, Some(lo), Some(hi)),
                    location: location.label(),
                    requirements: extract_requirements(&description),
                    benefits: extract_benefits(&description),
                    description,
                    contact_phone: format!("555-01{:02}", rng.random_range(0..100)),
                    contact_email: format!("jobs@{}.example.org", slug(company)),
                    application_url: format!(
                        "https://jobs.example.org/{}/{}-{i}",
                        slug(company),
                        slug(title)
                    ),
                    is_target_audience_friendly: friendly,
                    is_active: true,
                    posted_date: now - age,
                    provider: MOCK_PROVIDER.to_string(),
                    external: true,
                    urgency: *URGENCY.choose(&mut *rng).unwrap_or(&Urgency::Medium),
                    latitude,
                    longitude,
                }
            })
            .collect()
    }

    pub fn generate_services(
        &self,
        location: &Location,
        origin: Option<(f64, f64)>,
        count: usize,
    ) -> Vec<ServiceRecord> {
        let mut rng = self.rng.lock();
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let service_type = pick(&mut *rng, SERVICE_TYPES);
                let org = pick(&mut *rng, ORG_NAMES);
                let description = pick(&mut *rng, SERVICE_BLURBS).to_string();
                let (latitude, longitude) = jitter(&mut *rng, origin);
                let age = Duration::hours(rng.random_range(0..=MAX_POSTED_AGE_HOURS));
                let name = format!("{org} {service_type}");

                ServiceRecord {
                    contact_email: format!("help@{}.example.org", slug(&name)),
                    application_url: format!("https://services.example.org/{}", slug(&name)),
                    name,
                    service_type: service_type.to_string(),
                    cost: "Free".to_string(),
                    location: location.label(),
                    requirements: vec!["Open to all".to_string()],
                    benefits: vec![service_type.to_string()],
                    description,
                    contact_phone: format!("555-01{:02}", rng.random_range(0..100)),
                    is_target_audience_friendly: true,
                    is_active: true,
                    posted_date: now - age,
                    provider: MOCK_PROVIDER.to_string(),
                    external: true,
                    latitude,
                    longitude,
                }
            })
            .collect()
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &'a [&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, origin: Option<(f64, f64)>) -> (Option<f64>, Option<f64>) {
    match origin {
        Some((lat, lng)) => (
            Some(lat + rng.random_range(-COORD_JITTER_DEG..COORD_JITTER_DEG)),
            Some(lng + rng.random_range(-COORD_JITTER_DEG..COORD_JITTER_DEG)),
        ),
        None => (None, None),
    }
}

fn slug(s: &str) -> String {
    s.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
