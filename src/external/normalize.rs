// src/external/normalize.rs
//! Field-level normalization shared by every provider adapter: description
//! cleanup, employment-type mapping, compensation formatting and the keyword
//! heuristics for requirements, benefits, friendliness and urgency.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::external::types::{EmploymentType, Urgency};

const DESCRIPTION_CAP: usize = 2000;

pub const DEFAULT_REQUIREMENTS: [&str; 2] = ["Positive attitude", "Willingness to learn"];
pub const DEFAULT_BENEFITS: [&str; 2] = ["Steady income", "Supportive work environment"];
pub const SALARY_NOT_SPECIFIED: &str = "Salary not specified";

/// (keywords, label): any keyword hit adds the label once.
const REQUIREMENT_KEYWORDS: &[(&[&str], &str)] = &[
    (
        &["driving licence", "driver's license", "drivers license", "driving license"],
        "Valid driver's license",
    ),
    (&["forklift"], "Forklift certification"),
    (&["cscs"], "CSCS card"),
    (&["food hygiene", "food handler"], "Food hygiene certificate"),
    (&["english"], "Basic English"),
    (&["lifting", "physical"], "Able to do physical work"),
    (&["customer service"], "Customer service skills"),
    (&["background check", "dbs"], "Background check"),
    (&["high school", "diploma"], "High school diploma or equivalent"),
];

const BENEFIT_KEYWORDS: &[(&[&str], &str)] = &[
    (&["insurance"], "Health insurance"),
    (&["training"], "Paid training"),
    (&["flexible"], "Flexible hours"),
    (&["holiday", "vacation", "paid time off"], "Paid time off"),
    (&["pension", "401k", "401(k)"], "Pension plan"),
    (&["meal", "food provided"], "Free meals"),
    (&["bonus"], "Performance bonus"),
    (&["accommodation", "housing"], "Accommodation provided"),
    (&["transport", "travel"], "Travel assistance"),
];

pub const FRIENDLY_KEYWORDS: &[&str] = &[
    "no experience",
    "entry level",
    "entry-level",
    "immediate start",
    "training provided",
    "will train",
    "no qualifications",
    "fair chance",
    "second chance",
    "same day pay",
    "daily pay",
];

const URGENT_KEYWORDS: &[&str] = &["urgent", "immediate", "asap"];

/// Decode entities, strip tags, collapse whitespace, cap length.
pub fn clean_description(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > DESCRIPTION_CAP {
        out = out.chars().take(DESCRIPTION_CAP).collect();
    }
    out
}

/// Missing or unrecognized values map to full-time.
pub fn map_employment_type(raw: Option<&str>) -> EmploymentType {
    let Some(raw) = raw else {
        return EmploymentType::FullTime;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "permanent" | "full_time" | "full-time" | "fulltime" | "full time" => {
            EmploymentType::FullTime
        }
        "part_time" | "part-time" | "parttime" | "part time" => EmploymentType::PartTime,
        "contract" | "temporary" | "temp" | "seasonal" => EmploymentType::Contract,
        "internship" | "apprenticeship" => EmploymentType::Internship,
        _ => EmploymentType::FullTime,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryFormat {
    pub symbol: &'static str,
    pub period: &'static str,
}

const fn salary(symbol: &'static str, period: &'static str) -> SalaryFormat {
    SalaryFormat { symbol, period }
}

pub fn salary_format_for(country: &str) -> SalaryFormat {
    match country {
        "United States" => salary("$", "per year"),
        "United Kingdom" => salary("£", "per annum"),
        "Cyprus" => salary("€", "per month"),
        "Canada" => salary("C$", "per year"),
        "Australia" => salary("A$", "per year"),
        "Germany" | "France" | "Ireland" | "Greece" => salary("€", "per year"),
        // Global
        _ => salary("$", "per year"),
    }
}

/// "£20,000 - £25,000 per annum", "€1,200 per month" or "Salary not specified".
pub fn format_compensation(country: &str, min: Option<f64>, max: Option<f64>) -> String {
    let fmt = salary_format_for(country);
    let min = min.filter(|v| v.is_finite() && *v > 0.0);
    let max = max.filter(|v| v.is_finite() && *v > 0.0);
    match (min, max) {
        (Some(lo), Some(hi)) if (hi - lo).abs() >= 1.0 => format!(
            "{sym}{} - {sym}{} {}",
            group_thousands(lo),
            group_thousands(hi),
            fmt.period,
            sym = fmt.symbol
        ),
        (Some(v), _) | (None, Some(v)) => {
            format!("{}{} {}", fmt.symbol, group_thousands(v), fmt.period)
        }
        (None, None) => SALARY_NOT_SPECIFIED.to_string(),
    }
}

fn group_thousands(v: f64) -> String {
    let digits = (v.round() as u64).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn scan_keywords(text: &str, table: &[(&[&str], &str)], defaults: &[&str]) -> Vec<String> {
    let lower = text.to_lowercase();
    let hits: Vec<String> = table
        .iter()
        .filter(|(keys, _)| keys.iter().any(|k| lower.contains(k)))
        .map(|(_, label)| label.to_string())
        .collect();
    if hits.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        hits
    }
}

pub fn extract_requirements(text: &str) -> Vec<String> {
    scan_keywords(text, REQUIREMENT_KEYWORDS, &DEFAULT_REQUIREMENTS)
}

pub fn extract_benefits(text: &str) -> Vec<String> {
    scan_keywords(text, BENEFIT_KEYWORDS, &DEFAULT_BENEFITS)
}

pub fn is_target_audience_friendly(text: &str) -> bool {
    let lower = text.to_lowercase();
    FRIENDLY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// First e-mail address mentioned in free text, or "".
pub fn extract_email(text: &str) -> String {
    static RE_EMAIL: OnceCell<Regex> = OnceCell::new();
    let re = RE_EMAIL
        .get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
    re.find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn urgency_for(text: &str, posted: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    let lower = text.to_lowercase();
    if URGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Urgency::High
    } else if now.signed_duration_since(posted) <= Duration::days(7) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Parse an RFC 3339 timestamp, falling back to `now` so `postedDate` is always set.
pub fn parse_posted(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

/// Empty or whitespace-only strings become `fallback`.
pub fn or_default(raw: Option<String>, fallback: &str) -> String {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
