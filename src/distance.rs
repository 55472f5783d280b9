// src/distance.rs
use std::cmp::Ordering;

use crate::external::types::Listing;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two `(lat, lng)` points in degrees.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lng1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lng2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Distance from `origin`, or `None` when the record has no coordinates.
pub fn distance_from<T: Listing>(origin: (f64, f64), record: &T) -> Option<f64> {
    record.coordinates().map(|c| haversine_km(origin, c))
}

/// Nearest first. Records without coordinates go last, keeping their order.
pub fn sort_by_distance<T: Listing>(records: &mut [T], origin: (f64, f64)) {
    records.sort_by(|a, b| {
        match (distance_from(origin, a), distance_from(origin, b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Newest `postedDate` first; stable for equal dates.
pub fn sort_by_posted_desc<T: Listing>(records: &mut [T]) {
    records.sort_by(|a, b| b.posted_date().cmp(&a.posted_date()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_for_same_point() {
        assert!(haversine_km((35.1856, 33.3823), (35.1856, 33.3823)).abs() < 1e-9);
    }

    #[test]
    fn london_to_paris_is_about_344_km() {
        let d = haversine_km((51.5074, -0.1278), (48.8566, 2.3522));
        assert!((d - 343.5).abs() < 2.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = (40.7128, -74.0060);
        let b = (34.0522, -118.2437);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }
}
