//! Great-circle distance calculations.
//!
//! Contains helper functions for:
//! - Haversine distance between two coordinates (kilometers)
//! - Inclusive range checks expressed in meters

use super::types::Coordinate;

/// Mean Earth radius used by the haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates using the haversine formula.
///
/// # Formula
///
/// ```text
/// a = sin²(Δφ/2) + cos φ₁ · cos φ₂ · sin²(Δλ/2)
/// c = 2 · atan2(√a, √(1−a))
/// d = R · c
/// ```
///
/// # Parameters
///
/// * `a` - First coordinate (degrees)
/// * `b` - Second coordinate (degrees)
///
/// # Returns
///
/// Distance in kilometers. Degenerate input yields a value (possibly NaN),
/// never an error.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_distance = (a.latitude - b.latitude).to_radians();
    let lon_distance = (a.longitude - b.longitude).to_radians();
    let h = (lat_distance / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (lon_distance / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Inclusive range check: is `b` within `range_m` meters of `a`?
pub fn within_range(a: &Coordinate, b: &Coordinate, range_m: f64) -> bool {
    haversine_km(a, b) <= range_m / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate { latitude, longitude }
    }

    #[test]
    fn distance_to_self_is_zero() {
        for point in [c(0.0, 0.0), c(-37.8136, 144.9631), c(89.9, -179.9)] {
            assert_eq!(haversine_km(&point, &point), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let melbourne = c(-37.8136, 144.9631);
        let sydney = c(-33.8688, 151.2093);
        let there = haversine_km(&melbourne, &sydney);
        let back = haversine_km(&sydney, &melbourne);
        assert!((there - back).abs() < 1e-9);
        // Roughly 714 km by great circle
        assert!((there - 714.0).abs() < 5.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_km(&c(10.0, 20.0), &c(11.0, 20.0));
        assert!((d - 111.2).abs() <= 111.2 * 0.01, "got {} km", d);
    }

    #[test]
    fn range_check_is_inclusive_and_in_meters() {
        let a = c(0.0, 0.0);
        // ~1 km north
        let near = c(1.0 / 111.195, 0.0);
        // ~5 km north
        let far = c(5.0 / 111.195, 0.0);
        assert!(within_range(&a, &near, 2000.0));
        assert!(!within_range(&a, &far, 2000.0));
        assert!(within_range(&a, &a, 0.0));
    }
}
