//! Geographic utilities.
//!
//! Pure spherical-earth helpers used on every incoming fix:
//! - Haversine great-circle distance
//! - Forward projection (destination point from distance + bearing)
//! - Initial bearing between two points
//! - Polyline length, bounds, center and display simplification
//!
//! None of these functions panic or return errors. Non-finite input yields a
//! neutral result (0 m) and a warning, because a failure here would abort
//! tracking mid-session.

use log::warn;

use crate::{Bounds, GpsPoint, Located};

/// Mean Earth radius in meters used by all distance calculations.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Convert degrees to radians.
#[inline]
pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Convert radians to degrees.
#[inline]
pub fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Great-circle distance in meters between two coordinates.
///
/// Returns exactly 0 for bitwise-identical points. The intermediate `a` term
/// is clamped to [0, 1] so rounding on near-identical points cannot produce
/// `NaN`.
///
/// # Example
/// ```
/// use gps_track_core::haversine_distance;
///
/// let d = haversine_distance(0.0, 0.0, 0.001, 0.0);
/// assert!((d - 111.19).abs() < 1.0);
/// ```
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if !(lat1.is_finite() && lon1.is_finite() && lat2.is_finite() && lon2.is_finite()) {
        warn!(
            "[Geodesy] Non-finite coordinates ({}, {}) -> ({}, {}), distance forced to 0",
            lat1, lon1, lat2, lon2
        );
        return 0.0;
    }

    if lat1 == lat2 && lon1 == lon2 {
        return 0.0;
    }

    let d_lat = to_radians(lat2 - lat1);
    let d_lon = to_radians(lon2 - lon1);
    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lon = (d_lon / 2.0).sin();

    let a = sin_d_lat * sin_d_lat
        + to_radians(lat1).cos() * to_radians(lat2).cos() * sin_d_lon * sin_d_lon;
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Haversine distance between two located values.
pub fn distance_between<A: Located, B: Located>(a: &A, b: &B) -> f64 {
    let p1 = a.position();
    let p2 = b.position();
    haversine_distance(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Initial bearing in degrees (0 = north, clockwise) from the first point
/// towards the second, normalized to [0, 360).
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = to_radians(lat1);
    let phi2 = to_radians(lat2);
    let d_lon = to_radians(lon2 - lon1);

    let y = d_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lon.cos();

    (to_degrees(y.atan2(x)) + 360.0) % 360.0
}

/// Project a point `distance_m` meters along `bearing_deg` (0 = north,
/// clockwise) using the spherical direct geodesic.
///
/// # Example
/// ```
/// use gps_track_core::{destination_point, haversine_distance};
///
/// let p = destination_point(40.0, 116.0, 1000.0, 90.0);
/// let back = haversine_distance(40.0, 116.0, p.latitude, p.longitude);
/// assert!((back - 1000.0).abs() < 1e-6);
/// ```
pub fn destination_point(lat: f64, lon: f64, distance_m: f64, bearing_deg: f64) -> GpsPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let phi1 = to_radians(lat);
    let lambda1 = to_radians(lon);
    let theta = to_radians(bearing_deg);

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    // Wrap longitude into [-180, 180)
    let lon2 = (to_degrees(lambda2) + 540.0) % 360.0 - 180.0;

    GpsPoint::new(to_degrees(phi2), lon2)
}

/// Sum of consecutive-pair haversine distances along a path.
///
/// This is the plain path length. Activity totals use the windowed estimate in
/// [`crate::aggregator::total_distance`], which is smaller for the same input.
pub fn polyline_length<T: Located>(points: &[T]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_between(&pair[0], &pair[1]))
        .sum()
}

/// Bounding box of a track, `None` when empty.
pub fn compute_bounds<T: Located>(points: &[T]) -> Option<Bounds> {
    Bounds::from_points(points)
}

/// Center of a track's bounding box, `None` when empty.
pub fn compute_center<T: Located>(points: &[T]) -> Option<GpsPoint> {
    compute_bounds(points).map(|b| b.center())
}

/// Douglas-Peucker line simplification for display.
///
/// Reduces the number of vertices the map has to draw while preserving the
/// track's shape. `tolerance` is in degrees (0.00001 ≈ 1.1 m).
///
/// # Example
/// ```rust
/// use gps_track_core::geo_utils::douglas_peucker;
/// use gps_track_core::GpsPoint;
///
/// let track = vec![
///     GpsPoint::new(40.0000, 116.0),
///     GpsPoint::new(40.0005, 116.0),
///     GpsPoint::new(40.0010, 116.0),
/// ];
/// let simplified = douglas_peucker(&track, 0.00001);
/// assert_eq!(simplified.len(), 2);
/// ```
pub fn douglas_peucker<T: Located>(points: &[T], tolerance: f64) -> Vec<GpsPoint> {
    use geo::{algorithm::simplify::Simplify, Coord, LineString};

    if points.len() < 3 {
        return points.iter().map(Located::position).collect();
    }

    let coords: Vec<Coord<f64>> = points
        .iter()
        .map(Located::position)
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    let line = LineString::new(coords);
    let simplified = line.simplify(&tolerance);

    simplified
        .coords()
        .map(|c| GpsPoint::new(c.y, c.x))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} ± {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_identical_points_are_zero() {
        assert_eq!(haversine_distance(40.0, 116.0, 40.0, 116.0), 0.0);
        assert_eq!(haversine_distance(-33.8688, 151.2093, -33.8688, 151.2093), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let ab = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        let ba = haversine_distance(48.8566, 2.3522, 51.5074, -0.1278);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_equator_millidegree() {
        let d = haversine_distance(0.0, 0.0, 0.001, 0.0);
        assert_close(d, 111.19, 111.19 * 0.01);
    }

    #[test]
    fn test_london_paris() {
        let d = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert_close(d / 1000.0, 343.5, 2.0);
    }

    #[test]
    fn test_non_finite_input_is_zero() {
        assert_eq!(haversine_distance(f64::NAN, 116.0, 40.0, 116.0), 0.0);
        assert_eq!(haversine_distance(40.0, f64::INFINITY, 40.0, 116.0), 0.0);
    }

    #[test]
    fn test_antipodal_points_do_not_nan() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert_close(d, std::f64::consts::PI * EARTH_RADIUS_M, 1.0);
    }

    #[test]
    fn test_destination_round_trip() {
        let (lat, lon) = (40.0, 116.0);
        for &bearing in &[0.0, 90.0, 180.0, 270.0] {
            for &distance in &[10.0, 1000.0, 100_000.0] {
                let p = destination_point(lat, lon, distance, bearing);
                let back = haversine_distance(lat, lon, p.latitude, p.longitude);
                assert_close(back, distance, distance * 1e-9 + 1e-6);
            }
        }
    }

    #[test]
    fn test_destination_inverts_bearing_and_distance() {
        let (lat1, lon1) = (40.4191, 115.5054);
        let (lat2, lon2) = (40.4291, 115.5204);
        let d = haversine_distance(lat1, lon1, lat2, lon2);
        let b = initial_bearing(lat1, lon1, lat2, lon2);
        let q = destination_point(lat1, lon1, d, b);
        assert_close(q.latitude, lat2, 1e-9);
        assert_close(q.longitude, lon2, 1e-9);
    }

    #[test]
    fn test_bearing_cardinals() {
        assert_close(initial_bearing(0.0, 0.0, 1.0, 0.0), 0.0, 1e-9);
        assert_close(initial_bearing(0.0, 0.0, 0.0, 1.0), 90.0, 1e-9);
        assert_close(initial_bearing(1.0, 0.0, 0.0, 0.0), 180.0, 1e-9);
        assert_close(initial_bearing(0.0, 1.0, 0.0, 0.0), 270.0, 1e-9);
    }

    #[test]
    fn test_destination_wraps_longitude() {
        let p = destination_point(0.0, 179.9995, 200.0, 90.0);
        assert!(p.longitude < -179.0);
    }

    #[test]
    fn test_polyline_length() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.001, 0.0),
            GpsPoint::new(0.002, 0.0),
        ];
        let expected = 2.0 * haversine_distance(0.0, 0.0, 0.001, 0.0);
        assert_close(polyline_length(&points), expected, 1e-6);
        assert_eq!(polyline_length::<GpsPoint>(&[]), 0.0);
    }

    #[test]
    fn test_douglas_peucker_keeps_corner() {
        let track = vec![
            GpsPoint::new(40.0, 116.0),
            GpsPoint::new(40.0005, 116.0),
            GpsPoint::new(40.001, 116.0),
            GpsPoint::new(40.001, 116.0005),
            GpsPoint::new(40.001, 116.001),
        ];
        let simplified = douglas_peucker(&track, 0.00001);
        assert_eq!(simplified.len(), 3);
        assert_eq!(simplified[1], GpsPoint::new(40.001, 116.0));
    }
}
