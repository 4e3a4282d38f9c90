//! Geodesy, smoothing and aggregation properties checked through the public API.

use gps_track_core::geo_utils::{douglas_peucker, polyline_length};
use gps_track_core::{
    destination_point, haversine_distance, initial_bearing, total_distance, Bounds, GpsPoint,
    KalmanFilter, Smoother, SpeedSmoother,
};

const SAMPLE_POINTS: [(f64, f64); 5] = [
    (0.0, 0.0),
    (40.0, 116.0),
    (-33.8688, 151.2093),
    (51.5074, -0.1278),
    (64.1466, -21.9426),
];

#[test]
fn distance_identity_and_symmetry() {
    for &(lat1, lon1) in &SAMPLE_POINTS {
        assert_eq!(haversine_distance(lat1, lon1, lat1, lon1), 0.0);
        for &(lat2, lon2) in &SAMPLE_POINTS {
            let ab = haversine_distance(lat1, lon1, lat2, lon2);
            let ba = haversine_distance(lat2, lon2, lat1, lon1);
            assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
            assert!(ab.is_finite() && ab >= 0.0);
        }
    }
}

#[test]
fn thousandth_degree_at_equator() {
    let d = haversine_distance(0.0, 0.0, 0.001, 0.0);
    assert!((d - 111.19).abs() / 111.19 < 0.01, "distance {}", d);
}

#[test]
fn destination_round_trip() {
    for &(lat, lon) in &SAMPLE_POINTS {
        for bearing in [0.0, 90.0, 180.0, 270.0] {
            for distance in [10.0, 1_000.0, 100_000.0] {
                let p = destination_point(lat, lon, distance, bearing);
                let back = haversine_distance(lat, lon, p.latitude, p.longitude);
                assert!(
                    (back - distance).abs() < 1e-6 * distance.max(1.0),
                    "({}, {}) bearing {} distance {} -> {}",
                    lat,
                    lon,
                    bearing,
                    distance,
                    back
                );
            }
        }
    }
}

#[test]
fn destination_reaches_target() {
    let (lat1, lon1) = (40.0, 116.0);
    let (lat2, lon2) = (40.01, 116.02);
    let d = haversine_distance(lat1, lon1, lat2, lon2);
    let b = initial_bearing(lat1, lon1, lat2, lon2);
    let p = destination_point(lat1, lon1, d, b);
    assert!(haversine_distance(p.latitude, p.longitude, lat2, lon2) < 0.01);
}

#[test]
fn windowed_distance_never_exceeds_path_length() {
    // A zigzag, where the windowed total drops the final segment
    let track: Vec<GpsPoint> = (0..12)
        .map(|i| {
            let east = if i % 2 == 0 { 0.0 } else { 25.0 };
            let north = destination_point(40.0, 116.0, i as f64 * 20.0, 0.0);
            destination_point(north.latitude, north.longitude, east, 90.0)
        })
        .collect();
    let windowed = total_distance(&track);
    let naive = polyline_length(&track);
    assert!(windowed > 0.0);
    assert!(windowed < naive);
}

#[test]
fn kalman_converges_on_constant_stream() {
    let mut kalman = KalmanFilter::default();
    kalman.update(0.0);
    let mut estimate = 0.0;
    for _ in 0..200 {
        estimate = kalman.update(12.5);
    }
    assert!((estimate - 12.5).abs() < 1e-3, "estimate {}", estimate);

    // Converged: further identical samples do not move it
    for _ in 0..50 {
        let next = kalman.update(12.5);
        assert!((next - 12.5).abs() <= (estimate - 12.5).abs() + 1e-12);
    }
}

#[test]
fn single_speed_spike_is_not_propagated() {
    let mut smoother = SpeedSmoother::default();
    smoother.update(5.0);
    let before = smoother.update(5.0);
    let during = smoother.update(50.0);
    assert_eq!(during, before);
    let after = smoother.update(6.0);
    assert!(after < 6.0 && after > 5.0, "after {}", after);
}

#[test]
fn simplified_track_keeps_endpoints_and_bounds() {
    let track: Vec<GpsPoint> = (0..50)
        .map(|i| destination_point(40.0, 116.0, i as f64 * 10.0, 30.0))
        .collect();
    let simplified = douglas_peucker(&track, 0.00001);
    assert_eq!(simplified.first(), track.first());
    assert_eq!(simplified.last(), track.last());
    assert!(simplified.len() < track.len());

    let bounds = Bounds::from_points(&track).unwrap();
    let center = bounds.center();
    assert!(center.latitude > bounds.min_lat && center.latitude < bounds.max_lat);
}
