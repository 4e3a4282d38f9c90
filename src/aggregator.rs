//! Running distance and average speed over accepted fixes.
//!
//! ## Sliding-window distance
//!
//! Distance is accumulated through a window of the 3 most recent points. Each
//! time the window is full, the distance between its *first and second*
//! points is added (if above a 1 m noise floor) and the window slides by one.
//!
//! Over a track of `n` points this sums the consecutive pairs
//! `(p0,p1) .. (p[n-3],p[n-2])`: the final pair is never counted, and tracks
//! with fewer than 3 points report 0. Stored activity averages and the
//! per-activity thresholds were tuned against exactly this estimate, so it is
//! kept as is. Use [`crate::geo_utils::polyline_length`] for the plain path
//! length.

use std::collections::VecDeque;

use crate::geo_utils::distance_between;
use crate::units::MS_PER_HOUR;
use crate::{AcceptedFix, GpsPoint, Located};

/// Number of points in the distance window.
pub const WINDOW_SIZE: usize = 3;

/// Segments at or below this length (meters) are treated as noise.
pub const NOISE_FLOOR_METERS: f64 = 1.0;

/// Incremental sliding-window distance accumulator.
///
/// Pushing points one by one gives the same total as [`total_distance`] over
/// the whole sequence.
#[derive(Debug, Clone, Default)]
pub struct TrackAggregator {
    window: VecDeque<GpsPoint>,
    total_meters: f64,
    point_count: usize,
}

impl TrackAggregator {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            total_meters: 0.0,
            point_count: 0,
        }
    }

    /// Add the next point and return the running total in meters.
    pub fn push<T: Located>(&mut self, point: &T) -> f64 {
        self.window.push_back(point.position());
        self.point_count += 1;

        if self.window.len() == WINDOW_SIZE {
            let segment = distance_between(&self.window[0], &self.window[1]);
            if segment > NOISE_FLOOR_METERS {
                self.total_meters += segment;
            }
            self.window.pop_front();
        }

        self.total_meters
    }

    /// Running total in meters.
    pub fn total_distance(&self) -> f64 {
        self.total_meters
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.total_meters = 0.0;
        self.point_count = 0;
    }
}

/// Sliding-window total distance in meters.
///
/// Empty and single-point sequences return 0.
///
/// # Example
/// ```
/// use gps_track_core::{total_distance, GpsPoint};
///
/// let track: Vec<GpsPoint> = (0..5)
///     .map(|i| GpsPoint::new(40.0 + i as f64 * 0.0001, 116.0))
///     .collect();
/// let naive = gps_track_core::geo_utils::polyline_length(&track);
/// assert!(total_distance(&track) < naive);
/// ```
pub fn total_distance<T: Located>(coordinates: &[T]) -> f64 {
    let mut aggregator = TrackAggregator::new();
    for point in coordinates {
        aggregator.push(point);
    }
    aggregator.total_distance()
}

/// Average speed in km/h from `start_timestamp` (ms) to the last fix.
///
/// Returns 0 for fewer than 2 fixes or a non-positive duration.
pub fn average_speed_kmh(coordinates: &[AcceptedFix], start_timestamp: i64) -> f64 {
    if coordinates.len() < 2 {
        return 0.0;
    }
    let Some(last) = coordinates.last() else {
        return 0.0;
    };
    speed_kmh(total_distance(coordinates), last.timestamp.saturating_sub(start_timestamp))
}

/// Speed in km/h for a distance covered over `duration_ms`; 0 when the
/// duration is not positive.
pub fn speed_kmh(distance_meters: f64, duration_ms: i64) -> f64 {
    if duration_ms <= 0 {
        return 0.0;
    }
    let hours = duration_ms as f64 / MS_PER_HOUR;
    (distance_meters / 1000.0) / hours
}
