//! # GPS Track Core
//!
//! GPS track ingestion and activity statistics for mobile fitness tracking.
//!
//! This library provides:
//! - Geodesy primitives (haversine distance, forward projection, bearing)
//! - A per-session location validity filter for noisy provider fixes
//! - Scalar smoothers (Kalman filter, weighted moving average) for position and speed
//! - Sliding-window distance and average speed aggregation
//! - A session state machine that turns a fix stream into an [`ActivitySummary`]
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch replay with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use gps_track_core::{RawFix, TrackRecorder};
//!
//! let mut recorder = TrackRecorder::new();
//! recorder.start("running").unwrap();
//!
//! recorder.on_raw_fix(RawFix::new(40.0, 116.0, Some(5.0), Some(2.5), 0));
//! recorder.on_raw_fix(RawFix::new(40.0009, 116.0, Some(5.0), Some(2.5), 10_000));
//!
//! match recorder.stop().unwrap() {
//!     Some(summary) => println!("{}", summary),
//!     None => println!("Not enough points to save"),
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackError};

// Geographic utilities (distance, projection, bounds, simplification)
pub mod geo_utils;
pub use geo_utils::{destination_point, haversine_distance, initial_bearing, to_radians};

// Location validity filter
pub mod filter;
pub use filter::{AcceptReason, FilterConfig, FilterDecision, FilterStats, LocationFilter, RejectReason};

// Scalar smoothers for position and speed
pub mod smoothing;
pub use smoothing::{KalmanFilter, PositionSmoother, Smoother, SmoothingConfig, SpeedSmoother};

// Running distance and average speed
pub mod aggregator;
pub use aggregator::{average_speed_kmh, total_distance, TrackAggregator};

// Activity type catalogue (per-type thresholds)
pub mod profiles;
pub use profiles::{default_catalog, ActivityCatalog, ActivityProfile};

// Activity summary construction
pub mod summary;
pub use summary::ActivitySummary;

// Session state machine
pub mod session;
pub use session::{FixOutcome, LiveStats, SessionState, TrackRecorder, TrackSession, TrackerEvent, TrackerOutput};

// Offline replay of recorded fix streams
pub mod replay;
pub use replay::{replay_session, replay_sessions, RecordedSession};

// Unit conversion and display formatting
pub mod units;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("GpsTrackCore"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use gps_track_core::GpsPoint;
/// let point = GpsPoint::new(39.9042, 116.4074); // Beijing
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Anything that sits at a geographic position.
///
/// Lets the geometry and aggregation helpers work on plain points, raw
/// fixes and accepted fixes alike.
pub trait Located {
    fn position(&self) -> GpsPoint;
}

impl Located for GpsPoint {
    fn position(&self) -> GpsPoint {
        *self
    }
}

/// Bounding box for a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from anything located. Returns `None` for an empty slice.
    pub fn from_points<T: Located>(points: &[T]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points.iter().map(Located::position) {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A single location sample as delivered by the location provider.
///
/// Speed and accuracy are normalized on construction: providers report
/// "unknown" as a negative (or missing) value, which becomes `None` here so
/// downstream code never re-checks the sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal error radius in meters
    #[serde(default, deserialize_with = "deserialize_reading")]
    pub accuracy: Option<f64>,
    /// Provider speed in m/s
    #[serde(default, deserialize_with = "deserialize_reading")]
    pub speed: Option<f64>,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl RawFix {
    /// Create a fix, dropping negative or non-finite accuracy/speed readings.
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
        speed: Option<f64>,
        timestamp: i64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: accuracy.and_then(normalize_reading),
            speed: speed.and_then(normalize_reading),
            timestamp,
        }
    }

    /// Create a fix from a provider that uses negative sentinels for unknown values.
    pub fn from_provider(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        speed: f64,
        timestamp: i64,
    ) -> Self {
        Self::new(latitude, longitude, Some(accuracy), Some(speed), timestamp)
    }

    /// True when both coordinates are finite and in range.
    pub fn has_valid_coordinates(&self) -> bool {
        self.position().is_valid()
    }

    /// True when the timestamp maps to a representable calendar instant.
    pub fn has_valid_timestamp(&self) -> bool {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp).is_some()
    }
}

impl Located for RawFix {
    fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A fix that passed the validity filter and became a node of the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct AcceptedFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    /// Provider speed in m/s
    pub speed: Option<f64>,
    pub timestamp: i64,
    /// Moving-average speed at this fix, in km/h (None when smoothing is off)
    #[serde(default)]
    pub smoothed_speed_kmh: Option<f64>,
}

impl AcceptedFix {
    /// Promote a raw fix to a track node.
    pub fn from_raw(fix: &RawFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            speed: fix.speed,
            timestamp: fix.timestamp,
            smoothed_speed_kmh: None,
        }
    }
}

impl Located for AcceptedFix {
    fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

fn normalize_reading(value: f64) -> Option<f64> {
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

fn deserialize_reading<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.and_then(normalize_reading))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(40.0, 116.0).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_negative_speed_is_no_reading() {
        let fix = RawFix::from_provider(40.0, 116.0, 5.0, -1.0, 1_000);
        assert_eq!(fix.speed, None);
        assert_eq!(fix.accuracy, Some(5.0));

        let fix = RawFix::new(40.0, 116.0, Some(f64::NAN), Some(3.2), 1_000);
        assert_eq!(fix.accuracy, None);
        assert_eq!(fix.speed, Some(3.2));
    }

    #[test]
    fn test_deserialize_normalizes_speed() {
        let json = r#"{"latitude":40.0,"longitude":116.0,"accuracy":4.0,"speed":-1.0,"timestamp":5}"#;
        let fix: RawFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.speed, None);
        assert_eq!(fix.accuracy, Some(4.0));

        let json = r#"{"latitude":40.0,"longitude":116.0,"timestamp":5}"#;
        let fix: RawFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.accuracy, None);
    }

    #[test]
    fn test_bounds_and_center() {
        let points = vec![
            GpsPoint::new(40.0, 116.0),
            GpsPoint::new(40.002, 116.004),
            GpsPoint::new(39.998, 116.002),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 39.998);
        assert_eq!(bounds.max_lng, 116.004);
        let center = bounds.center();
        assert!((center.latitude - 40.0).abs() < 1e-9);
        assert!((center.longitude - 116.002).abs() < 1e-9);

        let empty: Vec<GpsPoint> = Vec::new();
        assert!(Bounds::from_points(&empty).is_none());
    }

    #[test]
    fn test_accepted_fix_from_raw() {
        let raw = RawFix::new(40.0, 116.0, Some(3.0), None, 42);
        let accepted = AcceptedFix::from_raw(&raw);
        assert_eq!(accepted.position(), raw.position());
        assert_eq!(accepted.timestamp, 42);
        assert_eq!(accepted.smoothed_speed_kmh, None);
    }

    #[test]
    fn test_timestamp_range() {
        assert!(RawFix::new(40.0, 116.0, None, None, 0).has_valid_timestamp());
        assert!(RawFix::new(40.0, 116.0, None, None, -86_400_000).has_valid_timestamp());
        assert!(RawFix::new(40.0, 116.0, None, None, 8_000_000_000_000_000).has_valid_timestamp());
        assert!(!RawFix::new(40.0, 116.0, None, None, i64::MIN + 1).has_valid_timestamp());
        assert!(!RawFix::new(40.0, 116.0, None, None, 10_000_000_000_000_000).has_valid_timestamp());
    }
}
