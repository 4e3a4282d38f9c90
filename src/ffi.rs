//! FFI bindings for mobile platforms (iOS/Android).
//!
//! Exposes a recorder object, one per tracking screen, plus stateless
//! helpers. Errors are reported as `false`/`None` and logged, since the
//! JS layer only needs to know whether to show a message.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};

use crate::geo_utils::douglas_peucker;
use crate::{
    default_catalog, destination_point, haversine_distance, init_logging, total_distance,
    ActivityCatalog, ActivityProfile, ActivitySummary, FilterConfig, FixOutcome, GpsPoint,
    LiveStats, RawFix, TrackRecorder,
};

// ============================================================================
// Recorder Object
// ============================================================================

/// A track recorder owned by the host app.
#[derive(uniffi::Object)]
pub struct FfiTrackRecorder {
    inner: Mutex<TrackRecorder>,
}

impl FfiTrackRecorder {
    fn recorder(&self) -> MutexGuard<'_, TrackRecorder> {
        // Recover from a poisoned lock
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl FfiTrackRecorder {
    /// New recorder with the built-in activity catalogue.
    #[uniffi::constructor]
    pub fn new() -> Arc<Self> {
        init_logging();
        Arc::new(Self {
            inner: Mutex::new(TrackRecorder::new()),
        })
    }

    /// Replace the activity catalogue from JSON. Fails while tracking.
    pub fn set_catalog_json(&self, json: String) -> bool {
        let result = ActivityCatalog::from_json(&json)
            .and_then(|catalog| self.recorder().set_catalog(catalog));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("[TrackRecorder] Catalogue not loaded: {}", e);
                false
            }
        }
    }

    pub fn start(&self, activity_type: String) -> bool {
        match self.recorder().start(&activity_type) {
            Ok(()) => true,
            Err(e) => {
                warn!("[TrackRecorder] start failed: {}", e);
                false
            }
        }
    }

    pub fn on_raw_fix(&self, fix: RawFix) -> FixOutcome {
        self.recorder().on_raw_fix(fix)
    }

    pub fn on_raw_fix_at(&self, fix: RawFix, now_ms: i64) -> FixOutcome {
        self.recorder().on_raw_fix_at(fix, now_ms)
    }

    /// Stop tracking. `None` when no session was open or too few points were kept.
    pub fn stop(&self) -> Option<ActivitySummary> {
        match self.recorder().stop() {
            Ok(summary) => summary,
            Err(e) => {
                warn!("[TrackRecorder] stop failed: {}", e);
                None
            }
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.recorder().is_tracking()
    }

    pub fn coordinates(&self) -> Vec<GpsPoint> {
        self.recorder().coordinates()
    }

    pub fn live_stats(&self) -> Option<LiveStats> {
        self.recorder().live_stats()
    }
}

// ============================================================================
// Stateless Helpers
// ============================================================================

#[uniffi::export]
pub fn ffi_haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance(lat1, lon1, lat2, lon2)
}

#[uniffi::export]
pub fn ffi_destination_point(lat: f64, lon: f64, distance_m: f64, bearing_deg: f64) -> GpsPoint {
    destination_point(lat, lon, distance_m, bearing_deg)
}

/// Sliding-window distance of a track, in meters.
#[uniffi::export]
pub fn ffi_total_distance(points: Vec<GpsPoint>) -> f64 {
    total_distance(&points)
}

/// Simplify a track for rendering.
#[uniffi::export]
pub fn ffi_simplify_track(points: Vec<GpsPoint>, tolerance: f64) -> Vec<GpsPoint> {
    init_logging();
    let simplified = douglas_peucker(&points, tolerance);
    info!(
        "[TrackRecorder] Simplified track {} -> {} points",
        points.len(),
        simplified.len()
    );
    simplified
}

/// Built-in activity profiles, for the activity picker and provider setup.
#[uniffi::export]
pub fn activity_profiles() -> Vec<ActivityProfile> {
    default_catalog().profiles().to_vec()
}

#[uniffi::export]
pub fn default_filter_config() -> FilterConfig {
    FilterConfig::default()
}

/// Serialize a summary for the persistence layer.
#[uniffi::export]
pub fn summary_to_json(summary: ActivitySummary) -> Option<String> {
    match summary.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("[TrackRecorder] Summary not serialized: {}", e);
            None
        }
    }
}

#[uniffi::export]
pub fn summary_from_json(json: String) -> Option<ActivitySummary> {
    ActivitySummary::from_json(&json).ok()
}
