//! Activity summary construction.
//!
//! At stop time the accepted track goes through a stricter accuracy
//! post-filter, then the final statistics are computed over what survives.
//! A summary always holds at least [`MIN_SUMMARY_POINTS`] coordinates.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::aggregator::{average_speed_kmh, total_distance};
use crate::error::{Result, TrackError};
use crate::units::{format_distance, format_elapsed, format_speed, kmh_to_ms};
use crate::AcceptedFix;

/// Fixes reporting a larger error radius are dropped at stop time.
pub const POST_FILTER_ACCURACY_METERS: f64 = 50.0;

/// Fewest coordinates a persisted activity may have.
pub const MIN_SUMMARY_POINTS: usize = 2;

/// Reported as `min_accuracy_m` when no retained fix has an accuracy reading.
pub const MIN_ACCURACY_SENTINEL: f64 = 999.0;

/// Reported as `max_accuracy_m` when no retained fix has an accuracy reading.
pub const MAX_ACCURACY_SENTINEL: f64 = 0.0;

/// Immutable record of one finished activity, stored verbatim by the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivitySummary {
    pub id: String,
    pub activity_type: String,
    /// Timestamp of the first accepted fix (ms since epoch)
    pub start_timestamp: i64,
    /// Timestamp of the last accepted fix (ms since epoch)
    pub end_timestamp: i64,
    /// RFC 3339 rendering of `start_timestamp`
    pub start_time: String,
    /// RFC 3339 rendering of `end_timestamp`
    pub end_time: String,
    pub duration_seconds: u64,
    pub total_distance_meters: f64,
    pub average_speed_kmh: f64,
    pub max_speed_ms: f64,
    pub min_accuracy_m: f64,
    pub max_accuracy_m: f64,
    pub coordinates: Vec<AcceptedFix>,
}

impl ActivitySummary {
    /// Build a summary from a finished session's accepted fixes.
    ///
    /// Returns [`crate::TrackError::InsufficientPoints`] when fewer than
    /// [`MIN_SUMMARY_POINTS`] fixes survive the accuracy post-filter.
    pub fn build(
        activity_type: &str,
        start_timestamp: i64,
        end_timestamp: i64,
        accepted: &[AcceptedFix],
    ) -> Result<Self> {
        let coordinates = post_filter(accepted);
        let point_count = coordinates.len();
        if point_count < MIN_SUMMARY_POINTS {
            return Err(TrackError::InsufficientPoints {
                activity_type: activity_type.to_string(),
                point_count,
                minimum_required: MIN_SUMMARY_POINTS,
            });
        }

        let duration_ms = end_timestamp.saturating_sub(start_timestamp).max(0);

        let max_speed_ms = coordinates
            .iter()
            .map(|c| c.speed.unwrap_or(0.0))
            .fold(0.0, f64::max);

        let accuracies = coordinates.iter().filter_map(|c| c.accuracy);
        let (min_accuracy_m, max_accuracy_m) = accuracies.fold(
            (MIN_ACCURACY_SENTINEL, MAX_ACCURACY_SENTINEL),
            |(lo, hi), a| (lo.min(a), hi.max(a)),
        );

        Ok(Self {
            id: start_timestamp.to_string(),
            activity_type: activity_type.to_string(),
            start_timestamp,
            end_timestamp,
            start_time: rfc3339(start_timestamp),
            end_time: rfc3339(end_timestamp),
            duration_seconds: (duration_ms / 1000) as u64,
            total_distance_meters: total_distance(&coordinates),
            average_speed_kmh: average_speed_kmh(&coordinates, start_timestamp),
            max_speed_ms,
            min_accuracy_m,
            max_accuracy_m,
            coordinates,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for ActivitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} in {} (avg {}, max {}, {} points)",
            self.activity_type,
            format_distance(self.total_distance_meters),
            format_elapsed(self.duration_seconds),
            format_speed(kmh_to_ms(self.average_speed_kmh), true),
            format_speed(self.max_speed_ms, true),
            self.coordinates.len()
        )
    }
}

/// Drop fixes whose reported accuracy exceeds [`POST_FILTER_ACCURACY_METERS`].
///
/// Fixes without an accuracy reading are kept.
pub fn post_filter(accepted: &[AcceptedFix]) -> Vec<AcceptedFix> {
    accepted
        .iter()
        .filter(|c| c.accuracy.map_or(true, |a| a <= POST_FILTER_ACCURACY_METERS))
        .copied()
        .collect()
}

/// RFC 3339 UTC time, or an empty string when the timestamp has no
/// calendar representation.
fn rfc3339(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => {
            warn!("[ActivitySummary] Timestamp {} out of range", timestamp_ms);
            String::new()
        }
    }
}
