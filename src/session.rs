//! Session state machine.
//!
//! A [`TrackRecorder`] moves between `Idle` and `Tracking`. Each `start`
//! builds a fresh [`TrackSession`] owning its own filter, aggregator and
//! smoothers, so nothing carries over from a previous run. Every incoming fix
//! is evaluated by the session's filter; accepted fixes extend the track and
//! update the running aggregates. `stop` freezes the session into an
//! [`ActivitySummary`], or into nothing when too few fixes survive.
//!
//! Fixes delivered while idle are dropped, so a fix that races a `stop` can
//! never reach the closed session.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::aggregator::TrackAggregator;
use crate::error::{Result, TrackError};
use crate::filter::{FilterDecision, FilterStats, LocationFilter, RejectReason};
use crate::profiles::{default_catalog, ActivityCatalog, ActivityProfile};
use crate::smoothing::{PositionSmoother, Smoother, SpeedSmoother};
use crate::summary::ActivitySummary;
use crate::{AcceptedFix, GpsPoint, RawFix};

/// Recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SessionState {
    /// No session open; incoming fixes are ignored
    Idle,
    /// A session is open and accepting fixes
    Tracking,
}

/// What happened to one incoming fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum FixOutcome {
    /// The fix became a node of the track
    Accepted {
        point_count: u32,
        distance_meters: f64,
        elapsed_seconds: f64,
        smoothed_speed_kmh: Option<f64>,
    },
    /// The filter turned the fix down
    Rejected { reason: RejectReason },
    /// No session was open
    Ignored,
}

impl FixOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixOutcome::Accepted { .. })
    }
}

/// Snapshot of an open session for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LiveStats {
    pub activity_type: String,
    pub point_count: u32,
    pub distance_meters: f64,
    pub elapsed_seconds: f64,
    pub smoothed_speed_kmh: Option<f64>,
    pub last_fix: Option<AcceptedFix>,
    pub filter_stats: FilterStats,
}

// ============================================================================
// Track Session
// ============================================================================

/// State of one tracking session, from `start` to `stop`.
#[derive(Debug, Clone)]
pub struct TrackSession {
    activity_type: String,
    profile: ActivityProfile,
    start_timestamp: Option<i64>,
    fixes: Vec<AcceptedFix>,
    running_distance_meters: f64,
    running_elapsed_seconds: f64,
    filter: LocationFilter,
    aggregator: TrackAggregator,
    position_smoother: Option<PositionSmoother>,
    speed_smoother: Option<SpeedSmoother>,
}

impl TrackSession {
    /// Open a session with fresh filter and smoother state.
    pub fn new(activity_type: &str, profile: &ActivityProfile) -> Self {
        let smoothing = &profile.smoothing;
        Self {
            activity_type: activity_type.to_string(),
            profile: profile.clone(),
            start_timestamp: None,
            fixes: Vec::new(),
            running_distance_meters: 0.0,
            running_elapsed_seconds: 0.0,
            filter: LocationFilter::new(profile.filter.clone()),
            aggregator: TrackAggregator::new(),
            position_smoother: smoothing
                .kalman_enabled
                .then(|| PositionSmoother::from_config(smoothing)),
            speed_smoother: smoothing
                .moving_average_enabled
                .then(|| SpeedSmoother::from_config(smoothing)),
        }
    }

    /// Run a fix through the filter and, if accepted, extend the track.
    pub fn ingest(&mut self, fix: &RawFix, now_ms: i64) -> FixOutcome {
        let (distance, elapsed) = match self.filter.evaluate_at(fix, now_ms) {
            FilterDecision::Rejected { reason } => return FixOutcome::Rejected { reason },
            FilterDecision::Accepted {
                distance_meters,
                elapsed_seconds,
                ..
            } => (distance_meters, elapsed_seconds),
        };

        let start = *self.start_timestamp.get_or_insert(fix.timestamp);

        let mut accepted = AcceptedFix::from_raw(fix);
        if let Some(smoother) = self.position_smoother.as_mut() {
            let smoothed = smoother.smooth(&GpsPoint::new(fix.latitude, fix.longitude));
            accepted.latitude = smoothed.latitude;
            accepted.longitude = smoothed.longitude;
        }

        // Provider speed, or displacement over time when the provider gave none
        let speed_ms = fix
            .speed
            .or_else(|| (elapsed > 0.0).then(|| distance / elapsed));
        if let (Some(smoother), Some(speed_ms)) = (self.speed_smoother.as_mut(), speed_ms) {
            accepted.smoothed_speed_kmh = Some(smoother.update_ms(speed_ms));
        }

        self.running_distance_meters = self.aggregator.push(&accepted);
        let elapsed_total = fix.timestamp.saturating_sub(start) as f64 / 1000.0;
        self.running_elapsed_seconds = self.running_elapsed_seconds.max(elapsed_total);
        self.fixes.push(accepted);

        FixOutcome::Accepted {
            point_count: self.fixes.len() as u32,
            distance_meters: self.running_distance_meters,
            elapsed_seconds: self.running_elapsed_seconds,
            smoothed_speed_kmh: self.smoothed_speed_kmh(),
        }
    }

    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    pub fn profile(&self) -> &ActivityProfile {
        &self.profile
    }

    /// Timestamp of the first accepted fix.
    pub fn start_timestamp(&self) -> Option<i64> {
        self.start_timestamp
    }

    pub fn fixes(&self) -> &[AcceptedFix] {
        &self.fixes
    }

    pub fn last_fix(&self) -> Option<&AcceptedFix> {
        self.fixes.last()
    }

    pub fn running_distance_meters(&self) -> f64 {
        self.running_distance_meters
    }

    pub fn running_elapsed_seconds(&self) -> f64 {
        self.running_elapsed_seconds
    }

    pub fn smoothed_speed_kmh(&self) -> Option<f64> {
        self.speed_smoother.as_ref().and_then(|s| s.current())
    }

    pub fn filter_stats(&self) -> &FilterStats {
        self.filter.stats()
    }

    /// Track geometry for the map.
    pub fn coordinates(&self) -> Vec<GpsPoint> {
        self.fixes
            .iter()
            .map(|f| GpsPoint::new(f.latitude, f.longitude))
            .collect()
    }

    pub fn live_stats(&self) -> LiveStats {
        LiveStats {
            activity_type: self.activity_type.clone(),
            point_count: self.fixes.len() as u32,
            distance_meters: self.running_distance_meters,
            elapsed_seconds: self.running_elapsed_seconds,
            smoothed_speed_kmh: self.smoothed_speed_kmh(),
            last_fix: self.fixes.last().copied(),
            filter_stats: self.filter.stats().clone(),
        }
    }

    /// Freeze the session into a summary.
    ///
    /// `Ok(None)` when fewer than two fixes survive the accuracy post-filter.
    pub fn finish(self) -> Result<Option<ActivitySummary>> {
        // A staleness override may carry an older timestamp than its predecessor
        let end = self.fixes.iter().map(|f| f.timestamp).max();
        let (Some(start), Some(end)) = (self.start_timestamp, end) else {
            warn!(
                "[TrackRecorder] '{}' session ended without any accepted fix",
                self.activity_type
            );
            return Ok(None);
        };

        match ActivitySummary::build(&self.activity_type, start, end, &self.fixes) {
            Ok(summary) => {
                info!(
                    "[TrackRecorder] Session complete: {} points, {:.1} m, {} s",
                    summary.coordinates.len(),
                    summary.total_distance_meters,
                    summary.duration_seconds
                );
                Ok(Some(summary))
            }
            Err(TrackError::InsufficientPoints { point_count, .. }) => {
                warn!(
                    "[TrackRecorder] Discarding '{}' session: {} of {} fixes usable",
                    self.activity_type,
                    point_count,
                    self.fixes.len()
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Track Recorder
// ============================================================================

/// Inbound events, for callers that drive the recorder as a message stream.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Start(String),
    Fix(RawFix),
    /// A fix evaluated against an explicit "now" (ms since epoch)
    FixAt { fix: RawFix, now_ms: i64 },
    Stop,
}

/// Result of handling one [`TrackerEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutput {
    Started,
    Fix(FixOutcome),
    Stopped(Option<ActivitySummary>),
    Error(TrackError),
}

/// Owns the current session, if any, and the activity catalogue.
#[derive(Debug, Clone)]
pub struct TrackRecorder {
    catalog: ActivityCatalog,
    session: Option<TrackSession>,
}

impl TrackRecorder {
    /// Recorder using the built-in activity catalogue.
    pub fn new() -> Self {
        Self::with_catalog(default_catalog().clone())
    }

    pub fn with_catalog(catalog: ActivityCatalog) -> Self {
        Self {
            catalog,
            session: None,
        }
    }

    pub fn catalog(&self) -> &ActivityCatalog {
        &self.catalog
    }

    /// Swap the activity catalogue. Only allowed while idle.
    pub fn set_catalog(&mut self, catalog: ActivityCatalog) -> Result<()> {
        if let Some(open) = &self.session {
            return Err(TrackError::AlreadyTracking {
                activity_type: open.activity_type().to_string(),
            });
        }
        self.catalog = catalog;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Tracking
        } else {
            SessionState::Idle
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// The open session, if any.
    pub fn session(&self) -> Option<&TrackSession> {
        self.session.as_ref()
    }

    /// Idle -> Tracking.
    pub fn start(&mut self, activity_type: &str) -> Result<()> {
        if activity_type.trim().is_empty() {
            return Err(TrackError::EmptyActivityType);
        }
        if let Some(open) = &self.session {
            return Err(TrackError::AlreadyTracking {
                activity_type: open.activity_type().to_string(),
            });
        }

        let profile = self.catalog.resolve(activity_type);
        info!(
            "[TrackRecorder] Starting '{}' session (profile '{}', accuracy <= {} m)",
            activity_type, profile.tag, profile.filter.accuracy_threshold_meters
        );
        self.session = Some(TrackSession::new(activity_type, profile));
        Ok(())
    }

    /// Handle one provider sample, using its timestamp as "now".
    pub fn on_raw_fix(&mut self, fix: RawFix) -> FixOutcome {
        self.on_raw_fix_at(fix, fix.timestamp)
    }

    /// Handle one provider sample against an explicit clock.
    pub fn on_raw_fix_at(&mut self, fix: RawFix, now_ms: i64) -> FixOutcome {
        match self.session.as_mut() {
            Some(session) => session.ingest(&fix, now_ms),
            None => {
                warn!(
                    "[TrackRecorder] Fix at {} arrived while idle, ignoring",
                    fix.timestamp
                );
                FixOutcome::Ignored
            }
        }
    }

    /// Tracking -> Idle.
    ///
    /// Returns `Ok(None)` when the session had too few usable fixes to keep.
    pub fn stop(&mut self) -> Result<Option<ActivitySummary>> {
        let session = self.session.take().ok_or(TrackError::NotTracking)?;
        info!(
            "[TrackRecorder] Stopping '{}' session ({} accepted fixes)",
            session.activity_type(),
            session.fixes().len()
        );
        session.finish()
    }

    /// Live track geometry; empty while idle.
    pub fn coordinates(&self) -> Vec<GpsPoint> {
        self.session
            .as_ref()
            .map(TrackSession::coordinates)
            .unwrap_or_default()
    }

    pub fn live_stats(&self) -> Option<LiveStats> {
        self.session.as_ref().map(TrackSession::live_stats)
    }

    /// Apply one event and report what happened.
    pub fn handle(&mut self, event: TrackerEvent) -> TrackerOutput {
        let result = match event {
            TrackerEvent::Start(activity_type) => {
                self.start(&activity_type).map(|_| TrackerOutput::Started)
            }
            TrackerEvent::Fix(fix) => Ok(TrackerOutput::Fix(self.on_raw_fix(fix))),
            TrackerEvent::FixAt { fix, now_ms } => {
                Ok(TrackerOutput::Fix(self.on_raw_fix_at(fix, now_ms)))
            }
            TrackerEvent::Stop => self.stop().map(TrackerOutput::Stopped),
        };
        result.unwrap_or_else(TrackerOutput::Error)
    }
}

impl Default for TrackRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::destination_point;
    use crate::smoothing::SmoothingConfig;

    fn fix_at(distance_m: f64, accuracy: f64, speed: Option<f64>, ts: i64) -> RawFix {
        let p = destination_point(40.0, 116.0, distance_m, 90.0);
        RawFix::new(p.latitude, p.longitude, Some(accuracy), speed, ts)
    }

    #[test]
    fn test_state_transitions() {
        let mut recorder = TrackRecorder::new();
        assert_eq!(recorder.state(), SessionState::Idle);
        assert_eq!(recorder.stop(), Err(TrackError::NotTracking));
        assert_eq!(recorder.start("  "), Err(TrackError::EmptyActivityType));

        recorder.start("cycling").unwrap();
        assert_eq!(recorder.state(), SessionState::Tracking);
        assert_eq!(
            recorder.start("running"),
            Err(TrackError::AlreadyTracking {
                activity_type: "cycling".to_string()
            })
        );

        assert_eq!(recorder.stop(), Ok(None));
        assert_eq!(recorder.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_timestamp_is_first_accepted_fix() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        // Rejected as malformed: the session has no start yet
        recorder.on_raw_fix(RawFix::new(f64::NAN, 116.0, Some(5.0), None, 1_000));
        assert_eq!(recorder.session().unwrap().start_timestamp(), None);

        recorder.on_raw_fix(fix_at(0.0, 5.0, None, 3_000));
        assert_eq!(recorder.session().unwrap().start_timestamp(), Some(3_000));
    }

    #[test]
    fn test_running_aggregates() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        for i in 0..5 {
            let outcome = recorder.on_raw_fix(fix_at(i as f64 * 10.0, 5.0, Some(3.0), i * 6_000));
            assert!(outcome.is_accepted(), "fix {} rejected: {:?}", i, outcome);
        }

        let stats = recorder.live_stats().unwrap();
        assert_eq!(stats.point_count, 5);
        assert!((stats.distance_meters - 30.0).abs() < 1e-6);
        assert_eq!(stats.elapsed_seconds, 24.0);
        assert!((stats.smoothed_speed_kmh.unwrap() - 10.8).abs() < 1e-9);
        assert_eq!(stats.filter_stats.accepted, 5);
        assert_eq!(recorder.coordinates().len(), 5);
    }

    #[test]
    fn test_rejected_fix_not_appended() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        recorder.on_raw_fix(fix_at(0.0, 5.0, None, 0));
        let outcome = recorder.on_raw_fix(fix_at(20.0, 300.0, None, 2_000));
        assert_eq!(
            outcome,
            FixOutcome::Rejected {
                reason: RejectReason::LowAccuracy
            }
        );
        assert_eq!(recorder.coordinates().len(), 1);
    }

    #[test]
    fn test_derived_speed_when_provider_has_none() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        recorder.on_raw_fix(fix_at(0.0, 5.0, None, 0));
        // No speed on the anchor, so nothing to smooth yet
        assert_eq!(recorder.live_stats().unwrap().smoothed_speed_kmh, None);

        recorder.on_raw_fix(fix_at(10.0, 5.0, None, 5_000));
        let speed = recorder.live_stats().unwrap().smoothed_speed_kmh.unwrap();
        assert!((speed - 7.2).abs() < 1e-6, "speed {}", speed);
    }

    #[test]
    fn test_elapsed_never_decreases() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        recorder.on_raw_fix(fix_at(0.0, 5.0, None, 10_000));
        recorder.on_raw_fix(fix_at(20.0, 5.0, None, 20_000));
        // Stale override with an older timestamp than the last accepted fix
        let outcome = recorder.on_raw_fix_at(fix_at(40.0, 5.0, None, 15_000), 40_000);
        assert!(outcome.is_accepted());
        assert_eq!(recorder.live_stats().unwrap().elapsed_seconds, 10.0);
    }

    #[test]
    fn test_summary_duration_matches_clamped_elapsed() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        recorder.on_raw_fix(fix_at(0.0, 5.0, None, 10_000));
        recorder.on_raw_fix(fix_at(20.0, 5.0, None, 20_000));
        recorder.on_raw_fix_at(fix_at(40.0, 5.0, None, 15_000), 40_000);
        let shown = recorder.live_stats().unwrap().elapsed_seconds;

        let summary = recorder.stop().unwrap().unwrap();
        assert_eq!(summary.coordinates.len(), 3);
        assert_eq!(summary.end_timestamp, 20_000);
        assert_eq!(summary.duration_seconds as f64, shown);
    }

    #[test]
    fn test_extreme_timestamps_never_panic() {
        let mut recorder = TrackRecorder::new();
        recorder.start("running").unwrap();
        assert_eq!(
            recorder.on_raw_fix(fix_at(0.0, 5.0, None, i64::MIN + 1)),
            FixOutcome::Rejected {
                reason: RejectReason::Malformed
            }
        );
        // Unrepresentable fixes never become the anchor
        assert!(matches!(
            recorder.on_raw_fix(fix_at(0.0, 5.0, None, 1_000)),
            FixOutcome::Accepted { point_count: 1, .. }
        ));
        assert_eq!(recorder.session().unwrap().start_timestamp(), Some(1_000));

        let outcome = recorder.on_raw_fix_at(fix_at(30.0, 5.0, None, 8_000_000_000_000_000), i64::MAX);
        assert!(outcome.is_accepted());
        assert!(recorder.live_stats().unwrap().elapsed_seconds > 0.0);
        assert!(recorder.stop().unwrap().is_some());
    }

    #[test]
    fn test_kalman_smooths_stored_coordinates() {
        let mut profile = default_catalog().resolve("running").clone();
        profile.smoothing = SmoothingConfig {
            kalman_enabled: true,
            ..SmoothingConfig::default()
        };
        let mut session = TrackSession::new("running", &profile);
        session.ingest(&fix_at(0.0, 5.0, None, 0), 0);
        session.ingest(&fix_at(100.0, 5.0, None, 5_000), 5_000);

        let raw = fix_at(100.0, 5.0, None, 5_000);
        let stored = session.last_fix().unwrap();
        assert!(stored.longitude < raw.longitude);
        assert!(stored.longitude > 116.0);
    }

    #[test]
    fn test_ignored_while_idle() {
        let mut recorder = TrackRecorder::new();
        assert_eq!(recorder.on_raw_fix(fix_at(0.0, 5.0, None, 0)), FixOutcome::Ignored);
        assert!(recorder.coordinates().is_empty());
        assert!(recorder.live_stats().is_none());
    }

    #[test]
    fn test_handle_events() {
        let mut recorder = TrackRecorder::new();
        assert_eq!(
            recorder.handle(TrackerEvent::Stop),
            TrackerOutput::Error(TrackError::NotTracking)
        );
        assert_eq!(
            recorder.handle(TrackerEvent::Start("hiking".to_string())),
            TrackerOutput::Started
        );
        let out = recorder.handle(TrackerEvent::Fix(fix_at(0.0, 5.0, None, 0)));
        assert!(matches!(out, TrackerOutput::Fix(FixOutcome::Accepted { point_count: 1, .. })));
        let out = recorder.handle(TrackerEvent::FixAt {
            fix: fix_at(50.0, 5.0, None, 30_000),
            now_ms: 30_000,
        });
        assert!(matches!(out, TrackerOutput::Fix(FixOutcome::Accepted { point_count: 2, .. })));
        match recorder.handle(TrackerEvent::Stop) {
            TrackerOutput::Stopped(Some(summary)) => {
                assert_eq!(summary.activity_type, "hiking");
                assert_eq!(summary.duration_seconds, 30);
            }
            other => panic!("expected a summary, got {:?}", other),
        }
    }
}
