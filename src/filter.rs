//! Location validity filter.
//!
//! Decides, fix by fix, whether a provider sample becomes part of the track.
//! Rules are applied in order and the first failing rule rejects:
//!
//! 1. Coordinates must be finite and in range
//! 2. The first fix of a session is always accepted (session anchor)
//! 3. Staleness override: after a long gap since the last accepted fix, accept
//!    regardless of accuracy or displacement so the track never freezes
//! 4. Non-increasing timestamps are rejected (no `dt <= 0` arithmetic)
//! 5. Accuracy gate
//! 6. Jitter gate: tiny displacement within a short interval
//! 7. Plausible-speed gate (strict mode only)
//!
//! The only state the filter owns is the last accepted fix and its counters.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::geo_utils::distance_between;
use crate::{GpsPoint, RawFix};

/// Thresholds for the validity filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FilterConfig {
    /// Fixes reporting a larger error radius are rejected.
    /// Default: 50.0 meters
    pub accuracy_threshold_meters: f64,

    /// Displacement below which a fix counts as stationary jitter.
    /// Default: 2.0 meters
    pub min_displacement_meters: f64,

    /// A sub-threshold displacement is only rejected when it happened within
    /// this many seconds of the last accepted fix.
    /// Default: 5.0 seconds
    pub min_interval_seconds: f64,

    /// Gap after which the next fix is force-accepted.
    /// Default: 10.0 seconds
    pub max_stale_gap_seconds: f64,

    /// Implied speed above which a fix is treated as a teleport artifact.
    /// Default: 100.0 m/s
    pub implausible_speed_ms: f64,

    /// Enables the plausible-speed gate.
    /// Default: false
    pub strict_speed_gate: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_meters: 50.0,
            min_displacement_meters: 2.0,
            min_interval_seconds: 5.0,
            max_stale_gap_seconds: 10.0,
            implausible_speed_ms: 100.0,
            strict_speed_gate: false,
        }
    }
}

impl FilterConfig {
    /// Check that every threshold is a usable number.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("accuracyThresholdMeters", self.accuracy_threshold_meters),
            ("maxStaleGapSeconds", self.max_stale_gap_seconds),
            ("implausibleSpeedMs", self.implausible_speed_ms),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackError::ConfigError {
                    message: format!("{} must be a positive number, got {}", name, value),
                });
            }
        }

        let non_negative = [
            ("minDisplacementMeters", self.min_displacement_meters),
            ("minIntervalSeconds", self.min_interval_seconds),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackError::ConfigError {
                    message: format!("{} must be zero or positive, got {}", name, value),
                });
            }
        }

        Ok(())
    }
}

/// Why a fix was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum AcceptReason {
    /// First fix of the session
    Anchor,
    /// Long gap since the last accepted fix
    StalenessOverride,
    /// Passed every gate
    Moved,
}

/// Why a fix was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RejectReason {
    /// Coordinates not finite or out of range, or timestamp outside the calendar range
    Malformed,
    /// Timestamp not after the last accepted fix
    NonIncreasingTimestamp,
    /// Reported error radius above the threshold
    LowAccuracy,
    /// Too little movement within too short a time
    Jitter,
    /// Implied speed above the implausible-motion ceiling
    ImplausibleSpeed,
}

/// Outcome of evaluating one fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum FilterDecision {
    Accepted {
        reason: AcceptReason,
        /// Displacement from the previous accepted fix in meters (0 for the anchor)
        distance_meters: f64,
        /// Seconds since the previous accepted fix (0 for the anchor)
        elapsed_seconds: f64,
    },
    Rejected {
        reason: RejectReason,
    },
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted { .. })
    }
}

/// Per-reason counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FilterStats {
    pub accepted: u32,
    pub stale_overrides: u32,
    pub rejected_malformed: u32,
    pub rejected_out_of_order: u32,
    pub rejected_accuracy: u32,
    pub rejected_jitter: u32,
    pub rejected_speed: u32,
}

impl FilterStats {
    /// Total number of rejected fixes.
    pub fn rejected(&self) -> u32 {
        self.rejected_malformed
            + self.rejected_out_of_order
            + self.rejected_accuracy
            + self.rejected_jitter
            + self.rejected_speed
    }

    fn record(&mut self, decision: &FilterDecision) {
        match decision {
            FilterDecision::Accepted { reason, .. } => {
                self.accepted += 1;
                if *reason == AcceptReason::StalenessOverride {
                    self.stale_overrides += 1;
                }
            }
            FilterDecision::Rejected { reason } => match reason {
                RejectReason::Malformed => self.rejected_malformed += 1,
                RejectReason::NonIncreasingTimestamp => self.rejected_out_of_order += 1,
                RejectReason::LowAccuracy => self.rejected_accuracy += 1,
                RejectReason::Jitter => self.rejected_jitter += 1,
                RejectReason::ImplausibleSpeed => self.rejected_speed += 1,
            },
        }
    }
}

/// Minimal state kept about the last accepted fix.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    point: GpsPoint,
    timestamp: i64,
}

/// Stateful per-session validity filter.
#[derive(Debug, Clone)]
pub struct LocationFilter {
    config: FilterConfig,
    previous: Option<Anchor>,
    stats: FilterStats,
}

impl LocationFilter {
    /// Create a filter with the given thresholds.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            previous: None,
            stats: FilterStats::default(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Forget the last accepted fix and counters.
    pub fn reset(&mut self) {
        self.previous = None;
        self.stats = FilterStats::default();
    }

    /// Evaluate a fix using its own timestamp as "now".
    pub fn evaluate(&mut self, candidate: &RawFix) -> FilterDecision {
        self.evaluate_at(candidate, candidate.timestamp)
    }

    /// Evaluate a fix against the last accepted one.
    ///
    /// `now_ms` drives the staleness override; accepted fixes become the new
    /// reference for the next call.
    pub fn evaluate_at(&mut self, candidate: &RawFix, now_ms: i64) -> FilterDecision {
        let decision = self.decide(candidate, now_ms);

        match decision {
            FilterDecision::Accepted { reason, .. } => {
                debug!(
                    "[LocationFilter] Accepted fix at {} ({:?})",
                    candidate.timestamp, reason
                );
                self.previous = Some(Anchor {
                    point: GpsPoint::new(candidate.latitude, candidate.longitude),
                    timestamp: candidate.timestamp,
                });
            }
            FilterDecision::Rejected { reason } => {
                debug!(
                    "[LocationFilter] Rejected fix at {} ({:?})",
                    candidate.timestamp, reason
                );
            }
        }

        self.stats.record(&decision);
        decision
    }

    fn decide(&self, candidate: &RawFix, now_ms: i64) -> FilterDecision {
        if !candidate.has_valid_coordinates() || !candidate.has_valid_timestamp() {
            return FilterDecision::Rejected {
                reason: RejectReason::Malformed,
            };
        }

        let previous = match self.previous {
            Some(previous) => previous,
            None => {
                return FilterDecision::Accepted {
                    reason: AcceptReason::Anchor,
                    distance_meters: 0.0,
                    elapsed_seconds: 0.0,
                }
            }
        };

        let distance = distance_between(&previous.point, candidate);
        let dt = candidate.timestamp.saturating_sub(previous.timestamp) as f64 / 1000.0;
        let gap = now_ms.saturating_sub(previous.timestamp) as f64 / 1000.0;

        if gap > self.config.max_stale_gap_seconds {
            return FilterDecision::Accepted {
                reason: AcceptReason::StalenessOverride,
                distance_meters: distance,
                elapsed_seconds: dt.max(0.0),
            };
        }

        if dt <= 0.0 {
            return FilterDecision::Rejected {
                reason: RejectReason::NonIncreasingTimestamp,
            };
        }

        if let Some(accuracy) = candidate.accuracy {
            if accuracy > self.config.accuracy_threshold_meters {
                return FilterDecision::Rejected {
                    reason: RejectReason::LowAccuracy,
                };
            }
        }

        if distance < self.config.min_displacement_meters && dt < self.config.min_interval_seconds
        {
            return FilterDecision::Rejected {
                reason: RejectReason::Jitter,
            };
        }

        if self.config.strict_speed_gate && distance / dt > self.config.implausible_speed_ms {
            return FilterDecision::Rejected {
                reason: RejectReason::ImplausibleSpeed,
            };
        }

        FilterDecision::Accepted {
            reason: AcceptReason::Moved,
            distance_meters: distance,
            elapsed_seconds: dt,
        }
    }
}

impl Default for LocationFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
