//! Scalar smoothers for track geometry and displayed speed.
//!
//! Two independent strategies share the [`Smoother`] trait:
//! - [`KalmanFilter`]: constant-state scalar Kalman filter. Two of them (one
//!   per axis) form a [`PositionSmoother`] that denoises latitude/longitude.
//! - [`SpeedSmoother`]: exponentially weighted moving average over speed in
//!   km/h, holding its value when a single sample jumps too far.
//!
//! Both are optional. Everything downstream works on raw values as well.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::units::ms_to_kmh;
use crate::GpsPoint;

/// A running-state transformer over a scalar stream.
pub trait Smoother {
    /// Feed one measurement, returning the new smoothed value.
    fn update(&mut self, measurement: f64) -> f64;

    /// The current smoothed value, `None` before the first measurement.
    fn current(&self) -> Option<f64>;

    /// Drop all state so the next measurement seeds the filter again.
    fn reset(&mut self);
}

/// Smoothing parameters, tunable per activity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SmoothingConfig {
    /// Smooth stored coordinates with a per-axis Kalman filter.
    /// Default: false
    pub kalman_enabled: bool,

    /// Kalman process noise Q.
    /// Default: 0.005
    pub kalman_process_noise: f64,

    /// Kalman measurement noise R.
    /// Default: 0.5
    pub kalman_measurement_noise: f64,

    /// Smooth displayed speed with the weighted moving average.
    /// Default: true
    pub moving_average_enabled: bool,

    /// Weight of the previous smoothed value (the new sample gets `1 - weight`).
    /// Default: 0.7
    pub speed_previous_weight: f64,

    /// Samples further than this from the smoothed value are held back as spikes.
    /// Default: 10.0 km/h
    pub spike_threshold_kmh: f64,

    /// After this many consecutive held-back spikes the smoother adopts the new
    /// level. `None` holds spikes indefinitely.
    /// Default: None
    pub spike_release_after: Option<u32>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            kalman_enabled: false,
            kalman_process_noise: 0.005,
            kalman_measurement_noise: 0.5,
            moving_average_enabled: true,
            speed_previous_weight: 0.7,
            spike_threshold_kmh: 10.0,
            spike_release_after: None,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.kalman_process_noise.is_finite() && self.kalman_process_noise > 0.0) {
            return Err(TrackError::ConfigError {
                message: format!(
                    "kalmanProcessNoise must be positive, got {}",
                    self.kalman_process_noise
                ),
            });
        }
        if !(self.kalman_measurement_noise.is_finite() && self.kalman_measurement_noise > 0.0) {
            return Err(TrackError::ConfigError {
                message: format!(
                    "kalmanMeasurementNoise must be positive, got {}",
                    self.kalman_measurement_noise
                ),
            });
        }
        if !(0.0..1.0).contains(&self.speed_previous_weight) {
            return Err(TrackError::ConfigError {
                message: format!(
                    "speedPreviousWeight must be in [0, 1), got {}",
                    self.speed_previous_weight
                ),
            });
        }
        if !(self.spike_threshold_kmh.is_finite() && self.spike_threshold_kmh > 0.0) {
            return Err(TrackError::ConfigError {
                message: format!(
                    "spikeThresholdKmh must be positive, got {}",
                    self.spike_threshold_kmh
                ),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Kalman Filter
// ============================================================================

/// Initial error covariance after seeding.
const INITIAL_ERROR_COVARIANCE: f64 = 1.0;

/// Scalar Kalman filter with a constant-state model.
///
/// Only smoothing is needed, so there is no velocity term: predict inflates
/// the error covariance by Q, update blends the measurement in with gain
/// `K = P / (P + R)`.
///
/// # Example
/// ```
/// use gps_track_core::{KalmanFilter, Smoother};
///
/// let mut kf = KalmanFilter::new(0.005, 0.5);
/// assert_eq!(kf.update(10.0), 10.0); // first call seeds
/// let next = kf.update(12.0);
/// assert!(next > 10.0 && next < 12.0);
/// ```
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    process_noise: f64,
    measurement_noise: f64,
    estimate: Option<f64>,
    error_covariance: f64,
}

impl KalmanFilter {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: None,
            error_covariance: INITIAL_ERROR_COVARIANCE,
        }
    }

    pub fn error_covariance(&self) -> f64 {
        self.error_covariance
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        let config = SmoothingConfig::default();
        Self::new(config.kalman_process_noise, config.kalman_measurement_noise)
    }
}

impl Smoother for KalmanFilter {
    fn update(&mut self, measurement: f64) -> f64 {
        if !measurement.is_finite() {
            return self.estimate.unwrap_or(measurement);
        }

        let estimate = match self.estimate {
            Some(estimate) => estimate,
            None => {
                self.estimate = Some(measurement);
                self.error_covariance = INITIAL_ERROR_COVARIANCE;
                return measurement;
            }
        };

        // Predict
        let predicted_covariance = self.error_covariance + self.process_noise;

        // Update
        let gain = predicted_covariance / (predicted_covariance + self.measurement_noise);
        let updated = estimate + gain * (measurement - estimate);
        self.error_covariance = (1.0 - gain) * predicted_covariance;
        self.estimate = Some(updated);

        updated
    }

    fn current(&self) -> Option<f64> {
        self.estimate
    }

    fn reset(&mut self) {
        self.estimate = None;
        self.error_covariance = INITIAL_ERROR_COVARIANCE;
    }
}

/// Independent Kalman filters on latitude and longitude.
#[derive(Debug, Clone)]
pub struct PositionSmoother {
    latitude: KalmanFilter,
    longitude: KalmanFilter,
}

impl PositionSmoother {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            latitude: KalmanFilter::new(process_noise, measurement_noise),
            longitude: KalmanFilter::new(process_noise, measurement_noise),
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.kalman_process_noise, config.kalman_measurement_noise)
    }

    /// Smooth one position.
    pub fn smooth(&mut self, point: &GpsPoint) -> GpsPoint {
        GpsPoint::new(
            self.latitude.update(point.latitude),
            self.longitude.update(point.longitude),
        )
    }

    pub fn reset(&mut self) {
        self.latitude.reset();
        self.longitude.reset();
    }
}

// ============================================================================
// Moving Average Speed Smoother
// ============================================================================

/// Exponentially weighted moving average over speed, in km/h.
///
/// `smoothed = smoothed * w + sample * (1 - w)`. A sample further than the
/// spike threshold from the current value is discarded and the previous value
/// kept, until `spike_release_after` consecutive samples agree on the jump.
#[derive(Debug, Clone)]
pub struct SpeedSmoother {
    previous_weight: f64,
    spike_threshold_kmh: f64,
    spike_release_after: Option<u32>,
    smoothed_kmh: Option<f64>,
    consecutive_spikes: u32,
}

impl SpeedSmoother {
    pub fn new(previous_weight: f64, spike_threshold_kmh: f64, spike_release_after: Option<u32>) -> Self {
        Self {
            previous_weight,
            spike_threshold_kmh,
            spike_release_after,
            smoothed_kmh: None,
            consecutive_spikes: 0,
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(
            config.speed_previous_weight,
            config.spike_threshold_kmh,
            config.spike_release_after,
        )
    }

    /// Feed a provider speed in m/s; returns the smoothed speed in km/h.
    pub fn update_ms(&mut self, speed_ms: f64) -> f64 {
        self.update(ms_to_kmh(speed_ms))
    }

    /// Number of spikes currently being held back.
    pub fn pending_spikes(&self) -> u32 {
        self.consecutive_spikes
    }
}

impl Default for SpeedSmoother {
    fn default() -> Self {
        Self::from_config(&SmoothingConfig::default())
    }
}

impl Smoother for SpeedSmoother {
    fn update(&mut self, speed_kmh: f64) -> f64 {
        if !speed_kmh.is_finite() || speed_kmh < 0.0 {
            return self.smoothed_kmh.unwrap_or(0.0);
        }

        let smoothed = match self.smoothed_kmh {
            Some(smoothed) => smoothed,
            None => {
                self.smoothed_kmh = Some(speed_kmh);
                return speed_kmh;
            }
        };

        if (speed_kmh - smoothed).abs() > self.spike_threshold_kmh {
            let held_long_enough = self
                .spike_release_after
                .is_some_and(|limit| self.consecutive_spikes >= limit);
            if !held_long_enough {
                self.consecutive_spikes = self.consecutive_spikes.saturating_add(1);
                return smoothed;
            }
            // Sustained change: adopt the new level outright
            self.consecutive_spikes = 0;
            self.smoothed_kmh = Some(speed_kmh);
            return speed_kmh;
        }

        self.consecutive_spikes = 0;
        let updated = smoothed * self.previous_weight + speed_kmh * (1.0 - self.previous_weight);
        self.smoothed_kmh = Some(updated);
        updated
    }

    fn current(&self) -> Option<f64> {
        self.smoothed_kmh
    }

    fn reset(&mut self) {
        self.smoothed_kmh = None;
        self.consecutive_spikes = 0;
    }
}
