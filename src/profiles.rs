//! Activity type catalogue.
//!
//! Each activity type (walking the dog, cycling, driving, ...) carries its own
//! filter thresholds and smoothing parameters, plus the distance filter the app
//! hands to the location provider. The host app may ship its own catalogue as
//! JSON; otherwise the built-in one is used.
//!
//! ## Example
//! ```rust
//! use gps_track_core::profiles::default_catalog;
//!
//! let cycling = default_catalog().resolve("cycling");
//! assert_eq!(cycling.distance_filter_meters, 20.0);
//!
//! // Unknown tags fall back to the catalogue's default profile
//! assert_eq!(default_catalog().resolve("unicycling").tag, "others");
//! ```

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::filter::FilterConfig;
use crate::smoothing::SmoothingConfig;

/// Tag of the profile used for unknown activity types in the built-in catalogue.
pub const FALLBACK_TAG: &str = "others";

/// Settings for one activity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivityProfile {
    /// Stable identifier stored with each activity (e.g. "cycling")
    pub tag: String,
    /// Human readable name
    pub label: String,
    /// Provider-side distance filter in meters, passed to the location SDK
    pub distance_filter_meters: f64,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
}

impl ActivityProfile {
    fn builtin(
        tag: &str,
        label: &str,
        distance_filter_meters: f64,
        accuracy_threshold_meters: f64,
        min_displacement_meters: f64,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            label: label.to_string(),
            distance_filter_meters,
            filter: FilterConfig {
                accuracy_threshold_meters,
                min_displacement_meters,
                ..FilterConfig::default()
            },
            smoothing: SmoothingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(TrackError::ConfigError {
                message: "activity profile tag must not be empty".to_string(),
            });
        }
        if !self.distance_filter_meters.is_finite() || self.distance_filter_meters < 0.0 {
            return Err(TrackError::ConfigError {
                message: format!(
                    "profile '{}': distanceFilterMeters must be zero or positive",
                    self.tag
                ),
            });
        }
        self.filter
            .validate()
            .and_then(|_| self.smoothing.validate())
            .map_err(|e| TrackError::ConfigError {
                message: format!("profile '{}': {}", self.tag, e),
            })
    }
}

/// On-disk shape of a catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    profiles: Vec<ActivityProfile>,
    fallback_tag: String,
}

/// A validated set of activity profiles with a fallback for unknown tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCatalog {
    profiles: Vec<ActivityProfile>,
    fallback_index: usize,
}

impl ActivityCatalog {
    /// Build a catalogue, validating every profile.
    ///
    /// Tags must be unique and `fallback_tag` must name one of the profiles.
    pub fn new(profiles: Vec<ActivityProfile>, fallback_tag: &str) -> Result<Self> {
        for (i, profile) in profiles.iter().enumerate() {
            profile.validate()?;
            if profiles[..i].iter().any(|p| p.tag == profile.tag) {
                return Err(TrackError::ConfigError {
                    message: format!("duplicate activity tag '{}'", profile.tag),
                });
            }
        }

        let fallback_index = profiles
            .iter()
            .position(|p| p.tag == fallback_tag)
            .ok_or_else(|| TrackError::ConfigError {
                message: format!("fallback tag '{}' has no profile", fallback_tag),
            })?;

        Ok(Self {
            profiles,
            fallback_index,
        })
    }

    /// The catalogue shipped with the app.
    pub fn builtin() -> Self {
        let mut debug = ActivityProfile::builtin("debug", "Debug", 1.0, 8.0, 0.2);
        debug.filter.strict_speed_gate = true;

        let mut driving = ActivityProfile::builtin("driving", "Driving", 50.0, 100.0, 5.0);
        driving.smoothing.spike_threshold_kmh = 30.0;

        let profiles = vec![
            ActivityProfile::builtin("walking_dog", "Dog walking", 5.0, 50.0, 1.0),
            ActivityProfile::builtin("cycling", "Cycling", 20.0, 50.0, 3.0),
            ActivityProfile::builtin("running", "Running", 10.0, 50.0, 2.0),
            ActivityProfile::builtin("hiking", "Hiking", 15.0, 50.0, 2.0),
            ActivityProfile::builtin("skating", "Skating", 15.0, 50.0, 2.0),
            driving,
            ActivityProfile::builtin(FALLBACK_TAG, "Other", 20.0, 50.0, 2.0),
            debug,
        ];

        Self {
            fallback_index: profiles.len() - 2,
            profiles,
        }
    }

    /// Load a catalogue from JSON (`{"profiles": [...], "fallbackTag": "..."}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.profiles, &file.fallback_tag)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = CatalogFile {
            profiles: self.profiles.clone(),
            fallback_tag: self.fallback().tag.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Exact lookup by tag.
    pub fn get(&self, tag: &str) -> Option<&ActivityProfile> {
        self.profiles.iter().find(|p| p.tag == tag)
    }

    /// Lookup by tag, falling back to the default profile for unknown tags.
    pub fn resolve(&self, tag: &str) -> &ActivityProfile {
        match self.get(tag) {
            Some(profile) => profile,
            None => {
                warn!(
                    "[ActivityCatalog] Unknown activity type '{}', using '{}'",
                    tag,
                    self.fallback().tag
                );
                self.fallback()
            }
        }
    }

    pub fn fallback(&self) -> &ActivityProfile {
        &self.profiles[self.fallback_index]
    }

    pub fn profiles(&self) -> &[ActivityProfile] {
        &self.profiles
    }

    /// Display label for a tag, "Unknown" if the tag is not in the catalogue.
    pub fn label(&self, tag: &str) -> &str {
        self.get(tag).map(|p| p.label.as_str()).unwrap_or("Unknown")
    }
}

impl Default for ActivityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

static DEFAULT_CATALOG: Lazy<ActivityCatalog> = Lazy::new(ActivityCatalog::builtin);

/// The shared, immutable built-in catalogue.
pub fn default_catalog() -> &'static ActivityCatalog {
    &DEFAULT_CATALOG
}
