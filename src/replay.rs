//! Offline replay of recorded raw-fix streams.
//!
//! A recorded stream is fed through a fresh recorder exactly as the live
//! provider would deliver it, which makes it possible to re-derive summaries
//! after tuning an activity profile or to check a catalogue against field
//! recordings.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profiles::ActivityCatalog;
use crate::session::TrackRecorder;
use crate::summary::ActivitySummary;
use crate::RawFix;

/// A raw provider stream captured for one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSession {
    pub activity_type: String,
    pub fixes: Vec<RawFix>,
}

impl RecordedSession {
    pub fn new(activity_type: impl Into<String>, fixes: Vec<RawFix>) -> Self {
        Self {
            activity_type: activity_type.into(),
            fixes,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Replay one stream through a fresh session.
///
/// `Ok(None)` when the stream yields too few usable fixes for a summary.
pub fn replay_session(
    catalog: &ActivityCatalog,
    activity_type: &str,
    fixes: &[RawFix],
) -> Result<Option<ActivitySummary>> {
    let mut recorder = TrackRecorder::with_catalog(catalog.clone());
    recorder.start(activity_type)?;
    for fix in fixes {
        recorder.on_raw_fix(*fix);
    }
    recorder.stop()
}

/// Replay a batch of recordings, each in its own session.
///
/// Results are in input order. With the `parallel` feature the sessions are
/// replayed on the rayon thread pool.
pub fn replay_sessions(
    catalog: &ActivityCatalog,
    sessions: &[RecordedSession],
) -> Vec<Result<Option<ActivitySummary>>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        sessions
            .par_iter()
            .map(|s| replay_session(catalog, &s.activity_type, &s.fixes))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        sessions
            .iter()
            .map(|s| replay_session(catalog, &s.activity_type, &s.fixes))
            .collect()
    }
}
