//! Observable loader state.

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};

/// Where the current selection is in its load lifecycle.
///
/// A superseded session never shows up here; its results are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Snapshot of what the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_track_id: Option<String>,
    /// User intent. While loading, `true` means "start as soon as ready".
    pub is_playing: bool,
    /// `0.0..=1.0`
    pub volume: f32,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    /// True from selection until the session is ready or failed.
    pub is_loading: bool,
    pub phase: LoadPhase,
}

impl PlaybackState {
    pub fn new(volume: f32) -> Self {
        Self {
            current_track_id: None,
            is_playing: false,
            volume,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            is_loading: false,
            phase: LoadPhase::Idle,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    /// Playback position as a fraction of duration, `0.0` when unknown.
    pub fn progress(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.position_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// How a [`PendingLoad`](super::PendingLoad) ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Source attached; playback started if it was requested.
    Ready {
        from_cache: bool,
        duration_seconds: Option<f64>,
    },
    /// The session failed; state was reset to not loading, not playing.
    Failed(PlaybackError),
    /// A newer selection or teardown replaced this session.
    Superseded,
    /// The track was already current; nothing was started.
    Unchanged,
}

impl LoadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadOutcome::Ready { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadOutcome::Failed(_))
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, LoadOutcome::Superseded)
    }

    pub fn error(&self) -> Option<&PlaybackError> {
        match self {
            LoadOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}
