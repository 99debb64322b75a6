//! Load sessions and the stale-result guard.
//!
//! Every selection creates a [`LoadSession`] tagged with a monotonically
//! increasing generation. Shared state can only be changed through
//! [`LoadSession::apply`], which takes the loader lock and refuses to run once
//! a newer selection (or teardown) has replaced the session.

use bridge_traits::playback::{AudioTransport, BlobRegistry, BlobUrl};
use core_async::sync::CancellationToken;
use parking_lot::Mutex;
use std::future::Future;
use tracing::debug;

use super::state::{LoadPhase, PlaybackState};
use crate::models::TrackRef;

/// Mutable loader state, always accessed under one lock.
pub(crate) struct LoaderInner {
    pub(crate) state: PlaybackState,
    pub(crate) generation: u64,
    pub(crate) active: Option<ActiveSession>,
    pub(crate) torn_down: bool,
}

/// Bookkeeping for the one session allowed to touch shared state.
pub(crate) struct ActiveSession {
    pub(crate) generation: u64,
    pub(crate) token: CancellationToken,
    /// Object URL currently attached to the transport, if any.
    pub(crate) blob: Option<BlobUrl>,
}

impl LoaderInner {
    pub(crate) fn new(volume: f32) -> Self {
        Self {
            state: PlaybackState::new(volume),
            generation: 0,
            active: None,
            torn_down: false,
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.torn_down
            && self
                .active
                .as_ref()
                .is_some_and(|active| active.generation == generation)
    }

    /// Whether `track_id` is already loading or loaded.
    pub(crate) fn is_serving(&self, track_id: &str) -> bool {
        self.active.is_some()
            && self.state.current_track_id.as_deref() == Some(track_id)
            && matches!(self.state.phase, LoadPhase::Loading | LoadPhase::Ready)
    }

    /// Cancel the active session and release what it holds on the transport.
    pub(crate) fn release_active(&mut self, transport: &dyn AudioTransport, blobs: &dyn BlobRegistry) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.token.cancel();
        transport.pause();
        transport.detach_source();
        if let Some(url) = active.blob {
            blobs.revoke(&url);
        }
        debug!(generation = active.generation, "Released load session");
    }

    /// Replace any active session with a new one for `track`.
    pub(crate) fn begin(
        &mut self,
        track: TrackRef,
        transport: &dyn AudioTransport,
        blobs: &dyn BlobRegistry,
    ) -> LoadSession {
        self.release_active(transport, blobs);

        self.generation += 1;
        let token = CancellationToken::new();
        self.active = Some(ActiveSession {
            generation: self.generation,
            token: token.clone(),
            blob: None,
        });

        self.state.current_track_id = Some(track.id.clone());
        self.state.phase = LoadPhase::Loading;
        self.state.is_loading = true;
        self.state.position_seconds = 0.0;
        self.state.duration_seconds = 0.0;

        LoadSession {
            generation: self.generation,
            track,
            token,
        }
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        self.active.as_mut()
    }
}

/// One load attempt for one track.
#[derive(Debug)]
pub(crate) struct LoadSession {
    pub(crate) generation: u64,
    pub(crate) track: TrackRef,
    pub(crate) token: CancellationToken,
}

impl LoadSession {
    pub(crate) fn track_id(&self) -> &str {
        &self.track.id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` unless the session is cancelled first.
    pub(crate) async fn until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        self.token.run_until_cancelled(fut).await
    }

    /// Run `apply` against shared state if this session is still current.
    ///
    /// Returns `None` without calling `apply` when the session was superseded.
    pub(crate) fn apply<R>(
        &self,
        inner: &Mutex<LoaderInner>,
        apply: impl FnOnce(&mut LoaderInner) -> R,
    ) -> Option<R> {
        let mut guard = inner.lock();
        if self.is_cancelled() || !guard.is_current(self.generation) {
            return None;
        }
        Some(apply(&mut guard))
    }
}
