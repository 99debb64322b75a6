//! # Event Bus System
//!
//! Broadcasts playback and cache notifications to any number of listeners
//! (UI bindings, analytics, tests) using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`PlaybackEvent`] for the load lifecycle and transport,
//!   [`CacheEvent`] for cache mutations, wrapped in [`CoreEvent`]
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ```text
//! ┌───────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ PlaybackLoader├──────────>│           ├──────────────>│ UI binding │
//! └───────────────┘           │ EventBus  │               └────────────┘
//! ┌───────────────┐   emit    │           │   subscribe   ┌────────────┐
//! │  AudioCache   ├──────────>│           ├──────────────>│   tests    │
//! └───────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Delivery
//!
//! Emission is best-effort: `emit` fails only when nobody is subscribed and
//! callers ignore that. Terminal load events (`Ready`, `LoadFailed`) are
//! emitted only by the session that is still current when it finishes, so a
//! subscriber sees exactly one terminal event per effective selection.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::LoadStarted {
//!     track_id: "t1".to_string(),
//!     generation: 1,
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Track load started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::Evicted { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Ready { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Cleared) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Whether this event ends a load (`Ready` or `LoadFailed`).
    pub fn is_terminal_load_event(&self) -> bool {
        matches!(
            self,
            CoreEvent::Playback(PlaybackEvent::Ready { .. })
                | CoreEvent::Playback(PlaybackEvent::LoadFailed { .. })
        )
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Load lifecycle and transport notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new selection started loading.
    LoadStarted {
        track_id: String,
        /// Generation token of the new session.
        generation: u64,
    },
    /// The selected track is attached and ready to play.
    Ready {
        track_id: String,
        /// Bytes came from the local cache rather than the network.
        from_cache: bool,
        /// Duration reported by the transport, if it arrived before the timeout.
        duration_ms: Option<u64>,
    },
    /// The selected track could not be loaded.
    LoadFailed {
        track_id: String,
        reason: String,
        /// A later retry might succeed (network blips, expired links).
        recoverable: bool,
    },
    Playing {
        track_id: String,
    },
    Paused {
        track_id: String,
        position_ms: u64,
    },
    Seeked {
        track_id: String,
        position_ms: u64,
    },
    VolumeChanged {
        /// Volume scaled to `0..=100`.
        volume_percent: u8,
    },
    /// Playback reached the end of the track.
    Ended {
        track_id: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::LoadStarted { .. } => "Track load started",
            PlaybackEvent::Ready { .. } => "Track ready",
            PlaybackEvent::LoadFailed { .. } => "Track load failed",
            PlaybackEvent::Playing { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Seeked { .. } => "Playback position changed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::Ended { .. } => "Track ended",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Mutations of the persistent audio cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    Stored { track_id: String, size_bytes: u64 },
    Removed { track_id: String },
    Cleared,
    /// Entry dropped to keep the cache under its size cap.
    Evicted { track_id: String, size_bytes: u64 },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Stored { .. } => "Audio cached",
            CacheEvent::Removed { .. } => "Cached audio removed",
            CacheEvent::Cleared => "Cache cleared",
            CacheEvent::Evicted { .. } => "Cached audio evicted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes into the same
/// channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drain every buffered event that passes the filter.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
