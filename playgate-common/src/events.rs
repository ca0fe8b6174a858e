//! Event types for the playgate event system
//!
//! Provides the shared [`PlayerEvent`] enum and the [`EventBus`] used to
//! broadcast engine transitions to UI layers and other observers.
//!
//! # Architecture
//!
//! Events are one-to-many broadcast over `tokio::sync::broadcast`. Emission
//! is lossy by design: the engine never blocks or fails because nobody is
//! listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::timeline::Segment;

/// How a skip was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipMethod {
    /// User clicked the skip button
    Button,
    /// Auto-skip countdown reached zero
    Auto,
    /// Programmatic skip-to-segment call
    Manual,
}

/// Why the skip button was hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HideReason {
    /// Auto-hide timer elapsed
    Timeout,
    /// Playback left the segment
    SegmentEnd,
    /// User clicked the button
    UserAction,
    /// Explicit hide (teardown, reload)
    Manual,
}

/// Playgate event types
///
/// Every event carries the playback position it was observed at and a wall
/// clock timestamp. Events are serializable so a host player can forward
/// them over any transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A timeline was loaded and validated
    TimelineLoaded {
        media_id: String,
        segment_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Playback entered a segment
    SegmentEntered {
        segment: Segment,
        /// Previous segment, when transitioning directly between two
        previous: Option<Segment>,
        position: f64,
        timestamp: DateTime<Utc>,
    },

    /// Playback left a segment (always emitted before the paired
    /// `SegmentEntered` on direct transitions)
    SegmentExited {
        segment: Segment,
        /// Segment being entered, when transitioning directly between two
        next: Option<Segment>,
        position: f64,
        timestamp: DateTime<Utc>,
    },

    /// A segment was skipped
    SegmentSkipped {
        from: Option<Segment>,
        /// Target content segment, or None when seeking to the segment end
        to: Option<Segment>,
        method: SkipMethod,
        position: f64,
        timestamp: DateTime<Utc>,
    },

    /// Skip button became visible for a segment
    SkipButtonShown {
        segment: Segment,
        position: f64,
        timestamp: DateTime<Utc>,
    },

    /// Skip button was hidden
    SkipButtonHidden {
        segment: Segment,
        reason: HideReason,
        position: f64,
        timestamp: DateTime<Utc>,
    },

    /// Free preview threshold was crossed; fires exactly once per latch
    PreviewEnded {
        threshold_secs: f64,
        position: f64,
        timestamp: DateTime<Utc>,
    },

    /// The preview gate was explicitly re-armed
    GateReset {
        timestamp: DateTime<Utc>,
    },

    /// Non-fatal playback error surfaced to the host player
    PlaybackError {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Terminal lockout after repeated tamper detection
    SecurityViolation {
        tamper_attempts: u32,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// One-to-many event broadcaster
///
/// Thin wrapper over `tokio::sync::broadcast` so components share a single
/// emission idiom.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// State transitions must not fail because nobody is listening.
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Emit an event, returning the subscriber count
    ///
    /// Returns `Err` if no subscribers are listening.
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
