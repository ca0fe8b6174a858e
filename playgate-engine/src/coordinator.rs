//! Play/pause coordination
//!
//! Serializes asynchronous start requests against a playback surface whose
//! `play()` is racy with `pause()`. At most one in-flight start (the
//! `PlayIntent`) exists at a time; a pause requested while a start is in
//! flight is deferred and applied immediately after the start settles. This
//! defer mechanism is what prevents the "pause interrupted by play" class of
//! races.
//!
//! Only this component is permitted to call the surface's start/stop
//! primitives directly.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use playgate_common::{Error, EventBus, PlayError, PlayerEvent, Result};

use crate::gate::PlaybackGate;
use crate::surface::PlaybackSurface;

/// One in-flight asynchronous start request
#[derive(Debug, Default)]
struct PlayIntent {
    /// Pause was requested while the start was in flight
    deferred_pause: bool,
}

#[derive(Debug, Default)]
struct Inner {
    /// The single outstanding start, if any
    intent: Option<PlayIntent>,
    /// Pause requested while the surface was not buffered enough to pause
    /// safely; applied by the next settlement or deferred-work poll
    pending_pause: bool,
    /// Last play attempt, for debouncing rapid toggles
    last_attempt: Option<Instant>,
}

/// How a play request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Start was issued and settled successfully
    Started,
    /// Start settled as a benign abort (racing pause won)
    Aborted,
    /// Start failed with a media error, surfaced as a non-fatal player error
    Failed,
    /// Surface already playing, nothing to do
    AlreadyPlaying,
    /// A start is already in flight
    PendingStart,
    /// Second toggle inside the debounce window, ignored
    Debounced,
    /// The free-preview gate refused the start
    DeniedByGate,
}

/// Serializer for surface start/stop calls
pub struct PlayPauseCoordinator {
    surface: Arc<dyn PlaybackSurface>,
    gate: Arc<PlaybackGate>,
    events: Arc<EventBus>,
    inner: Mutex<Inner>,
    debounce: Duration,
}

impl PlayPauseCoordinator {
    pub fn new(
        surface: Arc<dyn PlaybackSurface>,
        gate: Arc<PlaybackGate>,
        events: Arc<EventBus>,
        debounce: Duration,
    ) -> Self {
        Self {
            surface,
            gate,
            events,
            inner: Mutex::new(Inner::default()),
            debounce,
        }
    }

    /// Request playback to start
    ///
    /// Consults the gate first; a denied request re-asserts the pause and
    /// returns without starting. Autoplay-restriction failures propagate so
    /// the caller can attempt a fallback (e.g. muted retry); all other
    /// failures are absorbed here.
    pub async fn request_play(&self) -> Result<PlayOutcome> {
        let position = self.surface.current_time();
        if !self.gate.can_play(position).await {
            debug!(position, "play denied by preview gate");
            // Enforcement pause goes through the same deferral logic as any
            // other pause, it must not race an unbuffered surface
            self.request_pause().await;
            return Ok(PlayOutcome::DeniedByGate);
        }

        {
            let mut inner = self.inner.lock().await;

            if let Some(last) = inner.last_attempt {
                if last.elapsed() < self.debounce {
                    debug!("play request debounced");
                    return Ok(PlayOutcome::Debounced);
                }
            }
            inner.last_attempt = Some(Instant::now());

            if inner.intent.is_some() {
                return Ok(PlayOutcome::PendingStart);
            }
            if !self.surface.is_paused() {
                return Ok(PlayOutcome::AlreadyPlaying);
            }

            inner.intent = Some(PlayIntent::default());
        }

        let result = self.surface.play().await;

        // Settle: clear the intent and pick up any pause that arrived while
        // the start was in flight
        let deferred = {
            let mut inner = self.inner.lock().await;
            let from_intent = inner
                .intent
                .take()
                .map(|intent| intent.deferred_pause)
                .unwrap_or(false);
            from_intent || std::mem::take(&mut inner.pending_pause)
        };

        match result {
            Ok(()) => {
                if deferred {
                    debug!("applying pause deferred during start");
                    self.surface.pause();
                }
                Ok(PlayOutcome::Started)
            }
            Err(PlayError::BenignAbort) => {
                // Expected outcome of a legitimate pause racing the start
                debug!("start aborted by racing pause, swallowing");
                if deferred {
                    self.surface.pause();
                }
                Ok(PlayOutcome::Aborted)
            }
            Err(err @ PlayError::AutoplayRestricted(_)) => {
                if deferred {
                    self.surface.pause();
                }
                Err(Error::Play(err))
            }
            Err(PlayError::Media(message)) => {
                warn!(%message, "playback start failed");
                if deferred {
                    self.surface.pause();
                }
                self.events.emit_lossy(PlayerEvent::PlaybackError {
                    message,
                    timestamp: Utc::now(),
                });
                Ok(PlayOutcome::Failed)
            }
        }
    }

    /// Request playback to stop
    ///
    /// With a start in flight, or a surface not yet buffered enough to pause
    /// safely, the pause is deferred and applied as soon as it can be.
    pub async fn request_pause(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(intent) = inner.intent.as_mut() {
            intent.deferred_pause = true;
            debug!("pause deferred until in-flight start settles");
            return;
        }

        if !self.surface.ready_state().can_pause_safely() {
            inner.pending_pause = true;
            debug!("pause deferred until surface is buffered");
            return;
        }

        drop(inner);
        self.surface.pause();
    }

    /// Apply a pause that was deferred for buffering, once it is safe
    ///
    /// Called from the engine tick loop; a no-op unless a deferred pause is
    /// pending and the surface can now pause safely.
    pub async fn poll_deferred(&self) {
        let mut inner = self.inner.lock().await;
        if inner.pending_pause
            && inner.intent.is_none()
            && self.surface.ready_state().can_pause_safely()
        {
            inner.pending_pause = false;
            drop(inner);
            debug!("applying pause deferred for buffering");
            self.surface.pause();
        }
    }

    /// Whether a start is currently in flight
    pub async fn is_start_pending(&self) -> bool {
        self.inner.lock().await.intent.is_some()
    }
}

impl std::fmt::Debug for PlayPauseCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayPauseCoordinator")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}
