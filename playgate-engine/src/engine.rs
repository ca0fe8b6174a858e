//! Control engine - orchestrates all gating and segment components
//!
//! Top-level coordinator. Owns the timeline index, segment tracker, skip
//! button controller, preview gate, play/pause coordinator and integrity
//! monitor, and drives them from a periodic time-signal loop polling the
//! playback surface. Hosts with their own time events can instead feed
//! `handle_time_update` / `handle_seek` directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

use playgate_common::timeline::{Segment, Timeline};
use playgate_common::{
    Error, EventBus, HideReason, PlayerEvent, Result, SkipMethod, UserPreferences,
};

use crate::config::EngineConfig;
use crate::coordinator::{PlayOutcome, PlayPauseCoordinator};
use crate::gate::{GateDecision, PlaybackGate};
use crate::integrity::IntegrityMonitor;
use crate::overlay::AccessOverlay;
use crate::skip::{SkipButtonController, SkipButtonState};
use crate::surface::PlaybackSurface;
use crate::timeline::{SegmentTracker, TimelineIndex};

/// Capacity of the broadcast event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Playback control engine
pub struct ControlEngine {
    config: EngineConfig,

    /// External playback surface (video element, pipeline, cast session)
    surface: Arc<dyn PlaybackSurface>,

    /// External access-control overlay
    overlay: Arc<dyn AccessOverlay>,

    /// Broadcast channel for engine events
    events: Arc<EventBus>,

    /// Validated segment timeline
    index: Arc<RwLock<TimelineIndex>>,

    /// Current-segment state machine
    tracker: Arc<RwLock<SegmentTracker>>,

    /// Skip button state and timers
    skip: Arc<SkipButtonController>,

    /// Free-preview gate
    gate: Arc<PlaybackGate>,

    /// Serializer for surface start/stop
    coordinator: Arc<PlayPauseCoordinator>,

    /// Tamper watchdog
    integrity: Arc<IntegrityMonitor>,

    /// Per-user skip behavior
    prefs: Arc<RwLock<UserPreferences>>,

    /// Tick loop running flag
    running: Arc<RwLock<bool>>,
}

impl ControlEngine {
    /// Create a new control engine wired to the given collaborators
    pub fn new(
        config: EngineConfig,
        surface: Arc<dyn PlaybackSurface>,
        overlay: Arc<dyn AccessOverlay>,
    ) -> Self {
        let events = Arc::new(EventBus::new(EVENT_CHANNEL_CAPACITY));
        let gate = Arc::new(PlaybackGate::new(config.gate.clone()));
        let coordinator = Arc::new(PlayPauseCoordinator::new(
            surface.clone(),
            gate.clone(),
            events.clone(),
            Duration::from_millis(config.debounce_ms),
        ));
        let integrity = Arc::new(IntegrityMonitor::new(
            config.integrity.clone(),
            surface.clone(),
            overlay.clone(),
            gate.clone(),
            coordinator.clone(),
            events.clone(),
        ));
        let skip = Arc::new(SkipButtonController::new(
            config.skip.clone(),
            events.clone(),
        ));

        Self {
            config,
            surface,
            overlay,
            events,
            index: Arc::new(RwLock::new(TimelineIndex::new())),
            tracker: Arc::new(RwLock::new(SegmentTracker::new())),
            skip,
            gate,
            coordinator,
            integrity,
            prefs: Arc::new(RwLock::new(UserPreferences::default())),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the periodic time-signal loop
    pub async fn start(&self) {
        info!(
            tick_interval_ms = self.config.tick_interval_ms,
            "starting control engine"
        );
        *self.running.write().await = true;

        let engine = self.clone_handles();
        tokio::spawn(async move {
            engine.tick_loop().await;
        });
    }

    /// Stop all background work and clear transient state
    ///
    /// Latches, timers, intents and the monitor are all released; the
    /// lockout flag, if set, survives.
    pub async fn shutdown(&self) {
        info!("shutting down control engine");
        *self.running.write().await = false;

        self.skip.cancel_timers();
        self.skip
            .hide(HideReason::Manual, self.surface.current_time())
            .await;
        self.integrity.disarm().await;
        self.gate.reset().await;
        self.tracker.write().await.reset();
    }

    /// Validate and install a segment timeline
    pub async fn load_timeline(&self, timeline: Timeline) -> Result<()> {
        let (media_id, segment_count) = {
            let mut index = self.index.write().await;
            index.load(timeline)?;
            (
                index.media_id().unwrap_or_default().to_string(),
                index.segments().len(),
            )
        };

        // Fresh timeline: forget the current segment and any shown button
        self.tracker.write().await.reset();
        self.skip
            .hide(HideReason::Manual, self.surface.current_time())
            .await;

        self.events.emit_lossy(PlayerEvent::TimelineLoaded {
            media_id,
            segment_count,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Fetch a timeline over HTTP and install it
    pub async fn load_timeline_from_url(&self, url: &str) -> Result<()> {
        debug!(url, "fetching timeline");
        let response = reqwest::get(url)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let timeline: Timeline = response
            .json()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        self.load_timeline(timeline).await
    }

    /// Segment containing position `t` in the loaded timeline
    pub async fn current_segment(&self, t: f64) -> Option<Segment> {
        self.index.read().await.query(t).cloned()
    }

    /// Feed a periodic time signal
    pub async fn handle_time_update(&self, t: f64) {
        self.process_time(t, false).await;
    }

    /// Feed a seek, evaluated immediately rather than on the next tick
    pub async fn handle_seek(&self, t: f64) {
        self.process_time(t, true).await;
    }

    /// Skip the segment currently containing the playhead
    pub async fn skip_current_segment(&self) -> Result<()> {
        let position = self.surface.current_time();
        let segment = self
            .current_segment(position)
            .await
            .ok_or_else(|| Error::InvalidState("no segment at current position".to_string()))?;
        self.skip
            .hide_if(&segment.id, HideReason::Manual, position)
            .await;
        self.perform_skip(&segment.id, SkipMethod::Manual).await
    }

    /// Seek directly to the start of a segment by id
    pub async fn skip_to_segment(&self, id: &str) -> Result<()> {
        let position = self.surface.current_time();
        let (from, target) = {
            let index = self.index.read().await;
            let target = index
                .segment(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("segment {}", id)))?;
            (index.query(position).cloned(), target)
        };

        self.surface.seek(target.start_time);
        self.process_time(target.start_time, true).await;

        self.events.emit_lossy(PlayerEvent::SegmentSkipped {
            from,
            to: Some(target),
            method: SkipMethod::Manual,
            position,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// User clicked the visible skip button
    pub async fn click_skip_button(&self) -> Result<()> {
        let position = self.surface.current_time();
        let segment = self
            .skip
            .visible_segment()
            .await
            .ok_or_else(|| Error::InvalidState("skip button is not visible".to_string()))?;
        self.skip
            .hide_if(&segment.id, HideReason::UserAction, position)
            .await;
        self.perform_skip(&segment.id, SkipMethod::Button).await
    }

    /// Request playback to start
    ///
    /// Gate denials re-assert the overlay; autoplay restrictions propagate
    /// to the caller.
    pub async fn request_play(&self) -> Result<PlayOutcome> {
        let outcome = self.coordinator.request_play().await?;
        if outcome == PlayOutcome::DeniedByGate {
            self.overlay.show();
        }
        Ok(outcome)
    }

    /// Request playback to stop
    pub async fn request_pause(&self) {
        self.coordinator.request_pause().await;
    }

    /// Install a new free-preview threshold (seconds, 0 disables)
    ///
    /// Re-evaluated immediately against the current position: lowering the
    /// threshold below the playhead trips the gate, raising it above the
    /// playhead releases a latched gate.
    pub async fn set_free_duration_threshold(&self, threshold_secs: f64) {
        let position = self.surface.current_time();
        let violation_active = self.integrity.is_locked_out().await;

        let unlatched = self
            .gate
            .set_threshold(threshold_secs, position, violation_active)
            .await;
        if unlatched {
            self.overlay.hide();
            self.integrity.disarm().await;
        }

        let decision = self.gate.evaluate(position, false).await;
        self.apply_gate_decision(position, decision).await;
    }

    /// Explicitly re-arm the preview gate
    ///
    /// Refused after a terminal lockout.
    pub async fn reset_gate(&self) -> Result<()> {
        if self.integrity.is_locked_out().await {
            return Err(Error::SecurityViolation(
                "session is locked out".to_string(),
            ));
        }

        self.gate.reset().await;
        self.overlay.hide();
        self.integrity.disarm().await;
        self.events.emit_lossy(PlayerEvent::GateReset {
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Grant permanent access for the session
    ///
    /// Refused after a terminal lockout: the session stays locked whatever
    /// arrives afterwards, a fresh session is required.
    pub async fn mark_unlocked_permanently(&self) -> Result<()> {
        if self.integrity.is_locked_out().await {
            return Err(Error::SecurityViolation(
                "session is locked out".to_string(),
            ));
        }

        self.gate.mark_unlocked().await;
        self.overlay.hide();
        self.integrity.disarm().await;
        Ok(())
    }

    /// Replace the per-user skip preferences
    pub async fn set_preferences(&self, prefs: UserPreferences) {
        let hide_button = !prefs.show_skip_buttons;
        *self.prefs.write().await = prefs;
        if hide_button {
            self.skip
                .hide(HideReason::Manual, self.surface.current_time())
                .await;
        }
    }

    /// Current per-user skip preferences
    pub async fn preferences(&self) -> UserPreferences {
        self.prefs.read().await.clone()
    }

    /// Subscribe to engine events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Observable skip button state
    pub async fn skip_button_state(&self) -> SkipButtonState {
        self.skip.snapshot().await
    }

    /// Whether the session reached terminal lockout
    pub async fn is_locked_out(&self) -> bool {
        self.integrity.is_locked_out().await
    }

    // ------------------------------------------------------------------
    // Internal machinery
    // ------------------------------------------------------------------

    /// Periodic time-signal loop polling the surface clock
    async fn tick_loop(&self) {
        let mut ticker = interval(Duration::from_millis(self.config.tick_interval_ms));
        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                debug!("tick loop stopping");
                break;
            }
            let t = self.surface.current_time();
            self.process_time(t, false).await;
            self.coordinator.poll_deferred().await;
        }
    }

    /// Core time-signal processing: gate first, then segment transitions
    ///
    /// Boxed because the call graph is cyclic (a spawned auto-skip runs a
    /// skip, which re-enters time processing at the seek target); the
    /// indirection gives the recursive future a finite type.
    fn process_time<'a>(
        &'a self,
        t: f64,
        from_seek: bool,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            // Gate has priority over segment bookkeeping
            let decision = self.gate.evaluate(t, from_seek).await;
            let effective_t = self.apply_gate_decision(t, decision).await;

            let transition = {
                let index = self.index.read().await;
                self.tracker.write().await.advance(&index, effective_t)
            };

            let Some(transition) = transition else {
                return;
            };

            if let Some(exited) = &transition.exited {
                self.events.emit_lossy(PlayerEvent::SegmentExited {
                    segment: exited.clone(),
                    next: transition.entered.clone(),
                    position: effective_t,
                    timestamp: Utc::now(),
                });

                // Hide the button shown for the segment we just left
                if self.skip.visible_segment_id().await.as_deref() == Some(exited.id.as_str()) {
                    self.skip.hide(HideReason::SegmentEnd, effective_t).await;
                }
            }

            if let Some(entered) = &transition.entered {
                self.events.emit_lossy(PlayerEvent::SegmentEntered {
                    segment: entered.clone(),
                    previous: transition.exited.clone(),
                    position: effective_t,
                    timestamp: Utc::now(),
                });

                let prefs = self.prefs.read().await.clone();
                if self.skip.is_eligible(entered, &prefs) {
                    self.show_skip_button(entered, effective_t, &prefs).await;
                }
            }
        })
    }

    /// Apply a gate decision, returning the possibly clamped position
    async fn apply_gate_decision(&self, t: f64, decision: GateDecision) -> f64 {
        match decision {
            GateDecision::NoAction => t,
            GateDecision::Enforce => {
                if !self.surface.is_paused() {
                    self.coordinator.request_pause().await;
                }
                t
            }
            GateDecision::Trip { clamp_to } => {
                self.events.emit_lossy(PlayerEvent::PreviewEnded {
                    threshold_secs: self.gate.threshold().await,
                    position: t,
                    timestamp: Utc::now(),
                });

                self.coordinator.request_pause().await;
                if let Some(clamp) = clamp_to {
                    self.surface.seek(clamp);
                }
                self.overlay.show();
                self.integrity.arm().await;

                clamp_to.unwrap_or(t)
            }
        }
    }

    /// Show the skip button for `segment` and arm its timers
    async fn show_skip_button(&self, segment: &Segment, t: f64, prefs: &UserPreferences) {
        self.skip.show(segment, t).await;

        let auto_skip_delay = self.skip.auto_skip_delay(segment, prefs);

        // Timer tasks hand the actual action off to a detached task: the
        // action cancels the timer trio, and a timer must not abort itself
        // mid-action.
        let countdown_handles = if let Some(delay) = auto_skip_delay {
            self.skip.begin_countdown(delay).await;

            // 1 s tick decrementing the visible countdown
            let countdown = {
                let engine = self.clone_handles();
                let segment_id = segment.id.clone();
                tokio::spawn(async move {
                    let mut ticker = interval(Duration::from_secs(1));
                    ticker.tick().await; // immediate first tick
                    loop {
                        ticker.tick().await;
                        match engine.skip.tick_countdown().await {
                            Some(remaining) if remaining <= 0.0 => {
                                let engine = engine.clone_handles();
                                tokio::spawn(async move {
                                    engine.auto_skip(&segment_id).await;
                                });
                                break;
                            }
                            Some(_) => continue,
                            None => break,
                        }
                    }
                })
            };

            // Absolute backup covering the full delay in case countdown
            // ticks are starved
            let backup = {
                let engine = self.clone_handles();
                let segment_id = segment.id.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                    let engine2 = engine.clone_handles();
                    tokio::spawn(async move {
                        engine2.auto_skip(&segment_id).await;
                    });
                })
            };

            Some((countdown, backup))
        } else {
            None
        };

        // Auto-hide only when no countdown is running; hiding mid-countdown
        // would strand the pending auto-skip without its button
        let hide = if countdown_handles.is_none() {
            self.skip.auto_hide_delay().map(|delay| {
                let engine = self.clone_handles();
                let segment_id = segment.id.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let engine2 = engine.clone_handles();
                    tokio::spawn(async move {
                        let position = engine2.surface.current_time();
                        // Target only the segment this timer was armed for:
                        // the detached task can outlive its timer handle and
                        // race a newly shown button
                        engine2
                            .skip
                            .hide_if(&segment_id, HideReason::Timeout, position)
                            .await;
                    });
                })
            })
        } else {
            None
        };

        let (countdown, backup) = match countdown_handles {
            Some((c, b)) => (Some(c), Some(b)),
            None => (None, None),
        };
        self.skip.install_timers(hide, countdown, backup);
    }

    /// Auto-skip fired by the countdown or its backup timer
    ///
    /// Idempotent: both timers can fire for the same segment, and `hide_if`
    /// lets exactly one of them through.
    async fn auto_skip(&self, segment_id: &str) {
        let position = self.surface.current_time();
        if self
            .skip
            .hide_if(segment_id, HideReason::Timeout, position)
            .await
            .is_none()
        {
            return;
        }
        if let Err(e) = self.perform_skip(segment_id, SkipMethod::Auto).await {
            warn!(segment_id, error = %e, "auto-skip failed");
        }
    }

    /// Perform the skip: seek past the segment and optionally resume
    ///
    /// The button, if it was shown for this segment, is already hidden by
    /// the caller.
    async fn perform_skip(&self, segment_id: &str, method: SkipMethod) -> Result<()> {
        let position = self.surface.current_time();
        let (from, target) = {
            let index = self.index.read().await;
            let from = index
                .segment(segment_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("segment {}", segment_id)))?;
            let target = index.next_content_segment_after(segment_id).cloned();
            (from, target)
        };

        let was_playing = !self.surface.is_paused();

        // Land on the next content segment, or just past this one
        let seek_to = target
            .as_ref()
            .map(|s| s.start_time)
            .unwrap_or(from.end_time);

        debug!(segment_id, seek_to, ?method, "skipping segment");
        self.surface.seek(seek_to);
        self.process_time(seek_to, true).await;

        self.events.emit_lossy(PlayerEvent::SegmentSkipped {
            from: Some(from),
            to: target,
            method,
            position,
            timestamp: Utc::now(),
        });

        // Best-effort resume; a failed resume leaves the player paused at
        // the target, which is recoverable by the user
        if was_playing && self.prefs.read().await.resume_after_skip {
            if let Err(e) = self.coordinator.request_play().await {
                warn!(error = %e, "resume after skip failed");
            }
        }
        Ok(())
    }

    /// Clone Arc handles for use in spawned tasks
    fn clone_handles(&self) -> Self {
        Self {
            config: self.config.clone(),
            surface: Arc::clone(&self.surface),
            overlay: Arc::clone(&self.overlay),
            events: Arc::clone(&self.events),
            index: Arc::clone(&self.index),
            tracker: Arc::clone(&self.tracker),
            skip: Arc::clone(&self.skip),
            gate: Arc::clone(&self.gate),
            coordinator: Arc::clone(&self.coordinator),
            integrity: Arc::clone(&self.integrity),
            prefs: Arc::clone(&self.prefs),
            running: Arc::clone(&self.running),
        }
    }
}

impl std::fmt::Debug for ControlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
