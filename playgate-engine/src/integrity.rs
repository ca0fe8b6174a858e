//! Access-control integrity monitor
//!
//! Watchdog armed while the free-preview gate is latched. Polls the access
//! overlay and the playback surface: a missing overlay counts as a tamper
//! attempt and is self-healed by re-requesting it, until the attempt budget
//! is exhausted and the session enters a terminal lockout. A surface found
//! playing while latched is paused immediately.
//!
//! Lockout is one-way for the session: the monitor stops polling and the
//! gate can no longer be reset.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use playgate_common::{EventBus, PlayerEvent};

use crate::config::IntegrityConfig;
use crate::coordinator::PlayPauseCoordinator;
use crate::gate::PlaybackGate;
use crate::overlay::AccessOverlay;
use crate::surface::PlaybackSurface;

const LOCKOUT_MESSAGE: &str = "access control integrity violated";

/// Monitor state record
#[derive(Debug, Clone, Default)]
pub struct IntegrityState {
    /// Poll loop is running
    pub active: bool,
    /// Overlay-missing detections since the monitor was armed
    pub tamper_attempts: u32,
    /// Terminal lockout reached; cannot be exited in-session
    pub locked_out: bool,
}

/// Tamper watchdog for the free-preview overlay
pub struct IntegrityMonitor {
    config: IntegrityConfig,
    surface: Arc<dyn PlaybackSurface>,
    overlay: Arc<dyn AccessOverlay>,
    gate: Arc<PlaybackGate>,
    coordinator: Arc<PlayPauseCoordinator>,
    events: Arc<EventBus>,
    state: RwLock<IntegrityState>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl IntegrityMonitor {
    pub fn new(
        config: IntegrityConfig,
        surface: Arc<dyn PlaybackSurface>,
        overlay: Arc<dyn AccessOverlay>,
        gate: Arc<PlaybackGate>,
        coordinator: Arc<PlayPauseCoordinator>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            surface,
            overlay,
            gate,
            coordinator,
            events,
            state: RwLock::new(IntegrityState::default()),
            task: StdMutex::new(None),
        }
    }

    /// Start the poll loop
    ///
    /// No-op when already armed or locked out. The attempt counter starts
    /// fresh on every arming.
    pub async fn arm(self: &Arc<Self>) {
        {
            let mut state = self.state.write().await;
            if state.active || state.locked_out {
                return;
            }
            state.active = true;
            state.tamper_attempts = 0;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_attempts = self.config.max_attempts,
            "integrity monitor armed"
        );

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(monitor.config.poll_interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; skip it so the first real
            // check happens one interval after arming
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !monitor.poll_once().await {
                    break;
                }
            }
        });

        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
    }

    /// Stop polling without touching the lockout flag
    pub async fn disarm(&self) {
        {
            let mut state = self.state.write().await;
            if !state.active {
                return;
            }
            state.active = false;
        }
        self.abort_task();
        debug!("integrity monitor disarmed");
    }

    /// One watchdog check; returns false when polling should stop
    ///
    /// Exposed for the engine tick loop and for tests; the spawned loop is
    /// just this on an interval.
    pub async fn poll_once(&self) -> bool {
        if self.state.read().await.locked_out {
            return false;
        }

        // Gate released or unlocked: nothing left to guard
        if self.gate.is_unlocked().await || !self.gate.is_latched().await {
            self.disarm().await;
            return false;
        }

        // The surface must stay paused while latched, whatever happened to
        // the overlay
        if !self.surface.is_paused() {
            warn!("surface playing while preview gate latched, pausing");
            self.coordinator.request_pause().await;
        }

        if self.overlay.is_present() {
            return true;
        }

        let attempts = {
            let mut state = self.state.write().await;
            state.tamper_attempts += 1;
            state.tamper_attempts
        };

        if attempts < self.config.max_attempts {
            warn!(
                attempts,
                max_attempts = self.config.max_attempts,
                "access overlay missing, restoring"
            );
            self.overlay.show();
            return true;
        }

        self.lock_out(attempts).await;
        false
    }

    /// Enter terminal lockout
    async fn lock_out(&self, attempts: u32) {
        {
            let mut state = self.state.write().await;
            state.locked_out = true;
            state.active = false;
        }

        error!(attempts, "tamper attempt budget exhausted, locking out");

        // Blank the surface: stop playback and rewind to the start
        self.coordinator.request_pause().await;
        self.surface.seek(0.0);
        self.overlay.show_lockout(LOCKOUT_MESSAGE);

        self.events.emit_lossy(PlayerEvent::SecurityViolation {
            tamper_attempts: attempts,
            message: LOCKOUT_MESSAGE.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub async fn is_locked_out(&self) -> bool {
        self.state.read().await.locked_out
    }

    pub async fn is_active(&self) -> bool {
        self.state.read().await.active
    }

    /// Copy of the current monitor state
    pub async fn snapshot(&self) -> IntegrityState {
        self.state.read().await.clone()
    }

    fn abort_task(&self) {
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for IntegrityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityMonitor")
            .field("poll_interval_ms", &self.config.poll_interval_ms)
            .field("max_attempts", &self.config.max_attempts)
            .finish_non_exhaustive()
    }
}
