//! Free-preview playback gate
//!
//! Latch-style access-control state machine. Evaluated on every time signal
//! and on every seek; once the preview threshold is crossed the gate latches
//! and keeps the surface paused until a permanent unlock arrives. The latch
//! guarantees the preview-ended notification fires exactly once per arming.
//!
//! The gate is a pure state machine: it decides, the engine applies the
//! side effects (pause, clamp, overlay, monitor arming).

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::GateConfig;

/// Gate state record
///
/// `unlocked_permanently` is monotonic: once true it never reverts for the
/// session. `latched` prevents re-firing the preview-ended event on every
/// tick once tripped.
#[derive(Debug, Clone)]
pub struct GateState {
    /// Free preview length in seconds; 0 disables the gate entirely
    pub threshold_secs: f64,
    /// Whether the gate has tripped
    pub latched: bool,
    /// Access granted for the rest of the session
    pub unlocked_permanently: bool,
    /// Wall clock time the unlock arrived
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// What the engine must do after a gate evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Nothing to do
    NoAction,
    /// Threshold crossed for the first time: emit the preview-ended event,
    /// pause, show the overlay, arm the integrity monitor, and clamp the
    /// position when it overshot the threshold
    Trip { clamp_to: Option<f64> },
    /// Already latched and still at/past the threshold: re-assert pause
    /// idempotently, no event
    Enforce,
}

/// Free-preview access gate
pub struct PlaybackGate {
    config: GateConfig,
    state: RwLock<GateState>,
}

impl PlaybackGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: RwLock::new(GateState {
                threshold_secs: 0.0,
                latched: false,
                unlocked_permanently: false,
                unlocked_at: None,
            }),
        }
    }

    /// Evaluate the gate against position `t`
    ///
    /// `from_seek` marks out-of-band evaluation triggered by a seek; the
    /// latch already guarantees exactly-once tripping, the flag only feeds
    /// diagnostics.
    pub async fn evaluate(&self, t: f64, from_seek: bool) -> GateDecision {
        let mut state = self.state.write().await;

        if state.unlocked_permanently || state.threshold_secs <= 0.0 {
            return GateDecision::NoAction;
        }

        let threshold = state.threshold_secs;
        if t < threshold - self.config.epsilon {
            return GateDecision::NoAction;
        }

        if state.latched {
            return GateDecision::Enforce;
        }

        state.latched = true;
        info!(
            position = t,
            threshold, from_seek, "free preview threshold crossed"
        );

        // Clamp back when the position overshot (seek-past-threshold)
        let clamp_to = (t > threshold).then(|| (threshold - self.config.clamp_back).max(0.0));
        GateDecision::Trip { clamp_to }
    }

    /// Whether a play request may be admitted at position `t`
    pub async fn can_play(&self, t: f64) -> bool {
        let state = self.state.read().await;
        if state.unlocked_permanently || state.threshold_secs <= 0.0 {
            return true;
        }
        !state.latched && t < state.threshold_secs - self.config.epsilon
    }

    /// Install a new threshold and re-evaluate the latch
    ///
    /// Returns true when the gate un-latched: the new threshold exceeds the
    /// current position (or disables the gate) and no permanent unlock or
    /// active violation exists. The caller is responsible for hiding the
    /// overlay and disarming the monitor in that case.
    pub async fn set_threshold(
        &self,
        threshold_secs: f64,
        current_position: f64,
        violation_active: bool,
    ) -> bool {
        let mut state = self.state.write().await;
        state.threshold_secs = threshold_secs.max(0.0);

        let can_unlatch = state.latched
            && !state.unlocked_permanently
            && !violation_active
            && (state.threshold_secs <= 0.0
                || current_position < state.threshold_secs - self.config.epsilon);

        if can_unlatch {
            state.latched = false;
            debug!(
                threshold = state.threshold_secs,
                position = current_position,
                "gate un-latched by threshold update"
            );
        }
        can_unlatch
    }

    /// Grant permanent access for the session; monotonic
    pub async fn mark_unlocked(&self) {
        let mut state = self.state.write().await;
        if !state.unlocked_permanently {
            state.unlocked_permanently = true;
            state.unlocked_at = Some(Utc::now());
            info!("playback permanently unlocked for this session");
        }
    }

    /// Explicitly re-arm the latch (collaborator-driven reset)
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.latched = false;
    }

    pub async fn is_latched(&self) -> bool {
        self.state.read().await.latched
    }

    pub async fn is_unlocked(&self) -> bool {
        self.state.read().await.unlocked_permanently
    }

    pub async fn threshold(&self) -> f64 {
        self.state.read().await.threshold_secs
    }

    /// Copy of the current state record
    pub async fn snapshot(&self) -> GateState {
        self.state.read().await.clone()
    }
}

impl std::fmt::Debug for PlaybackGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trips_exactly_once() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;

        // Scenario A tick sequence
        for t in [0.0, 10.0, 20.0, 29.0] {
            assert_eq!(gate.evaluate(t, false).await, GateDecision::NoAction);
        }
        assert!(matches!(
            gate.evaluate(30.0, false).await,
            GateDecision::Trip { clamp_to: None }
        ));
        assert_eq!(gate.evaluate(31.0, false).await, GateDecision::Enforce);
        assert_eq!(gate.evaluate(31.0, false).await, GateDecision::Enforce);
    }

    #[tokio::test]
    async fn test_epsilon_tolerance() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;

        assert_eq!(gate.evaluate(29.98, false).await, GateDecision::NoAction);
        assert!(matches!(
            gate.evaluate(29.995, false).await,
            GateDecision::Trip { .. }
        ));
    }

    #[tokio::test]
    async fn test_seek_overshoot_clamps() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;

        match gate.evaluate(120.0, true).await {
            GateDecision::Trip { clamp_to: Some(p) } => {
                assert!((p - 29.9).abs() < 1e-9);
            }
            other => panic!("expected clamped trip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unlock_is_monotonic() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;
        gate.mark_unlocked().await;

        assert_eq!(gate.evaluate(30.0, false).await, GateDecision::NoAction);
        assert_eq!(gate.evaluate(1000.0, true).await, GateDecision::NoAction);
        assert!(gate.can_play(1000.0).await);

        let snapshot = gate.snapshot().await;
        assert!(snapshot.unlocked_permanently);
        assert!(snapshot.unlocked_at.is_some());
    }

    #[tokio::test]
    async fn test_zero_threshold_disables_gate() {
        let gate = PlaybackGate::new(GateConfig::default());
        assert_eq!(gate.evaluate(9999.0, false).await, GateDecision::NoAction);
        assert!(gate.can_play(9999.0).await);
    }

    #[tokio::test]
    async fn test_can_play_denied_after_latch_even_below_threshold() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;
        gate.evaluate(30.0, false).await;

        // Clamped back below the threshold, still denied
        assert!(!gate.can_play(29.9).await);
        assert!(!gate.can_play(5.0).await);
    }

    #[tokio::test]
    async fn test_raising_threshold_unlatches() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;
        gate.evaluate(30.0, false).await;
        assert!(gate.is_latched().await);

        let unlatched = gate.set_threshold(300.0, 29.9, false).await;
        assert!(unlatched);
        assert!(!gate.is_latched().await);
        assert!(gate.can_play(29.9).await);
    }

    #[tokio::test]
    async fn test_threshold_update_respects_active_violation() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;
        gate.evaluate(30.0, false).await;

        let unlatched = gate.set_threshold(300.0, 29.9, true).await;
        assert!(!unlatched);
        assert!(gate.is_latched().await);
    }

    #[tokio::test]
    async fn test_reset_rearms_latch() {
        let gate = PlaybackGate::new(GateConfig::default());
        gate.set_threshold(30.0, 0.0, false).await;
        gate.evaluate(30.0, false).await;

        gate.reset().await;
        assert!(!gate.is_latched().await);

        // Trips again after reset
        assert!(matches!(
            gate.evaluate(31.0, false).await,
            GateDecision::Trip { .. }
        ));
    }
}
