//! Skip button lifecycle
//!
//! State machine for the per-segment skip button: Hidden, Visible, and
//! Visible with an auto-skip countdown. The controller owns the button state
//! and the three timers attached to it (auto-hide, countdown tick, backup
//! absolute auto-skip). Timers are tokio tasks spawned by the engine and
//! handed over here; showing a button for a new segment always cancels every
//! timer from the previous one before arming new ones.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use playgate_common::timeline::Segment;
use playgate_common::{EventBus, HideReason, PlayerEvent, UserPreferences};

use crate::config::{SkipButtonConfig, SkipButtonPosition};

/// Observable skip button state
#[derive(Debug, Clone)]
pub struct SkipButtonState {
    pub visible: bool,
    /// Segment the button is shown for
    pub segment: Option<Segment>,
    /// Corner the button is anchored to
    pub position: SkipButtonPosition,
    /// Seconds left on the auto-skip countdown, when one is running
    pub auto_skip_remaining: Option<f64>,
}

/// The timer trio attached to a visible button
///
/// At most one of each exists at a time; arming for a new segment aborts
/// whatever is still live.
#[derive(Debug, Default)]
struct SkipTimers {
    /// Auto-hide after `auto_hide_ms`
    hide: Option<JoinHandle<()>>,
    /// 1 s countdown tick decrementing `auto_skip_remaining`
    countdown: Option<JoinHandle<()>>,
    /// Absolute auto-skip timer covering the full delay, in case countdown
    /// ticks are starved
    backup: Option<JoinHandle<()>>,
}

impl SkipTimers {
    fn abort_all(&mut self) {
        for handle in [
            self.hide.take(),
            self.countdown.take(),
            self.backup.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

/// Skip button state machine
pub struct SkipButtonController {
    config: SkipButtonConfig,
    events: Arc<EventBus>,
    state: RwLock<SkipButtonState>,
    timers: StdMutex<SkipTimers>,
}

impl SkipButtonController {
    pub fn new(config: SkipButtonConfig, events: Arc<EventBus>) -> Self {
        let position = config.position;
        Self {
            config,
            events,
            state: RwLock::new(SkipButtonState {
                visible: false,
                segment: None,
                position,
                auto_skip_remaining: None,
            }),
            timers: StdMutex::new(SkipTimers::default()),
        }
    }

    /// Whether entering `segment` should show the skip button
    ///
    /// Non-content segments show unless they opt out; content segments show
    /// only when they opt in. The per-user master switch overrides both.
    pub fn is_eligible(&self, segment: &Segment, prefs: &UserPreferences) -> bool {
        if !prefs.show_skip_buttons {
            return false;
        }
        if segment.segment_type.is_content() {
            segment.show_skip_button == Some(true)
        } else {
            segment.show_skip_button != Some(false)
        }
    }

    /// Auto-skip delay for `segment`, when auto-skip applies
    ///
    /// Requires the segment to opt in with a delay and the per-type user
    /// preference to be enabled.
    pub fn auto_skip_delay(&self, segment: &Segment, prefs: &UserPreferences) -> Option<f64> {
        if segment.auto_skip != Some(true) {
            return None;
        }
        if !prefs.auto_skip_enabled(&segment.segment_type) {
            return None;
        }
        segment.auto_skip_delay.filter(|d| *d > 0.0)
    }

    /// Make the button visible for `segment`
    ///
    /// Cancels any timers left over from a previously shown segment.
    pub async fn show(&self, segment: &Segment, position: f64) {
        self.cancel_timers();

        let mut state = self.state.write().await;
        state.visible = true;
        state.segment = Some(segment.clone());
        state.auto_skip_remaining = None;
        drop(state);

        debug!(segment_id = %segment.id, kind = %segment.segment_type, "skip button shown");
        self.events.emit_lossy(PlayerEvent::SkipButtonShown {
            segment: segment.clone(),
            position,
            timestamp: Utc::now(),
        });
    }

    /// Hide the button, cancelling all timers
    ///
    /// Returns the segment the button was shown for; no-op when already
    /// hidden.
    pub async fn hide(&self, reason: HideReason, position: f64) -> Option<Segment> {
        self.cancel_timers();

        let mut state = self.state.write().await;
        if !state.visible {
            return None;
        }
        state.visible = false;
        state.auto_skip_remaining = None;
        let segment = state.segment.take()?;
        drop(state);

        debug!(segment_id = %segment.id, ?reason, "skip button hidden");
        self.events.emit_lossy(PlayerEvent::SkipButtonHidden {
            segment: segment.clone(),
            reason,
            position,
            timestamp: Utc::now(),
        });
        Some(segment)
    }

    /// Hide the button only if it is shown for segment `id`
    ///
    /// The check and the state change happen under one lock, so two racing
    /// hide attempts (countdown and its backup timer) resolve to exactly one
    /// winner. Returns the hidden segment for the winner, `None` otherwise.
    pub async fn hide_if(&self, id: &str, reason: HideReason, position: f64) -> Option<Segment> {
        let segment = {
            let mut state = self.state.write().await;
            if !state.visible || state.segment.as_ref().map(|s| s.id.as_str()) != Some(id) {
                return None;
            }
            state.visible = false;
            state.auto_skip_remaining = None;
            state.segment.take()?
        };
        self.cancel_timers();

        debug!(segment_id = %segment.id, ?reason, "skip button hidden");
        self.events.emit_lossy(PlayerEvent::SkipButtonHidden {
            segment: segment.clone(),
            reason,
            position,
            timestamp: Utc::now(),
        });
        Some(segment)
    }

    /// Start the auto-skip countdown at `delay` seconds
    pub async fn begin_countdown(&self, delay: f64) {
        let mut state = self.state.write().await;
        state.auto_skip_remaining = Some(delay);
    }

    /// Decrement the countdown by one second
    ///
    /// Returns the remaining seconds after the tick; `Some(0.0)` means the
    /// auto-skip should fire now. `None` when no countdown is running.
    pub async fn tick_countdown(&self) -> Option<f64> {
        let mut state = self.state.write().await;
        let remaining = state.auto_skip_remaining?;
        let next = (remaining - 1.0).max(0.0);
        state.auto_skip_remaining = Some(next);
        Some(next)
    }

    /// Hand over freshly spawned timers, aborting any previous trio
    pub fn install_timers(
        &self,
        hide: Option<JoinHandle<()>>,
        countdown: Option<JoinHandle<()>>,
        backup: Option<JoinHandle<()>>,
    ) {
        let mut timers = match self.timers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        timers.abort_all();
        timers.hide = hide;
        timers.countdown = countdown;
        timers.backup = backup;
    }

    /// Abort every live timer
    pub fn cancel_timers(&self) {
        let mut timers = match self.timers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        timers.abort_all();
    }

    /// Auto-hide delay from configuration, `None` when auto-hide is disabled
    pub fn auto_hide_delay(&self) -> Option<std::time::Duration> {
        (self.config.auto_hide_ms > 0)
            .then(|| std::time::Duration::from_millis(self.config.auto_hide_ms))
    }

    pub async fn is_visible(&self) -> bool {
        self.state.read().await.visible
    }

    /// Id of the segment the button is currently shown for
    pub async fn visible_segment_id(&self) -> Option<String> {
        let state = self.state.read().await;
        state.visible.then(|| state.segment.as_ref().map(|s| s.id.clone())).flatten()
    }

    /// Segment the button is currently shown for
    pub async fn visible_segment(&self) -> Option<Segment> {
        let state = self.state.read().await;
        state.visible.then(|| state.segment.clone()).flatten()
    }

    /// Whether an auto-skip countdown is currently running
    pub async fn countdown_active(&self) -> bool {
        self.state.read().await.auto_skip_remaining.is_some()
    }

    /// Copy of the current button state
    pub async fn snapshot(&self) -> SkipButtonState {
        self.state.read().await.clone()
    }

    /// Label to render on the button for `segment`
    pub fn label_for(&self, segment: &Segment) -> String {
        segment.effective_skip_label().to_string()
    }
}

impl std::fmt::Debug for SkipButtonController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipButtonController")
            .field("auto_hide_ms", &self.config.auto_hide_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playgate_common::timeline::SegmentType;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn segment(id: &str, ty: SegmentType) -> Segment {
        Segment {
            id: id.to_string(),
            segment_type: ty,
            start_time: 0.0,
            end_time: 20.0,
            title: None,
            skip_label: None,
            auto_skip: None,
            auto_skip_delay: None,
            show_skip_button: None,
        }
    }

    fn controller() -> SkipButtonController {
        SkipButtonController::new(SkipButtonConfig::default(), Arc::new(EventBus::new(16)))
    }

    #[test]
    fn test_eligibility_non_content_default_shows() {
        let ctl = controller();
        let prefs = UserPreferences::default();
        assert!(ctl.is_eligible(&segment("intro", SegmentType::Intro), &prefs));
        assert!(ctl.is_eligible(&segment("ad", SegmentType::Ad), &prefs));
    }

    #[test]
    fn test_eligibility_non_content_opt_out() {
        let ctl = controller();
        let prefs = UserPreferences::default();
        let mut seg = segment("intro", SegmentType::Intro);
        seg.show_skip_button = Some(false);
        assert!(!ctl.is_eligible(&seg, &prefs));
    }

    #[test]
    fn test_eligibility_content_requires_opt_in() {
        let ctl = controller();
        let prefs = UserPreferences::default();
        let mut seg = segment("main", SegmentType::Content);
        assert!(!ctl.is_eligible(&seg, &prefs));
        seg.show_skip_button = Some(true);
        assert!(ctl.is_eligible(&seg, &prefs));
    }

    #[test]
    fn test_eligibility_master_switch_wins() {
        let ctl = controller();
        let prefs = UserPreferences {
            show_skip_buttons: false,
            ..Default::default()
        };
        let mut seg = segment("intro", SegmentType::Intro);
        seg.show_skip_button = Some(true);
        assert!(!ctl.is_eligible(&seg, &prefs));
    }

    #[test]
    fn test_auto_skip_delay_requires_pref_and_opt_in() {
        let ctl = controller();
        let mut seg = segment("intro", SegmentType::Intro);
        seg.auto_skip = Some(true);
        seg.auto_skip_delay = Some(5.0);

        let off = UserPreferences::default();
        assert_eq!(ctl.auto_skip_delay(&seg, &off), None);

        let on = UserPreferences {
            auto_skip_intro: true,
            ..Default::default()
        };
        assert_eq!(ctl.auto_skip_delay(&seg, &on), Some(5.0));

        // Segment must opt in too
        seg.auto_skip = Some(false);
        assert_eq!(ctl.auto_skip_delay(&seg, &on), None);
    }

    #[tokio::test]
    async fn test_show_then_hide_emits_events() {
        let events = Arc::new(EventBus::new(16));
        let mut rx = events.subscribe();
        let ctl = SkipButtonController::new(SkipButtonConfig::default(), events);

        let seg = segment("intro", SegmentType::Intro);
        ctl.show(&seg, 1.0).await;
        assert!(ctl.is_visible().await);
        assert_eq!(ctl.visible_segment_id().await.as_deref(), Some("intro"));

        let hidden = ctl.hide(HideReason::SegmentEnd, 20.0).await;
        assert_eq!(hidden.unwrap().id, "intro");
        assert!(!ctl.is_visible().await);

        match rx.try_recv().unwrap() {
            PlayerEvent::SkipButtonShown { segment, .. } => assert_eq!(segment.id, "intro"),
            other => panic!("expected SkipButtonShown, got {:?}", other),
        }
        match rx.try_recv().unwrap() {
            PlayerEvent::SkipButtonHidden { reason, .. } => {
                assert_eq!(reason, HideReason::SegmentEnd);
            }
            other => panic!("expected SkipButtonHidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hide_if_ignores_other_segments_button() {
        let events = Arc::new(EventBus::new(16));
        let mut rx = events.subscribe();
        let ctl = SkipButtonController::new(SkipButtonConfig::default(), events);

        // A stale timer for "intro" fires after "recap" took over the button
        ctl.show(&segment("recap", SegmentType::Recap), 25.0).await;
        let _ = rx.try_recv();

        assert!(ctl
            .hide_if("intro", HideReason::Timeout, 26.0)
            .await
            .is_none());
        assert!(ctl.is_visible().await);
        assert_eq!(ctl.visible_segment_id().await.as_deref(), Some("recap"));
        // No hidden event leaked
        assert!(rx.try_recv().is_err());

        // The matching id still hides
        assert_eq!(
            ctl.hide_if("recap", HideReason::Timeout, 26.0)
                .await
                .unwrap()
                .id,
            "recap"
        );
    }

    #[tokio::test]
    async fn test_hide_when_hidden_is_noop() {
        let events = Arc::new(EventBus::new(16));
        let mut rx = events.subscribe();
        let ctl = SkipButtonController::new(SkipButtonConfig::default(), events);

        assert!(ctl.hide(HideReason::Manual, 0.0).await.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_countdown_ticks_to_zero() {
        let ctl = controller();
        ctl.begin_countdown(3.0).await;
        assert!(ctl.countdown_active().await);

        assert_eq!(ctl.tick_countdown().await, Some(2.0));
        assert_eq!(ctl.tick_countdown().await, Some(1.0));
        assert_eq!(ctl.tick_countdown().await, Some(0.0));
        // Floors at zero
        assert_eq!(ctl.tick_countdown().await, Some(0.0));
    }

    #[tokio::test]
    async fn test_tick_without_countdown_is_none() {
        let ctl = controller();
        assert_eq!(ctl.tick_countdown().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_timers_cancels_previous() {
        let ctl = controller();
        let fired = Arc::new(AtomicBool::new(false));

        let handle = {
            let fired = fired.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                fired.store(true, Ordering::SeqCst);
            })
        };
        ctl.install_timers(Some(handle), None, None);

        // A new segment's timers replace (and abort) the old trio
        ctl.install_timers(None, None, None);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_timers_aborts_all() {
        let ctl = controller();
        let fired = Arc::new(AtomicBool::new(false));

        let mk = |fired: Arc<AtomicBool>| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                fired.store(true, Ordering::SeqCst);
            })
        };
        ctl.install_timers(
            Some(mk(fired.clone())),
            Some(mk(fired.clone())),
            Some(mk(fired.clone())),
        );
        ctl.cancel_timers();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_auto_hide_disabled_when_zero() {
        let ctl = SkipButtonController::new(
            SkipButtonConfig {
                auto_hide_ms: 0,
                ..Default::default()
            },
            Arc::new(EventBus::new(16)),
        );
        assert!(ctl.auto_hide_delay().is_none());
    }
}
