//! Scriptable playback surface and overlay mocks

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use playgate_common::timeline::{Segment, SegmentType, Timeline};
use playgate_common::PlayError;
use playgate_engine::{PlaybackSurface, ReadyState};

/// Scriptable playback surface
///
/// Records every seek, play and pause; `play()` optionally sleeps to model
/// an asynchronous start and can be scripted to fail.
pub struct MockSurface {
    state: Mutex<SurfaceState>,
    play_delay: Duration,
}

struct SurfaceState {
    time: f64,
    paused: bool,
    ready: ReadyState,
    seeks: Vec<f64>,
    play_calls: u32,
    pause_calls: u32,
    play_results: VecDeque<PlayError>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::with_play_delay(Duration::ZERO)
    }

    /// Surface whose `play()` takes `delay` to settle
    pub fn with_play_delay(delay: Duration) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                time: 0.0,
                paused: true,
                ready: ReadyState::HaveEnoughData,
                seeks: Vec::new(),
                play_calls: 0,
                pause_calls: 0,
                play_results: VecDeque::new(),
            }),
            play_delay: delay,
        }
    }

    pub fn set_time(&self, t: f64) {
        self.state.lock().unwrap().time = t;
    }

    pub fn set_ready(&self, ready: ReadyState) {
        self.state.lock().unwrap().ready = ready;
    }

    pub fn set_playing(&self) {
        self.state.lock().unwrap().paused = false;
    }

    /// Queue a failure for the next `play()` call
    pub fn fail_next_play(&self, err: PlayError) {
        self.state.lock().unwrap().play_results.push_back(err);
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn play_calls(&self) -> u32 {
        self.state.lock().unwrap().play_calls
    }

    pub fn pause_calls(&self) -> u32 {
        self.state.lock().unwrap().pause_calls
    }
}

impl Default for MockSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackSurface for MockSurface {
    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    fn duration(&self) -> f64 {
        600.0
    }

    fn seek(&self, position: f64) {
        let mut state = self.state.lock().unwrap();
        state.seeks.push(position);
        state.time = position;
    }

    async fn play(&self) -> Result<(), PlayError> {
        self.state.lock().unwrap().play_calls += 1;
        if !self.play_delay.is_zero() {
            tokio::time::sleep(self.play_delay).await;
        }
        let scripted = self.state.lock().unwrap().play_results.pop_front();
        match scripted {
            Some(err) => Err(err),
            None => {
                self.state.lock().unwrap().paused = false;
                Ok(())
            }
        }
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.paused = true;
        state.pause_calls += 1;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().unwrap().ready
    }
}

/// Access overlay with removable presence
///
/// `remove()` models a tampered-away overlay; `restorable` controls whether
/// `show()` succeeds in bringing it back.
pub struct MockOverlay {
    present: AtomicBool,
    restorable: bool,
    lockout: Mutex<Option<String>>,
}

impl MockOverlay {
    pub fn new() -> Self {
        Self::with_restorable(true)
    }

    pub fn with_restorable(restorable: bool) -> Self {
        Self {
            present: AtomicBool::new(false),
            restorable,
            lockout: Mutex::new(None),
        }
    }

    /// Tamper: remove the overlay out from under the engine
    pub fn remove(&self) {
        self.present.store(false, Ordering::SeqCst);
    }

    pub fn lockout_message(&self) -> Option<String> {
        self.lockout.lock().unwrap().clone()
    }
}

impl Default for MockOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl playgate_engine::AccessOverlay for MockOverlay {
    fn show(&self) {
        if self.restorable {
            self.present.store(true, Ordering::SeqCst);
        }
    }

    fn hide(&self) {
        self.present.store(false, Ordering::SeqCst);
    }

    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn show_lockout(&self, message: &str) {
        *self.lockout.lock().unwrap() = Some(message.to_string());
    }
}

/// Segment fixture with everything optional left unset
pub fn segment(id: &str, ty: SegmentType, start: f64, end: f64) -> Segment {
    Segment {
        id: id.to_string(),
        segment_type: ty,
        start_time: start,
        end_time: end,
        title: None,
        skip_label: None,
        auto_skip: None,
        auto_skip_delay: None,
        show_skip_button: None,
    }
}

/// Timeline fixture over a 600 s media
pub fn timeline(segments: Vec<Segment>) -> Timeline {
    Timeline {
        media_id: "media-1".to_string(),
        duration: 600.0,
        segments,
    }
}
