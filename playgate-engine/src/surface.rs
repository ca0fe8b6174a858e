//! Playback surface abstraction
//!
//! The engine never touches a concrete player element. Everything it needs
//! from the underlying video surface is expressed here; the host player
//! provides the implementation.
//!
//! `play()` is asynchronous and racy with `pause()` by platform contract.
//! Only the play/pause coordinator may call the start/stop primitives
//! directly; every other component routes through it.

use async_trait::async_trait;

use playgate_common::PlayError;

/// How much of the media the surface has buffered
///
/// Mirrors the HTML media element readiness ladder. Ordering is meaningful:
/// a state compares greater than every state before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// No information about the media yet
    HaveNothing,
    /// Duration and dimensions known
    HaveMetadata,
    /// Data for the current position available
    HaveCurrentData,
    /// Enough data to advance at least a little
    HaveFutureData,
    /// Enough data to play through without stalling
    HaveEnoughData,
}

impl ReadyState {
    /// Whether an immediate pause is safe at this readiness level
    pub fn can_pause_safely(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// Externally-owned playback surface
///
/// All methods except `play()` are synchronous and best-effort; `seek` and
/// `pause` take effect on the surface's own schedule. `play()` settles when
/// the underlying start attempt resolves or is rejected.
#[async_trait]
pub trait PlaybackSurface: Send + Sync {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Total media duration in seconds
    fn duration(&self) -> f64;

    /// Move the playhead to `position` (seconds)
    fn seek(&self, position: f64);

    /// Begin playback; settles when the start attempt resolves
    async fn play(&self) -> std::result::Result<(), PlayError>;

    /// Stop playback immediately
    fn pause(&self);

    /// Whether the surface is currently paused
    fn is_paused(&self) -> bool;

    /// Current buffering readiness
    fn ready_state(&self) -> ReadyState;
}
