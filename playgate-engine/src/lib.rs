//! # Playgate Control Engine (playgate-engine)
//!
//! Timeline-driven playback gating and segment control for a video player.
//!
//! **Purpose:** Observe the playback clock and drive the cooperating state
//! machines built on top of it: segment enter/exit detection, skip-button
//! lifecycle, free-preview access gating, paywall integrity enforcement,
//! and race-free coordination of asynchronous play/pause requests.
//!
//! **Architecture:** Event-driven tokio components wired together by
//! [`engine::ControlEngine`]. The playback surface and the access-control
//! overlay are external collaborators reached only through the
//! [`surface::PlaybackSurface`] and [`overlay::AccessOverlay`] traits.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod gate;
pub mod integrity;
pub mod overlay;
pub mod skip;
pub mod surface;
pub mod timeline;

pub use playgate_common::{Error, PlayError, Result};

pub use config::EngineConfig;
pub use coordinator::PlayOutcome;
pub use engine::ControlEngine;
pub use overlay::AccessOverlay;
pub use surface::{PlaybackSurface, ReadyState};
