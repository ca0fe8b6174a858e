//! Test helper modules for playgate-engine integration tests
//!
//! Provides reusable test infrastructure:
//! - MockSurface: scriptable playback surface recording calls
//! - MockOverlay: access overlay with removable presence
//! - Timeline builders for common fixtures

pub mod mock_player;

pub use mock_player::{segment, timeline, MockOverlay, MockSurface};
