//! # Playgate Common Library
//!
//! Shared code for the playgate workspace:
//! - Timeline model types (Segment, SegmentType, Timeline)
//! - Event types (PlayerEvent enum) and EventBus
//! - Error taxonomy (Error, PlayError)
//! - User preferences

pub mod error;
pub mod events;
pub mod prefs;
pub mod timeline;

pub use error::{Error, PlayError, Result};
pub use events::{EventBus, HideReason, PlayerEvent, SkipMethod};
pub use prefs::UserPreferences;
pub use timeline::{Segment, SegmentType, Timeline};
