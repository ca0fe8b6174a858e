//! User preferences for skip behavior
//!
//! Preferences are owned by an external collaborator (typically the host
//! player's settings storage) and merged over built-in defaults at engine
//! construction. The engine itself persists nothing.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timeline::SegmentType;

/// Stable key under which an external store persists [`UserPreferences`]
pub const PREFERENCES_STORAGE_KEY: &str = "playgate.user-preferences";

/// Per-user skip behavior preferences
///
/// Missing fields deserialize to the built-in defaults, so stored blobs from
/// older versions merge cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    /// Master switch for skip-button visibility
    pub show_skip_buttons: bool,

    /// Auto-skip intro segments when the segment opts in
    pub auto_skip_intro: bool,

    /// Auto-skip recap segments when the segment opts in
    pub auto_skip_recap: bool,

    /// Auto-skip credits segments when the segment opts in
    pub auto_skip_credits: bool,

    /// Resume playback after a skip seek if the surface was playing
    pub resume_after_skip: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            show_skip_buttons: true,
            auto_skip_intro: false,
            auto_skip_recap: false,
            auto_skip_credits: false,
            resume_after_skip: true,
        }
    }
}

impl UserPreferences {
    /// Whether auto-skip is enabled for the given segment kind
    ///
    /// Only intro, recap and credits segments have auto-skip preferences;
    /// all other kinds never auto-skip.
    pub fn auto_skip_enabled(&self, segment_type: &SegmentType) -> bool {
        match segment_type {
            SegmentType::Intro => self.auto_skip_intro,
            SegmentType::Recap => self.auto_skip_recap,
            SegmentType::Credits => self.auto_skip_credits,
            _ => false,
        }
    }
}

/// Persistence capability provided by an external preferences collaborator
///
/// Implementations load at construction and save on change, keyed by
/// [`PREFERENCES_STORAGE_KEY`].
pub trait PreferencesStore: Send + Sync {
    /// Load stored preferences, or `None` when nothing was persisted yet
    fn load(&self) -> Result<Option<UserPreferences>>;

    /// Persist the given preferences
    fn save(&self, prefs: &UserPreferences) -> Result<()>;
}
