//! Timeline model types
//!
//! A [`Timeline`] is an immutable, time-ordered table of labeled intervals
//! ([`Segment`]s) over the media duration. Timelines are loaded inline or
//! fetched as JSON; the wire format uses camelCase field names.
//!
//! Segments are not required to be non-overlapping (ad markers may coincide
//! with content boundaries); interval queries resolve to the first match in
//! ascending start-time order.

use serde::{Deserialize, Serialize};

/// Kind of labeled interval over the media
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Intro,
    Recap,
    Content,
    Credits,
    Ad,
    Offensive,
    /// Free-form producer-defined segment kind
    #[serde(untagged)]
    Custom(String),
}

impl SegmentType {
    /// Content segments are the skip targets; everything else is skippable
    pub fn is_content(&self) -> bool {
        matches!(self, SegmentType::Content)
    }

    /// Default skip-button label for this segment kind
    pub fn default_skip_label(&self) -> &str {
        match self {
            SegmentType::Intro => "Skip Intro",
            SegmentType::Recap => "Skip Recap",
            SegmentType::Credits => "Skip Credits",
            SegmentType::Ad => "Skip Ad",
            SegmentType::Offensive => "Skip Scene",
            SegmentType::Content | SegmentType::Custom(_) => "Skip",
        }
    }
}

impl std::fmt::Display for SegmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentType::Intro => write!(f, "intro"),
            SegmentType::Recap => write!(f, "recap"),
            SegmentType::Content => write!(f, "content"),
            SegmentType::Credits => write!(f, "credits"),
            SegmentType::Ad => write!(f, "ad"),
            SegmentType::Offensive => write!(f, "offensive"),
            SegmentType::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A labeled time interval within the media
///
/// Times are in seconds from media start. The interval is half-open:
/// a position `t` is inside the segment when `start_time <= t < end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Unique segment identifier
    pub id: String,

    /// Segment kind
    #[serde(rename = "type")]
    pub segment_type: SegmentType,

    /// Interval start (seconds, inclusive)
    pub start_time: f64,

    /// Interval end (seconds, exclusive)
    pub end_time: f64,

    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Custom skip-button label (falls back to the per-type default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_label: Option<String>,

    /// Whether this segment should auto-skip after a countdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_skip: Option<bool>,

    /// Countdown duration in seconds before auto-skip fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_skip_delay: Option<f64>,

    /// Per-segment skip-button override (None = per-type default policy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_skip_button: Option<bool>,
}

impl Segment {
    /// Whether playback position `t` falls inside this segment
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }

    /// Skip-button label, falling back to the per-type default
    pub fn effective_skip_label(&self) -> &str {
        self.skip_label
            .as_deref()
            .unwrap_or_else(|| self.segment_type.default_skip_label())
    }
}

/// Chapter/segment timeline for one piece of media
///
/// Owned exclusively by the timeline index; rebuilt wholesale on reload,
/// never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Stable media identifier
    #[serde(alias = "videoId")]
    pub media_id: String,

    /// Total media duration in seconds
    pub duration: f64,

    /// Labeled intervals, sorted by start time at load
    pub segments: Vec<Segment>,
}
