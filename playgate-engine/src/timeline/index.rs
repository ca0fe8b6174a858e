//! Segment timeline index
//!
//! Immutable, time-ordered table of labeled intervals over the media
//! duration. Validated and sorted once at load; replaced atomically on
//! reload. A failed load leaves the previous timeline untouched.

use tracing::info;

use playgate_common::timeline::{Segment, SegmentType, Timeline};
use playgate_common::{Error, Result};

/// Validated, sorted segment table
///
/// Query is a linear scan over segments sorted by start time; timelines are
/// small (tens of segments), so no search structure is warranted. Ties on
/// identical start times keep declaration order (stable sort).
#[derive(Debug, Default)]
pub struct TimelineIndex {
    timeline: Option<Timeline>,
}

impl TimelineIndex {
    pub fn new() -> Self {
        Self { timeline: None }
    }

    /// Validate and install a new timeline, replacing any previous one
    ///
    /// On validation failure the previous timeline (if any) is retained.
    pub fn load(&mut self, mut timeline: Timeline) -> Result<()> {
        validate(&timeline)?;

        timeline
            .segments
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        info!(
            media_id = %timeline.media_id,
            segments = timeline.segments.len(),
            "timeline loaded"
        );
        self.timeline = Some(timeline);
        Ok(())
    }

    /// Drop the current timeline
    pub fn clear(&mut self) {
        self.timeline = None;
    }

    /// Whether a timeline is currently loaded
    pub fn has_timeline(&self) -> bool {
        self.timeline.is_some()
    }

    /// Media identifier of the loaded timeline
    pub fn media_id(&self) -> Option<&str> {
        self.timeline.as_ref().map(|t| t.media_id.as_str())
    }

    /// Duration of the loaded timeline in seconds
    pub fn duration(&self) -> Option<f64> {
        self.timeline.as_ref().map(|t| t.duration)
    }

    /// All segments, sorted by start time
    pub fn segments(&self) -> &[Segment] {
        self.timeline
            .as_ref()
            .map(|t| t.segments.as_slice())
            .unwrap_or(&[])
    }

    /// Index of the first segment containing `t`, in ascending start order
    pub fn query_index(&self, t: f64) -> Option<usize> {
        self.segments().iter().position(|s| s.contains(t))
    }

    /// First segment (ascending start order) for which `start <= t < end`
    pub fn query(&self, t: f64) -> Option<&Segment> {
        self.query_index(t).map(|i| &self.segments()[i])
    }

    /// Segment by id
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments().iter().find(|s| s.id == id)
    }

    /// All segments of the given kind
    pub fn segments_by_type(&self, ty: &SegmentType) -> Vec<&Segment> {
        self.segments()
            .iter()
            .filter(|s| &s.segment_type == ty)
            .collect()
    }

    /// First content segment strictly after the given segment, in timeline
    /// order
    ///
    /// This is the skip target: skipping a non-content segment lands on the
    /// next content segment's start, or the skipped segment's end when no
    /// content follows.
    pub fn next_content_segment_after(&self, id: &str) -> Option<&Segment> {
        let segments = self.segments();
        let current = segments.iter().position(|s| s.id == id)?;
        segments[current + 1..]
            .iter()
            .find(|s| s.segment_type.is_content())
    }
}

/// Validate timeline invariants
///
/// Returns a `Validation` error naming the offending segment index.
fn validate(timeline: &Timeline) -> Result<()> {
    if timeline.media_id.is_empty() {
        return Err(Error::Validation {
            index: None,
            reason: "timeline must have a media id".to_string(),
        });
    }

    if !(timeline.duration > 0.0) {
        return Err(Error::Validation {
            index: None,
            reason: format!("duration must be positive, got {}", timeline.duration),
        });
    }

    for (i, segment) in timeline.segments.iter().enumerate() {
        if segment.id.is_empty() {
            return Err(Error::Validation {
                index: Some(i),
                reason: format!("segment {} must have an id", i),
            });
        }

        if matches!(&segment.segment_type, SegmentType::Custom(name) if name.is_empty()) {
            return Err(Error::Validation {
                index: Some(i),
                reason: format!("segment {} must have a non-empty type", i),
            });
        }

        if segment.start_time < 0.0 || segment.end_time <= segment.start_time {
            return Err(Error::Validation {
                index: Some(i),
                reason: format!(
                    "segment {} has invalid time range {}..{}",
                    i, segment.start_time, segment.end_time
                ),
            });
        }

        if segment.end_time > timeline.duration {
            return Err(Error::Validation {
                index: Some(i),
                reason: format!("segment {} extends beyond media duration", i),
            });
        }
    }

    Ok(())
}
