//! Segment boundary tracking
//!
//! Detects when the playback position crosses from one segment to another
//! (or into/out of the gaps between them) and reports the transition as an
//! exit/enter pair. Exit is always reported strictly before the paired
//! enter, even when moving directly between two segments with no gap tick
//! in between.

use playgate_common::timeline::Segment;

use super::index::TimelineIndex;

/// One detected boundary crossing
///
/// `exited` and `entered` are both optional: a crossing out of all segments
/// has no `entered`, a crossing from a gap has no `exited`. At least one is
/// always present.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTransition {
    pub exited: Option<Segment>,
    pub entered: Option<Segment>,
}

/// Current-segment state machine
///
/// Fed the time signal on every tick and on every seek. Idempotent with
/// respect to redundant ticks: repeated positions inside one segment produce
/// no transitions. The first observation of a segment does report an enter
/// (the UI must react to the segment the playhead starts inside).
#[derive(Debug, Default)]
pub struct SegmentTracker {
    /// Id of the segment the playhead was last seen inside
    current_id: Option<String>,

    /// Cached index of that segment for the linear-advance hot path
    cached_index: Option<usize>,
}

impl SegmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the current segment, if any
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Forget all state (timeline reload, teardown)
    pub fn reset(&mut self) {
        self.current_id = None;
        self.cached_index = None;
    }

    /// Process a time signal and report any boundary crossing
    ///
    /// Segments are compared by id, so replacing the timeline with an
    /// equivalent one does not synthesize spurious transitions.
    pub fn advance(&mut self, index: &TimelineIndex, t: f64) -> Option<SegmentTransition> {
        // Hot path: still inside the cached segment
        if let (Some(i), Some(current_id)) = (self.cached_index, self.current_id.as_deref()) {
            if let Some(cached) = index.segments().get(i) {
                if cached.id == current_id && cached.contains(t) {
                    return None;
                }
            }
        }

        let new_index = index.query_index(t);
        let new_segment = new_index.map(|i| &index.segments()[i]);

        let same = match (self.current_id.as_deref(), new_segment) {
            (Some(a), Some(b)) => a == b.id,
            (None, None) => true,
            _ => false,
        };
        if same {
            self.cached_index = new_index;
            return None;
        }

        let exited = self
            .current_id
            .take()
            .and_then(|id| index.segment(&id).cloned());
        let entered = new_segment.cloned();

        self.current_id = entered.as_ref().map(|s| s.id.clone());
        self.cached_index = new_index;

        Some(SegmentTransition { exited, entered })
    }
}
