//! Timeline index and segment boundary tracking

pub mod index;
pub mod tracker;

pub use index::TimelineIndex;
pub use tracker::{SegmentTracker, SegmentTransition};
