// ABOUTME: Validated domain types shared by config and the deploy pipelines.
// ABOUTME: Uses phantom types to keep release labels and link names apart.

mod segment;

pub use segment::{
    DirMarker, DirName, LinkMarker, LinkName, ReleaseLabel, ReleaseMarker, Segment, SegmentError,
};
