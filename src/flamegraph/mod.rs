//! Flame graph aggregation over a selection of buckets.
//!
//! The aggregator merges bucket call trees depth by depth and produces
//! ordered rectangles per depth; the text summary renders them for terminals.

pub mod aggregator;
pub mod levels;
pub mod summary;

// Re-export main types
pub use aggregator::FlameAggregator;
pub use levels::{percentage, FlameGraph, FlameLevel, FlameRect};
pub use summary::flame_text_summary;
