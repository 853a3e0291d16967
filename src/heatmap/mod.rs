//! Sample buckets at several time resolutions.
//!
//! This module handles:
//! - Discovering zoom levels from the buffer trailer
//! - Range queries that prefer coarse buckets
//! - Per-bucket decoding contexts and search weights
//! - Normalised heat cells for display

pub mod cells;
pub mod index;

// Re-export main types
pub use cells::{HeatCell, SearchOverlay};
pub use index::{BucketRef, HeatmapIndex, ZoomLevel};
