//! Output writers and readers.
//!
//! This module handles:
//! - Flame graph JSON documents
//! - Report bundle JSON files

pub mod json;

// Re-export main functions
pub use json::{read_flame_json, read_report, write_flame_json, write_report, FlameDocument};
