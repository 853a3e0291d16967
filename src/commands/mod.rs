//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod inspect;
pub mod models;
pub mod render;
pub mod utils;

// Re-export main command functions
pub use inspect::execute_inspect;
pub use models::{InspectReport, RenderArgs, ZoomSummary};
pub use render::{execute_render, validate_args};
pub use utils::{display_inspect, display_version};
