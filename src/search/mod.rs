//! Regex search weighted by samples.

pub mod engine;
pub mod matcher;

// Re-export main types
pub use engine::{SearchState, SearchSummary, SearchTask};
pub use matcher::MethodMatcher;
