//! Opened reports and the encoded bundles they come from.

pub mod bundle;
pub mod session;

// Re-export main types
pub use bundle::{ReportBundle, StackEncoding};
pub use session::{NullSink, RenderSink, Session, SessionState};
