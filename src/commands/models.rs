use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the render command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RenderArgs {
    /// Report bundle to open
    pub report: PathBuf,

    /// First selected bucket
    pub from: usize,

    /// Last selected bucket (None = last bucket of the zoom level)
    pub to: Option<usize>,

    /// Zoom level the range refers to
    pub zoom: usize,

    /// Optional regex to search for
    pub search: Option<String>,

    /// Output path for the flame graph JSON (optional)
    pub output_json: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,

    /// Frames listed per depth in the summary
    pub frames_per_depth: usize,

    /// Scheduler time slice in milliseconds
    pub budget_ms: u64,
}

impl Default for RenderArgs {
    fn default() -> Self {
        Self {
            report: PathBuf::from("report.json"),
            from: 0,
            to: None,
            zoom: 0,
            search: None,
            output_json: Some(PathBuf::from("flame.json")),
            print_summary: false,
            frames_per_depth: 3,
            budget_ms: 10,
        }
    }
}

/// Shape of one zoom level as reported by `inspect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoomSummary {
    pub zoom: usize,
    pub buckets: usize,
    pub group_size: u32,
    pub max_total: u64,
    pub total: u64,
}

/// Everything `inspect` reports about a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub stacks: usize,
    pub forest_nodes: usize,
    pub methods: usize,
    pub constants: usize,
    pub started_at: Option<String>,
    pub ticks_per_second: u64,
    /// Finest level first
    pub zooms: Vec<ZoomSummary>,
}
