use super::models::InspectReport;
use crate::utils::config::SCHEMA_VERSION;

/// Print an inspect report as a table
pub fn display_inspect(report: &InspectReport) {
    println!("Report");
    println!("  Started:        {}", report.started_at.as_deref().unwrap_or("unknown"));
    println!("  Ticks/second:   {}", report.ticks_per_second);
    println!("  Global stacks:  {} ({} nodes)", report.stacks, report.forest_nodes);
    println!("  Methods:        {}", report.methods);
    println!("  Constants:      {}", report.constants);
    println!();
    println!("  {:>4}  {:>10}  {:>10}  {:>12}  {:>12}", "ZOOM", "BUCKETS", "GROUP", "MAX", "TOTAL");
    for zoom in &report.zooms {
        println!(
            "  {:>4}  {:>10}  {:>10}  {:>12}  {:>12}",
            zoom.zoom, zoom.buckets, zoom.group_size, zoom.max_total, zoom.total
        );
    }
}

/// Display version information
pub fn display_version() {
    println!("heatmap-flame v{}", env!("CARGO_PKG_VERSION"));
    println!("Flame Document Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Decodes sampled-profile heatmaps and builds flame graphs incrementally.");
}
