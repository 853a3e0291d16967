//! Inspect command implementation.
//!
//! Decodes the shared structures of a bundle and reports the shape of every
//! zoom level without decoding any bucket's stacks.

use super::models::{InspectReport, ZoomSummary};
use crate::heatmap::HeatmapIndex;
use crate::output::read_report;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Execute the inspect command
///
/// **Public** - main entry point called from main.rs
pub fn execute_inspect(report: &Path) -> Result<InspectReport> {
    info!("Inspecting report: {}", report.display());
    let bundle = read_report(report).context("Failed to load report bundle")?;

    let forest = bundle
        .decode_forest()
        .context("Failed to decode global stacks")?;
    let stacks = forest.stack_count();
    let forest_nodes = forest.node_count();

    let mut index = HeatmapIndex::new(bundle.heatmap_stream(), Arc::new(forest))
        .context("Failed to open heatmap")?;
    let mut zooms = Vec::with_capacity(index.max_zoom() + 1);
    for zoom in 0..=index.max_zoom() {
        let level = index
            .heatmap(zoom)
            .with_context(|| format!("Failed to read zoom level {}", zoom))?;
        zooms.push(ZoomSummary {
            zoom,
            buckets: level.len(),
            group_size: level.group_size,
            max_total: level.max_total,
            total: level.totals.iter().sum(),
        });
    }

    Ok(InspectReport {
        stacks,
        forest_nodes,
        methods: bundle.method_table().len(),
        constants: bundle.cpool.len(),
        started_at: bundle.started_at().map(|t| t.to_rfc3339()),
        ticks_per_second: bundle.ticks_per_second,
        zooms,
    })
}
