//! Render command implementation.
//!
//! The render command:
//! 1. Loads the report bundle
//! 2. Opens a session at the requested zoom
//! 3. Aggregates the selected range into a flame graph
//! 4. Optionally runs a search over every bucket
//! 5. Writes the flame graph JSON and prints a summary

use super::models::RenderArgs;
use crate::flamegraph::{flame_text_summary, FlameGraph, FlameLevel};
use crate::output::{read_report, write_flame_json, FlameDocument};
use crate::report::{RenderSink, Session};
use crate::search::SearchSummary;
use crate::utils::config::SessionConfig;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Sink that reports progress through the log
struct ProgressSink;

impl RenderSink for ProgressSink {
    fn flame_level(&mut self, depth: usize, level: &FlameLevel) {
        debug!("Depth {} ready: {} frames", depth, level.len());
    }

    fn flame_complete(&mut self, graph: &FlameGraph) {
        info!("Flame graph complete: {} levels", graph.depth());
    }

    fn search_finished(&mut self, summary: &SearchSummary) {
        info!(
            "Search '{}': {} of {} samples ({}%)",
            summary.pattern, summary.matched, summary.total, summary.percentage
        );
    }
}

/// Execute the render command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Unreadable or malformed report bundle
/// * Zoom level or bucket range out of bounds
/// * File write errors
pub fn execute_render(args: RenderArgs) -> Result<FlameDocument> {
    let start_time = Instant::now();

    info!("Step 1/5: Loading report: {}", args.report.display());
    let bundle = read_report(&args.report).context("Failed to load report bundle")?;

    info!("Step 2/5: Opening session at zoom {}...", args.zoom);
    let config = SessionConfig::new()
        .with_budget(Duration::from_millis(args.budget_ms))
        .with_initial_zoom(args.zoom);
    let mut session = Session::open(&bundle, config, Box::new(ProgressSink))
        .context("Failed to open report")?;

    let buckets = session.index().bucket_count();
    let to = args.to.unwrap_or_else(|| buckets.saturating_sub(1));
    info!(
        "Step 3/5: Aggregating buckets {}..={} of {}...",
        args.from, to, buckets
    );
    session
        .render_traces(args.from, to)
        .context("Failed to select bucket range")?;
    let ticks = session.run_until_idle();
    debug!("Flame graph built in {} ticks", ticks);

    if let Some(pattern) = &args.search {
        info!("Step 4/5: Searching for '{}'...", pattern);
        if let Err(e) = session.search(pattern) {
            warn!("{}; nothing will match", e);
        }
        session.run_until_idle();
    } else {
        info!("Step 4/5: Skipping search (no pattern)");
    }

    info!("Step 5/5: Writing output...");
    let document = FlameDocument::new(session.flame(), args.from, to, args.zoom)
        .with_search(session.search_state().summary.clone());

    if let Some(path) = &args.output_json {
        write_flame_json(&document, path).context("Failed to write flame graph JSON")?;
        info!("✓ Flame graph written to: {}", path.display());
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("FLAME GRAPH");
        println!("{}", "=".repeat(80));
        println!("Report:  {}", args.report.display());
        println!("Buckets: {}..={} (zoom {})", args.from, to, args.zoom);
        println!("Samples: {}", document.total);
        if let Some(search) = &document.search {
            println!("Search:  '{}' matched {}%", search.pattern, search.percentage);
        }
        println!("\n{}", flame_text_summary(session.flame(), args.frames_per_depth));
        println!("{}", "=".repeat(80));
    }

    info!(
        "Render completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(document)
}

/// Validate render arguments
///
/// **Public** - can be called before execute_render for early validation
pub fn validate_args(args: &RenderArgs) -> Result<()> {
    if args.report.as_os_str().is_empty() {
        anyhow::bail!("Report path cannot be empty");
    }

    if let Some(to) = args.to {
        if to < args.from {
            anyhow::bail!("Range end {} is before range start {}", to, args.from);
        }
    }

    if args.frames_per_depth == 0 {
        anyhow::bail!("frames_per_depth must be greater than 0");
    }

    if args.frames_per_depth > 100 {
        anyhow::bail!("frames_per_depth is too large (max 100)");
    }

    Ok(())
}
