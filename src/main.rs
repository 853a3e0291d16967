//! heatmap-flame CLI
//!
//! Inspects profiling report bundles and renders flame graphs for selected
//! bucket ranges.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use heatmap_flame::commands::{
    display_inspect, display_version, execute_inspect, execute_render, validate_args, RenderArgs,
};
use std::path::PathBuf;

/// heatmap-flame - flame graphs from sampled-profile heatmaps
#[derive(Parser, Debug)]
#[command(name = "heatmap-flame")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a flame graph for a range of buckets
    Render {
        /// Report bundle JSON
        #[arg(short, long)]
        report: PathBuf,

        /// First bucket of the selection
        #[arg(long, default_value = "0")]
        from: usize,

        /// Last bucket of the selection (defaults to the last bucket)
        #[arg(long)]
        to: Option<usize>,

        /// Zoom level the range refers to (0 = finest)
        #[arg(short, long, default_value = "0")]
        zoom: usize,

        /// Regex to search for in frame titles
        #[arg(short, long)]
        search: Option<String>,

        /// Output path for the flame graph JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Frames listed per depth in the summary
        #[arg(long, default_value = "3")]
        frames_per_depth: usize,

        /// Scheduler time slice in milliseconds
        #[arg(long, default_value = "10", env = "HEATMAP_FLAME_BUDGET_MS")]
        budget_ms: u64,
    },

    /// Show the shape of a report bundle
    Inspect {
        /// Report bundle JSON
        #[arg(short, long)]
        report: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Render {
            report,
            from,
            to,
            zoom,
            search,
            output,
            summary,
            frames_per_depth,
            budget_ms,
        } => {
            let args = RenderArgs {
                report,
                from,
                to,
                zoom,
                search,
                output_json: output,
                print_summary: summary,
                frames_per_depth,
                budget_ms,
            };

            validate_args(&args)?;
            execute_render(args)?;
        }

        Commands::Inspect { report, json } => {
            let inspected = execute_inspect(&report)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inspected)?);
            } else {
                display_inspect(&inspected);
            }
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
