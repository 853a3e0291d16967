//! JSON flame graph export and report bundle loading.
//!
//! Writes `FlameDocument`s to JSON files with pretty formatting and reads
//! report bundles back from disk.

use crate::flamegraph::levels::{FlameGraph, FlameLevel};
use crate::report::bundle::ReportBundle;
use crate::search::engine::SearchSummary;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Exported flame graph of one selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameDocument {
    pub version: String,
    /// ISO 8601 creation time
    pub generated_at: String,
    /// Selected fine buckets, inclusive
    pub from: usize,
    pub to: usize,
    pub zoom: usize,
    pub total: u64,
    pub complete: bool,
    pub levels: Vec<FlameLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSummary>,
}

impl FlameDocument {
    pub fn new(graph: &FlameGraph, from: usize, to: usize, zoom: usize) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            from,
            to,
            zoom,
            total: graph.total,
            complete: graph.complete,
            levels: graph.levels.clone(),
            search: None,
        }
    }

    pub fn with_search(mut self, summary: Option<SearchSummary>) -> Self {
        self.search = summary;
        self
    }
}

/// Write a flame document to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_flame_json(
    document: &FlameDocument,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing flame graph to: {}", output_path.display());
    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)
        .map_err(OutputError::SerializationFailed)?;

    info!(
        "Flame graph written successfully ({} bytes)",
        calculate_file_size(output_path)
    );
    Ok(())
}

/// Read a flame document back from JSON
///
/// **Public** - used by tests and downstream tooling
pub fn read_flame_json(input_path: impl AsRef<Path>) -> Result<FlameDocument, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading flame graph from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::ReadFailed)?;
    let document: FlameDocument =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Flame graph loaded: version {}, {} levels",
        document.version,
        document.levels.len()
    );
    Ok(document)
}

/// Load a report bundle from JSON
///
/// **Public** - entry point of every command
pub fn read_report(input_path: impl AsRef<Path>) -> Result<ReportBundle, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading report bundle from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::ReadFailed)?;
    let bundle: ReportBundle =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Report bundle loaded: heatmap {} bytes, {} constants",
        bundle.heatmap.len(),
        bundle.cpool.len()
    );
    Ok(bundle)
}

/// Store a report bundle as JSON
pub fn write_report(bundle: &ReportBundle, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    serde_json::to_writer(BufWriter::new(file), bundle).map_err(OutputError::SerializationFailed)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
