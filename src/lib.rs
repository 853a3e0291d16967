//! heatmap-flame
//!
//! Decoding and incremental flame graph aggregation for sampled profiling
//! reports.
//!
//! A report embeds its samples in a compact printable encoding: a shared
//! forest of call stacks and a heatmap of time buckets at several zoom
//! levels. This crate decodes those buffers lazily, answers range queries
//! over buckets, and merges the selected buckets into a flame graph one
//! depth at a time on a cooperative scheduler, so a host stays responsive
//! while millions of samples are processed.
//!
//! ## Getting Started
//!
//! ```bash
//! heatmap-flame inspect --report report.json
//! heatmap-flame render --report report.json --from 0 --to 99 --summary
//! ```

pub mod commands;
pub mod flamegraph;
pub mod heatmap;
pub mod output;
pub mod parser;
pub mod report;
pub mod scheduler;
pub mod search;
pub mod stacks;
pub mod utils;
