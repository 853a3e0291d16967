//! The encoded buffers of one profiling report.
//!
//! A report bundle carries every buffer a viewer needs: the heatmap, the
//! global stacks, the method records and the constant pool, plus the
//! recording's start time.

use crate::parser::buffer::ByteStream;
use crate::parser::methods::MethodTable;
use crate::parser::rle::RleReader;
use crate::stacks::forest::GlobalStackForest;
use crate::utils::error::DecodeResult;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Layout of the global stacks buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackEncoding {
    /// Breadth-first `(method, child count)` pairs per root
    #[default]
    Tree,
    /// One dictionary-compressed method array per stack
    Dictionary,
}

/// Encoded report as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub heatmap: String,
    pub global_stacks: String,
    #[serde(default)]
    pub stack_encoding: StackEncoding,
    /// Global stacks are wrapped in zero-run compression
    #[serde(default)]
    pub rle: bool,
    pub methods: String,
    #[serde(default)]
    pub cpool: Vec<String>,
    /// Wall-clock start of the recording, in milliseconds since the epoch
    #[serde(default)]
    pub start_ms: i64,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u64,
}

fn default_ticks_per_second() -> u64 {
    1
}

impl ReportBundle {
    /// Decode the global stack forest
    pub fn decode_forest(&self) -> DecodeResult<GlobalStackForest> {
        let mut stream = ByteStream::from(self.global_stacks.as_str());
        match (self.stack_encoding, self.rle) {
            (StackEncoding::Tree, false) => GlobalStackForest::decode_tree(&mut stream),
            (StackEncoding::Tree, true) => {
                GlobalStackForest::decode_tree(&mut RleReader::new(stream))
            }
            (StackEncoding::Dictionary, false) => {
                GlobalStackForest::decode_dictionary(&mut stream)
            }
            (StackEncoding::Dictionary, true) => {
                GlobalStackForest::decode_dictionary(&mut RleReader::new(stream))
            }
        }
    }

    pub fn method_table(&self) -> MethodTable {
        MethodTable::new(ByteStream::from(self.methods.as_str()), self.cpool.clone())
    }

    pub fn heatmap_stream(&self) -> ByteStream {
        ByteStream::from(self.heatmap.as_str())
    }

    /// Recording start as a UTC timestamp
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_ms).single()
    }
}
