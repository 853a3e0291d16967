//! Configuration and constants for decoding and scheduling.

use std::time::Duration;

/// Character code of the smallest unit value in an encoded buffer ('?')
pub const PRINTABLE_OFFSET: u8 = 63;

/// Largest value a single unit may carry (6 bits)
pub const MAX_UNIT_VALUE: u8 = 0x3F;

// VarInt layout: 5 data bits per unit, bit 0x20 flags a following unit
pub const VARINT_DATA_MASK: u8 = 0x1F;
pub const VARINT_CONTINUATION: u8 = 0x20;
pub const VARINT_DATA_BITS: u32 = 5;

/// Enough units to carry a full 32-bit value
pub const VARINT_MAX_UNITS: usize = 7;

/// Bits carried by each unit of a fixed-width field
pub const FIXED_UNIT_BITS: u32 = 6;

/// Units in an `int30` fixed-width field (trailer offsets, sizes, counts)
pub const INT30_UNITS: usize = 5;

/// Units in an `int36` fixed-width field (method records)
pub const INT36_UNITS: usize = 6;

/// Units per method record: two `int36` fields
pub const METHOD_RECORD_UNITS: usize = 2 * INT36_UNITS;

/// Elements in a frozen dictionary block before a new block is chained
pub const DICTIONARY_BLOCK_CAPACITY: usize = 64;

/// Wall-clock budget for one scheduler tick
pub const DEFAULT_SCHEDULER_BUDGET: Duration = Duration::from_millis(10);

/// Task identifier of the flame aggregation
pub const FLAME_TASK: &str = "flame";

/// Task identifier of the search scan
pub const SEARCH_TASK: &str = "search";

/// Title of the synthetic root frame
pub const ROOT_TITLE: &str = "all";

/// Frame type reported for the synthetic root frame
pub const ROOT_FRAME_TYPE: u8 = 3;

/// Current flame document schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time budget of a single scheduler tick
    pub budget: Duration,

    /// Zoom level selected when the session opens
    pub initial_zoom: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_SCHEDULER_BUDGET,
            initial_zoom: 0,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_initial_zoom(mut self, zoom: usize) -> Self {
        self.initial_zoom = zoom;
        self
    }
}
