//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised while decoding an encoded buffer
///
/// Inside a single bucket these are not fatal for the whole view: the
/// bucket is rendered as empty and the rest of the selection proceeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("character {byte:#04x} at offset {offset} is outside the encoding alphabet")]
    InvalidByte { offset: usize, byte: u8 },

    #[error("varint at offset {offset} does not fit in 32 bits")]
    VarIntOverflow { offset: usize },

    #[error("dictionary index {index} is unknown (table has {table_len} entries)")]
    UnknownDictionaryIndex { index: u32, table_len: usize },

    #[error("stack id {id} is unknown (forest has {count} stacks)")]
    UnknownStack { id: u32, count: usize },

    #[error("method id {id} is unknown")]
    UnknownMethod { id: u32 },

    #[error("bad zoom trailer: {0}")]
    BadZoomTrailer(String),

    #[error("corrupt block at offset {offset}: {reason}")]
    CorruptBlock { offset: usize, reason: String },
}

/// Errors raised by queries against the heatmap index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("{what} index {index} out of range (valid: 0..{len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors raised when starting a search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors raised while opening a report session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to decode global stacks: {0}")]
    GlobalStacks(DecodeError),

    #[error("failed to open heatmap: {0}")]
    Heatmap(QueryError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to read file: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Result alias for the decoding layer
pub type DecodeResult<T> = Result<T, DecodeError>;
