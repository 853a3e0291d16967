//! Decoding primitives for the encoded report buffers.
//!
//! This module handles:
//! - The printable-character byte stream and its VarInt / fixed-width fields
//! - Run-length expansion of zero runs
//! - LZ78-style dictionary reconstruction of shared-prefix arrays
//! - Method records and frame titles

pub mod buffer;
pub mod dictionary;
pub mod methods;
pub mod rle;

// Re-export main types
pub use buffer::{ByteStream, VarIntSource};
pub use dictionary::{DictionaryReader, DictionaryTable, EntryId, EMPTY_ENTRY};
pub use methods::{FrameKey, MethodId, MethodInfo, MethodTable};
pub use rle::RleReader;
