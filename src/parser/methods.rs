//! Method records and display titles.
//!
//! Each method id (1-based) owns a record of two `int36` fields:
//! `method_symbol << 18 | class_symbol` and `location << 4 | frame_type`.
//! Symbol values index the constant pool plus one; 0 stands for "no symbol".

use super::buffer::ByteStream;
use serde::{Deserialize, Serialize};
use crate::utils::config::{INT36_UNITS, METHOD_RECORD_UNITS, ROOT_FRAME_TYPE, ROOT_TITLE};
use crate::utils::error::{DecodeError, DecodeResult};

/// Identifier of a method in the method table
pub type MethodId = u32;

const SYMBOL_BITS: u32 = 18;
const SYMBOL_MASK: u64 = (1 << SYMBOL_BITS) - 1;
const FRAME_TYPE_BITS: u32 = 4;
const FRAME_TYPE_MASK: u64 = (1 << FRAME_TYPE_BITS) - 1;

/// A frame as seen by the flame graph: the synthetic root or a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKey {
    Root,
    Method(MethodId),
}

/// Decoded method record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo<'a> {
    pub class_name: &'a str,
    pub method_name: &'a str,
    pub location: u32,
    /// Fill selector handed to the palette collaborator
    pub frame_type: u8,
}

impl MethodInfo<'_> {
    /// `Class.method`, or the bare method name when the class is empty
    pub fn title(&self) -> String {
        if self.class_name.is_empty() {
            self.method_name.to_string()
        } else {
            format!("{}.{}", self.class_name, self.method_name)
        }
    }
}

/// Method records plus the constant pool they reference
#[derive(Debug, Clone)]
pub struct MethodTable {
    records: ByteStream,
    symbols: Vec<String>,
}

impl MethodTable {
    pub fn new(records: ByteStream, symbols: Vec<String>) -> Self {
        Self { records, symbols }
    }

    /// Number of method records
    pub fn len(&self) -> usize {
        self.records.len() / METHOD_RECORD_UNITS
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn symbol(&self, value: u64) -> &str {
        match value {
            0 => "",
            v => self
                .symbols
                .get(v as usize - 1)
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    /// Decode the record of a method id
    pub fn info(&self, id: MethodId) -> DecodeResult<MethodInfo<'_>> {
        if id == 0 || id as usize > self.len() {
            return Err(DecodeError::UnknownMethod { id });
        }
        let pos = (id as usize - 1) * METHOD_RECORD_UNITS;
        let names = self.records.int36_at(pos)?;
        let location_and_type = self.records.int36_at(pos + INT36_UNITS)?;

        Ok(MethodInfo {
            class_name: self.symbol(names & SYMBOL_MASK),
            method_name: self.symbol(names >> SYMBOL_BITS),
            location: (location_and_type >> FRAME_TYPE_BITS) as u32,
            frame_type: (location_and_type & FRAME_TYPE_MASK) as u8,
        })
    }

    /// Display title of a frame
    pub fn title(&self, key: FrameKey) -> DecodeResult<String> {
        match key {
            FrameKey::Root => Ok(ROOT_TITLE.to_string()),
            FrameKey::Method(id) => self.info(id).map(|info| info.title()),
        }
    }

    /// Fill selector of a frame
    pub fn frame_type(&self, key: FrameKey) -> DecodeResult<u8> {
        match key {
            FrameKey::Root => Ok(ROOT_FRAME_TYPE),
            FrameKey::Method(id) => self.info(id).map(|info| info.frame_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::PRINTABLE_OFFSET;

    fn int36(mut v: u64, out: &mut Vec<u8>) {
        for _ in 0..INT36_UNITS {
            out.push((v & 0x3F) as u8 + PRINTABLE_OFFSET);
            v >>= 6;
        }
    }

    fn table() -> MethodTable {
        let mut records = Vec::new();
        // 1: java.util.HashMap.get, frame type 1
        int36((2 << 18) | 1, &mut records);
        int36((42 << 4) | 1, &mut records);
        // 2: bare "malloc", no class, frame type 4
        int36(3 << 18, &mut records);
        int36(4, &mut records);
        MethodTable::new(
            ByteStream::new(records),
            vec!["java.util.HashMap".into(), "get".into(), "malloc".into()],
        )
    }

    #[test]
    fn test_method_info() {
        let methods = table();
        assert_eq!(methods.len(), 2);

        let info = methods.info(1).unwrap();
        assert_eq!(info.class_name, "java.util.HashMap");
        assert_eq!(info.method_name, "get");
        assert_eq!(info.location, 42);
        assert_eq!(info.frame_type, 1);
    }

    #[test]
    fn test_titles() {
        let methods = table();
        assert_eq!(methods.title(FrameKey::Method(1)).unwrap(), "java.util.HashMap.get");
        assert_eq!(methods.title(FrameKey::Method(2)).unwrap(), "malloc");
        assert_eq!(methods.title(FrameKey::Root).unwrap(), "all");
        assert_eq!(methods.frame_type(FrameKey::Root).unwrap(), 3);
    }

    #[test]
    fn test_unknown_method() {
        let methods = table();
        assert_eq!(
            methods.info(3),
            Err(DecodeError::UnknownMethod { id: 3 })
        );
        assert!(methods.info(0).is_err());
    }
}
