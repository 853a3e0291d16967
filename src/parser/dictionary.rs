//! LZ78-style dictionary reconstruction of shared-prefix arrays.
//!
//! The table starts with the empty entry. Decoding an array reads a target
//! length, then repeatedly copies a table entry into the output and, while the
//! output is incomplete, appends one literal element and registers
//! `entry ++ [element]` as a new table entry.
//!
//! Entries are persistent: a chain of frozen blocks of at most
//! `DICTIONARY_BLOCK_CAPACITY` elements plus a short tail, stored in arenas and
//! linked by integer handles. Extending an entry copies at most one tail and
//! never touches the entries it was derived from.

use super::buffer::VarIntSource;
use crate::utils::config::DICTIONARY_BLOCK_CAPACITY;
use crate::utils::error::{DecodeError, DecodeResult};

/// Handle of a dictionary entry
pub type EntryId = u32;

/// Entry 0: the empty sequence
pub const EMPTY_ENTRY: EntryId = 0;

#[derive(Debug, Clone)]
struct Link {
    block: usize,
    prev: Option<usize>,
}

#[derive(Debug, Clone)]
struct Entry {
    /// Last frozen block of the chain; earlier blocks hang off `prev`
    chain: Option<usize>,
    tail: Box<[u32]>,
    len: usize,
    /// Link freezing this entry's full tail, once an extension needed it
    frozen: Option<usize>,
}

/// Growing table of persistent dictionary entries
#[derive(Debug, Clone)]
pub struct DictionaryTable {
    entries: Vec<Entry>,
    blocks: Vec<Box<[u32]>>,
    links: Vec<Link>,
}

impl Default for DictionaryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryTable {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                chain: None,
                tail: Box::new([]),
                len: 0,
                frozen: None,
            }],
            blocks: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Number of entries, the empty entry included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of frozen blocks across all entries
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn entry(&self, id: EntryId) -> DecodeResult<&Entry> {
        self.entries
            .get(id as usize)
            .ok_or(DecodeError::UnknownDictionaryIndex {
                index: id,
                table_len: self.entries.len(),
            })
    }

    /// Number of elements of an entry
    pub fn entry_len(&self, id: EntryId) -> DecodeResult<usize> {
        self.entry(id).map(|e| e.len)
    }

    /// Register `id ++ [element]` and return its handle
    pub fn extend(&mut self, id: EntryId, element: u32) -> DecodeResult<EntryId> {
        let origin = self.entry(id)?;
        let len = origin.len + 1;
        let prev = origin.chain;
        let frozen = origin.frozen;
        let entry = if origin.tail.len() < DICTIONARY_BLOCK_CAPACITY {
            let mut tail = Vec::with_capacity(origin.tail.len() + 1);
            tail.extend_from_slice(&origin.tail);
            tail.push(element);
            Entry {
                chain: prev,
                tail: tail.into_boxed_slice(),
                len,
                frozen: None,
            }
        } else {
            // The full tail is frozen once and shared by every extension
            let link = match frozen {
                Some(link) => link,
                None => {
                    let block = self.entries[id as usize].tail.clone();
                    self.blocks.push(block);
                    self.links.push(Link {
                        block: self.blocks.len() - 1,
                        prev,
                    });
                    let link = self.links.len() - 1;
                    self.entries[id as usize].frozen = Some(link);
                    link
                }
            };
            Entry {
                chain: Some(link),
                tail: vec![element].into_boxed_slice(),
                len,
                frozen: None,
            }
        };
        self.entries.push(entry);
        Ok((self.entries.len() - 1) as EntryId)
    }

    /// Append the elements of an entry to `out`
    pub fn append_to(&self, id: EntryId, out: &mut Vec<u32>) -> DecodeResult<()> {
        let entry = self.entry(id)?;
        let mut chain = Vec::new();
        let mut link = entry.chain;
        while let Some(l) = link {
            chain.push(self.links[l].block);
            link = self.links[l].prev;
        }
        out.reserve(entry.len);
        for block in chain.iter().rev() {
            out.extend_from_slice(&self.blocks[*block]);
        }
        out.extend_from_slice(&entry.tail);
        Ok(())
    }

    /// Materialise an entry
    pub fn read(&self, id: EntryId) -> DecodeResult<Vec<u32>> {
        let mut out = Vec::new();
        self.append_to(id, &mut out)?;
        Ok(out)
    }
}

/// Decodes dictionary-compressed arrays from a VarInt source
#[derive(Debug)]
pub struct DictionaryReader<S> {
    source: S,
    table: DictionaryTable,
}

impl<S: VarIntSource> DictionaryReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            table: DictionaryTable::new(),
        }
    }

    pub fn table(&self) -> &DictionaryTable {
        &self.table
    }

    /// Decode one array
    pub fn read_array(&mut self) -> DecodeResult<Vec<u32>> {
        let size = self.source.next_var_int()? as usize;
        let mut result = Vec::with_capacity(size.min(1 << 16));
        while result.len() < size {
            let index = self.source.next_var_int()?;
            if self.table.entry_len(index)? > size - result.len() {
                return Err(DecodeError::CorruptBlock {
                    offset: self.source.position(),
                    reason: format!("dictionary entry {} overruns array of {}", index, size),
                });
            }
            self.table.append_to(index, &mut result)?;
            if result.len() < size {
                let element = self.source.next_var_int()?;
                result.push(element);
                self.table.extend(index, element)?;
            }
        }
        Ok(result)
    }
}
