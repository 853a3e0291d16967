//! Per-bucket incremental call tree decoding.
//!
//! A group block starts with the bucket's total weight, the number of
//! distinct stacks and their delta-encoded ids. The rest of the block holds
//! edge weights in the exact order they are needed while the bucket's trie is
//! grown one breadth-first level at a time: every live stack advances one
//! frame per level, and the first stack to create an edge reads its weight.
//!
//! An edge of weight 1 carries a single sample, so its whole remaining path is
//! known without further reads and is materialised as a chain at once.

use crate::parser::buffer::ByteStream;
use crate::parser::methods::MethodId;
use crate::stacks::forest::GlobalStackForest;
use crate::utils::error::{DecodeError, DecodeResult};
use log::{debug, warn};
use std::collections::HashMap;

/// Index of a node in a context's trie
pub type TrieId = u32;

/// The trie root; its weight is the bucket total
pub const TRIE_ROOT: TrieId = 0;

/// Trie node: accumulated weight plus children keyed by method id
#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    pub weight: u64,
    /// Sum of the children's weights; never exceeds `weight`
    pub children_weight: u64,
    pub children: HashMap<MethodId, TrieId>,
}

impl TrieNode {
    fn new(weight: u64) -> Self {
        Self {
            weight,
            ..Self::default()
        }
    }

    /// Weight of samples ending at this node
    pub fn self_weight(&self) -> u64 {
        self.weight - self.children_weight
    }
}

#[derive(Debug, Clone)]
struct StackCursor {
    path: Box<[MethodId]>,
    leaf: TrieId,
    done: bool,
}

/// Node created during the level being decoded
struct Created {
    parent: TrieId,
    method: MethodId,
    weight: u64,
}

/// Incrementally built call tree of one bucket
#[derive(Debug, Clone)]
pub struct StackDecodingContext {
    stream: ByteStream,
    offset: usize,
    nodes: Vec<TrieNode>,
    stacks: Vec<StackCursor>,
    live: usize,
    current_level: usize,
    max_level: usize,
    method_weights: HashMap<MethodId, u64>,
    found: u64,
    failure: Option<DecodeError>,
}

impl StackDecodingContext {
    /// Parse the block header at `offset`
    ///
    /// A corrupt header yields an empty context that records the failure.
    pub fn open(data: &ByteStream, offset: usize, forest: &GlobalStackForest) -> Self {
        match Self::decode_header(data, offset, forest) {
            Ok(context) => context,
            Err(e) => {
                warn!("Bucket block at offset {} is unreadable: {}", offset, e);
                let mut context = Self::empty(data, offset);
                context.failure = Some(e);
                context
            }
        }
    }

    fn empty(data: &ByteStream, offset: usize) -> Self {
        Self {
            stream: data.at(offset),
            offset,
            nodes: vec![TrieNode::new(0)],
            stacks: Vec::new(),
            live: 0,
            current_level: 0,
            max_level: 0,
            method_weights: HashMap::new(),
            found: 0,
            failure: None,
        }
    }

    fn decode_header(
        data: &ByteStream,
        offset: usize,
        forest: &GlobalStackForest,
    ) -> DecodeResult<Self> {
        let mut context = Self::empty(data, offset);
        let total = context.stream.next_var_int()?;
        context.nodes[TRIE_ROOT as usize].weight = u64::from(total);
        if total == 0 {
            return Ok(context);
        }

        let count = context.stream.next_var_int()? as usize;
        context.stacks.reserve(count.min(1 << 16));
        let mut stack_id: u64 = 0;
        for _ in 0..count {
            stack_id += u64::from(context.stream.next_var_int()?) + 1;
            let id = u32::try_from(stack_id).map_err(|_| DecodeError::CorruptBlock {
                offset,
                reason: format!("stack id {} out of range", stack_id),
            })?;
            let path = forest.path(id)?;
            context.max_level = context.max_level.max(path.len());
            context.stacks.push(StackCursor {
                path: path.into_boxed_slice(),
                leaf: TRIE_ROOT,
                done: false,
            });
        }
        context.live = context.stacks.len();
        Ok(context)
    }

    /// Byte offset of the block this context decodes
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total weight of the bucket
    pub fn total(&self) -> u64 {
        self.nodes[TRIE_ROOT as usize].weight
    }

    /// Weight matched by the last search
    pub fn found(&self) -> u64 {
        self.found
    }

    /// Depth of the deepest stack in the bucket
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Number of levels materialised so far
    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Whether some stack still has frames to decode
    pub fn has_live_stacks(&self) -> bool {
        self.live > 0
    }

    /// Decode error that stopped this context, if any
    pub fn failure(&self) -> Option<&DecodeError> {
        self.failure.as_ref()
    }

    pub fn node(&self, id: TrieId) -> &TrieNode {
        &self.nodes[id as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children of a node as `(method id, node)` pairs
    pub fn children(&self, id: TrieId) -> impl Iterator<Item = (MethodId, TrieId)> + '_ {
        self.nodes[id as usize]
            .children
            .iter()
            .map(|(&method, &child)| (method, child))
    }

    /// Accumulated weight of every method id decoded so far
    pub fn method_weights(&self) -> &HashMap<MethodId, u64> {
        &self.method_weights
    }

    fn corrupt(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::CorruptBlock {
            offset: self.stream.pos(),
            reason: reason.into(),
        }
    }

    fn attach(
        &mut self,
        parent: TrieId,
        method: MethodId,
        weight: u64,
        journal: &mut Vec<Created>,
    ) -> TrieId {
        let id = self.nodes.len() as TrieId;
        self.nodes.push(TrieNode::new(weight));
        let parent_node = &mut self.nodes[parent as usize];
        parent_node.children.insert(method, id);
        parent_node.children_weight += weight;
        *self.method_weights.entry(method).or_insert(0) += weight;
        journal.push(Created {
            parent,
            method,
            weight,
        });
        id
    }

    fn decode_level(&mut self, journal: &mut Vec<Created>) -> DecodeResult<()> {
        let level = self.current_level;
        let mut terminated = 0;

        for i in 0..self.stacks.len() {
            if self.stacks[i].done {
                terminated += 1;
                continue;
            }
            let cursor = &self.stacks[i];
            if level >= cursor.path.len() {
                self.stacks[i].done = true;
                self.live -= 1;
                terminated += 1;
                continue;
            }
            let method = cursor.path[level];
            let leaf = cursor.leaf;

            if let Some(&next) = self.nodes[leaf as usize].children.get(&method) {
                if self.nodes[next as usize].weight == 1 {
                    return Err(self.corrupt(format!(
                        "method {} at level {} holds a single sample but is shared",
                        method, level
                    )));
                }
                self.stacks[i].leaf = next;
                continue;
            }

            let weight = u64::from(self.stream.next_var_int()?);
            let parent = &self.nodes[leaf as usize];
            if weight == 0 || parent.children_weight + weight > parent.weight {
                return Err(self.corrupt(format!(
                    "edge weight {} does not fit parent weight {} at level {}",
                    weight, parent.weight, level
                )));
            }
            let child = self.attach(leaf, method, weight, journal);

            if weight == 1 {
                let mut chain = child;
                for depth in level + 1..self.stacks[i].path.len() {
                    let method = self.stacks[i].path[depth];
                    chain = self.attach(chain, method, 1, journal);
                }
                self.stacks[i].done = true;
                self.live -= 1;
                terminated += 1;
            } else {
                self.stacks[i].leaf = child;
            }
        }

        if terminated * 2 > self.stacks.len() {
            self.stacks.retain(|s| !s.done);
        }
        self.current_level += 1;
        Ok(())
    }

    fn rollback(&mut self, mark: usize, journal: Vec<Created>) {
        for created in journal.into_iter().rev() {
            if let Some(w) = self.method_weights.get_mut(&created.method) {
                *w -= created.weight;
                if *w == 0 {
                    self.method_weights.remove(&created.method);
                }
            }
            if (created.parent as usize) < mark {
                let parent = &mut self.nodes[created.parent as usize];
                parent.children.remove(&created.method);
                parent.children_weight -= created.weight;
            }
        }
        self.nodes.truncate(mark);
    }

    /// Materialise the next breadth-first level
    ///
    /// The level is applied atomically: on a decode error every node created
    /// for it is removed and the context stops loading.
    pub fn load_level(&mut self) -> DecodeResult<()> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        let mark = self.nodes.len();
        let mut journal = Vec::new();
        if let Err(e) = self.decode_level(&mut journal) {
            warn!(
                "Bucket block at offset {} failed at level {}: {}",
                self.offset, self.current_level, e
            );
            self.rollback(mark, journal);
            self.stacks.clear();
            self.live = 0;
            self.failure = Some(e.clone());
            return Err(e);
        }
        Ok(())
    }

    /// Load levels until `max_level` is materialised or no stack is live
    ///
    /// Returns whether more levels could still be loaded.
    pub fn load(&mut self, max_level: usize) -> DecodeResult<bool> {
        if self.failure.is_some() {
            return Ok(false);
        }
        while self.live > 0 && max_level >= self.current_level {
            self.load_level()?;
        }
        if self.live == 0 {
            debug!(
                "Bucket at offset {} fully decoded: {} nodes",
                self.offset,
                self.nodes.len()
            );
        }
        Ok(self.live > 0)
    }

    /// Sum the weight of every decoded method id accepted by `matches`
    ///
    /// The result is cached as the bucket's found weight. A failed context
    /// matches nothing.
    pub fn perform_search(&mut self, mut matches: impl FnMut(MethodId) -> bool) -> u64 {
        self.found = if self.failure.is_some() {
            0
        } else {
            self.method_weights
                .iter()
                .filter(|(&method, _)| matches(method))
                .map(|(_, &weight)| weight)
                .sum()
        };
        self.found
    }

    /// Forget the last search result
    pub fn reset_found(&mut self) {
        self.found = 0;
    }
}
