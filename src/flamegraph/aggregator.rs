//! Breadth-first merge of bucket call trees.
//!
//! Every selected bucket contributes its trie. The aggregator walks all of
//! them in lockstep, one depth per step, summing same-method children into a
//! merged tree and emitting the finished rectangles of that depth. Only the
//! depth being merged is ever decoded, so early levels reach the screen long
//! before deep stacks are loaded.

use crate::flamegraph::levels::{FlameLevel, FlameRect};
use crate::heatmap::index::{BucketRef, HeatmapIndex};
use crate::parser::methods::{FrameKey, MethodId, MethodTable};
use crate::stacks::context::{TrieId, TRIE_ROOT};
use crate::utils::error::QueryError;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
struct MergedNode {
    key: FrameKey,
    weight: u64,
    left: u64,
    children: HashMap<MethodId, usize>,
}

impl MergedNode {
    fn new(key: FrameKey) -> Self {
        Self {
            key,
            weight: 0,
            left: 0,
            children: HashMap::new(),
        }
    }
}

/// Pending merge: bucket slot, node in that bucket's trie, merged node
type Frontier = VecDeque<(usize, TrieId, usize)>;

/// Incremental flame graph builder for one selection
#[derive(Debug, Clone)]
pub struct FlameAggregator {
    buckets: Vec<BucketRef>,
    frontier: Frontier,
    nodes: Vec<MergedNode>,
    /// Merged nodes of the depth emitted next
    roots: Vec<usize>,
    depth: usize,
    max_level: usize,
    total: u64,
}

impl FlameAggregator {
    /// Open the contexts of `buckets` and seed the merge at the root
    pub fn new(index: &mut HeatmapIndex, buckets: Vec<BucketRef>) -> Result<Self, QueryError> {
        let mut frontier = Frontier::with_capacity(buckets.len());
        let mut total = 0;
        let mut max_level = 0;
        for (slot, &bucket) in buckets.iter().enumerate() {
            let context = index.context(bucket)?;
            total += context.total();
            max_level = max_level.max(context.max_level());
            frontier.push_back((slot, TRIE_ROOT, 0));
        }

        let mut root = MergedNode::new(FrameKey::Root);
        root.weight = total;
        info!(
            "Aggregating {} buckets: total {}, up to {} levels",
            buckets.len(),
            total,
            max_level + 1
        );
        Ok(Self {
            buckets,
            frontier,
            nodes: vec![root],
            roots: vec![0],
            depth: 0,
            max_level,
            total,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Depth of the next level to emit
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of levels the selection can produce at most
    pub fn level_count(&self) -> usize {
        self.max_level + 1
    }

    pub fn is_complete(&self) -> bool {
        self.roots.is_empty() || self.depth > self.max_level
    }

    fn merge_children(&mut self, index: &mut HeatmapIndex) -> Result<(), QueryError> {
        let depth = self.depth;
        for (slot, source, target) in std::mem::take(&mut self.frontier) {
            let context = index.context(self.buckets[slot])?;
            if let Err(e) = context.load(depth) {
                debug!("Bucket {:?} stops contributing at depth {}: {}", self.buckets[slot], depth, e);
                continue;
            }
            // Poisoned by an earlier entry of the same bucket
            if context.failure().is_some() {
                continue;
            }
            for (method, child) in context.children(source) {
                let merged = match self.nodes[target].children.get(&method) {
                    Some(&merged) => merged,
                    None => {
                        let merged = self.nodes.len();
                        self.nodes.push(MergedNode::new(FrameKey::Method(method)));
                        self.nodes[target].children.insert(method, merged);
                        merged
                    }
                };
                self.nodes[merged].weight += context.node(child).weight;
                self.frontier.push_back((slot, child, merged));
            }
        }
        Ok(())
    }

    fn emit(&mut self, methods: &MethodTable) -> FlameLevel {
        let mut level = Vec::with_capacity(self.roots.len());
        let mut next = Vec::new();
        for &id in &self.roots {
            let node = &self.nodes[id];
            level.push(FlameRect::new(node.key, node.left, node.weight, methods));

            let mut children: Vec<(MethodId, usize)> =
                node.children.iter().map(|(&m, &c)| (m, c)).collect();
            children.sort_by(|a, b| {
                self.nodes[b.1]
                    .weight
                    .cmp(&self.nodes[a.1].weight)
                    .then(a.0.cmp(&b.0))
            });
            let mut cursor = node.left;
            for (_, child) in children {
                self.nodes[child].left = cursor;
                cursor += self.nodes[child].weight;
                next.push(child);
            }
        }
        level.sort_by_key(|rect| rect.left);
        self.roots = next;
        level
    }

    /// Merge one more depth and return its rectangles
    ///
    /// Returns `None` once every level has been emitted.
    pub fn next_level(
        &mut self,
        index: &mut HeatmapIndex,
        methods: &MethodTable,
    ) -> Result<Option<FlameLevel>, QueryError> {
        if self.is_complete() {
            return Ok(None);
        }
        self.merge_children(index)?;
        let level = self.emit(methods);
        debug!("Emitted depth {} with {} frames", self.depth, level.len());
        self.depth += 1;
        Ok(Some(level))
    }
}
