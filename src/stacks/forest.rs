//! The global stack forest.
//!
//! One shared, read-only forest of call paths is decoded per report. Sample
//! blocks reference paths by stack id; many ids share prefixes structurally.
//! Nodes live in an arena and refer to each other by `NodeId`.

use crate::parser::buffer::VarIntSource;
use crate::parser::dictionary::DictionaryReader;
use crate::parser::methods::MethodId;
use crate::utils::error::{DecodeError, DecodeResult};
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Index of a node in the forest arena
pub type NodeId = u32;

/// 1-based identifier of a stack (a root-to-node path)
pub type StackId = u32;

/// Immutable forest node
#[derive(Debug, Clone)]
pub struct StackNode {
    pub method: MethodId,
    pub parent: Option<NodeId>,
    /// Number of frames on the path ending here (roots have depth 1)
    pub depth: u32,
    pub children: Box<[NodeId]>,
}

/// Shared, immutable set of call paths
#[derive(Debug, Clone, Default)]
pub struct GlobalStackForest {
    nodes: Vec<StackNode>,
    roots: Vec<NodeId>,
    /// Stack id - 1 -> last node of its path (`None` for an empty path)
    stacks: Vec<Option<NodeId>>,
}

/// Mutable node used while the forest is being built
struct PendingNode {
    method: MethodId,
    parent: Option<NodeId>,
    depth: u32,
    children: Vec<NodeId>,
}

#[derive(Default)]
struct ForestBuilder {
    nodes: Vec<PendingNode>,
    roots: Vec<NodeId>,
    stacks: Vec<Option<NodeId>>,
}

impl ForestBuilder {
    fn add(&mut self, method: MethodId, parent: Option<NodeId>, capacity: usize) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let depth = match parent {
            Some(p) => {
                let parent = &mut self.nodes[p as usize];
                parent.children.push(id);
                parent.depth + 1
            }
            None => {
                self.roots.push(id);
                1
            }
        };
        self.nodes.push(PendingNode {
            method,
            parent,
            depth,
            children: Vec::with_capacity(capacity),
        });
        id
    }

    fn finish(self) -> GlobalStackForest {
        GlobalStackForest {
            nodes: self
                .nodes
                .into_iter()
                .map(|n| StackNode {
                    method: n.method,
                    parent: n.parent,
                    depth: n.depth,
                    children: n.children.into_boxed_slice(),
                })
                .collect(),
            roots: self.roots,
            stacks: self.stacks,
        }
    }
}

impl GlobalStackForest {
    /// Decode the tree encoding: a root count, then for every root a
    /// breadth-first sequence of `(method id, child count)` pairs.
    ///
    /// Stack id `k` names the `k`-th decoded node.
    pub fn decode_tree<S: VarIntSource>(source: &mut S) -> DecodeResult<Self> {
        let root_count = source.next_var_int()?;
        let mut builder = ForestBuilder::default();
        // Pending parents with the number of children still to decode
        let mut queue: VecDeque<(Option<NodeId>, u32)> = VecDeque::new();

        for _ in 0..root_count {
            queue.push_back((None, 1));
            while let Some((parent, count)) = queue.pop_front() {
                for _ in 0..count {
                    let method = source.next_var_int()?;
                    let child_count = source.next_var_int()?;
                    let capacity = (child_count as usize).min(1024);
                    let id = builder.add(method, parent, capacity);
                    if child_count > 0 {
                        queue.push_back((Some(id), child_count));
                    }
                }
            }
        }

        builder.stacks = (0..builder.nodes.len() as NodeId).map(Some).collect();
        let forest = builder.finish();
        debug!(
            "Decoded stack forest: {} roots, {} nodes",
            forest.roots.len(),
            forest.nodes.len()
        );
        Ok(forest)
    }

    /// Decode the dictionary encoding: a stack count, then one
    /// dictionary-compressed array of root-first method ids per stack.
    ///
    /// Stack id `k` names the `k`-th array; shared prefixes share nodes.
    pub fn decode_dictionary<S: VarIntSource>(source: &mut S) -> DecodeResult<Self> {
        let count = source.next_var_int()?;
        let mut reader = DictionaryReader::new(source);
        let mut builder = ForestBuilder::default();
        let mut edges: HashMap<(Option<NodeId>, MethodId), NodeId> = HashMap::new();

        for _ in 0..count {
            let frames = reader.read_array()?;
            let mut leaf = None;
            for method in frames {
                leaf = Some(match edges.get(&(leaf, method)) {
                    Some(&id) => id,
                    None => {
                        let id = builder.add(method, leaf, 0);
                        edges.insert((leaf, method), id);
                        id
                    }
                });
            }
            builder.stacks.push(leaf);
        }

        let forest = builder.finish();
        debug!(
            "Decoded {} dictionary stacks into {} nodes (table size {})",
            forest.stacks.len(),
            forest.nodes.len(),
            reader.table().len()
        );
        Ok(forest)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&StackNode> {
        self.nodes.get(id as usize)
    }

    fn leaf(&self, stack: StackId) -> DecodeResult<Option<NodeId>> {
        stack
            .checked_sub(1)
            .and_then(|i| self.stacks.get(i as usize))
            .copied()
            .ok_or(DecodeError::UnknownStack {
                id: stack,
                count: self.stacks.len(),
            })
    }

    /// Number of frames of a stack
    pub fn depth(&self, stack: StackId) -> DecodeResult<usize> {
        Ok(self
            .leaf(stack)?
            .map_or(0, |leaf| self.nodes[leaf as usize].depth as usize))
    }

    /// Method ids of a stack, root first
    pub fn path(&self, stack: StackId) -> DecodeResult<Vec<MethodId>> {
        let mut path = Vec::with_capacity(self.depth(stack)?);
        let mut cursor = self.leaf(stack)?;
        while let Some(id) = cursor {
            let node = &self.nodes[id as usize];
            path.push(node.method);
            cursor = node.parent;
        }
        path.reverse();
        Ok(path)
    }
}
