//! Encoders producing report buffers for integration tests.
#![allow(dead_code)]

use heatmap_flame::flamegraph::{FlameGraph, FlameLevel};
use heatmap_flame::heatmap::HeatCell;
use heatmap_flame::report::{RenderSink, ReportBundle, StackEncoding};
use heatmap_flame::search::SearchSummary;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

const OFFSET: u8 = 63;

pub fn push_var_int(mut v: u32, out: &mut Vec<u8>) {
    loop {
        let low = (v & 0x1F) as u8;
        v >>= 5;
        if v == 0 {
            out.push(low + OFFSET);
            return;
        }
        out.push((low | 0x20) + OFFSET);
    }
}

pub fn push_int30(mut v: usize, out: &mut Vec<u8>) {
    for _ in 0..5 {
        out.push((v & 0x3F) as u8 + OFFSET);
        v >>= 6;
    }
}

pub fn push_int36(mut v: u64, out: &mut Vec<u8>) {
    for _ in 0..6 {
        out.push((v & 0x3F) as u8 + OFFSET);
        v >>= 6;
    }
}

pub fn var_ints(values: &[u32]) -> String {
    let mut out = Vec::new();
    for &v in values {
        push_var_int(v, &mut out);
    }
    String::from_utf8(out).unwrap()
}

/// Collapse zero runs: a zero followed by the run length minus one
pub fn rle(values: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < values.len() {
        if values[i] != 0 {
            out.push(values[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < values.len() && values[i] == 0 {
            i += 1;
        }
        out.push(0);
        out.push((i - start - 1) as u32);
    }
    out
}

/// Encoded global stacks plus the stack id of every input path
pub struct EncodedForest {
    pub values: Vec<u32>,
    pub ids: Vec<u32>,
    pub paths: HashMap<u32, Vec<u32>>,
}

struct TreeNode {
    method: u32,
    children: Vec<usize>,
}

/// Tree encoding: every node is a stack, numbered in decode order
pub fn tree_forest(paths: &[Vec<u32>]) -> EncodedForest {
    let mut nodes: Vec<TreeNode> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut ends = Vec::new();
    for path in paths {
        let mut parent: Option<usize> = None;
        for &method in path {
            let siblings = match parent {
                Some(p) => nodes[p].children.clone(),
                None => roots.clone(),
            };
            let found = siblings.into_iter().find(|&c| nodes[c].method == method);
            let id = match found {
                Some(id) => id,
                None => {
                    nodes.push(TreeNode { method, children: Vec::new() });
                    let id = nodes.len() - 1;
                    match parent {
                        Some(p) => nodes[p].children.push(id),
                        None => roots.push(id),
                    }
                    id
                }
            };
            parent = Some(id);
        }
        ends.push(parent.expect("paths are not empty"));
    }

    let mut values = vec![roots.len() as u32];
    let mut stack_of = HashMap::new();
    let mut node_paths: HashMap<usize, Vec<u32>> = HashMap::new();
    let mut next_id = 1u32;
    for &root in &roots {
        values.extend([nodes[root].method, nodes[root].children.len() as u32]);
        stack_of.insert(root, next_id);
        node_paths.insert(root, vec![nodes[root].method]);
        next_id += 1;
        let mut queue = VecDeque::from([root]);
        while let Some(p) = queue.pop_front() {
            for &c in &nodes[p].children {
                values.extend([nodes[c].method, nodes[c].children.len() as u32]);
                stack_of.insert(c, next_id);
                let mut path = node_paths[&p].clone();
                path.push(nodes[c].method);
                node_paths.insert(c, path);
                next_id += 1;
                queue.push_back(c);
            }
        }
    }

    EncodedForest {
        values,
        ids: ends.iter().map(|e| stack_of[e]).collect(),
        paths: node_paths
            .into_iter()
            .map(|(node, path)| (stack_of[&node], path))
            .collect(),
    }
}

/// Dictionary encoding with greedy longest-prefix matches
pub fn dictionary_forest(paths: &[Vec<u32>]) -> EncodedForest {
    let mut table: Vec<Vec<u32>> = vec![Vec::new()];
    let mut values = vec![paths.len() as u32];
    for path in paths {
        values.push(path.len() as u32);
        let mut done = 0;
        while done < path.len() {
            let rest = &path[done..];
            let (index, entry) = table
                .iter()
                .enumerate()
                .filter(|(_, e)| e.len() <= rest.len() && rest.starts_with(e))
                .max_by_key(|(_, e)| e.len())
                .map(|(i, e)| (i, e.clone()))
                .unwrap();
            values.push(index as u32);
            done += entry.len();
            if done < path.len() {
                values.push(path[done]);
                let mut extended = entry;
                extended.push(path[done]);
                table.push(extended);
                done += 1;
            }
        }
    }
    EncodedForest {
        values,
        ids: (1..=paths.len() as u32).collect(),
        paths: paths
            .iter()
            .enumerate()
            .map(|(i, p)| (i as u32 + 1, p.clone()))
            .collect(),
    }
}

/// Group block of one bucket: `stack id -> samples`
pub fn block(samples: &BTreeMap<u32, u32>, paths: &HashMap<u32, Vec<u32>>) -> Vec<u32> {
    let total: u32 = samples.values().sum();
    if total == 0 {
        return vec![0];
    }
    let mut values = vec![total, samples.len() as u32];
    let mut prev = 0;
    for &id in samples.keys() {
        values.push(id - prev - 1);
        prev = id;
    }

    // Weight of every path prefix
    let mut weights: HashMap<Vec<u32>, u32> = HashMap::new();
    for (id, &w) in samples {
        let path = &paths[id];
        for len in 1..=path.len() {
            *weights.entry(path[..len].to_vec()).or_insert(0) += w;
        }
    }

    // Replay the decoder's breadth-first order
    let stacks: Vec<&Vec<u32>> = samples.keys().map(|id| &paths[id]).collect();
    let mut done = vec![false; stacks.len()];
    let mut created: std::collections::HashSet<Vec<u32>> = Default::default();
    let max_level = stacks.iter().map(|p| p.len()).max().unwrap_or(0);
    for level in 0..=max_level {
        for (i, path) in stacks.iter().enumerate() {
            if done[i] {
                continue;
            }
            if level >= path.len() {
                done[i] = true;
                continue;
            }
            let prefix = path[..=level].to_vec();
            if created.contains(&prefix) {
                continue;
            }
            let w = weights[&prefix];
            values.push(w);
            created.insert(prefix);
            if w == 1 {
                done[i] = true;
            }
        }
    }
    values
}

/// Full heatmap buffer from fine buckets and the group size of every coarser level
pub fn heatmap(
    fine: &[Vec<(u32, u32)>],
    group_sizes: &[usize],
    paths: &HashMap<u32, Vec<u32>>,
) -> String {
    let mut levels: Vec<Vec<BTreeMap<u32, u32>>> = vec![fine
        .iter()
        .map(|samples| {
            let mut merged = BTreeMap::new();
            for &(id, w) in samples {
                *merged.entry(id).or_insert(0) += w;
            }
            merged
        })
        .collect()];
    for &size in group_sizes {
        let finer = levels.last().unwrap();
        let coarse = finer
            .chunks_exact(size)
            .map(|group| {
                let mut merged = BTreeMap::new();
                for bucket in group {
                    for (&id, &w) in bucket {
                        *merged.entry(id).or_insert(0) += w;
                    }
                }
                merged
            })
            .collect();
        levels.push(coarse);
    }

    let encoded: Vec<(usize, Vec<Vec<u32>>)> = levels
        .iter()
        .enumerate()
        .map(|(zoom, buckets)| {
            let group_size = if zoom == 0 { 1 } else { group_sizes[zoom - 1] };
            (group_size, buckets.iter().map(|b| block(b, paths)).collect())
        })
        .collect();
    heatmap_from_blocks(&encoded)
}

/// Heatmap buffer from raw blocks: `(group size, block values)` per level,
/// finest level first
pub fn heatmap_from_blocks(levels: &[(usize, Vec<Vec<u32>>)]) -> String {
    let mut out = Vec::new();
    for (group_size, blocks) in levels {
        let start = out.len();
        for values in blocks {
            let mut encoded = Vec::new();
            for &v in values {
                push_var_int(v, &mut encoded);
            }
            out.extend_from_slice(&encoded);
            push_int30(encoded.len(), &mut out);
        }
        push_int30(*group_size, &mut out);
        push_int30(blocks.len(), &mut out);
        let len = out.len() - start;
        push_int30(len, &mut out);
    }
    push_int30(levels.len().saturating_sub(1), &mut out);
    String::from_utf8(out).unwrap()
}

/// Method records for `(class, method, frame type)` triples, ids from 1
pub fn methods(defs: &[(&str, &str, u8)]) -> (String, Vec<String>) {
    let mut cpool: Vec<String> = Vec::new();
    let mut symbol = |name: &str| -> u64 {
        if name.is_empty() {
            return 0;
        }
        let index = match cpool.iter().position(|c| c == name) {
            Some(i) => i,
            None => {
                cpool.push(name.to_string());
                cpool.len() - 1
            }
        };
        index as u64 + 1
    };
    let mut out = Vec::new();
    for &(class, method, frame_type) in defs {
        let class = symbol(class);
        let method = symbol(method);
        push_int36((method << 18) | class, &mut out);
        push_int36(u64::from(frame_type), &mut out);
    }
    (String::from_utf8(out).unwrap(), cpool)
}

/// Report over `stacks` (paths of method ids) with fine buckets of
/// `(index into stacks, samples)`
pub fn bundle(
    defs: &[(&str, &str, u8)],
    stacks: &[Vec<u32>],
    fine: &[Vec<(usize, u32)>],
    group_sizes: &[usize],
    encoding: StackEncoding,
    compressed: bool,
) -> ReportBundle {
    let forest = match encoding {
        StackEncoding::Tree => tree_forest(stacks),
        StackEncoding::Dictionary => dictionary_forest(stacks),
    };
    let buckets: Vec<Vec<(u32, u32)>> = fine
        .iter()
        .map(|b| b.iter().map(|&(s, w)| (forest.ids[s], w)).collect())
        .collect();
    let values = if compressed {
        rle(&forest.values)
    } else {
        forest.values.clone()
    };
    let (records, cpool) = methods(defs);
    ReportBundle {
        heatmap: heatmap(&buckets, group_sizes, &forest.paths),
        global_stacks: var_ints(&values),
        stack_encoding: encoding,
        rle: compressed,
        methods: records,
        cpool,
        start_ms: 1_700_000_000_000,
        ticks_per_second: 1_000_000_000,
    }
}

/// Methods 1..=6 used by most scenarios
pub const DEFS: &[(&str, &str, u8)] = &[
    ("app.Main", "run", 1),
    ("app.Worker", "process", 1),
    ("java.util.HashMap", "get", 2),
    ("", "malloc", 4),
    ("app.Worker", "flush", 1),
    ("app.Main", "idle", 1),
];

/// Everything a sink was handed
#[derive(Debug, Default)]
pub struct Recorded {
    pub levels: Vec<(usize, FlameLevel)>,
    pub completed: usize,
    pub cells: Vec<HeatCell>,
    pub searches: Vec<SearchSummary>,
}

/// Sink that records into shared state the test keeps a handle to
#[derive(Clone, Default)]
pub struct RecordingSink(pub Rc<RefCell<Recorded>>);

impl RenderSink for RecordingSink {
    fn flame_level(&mut self, depth: usize, level: &FlameLevel) {
        self.0.borrow_mut().levels.push((depth, level.clone()));
    }

    fn flame_complete(&mut self, _graph: &FlameGraph) {
        self.0.borrow_mut().completed += 1;
    }

    fn heat_cells(&mut self, cells: &[HeatCell]) {
        self.0.borrow_mut().cells.extend_from_slice(cells);
    }

    fn search_finished(&mut self, summary: &SearchSummary) {
        self.0.borrow_mut().searches.push(summary.clone());
    }
}

/// Stacks of the sample report, as method paths
pub fn sample_stacks() -> Vec<Vec<u32>> {
    vec![
        vec![1, 2, 3],
        vec![1, 2, 4],
        vec![1, 5],
        vec![6],
        vec![1, 2],
    ]
}

/// Eight fine buckets of `(stack index, samples)`, 21 samples in all
pub fn sample_buckets() -> Vec<Vec<(usize, u32)>> {
    vec![
        vec![(0, 3), (2, 1)],
        vec![(1, 2)],
        vec![(3, 5)],
        vec![],
        vec![(0, 1), (4, 2)],
        vec![(1, 1), (2, 2)],
        vec![(0, 2)],
        vec![(3, 1), (1, 1)],
    ]
}

/// Sample report with zoom levels of 8, 4 and 2 buckets
pub fn sample_bundle(encoding: StackEncoding, compressed: bool) -> ReportBundle {
    bundle(
        DEFS,
        &sample_stacks(),
        &sample_buckets(),
        &[2, 2],
        encoding,
        compressed,
    )
}
