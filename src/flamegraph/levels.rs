//! Flame graph levels and rectangles.

use crate::parser::methods::{FrameKey, MethodTable};
use crate::search::matcher::MethodMatcher;
use log::debug;
use serde::{Deserialize, Serialize};

/// One frame box: horizontal offset and width in samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameRect {
    pub left: u64,
    pub width: u64,
    pub key: FrameKey,
    pub title: String,
    /// Fill selector for the palette
    pub frame_type: u8,
}

impl FlameRect {
    /// Resolve the title and frame type of `key`
    ///
    /// Methods missing from the table still get a box, titled by id.
    pub fn new(key: FrameKey, left: u64, width: u64, methods: &MethodTable) -> Self {
        let (title, frame_type) = match (methods.title(key), methods.frame_type(key)) {
            (Ok(title), Ok(frame_type)) => (title, frame_type),
            (Err(e), _) | (_, Err(e)) => {
                debug!("Frame {:?} has no method record: {}", key, e);
                let title = match key {
                    FrameKey::Root => String::new(),
                    FrameKey::Method(id) => format!("method#{}", id),
                };
                (title, 0)
            }
        };
        Self {
            left,
            width,
            key,
            title,
            frame_type,
        }
    }

    pub fn right(&self) -> u64 {
        self.left + self.width
    }
}

/// Rectangles of one depth, sorted by `left`
pub type FlameLevel = Vec<FlameRect>;

/// Aggregated call tree of a selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameGraph {
    pub levels: Vec<FlameLevel>,
    /// Sum of the selected bucket totals
    pub total: u64,
    /// Every level has been delivered
    pub complete: bool,
}

impl FlameGraph {
    pub fn new(total: u64) -> Self {
        Self {
            levels: Vec::new(),
            total,
            complete: false,
        }
    }

    pub fn root(&self) -> Option<&FlameRect> {
        self.levels.first().and_then(|level| level.first())
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Weight of the top-most rectangles whose title matches
    ///
    /// A rectangle nested under a matching ancestor is not counted again.
    pub fn matched_weight(&self, matcher: &mut MethodMatcher, methods: &MethodTable) -> u64 {
        // Disjoint [left, right) spans of counted rectangles, sorted by left
        let mut spans: Vec<(u64, u64)> = Vec::new();
        let mut matched = 0;
        for level in &self.levels {
            for rect in level {
                let at = spans.partition_point(|&(left, _)| left <= rect.left);
                let covered = at > 0 && rect.left < spans[at - 1].1;
                if covered || !matcher.matches_key(rect.key, methods) {
                    continue;
                }
                matched += rect.width;
                spans.insert(at, (rect.left, rect.right()));
            }
        }
        matched
    }
}

/// `part / total` as a percentage with two decimals
pub fn percentage(part: u64, total: u64) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", part as f64 * 100.0 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::buffer::ByteStream;
    use crate::utils::config::PRINTABLE_OFFSET;

    fn methods() -> MethodTable {
        // 1: "alpha", 2: "beta"
        let mut records = Vec::new();
        for symbol in [1u64, 2] {
            for v in [symbol << 18, 1] {
                let mut v = v;
                for _ in 0..6 {
                    records.push((v & 0x3F) as u8 + PRINTABLE_OFFSET);
                    v >>= 6;
                }
            }
        }
        MethodTable::new(ByteStream::new(records), vec!["alpha".into(), "beta".into()])
    }

    fn rect(key: FrameKey, left: u64, width: u64) -> FlameRect {
        FlameRect::new(key, left, width, &methods())
    }

    fn graph() -> FlameGraph {
        // all(10) -> alpha(6) -> beta(4); all -> beta(3)
        FlameGraph {
            levels: vec![
                vec![rect(FrameKey::Root, 0, 10)],
                vec![rect(FrameKey::Method(1), 0, 6), rect(FrameKey::Method(2), 6, 3)],
                vec![rect(FrameKey::Method(2), 0, 4)],
            ],
            total: 10,
            complete: true,
        }
    }

    #[test]
    fn test_titles_and_unknown_methods() {
        let methods = methods();
        assert_eq!(FlameRect::new(FrameKey::Root, 0, 1, &methods).title, "all");
        assert_eq!(FlameRect::new(FrameKey::Method(2), 0, 1, &methods).title, "beta");
        assert_eq!(
            FlameRect::new(FrameKey::Method(7), 0, 1, &methods).title,
            "method#7"
        );
    }

    #[test]
    fn test_matched_weight_counts_top_most_only() {
        let methods = methods();
        let graph = graph();

        let mut beta = MethodMatcher::new("beta").unwrap();
        assert_eq!(graph.matched_weight(&mut beta, &methods), 7);

        let mut any = MethodMatcher::new("a").unwrap();
        assert_eq!(graph.matched_weight(&mut any, &methods), 9);

        let mut none = MethodMatcher::new("zzz").unwrap();
        assert_eq!(graph.matched_weight(&mut none, &methods), 0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(7, 10), "70.00");
        assert_eq!(percentage(1, 3), "33.33");
        assert_eq!(percentage(0, 0), "0.00");
    }
}
