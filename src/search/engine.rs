//! Incremental search over the buckets of the current zoom.
//!
//! One bucket is fully decoded and scanned per step. Completed buckets are
//! repainted after every tick, starting over from bucket 0 whenever a new
//! maximum changes the colour scale.

use crate::flamegraph::levels::percentage;
use crate::heatmap::cells::SearchOverlay;
use crate::report::session::SessionState;
use crate::scheduler::{Step, Task};
use crate::search::matcher::MethodMatcher;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Outcome of a finished search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub pattern: String,
    /// Weight of the top-most matching flame rectangles
    pub matched: u64,
    pub total: u64,
    /// `matched / total` in percent, two decimals
    pub percentage: String,
}

impl SearchSummary {
    /// Summary of a search that matched nothing
    pub fn empty(pattern: &str, total: u64) -> Self {
        Self {
            pattern: pattern.to_string(),
            matched: 0,
            total,
            percentage: percentage(0, total),
        }
    }
}

/// Progress of the current search, shared with the heat cell renderer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub pattern: Option<String>,
    /// Buckets `0..executed` have been searched
    pub executed: usize,
    /// Largest per-bucket found weight so far
    pub max: u64,
    pub summary: Option<SearchSummary>,
}

impl SearchState {
    /// State of a search that is about to scan the buckets
    pub fn started(pattern: &str) -> Self {
        Self {
            pattern: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    /// State of a search that can match nothing
    pub fn empty_match(pattern: &str, buckets: usize, total: u64) -> Self {
        Self {
            pattern: Some(pattern.to_string()),
            executed: buckets,
            max: 0,
            summary: Some(SearchSummary::empty(pattern, total)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.summary.is_some()
    }

    /// Overlay for heat cells while a pattern is set
    pub fn overlay(&self) -> Option<SearchOverlay> {
        self.pattern.as_ref().map(|_| SearchOverlay {
            executed: self.executed,
            max: self.max,
        })
    }
}

/// Scheduler task scanning one bucket per step
pub struct SearchTask {
    matcher: MethodMatcher,
    count: usize,
    repaint_from: usize,
}

impl SearchTask {
    pub fn new(matcher: MethodMatcher, count: usize) -> Self {
        Self {
            matcher,
            count,
            repaint_from: 0,
        }
    }

    fn finish(&mut self, env: &mut SessionState) {
        let total = env.flame.total;
        let matched = env.flame.matched_weight(&mut self.matcher, &env.methods);
        let summary = SearchSummary {
            pattern: self.matcher.as_str().to_string(),
            matched,
            total,
            percentage: percentage(matched, total),
        };
        info!(
            "Search '{}' matched {}% of the selection",
            summary.pattern, summary.percentage
        );
        env.sink.search_finished(&summary);
        env.search.summary = Some(summary);
    }
}

impl Task<SessionState> for SearchTask {
    fn step(&mut self, env: &mut SessionState) -> Step {
        let index = env.search.executed;
        if index < self.count {
            let found = env
                .index
                .perform_search_at(index, &mut self.matcher, &env.methods)
                .unwrap_or_else(|e| {
                    warn!("Search skipped bucket {}: {}", index, e);
                    0
                });
            env.search.executed += 1;
            if found > env.search.max {
                env.search.max = found;
                self.repaint_from = 0;
            }
        }
        if env.search.executed >= self.count {
            self.finish(env);
            Step::Done
        } else {
            Step::Continue
        }
    }

    fn after_step(&mut self, env: &mut SessionState) {
        let to = env.search.executed;
        if self.repaint_from >= to {
            return;
        }
        match env.index.heat_cells(env.search.overlay()) {
            Ok(cells) => {
                let to = to.min(cells.len());
                let from = self.repaint_from.min(to);
                env.sink.heat_cells(&cells[from..to]);
            }
            Err(e) => warn!("Cannot repaint heat cells: {}", e),
        }
        self.repaint_from = to;
    }
}
