//! An open report: the user-facing entry point.
//!
//! A `Session` owns everything decoded from a bundle plus the scheduler
//! that runs flame aggregation and search in small steps. User intents
//! (zoom, range selection, search) register or replace scheduler tasks;
//! results reach the host through a `RenderSink`.

use crate::flamegraph::aggregator::FlameAggregator;
use crate::flamegraph::levels::{FlameGraph, FlameLevel};
use crate::heatmap::cells::HeatCell;
use crate::heatmap::index::HeatmapIndex;
use crate::parser::methods::MethodTable;
use crate::report::bundle::ReportBundle;
use crate::scheduler::{Scheduler, Step, Task, TickOutcome};
use crate::search::engine::{SearchState, SearchSummary, SearchTask};
use crate::search::matcher::MethodMatcher;
use crate::utils::config::{SessionConfig, FLAME_TASK, SEARCH_TASK};
use crate::utils::error::{QueryError, SearchError, SessionError};
use log::{info, warn};
use std::sync::Arc;

/// Receiver of rendering work
///
/// Every method has an empty default so hosts implement only what they draw.
pub trait RenderSink {
    /// A finished flame graph depth
    fn flame_level(&mut self, _depth: usize, _level: &FlameLevel) {}

    /// Every depth of the selection has been delivered
    fn flame_complete(&mut self, _graph: &FlameGraph) {}

    /// Heat cells whose value or scale changed
    fn heat_cells(&mut self, _cells: &[HeatCell]) {}

    fn search_finished(&mut self, _summary: &SearchSummary) {}
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderSink for NullSink {}

/// Everything scheduler tasks operate on
pub struct SessionState {
    pub index: HeatmapIndex,
    pub methods: MethodTable,
    pub flame: FlameGraph,
    pub search: SearchState,
    pub sink: Box<dyn RenderSink>,
}

/// Scheduler task delivering one flame depth per step
struct FlameTask {
    aggregator: FlameAggregator,
    delivered: usize,
}

impl Task<SessionState> for FlameTask {
    fn step(&mut self, env: &mut SessionState) -> Step {
        match self.aggregator.next_level(&mut env.index, &env.methods) {
            Ok(Some(level)) => env.flame.levels.push(level),
            Ok(None) => {}
            Err(e) => {
                warn!("Flame aggregation stopped: {}", e);
                return Step::Done;
            }
        }
        if self.aggregator.is_complete() {
            env.flame.complete = true;
            Step::Done
        } else {
            Step::Continue
        }
    }

    fn after_step(&mut self, env: &mut SessionState) {
        for depth in self.delivered..env.flame.levels.len() {
            env.sink.flame_level(depth, &env.flame.levels[depth]);
        }
        self.delivered = env.flame.levels.len();
        if env.flame.complete {
            env.sink.flame_complete(&env.flame);
        }
    }
}

/// An opened report with its background work
pub struct Session {
    state: SessionState,
    scheduler: Scheduler<SessionState>,
}

impl Session {
    /// Decode the shared structures of `bundle` and select the initial zoom
    pub fn open(
        bundle: &ReportBundle,
        config: SessionConfig,
        sink: Box<dyn RenderSink>,
    ) -> Result<Self, SessionError> {
        let forest = bundle.decode_forest().map_err(SessionError::GlobalStacks)?;
        info!(
            "Decoded {} global stacks ({} nodes)",
            forest.stack_count(),
            forest.node_count()
        );
        let mut index = HeatmapIndex::new(bundle.heatmap_stream(), Arc::new(forest))
            .map_err(SessionError::Heatmap)?;
        index.set_zoom(config.initial_zoom)?;

        Ok(Self {
            state: SessionState {
                index,
                methods: bundle.method_table(),
                flame: FlameGraph::default(),
                search: SearchState::default(),
                sink,
            },
            scheduler: Scheduler::new(config.budget),
        })
    }

    pub fn index(&self) -> &HeatmapIndex {
        &self.state.index
    }

    pub fn methods(&self) -> &MethodTable {
        &self.state.methods
    }

    /// Latest flame graph, possibly still growing
    pub fn flame(&self) -> &FlameGraph {
        &self.state.flame
    }

    pub fn search_state(&self) -> &SearchState {
        &self.state.search
    }

    /// Whether background work is pending
    pub fn is_busy(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Switch zoom level, repainting the heatmap and rerunning an active search
    pub fn set_zoom(&mut self, zoom: usize) -> Result<(), QueryError> {
        self.state.index.set_zoom(zoom)?;
        if let Some(pattern) = self.state.search.pattern.clone() {
            if let Err(e) = self.search(&pattern) {
                warn!("Search '{}' could not be restarted: {}", pattern, e);
            }
        }
        self.repaint()
    }

    /// Heat cells of the current zoom, with the search overlay if any
    pub fn heat_cells(&self) -> Result<Vec<HeatCell>, QueryError> {
        self.state.index.heat_cells(self.state.search.overlay())
    }

    fn repaint(&mut self) -> Result<(), QueryError> {
        let cells = self.heat_cells()?;
        self.state.sink.heat_cells(&cells);
        Ok(())
    }

    /// Start aggregating buckets `from..=to` of the current zoom
    ///
    /// Replaces any aggregation still in progress.
    pub fn render_traces(&mut self, from: usize, to: usize) -> Result<(), QueryError> {
        let buckets = self.state.index.collect_frames(from, to)?;
        info!(
            "Rendering buckets {}..={} at zoom {} ({} contexts)",
            from,
            to,
            self.state.index.zoom(),
            buckets.len()
        );
        let aggregator = FlameAggregator::new(&mut self.state.index, buckets)?;
        self.state.flame = FlameGraph::new(aggregator.total());
        self.scheduler.add_task(
            FLAME_TASK,
            FlameTask {
                aggregator,
                delivered: 0,
            },
        );
        Ok(())
    }

    /// Start searching every bucket of the current zoom
    ///
    /// An empty pattern clears highlighting. An invalid pattern leaves the
    /// empty-match state behind and schedules nothing.
    pub fn search(&mut self, pattern: &str) -> Result<(), SearchError> {
        self.state.index.clear_found();
        if pattern.is_empty() {
            self.scheduler.cancel(SEARCH_TASK);
            self.state.search = SearchState::default();
            if let Err(e) = self.repaint() {
                warn!("Cannot repaint heat cells: {}", e);
            }
            return Ok(());
        }

        match MethodMatcher::new(pattern) {
            Ok(matcher) => {
                let count = self.state.index.bucket_count();
                self.state.search = SearchState::started(pattern);
                self.scheduler
                    .add_task(SEARCH_TASK, SearchTask::new(matcher, count));
                Ok(())
            }
            Err(e) => {
                self.scheduler.cancel(SEARCH_TASK);
                self.state.search = SearchState::empty_match(
                    pattern,
                    self.state.index.bucket_count(),
                    self.state.flame.total,
                );
                if let Err(repaint) = self.repaint() {
                    warn!("Cannot repaint heat cells: {}", repaint);
                }
                Err(e)
            }
        }
    }

    /// Run one scheduler time slice
    pub fn tick(&mut self) -> TickOutcome {
        self.scheduler.tick(&mut self.state)
    }

    /// Run scheduled work to completion; returns the number of ticks
    pub fn run_until_idle(&mut self) -> usize {
        self.scheduler.run_until_idle(&mut self.state)
    }
}
