//! Multi-resolution bucket index.
//!
//! The heatmap buffer holds one section per zoom level, finest first, and
//! ends with the index of the coarsest level. Each section lists its group
//! blocks (each followed by its length), then the group size, the group count
//! and the section length. Sections are discovered lazily by walking this
//! trailer backward, coarsest level first.

use crate::heatmap::cells::{HeatCell, SearchOverlay};
use crate::parser::buffer::ByteStream;
use crate::parser::methods::MethodTable;
use crate::search::matcher::MethodMatcher;
use crate::stacks::context::StackDecodingContext;
use crate::stacks::forest::GlobalStackForest;
use crate::utils::config::INT30_UNITS;
use crate::utils::error::{DecodeError, QueryError};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// One materialised resolution level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomLevel {
    /// Number of next-finer buckets folded into one bucket of this level
    pub group_size: u32,
    /// Byte offset of every group block
    pub offsets: Vec<usize>,
    /// Total weight of every group
    pub totals: Vec<u64>,
    pub max_total: u64,
}

impl ZoomLevel {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// A bucket at a given zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketRef {
    pub zoom: usize,
    pub index: usize,
}

impl BucketRef {
    pub fn new(zoom: usize, index: usize) -> Self {
        Self { zoom, index }
    }
}

/// Lazily materialised zoom levels with cached decoding contexts
#[derive(Debug)]
pub struct HeatmapIndex {
    data: ByteStream,
    forest: Arc<GlobalStackForest>,
    max_zoom: usize,
    zoom: usize,
    /// Indexed by zoom; filled from the coarsest level down
    levels: Vec<Option<ZoomLevel>>,
    /// Finest materialised level, `max_zoom + 1` before the first walk
    min_zoom: usize,
    /// End of the section that would be materialised next
    section_end: usize,
    contexts: Vec<HashMap<usize, StackDecodingContext>>,
}

fn trailer(reason: impl Into<String>) -> DecodeError {
    DecodeError::BadZoomTrailer(reason.into())
}

impl HeatmapIndex {
    /// Read the trailer and materialise the coarsest level
    pub fn new(data: ByteStream, forest: Arc<GlobalStackForest>) -> Result<Self, QueryError> {
        let end = data
            .len()
            .checked_sub(INT30_UNITS)
            .ok_or_else(|| trailer("buffer too short for the zoom count"))?;
        let max_zoom = data.int30_at(end)? as usize;
        // Every section ends with three fixed-width fields
        if max_zoom.saturating_add(1).saturating_mul(3 * INT30_UNITS) > end {
            return Err(trailer(format!(
                "{} zoom levels do not fit in {} bytes",
                max_zoom + 1,
                data.len()
            ))
            .into());
        }

        let mut index = Self {
            data,
            forest,
            max_zoom,
            zoom: max_zoom,
            levels: vec![None; max_zoom + 1],
            min_zoom: max_zoom + 1,
            section_end: end,
            contexts: (0..=max_zoom).map(|_| HashMap::new()).collect(),
        };
        index.heatmap(max_zoom)?;
        debug!("Heatmap index opened with {} zoom levels", max_zoom + 1);
        Ok(index)
    }

    pub fn max_zoom(&self) -> usize {
        self.max_zoom
    }

    pub fn zoom(&self) -> usize {
        self.zoom
    }

    pub fn forest(&self) -> &GlobalStackForest {
        &self.forest
    }

    /// Select the current zoom level, materialising it if needed
    pub fn set_zoom(&mut self, zoom: usize) -> Result<(), QueryError> {
        self.heatmap(zoom)?;
        self.zoom = zoom;
        Ok(())
    }

    fn read_section(&self, end: usize) -> Result<(ZoomLevel, usize), DecodeError> {
        let field = |pos: Option<usize>| -> Result<u32, DecodeError> {
            let pos = pos.ok_or_else(|| trailer("field before the start of the buffer"))?;
            self.data.int30_at(pos)
        };
        let section_len = field(end.checked_sub(INT30_UNITS))? as usize;
        let start = end
            .checked_sub(section_len + INT30_UNITS)
            .ok_or_else(|| trailer(format!("section of {} bytes ends at {}", section_len, end)))?;
        let count = field(end.checked_sub(2 * INT30_UNITS))? as usize;
        let group_size = field(end.checked_sub(3 * INT30_UNITS))?;
        if count > section_len {
            return Err(trailer(format!(
                "{} groups cannot fit in a {} byte section",
                count, section_len
            )));
        }

        let mut offsets = vec![0; count];
        let mut totals = vec![0; count];
        let mut max_total = 0;
        let mut pos = end.checked_sub(4 * INT30_UNITS);
        for i in (0..count).rev() {
            let len_pos = pos.ok_or_else(|| trailer("group length before the section"))?;
            let block_len = self.data.int30_at(len_pos)? as usize;
            let block = len_pos
                .checked_sub(block_len)
                .filter(|&b| b >= start)
                .ok_or_else(|| trailer(format!("group {} overruns its section", i)))?;
            let total = u64::from(self.data.var_int_at(block)?);
            offsets[i] = block;
            totals[i] = total;
            max_total = max_total.max(total);
            pos = block.checked_sub(INT30_UNITS);
        }
        if count > 0 && offsets[0] != start {
            return Err(trailer(format!(
                "groups start at {} but the section starts at {}",
                offsets[0], start
            )));
        }

        Ok((
            ZoomLevel {
                group_size,
                offsets,
                totals,
                max_total,
            },
            start,
        ))
    }

    /// Materialise `zoom` and every coarser level, returning `zoom`
    pub fn heatmap(&mut self, zoom: usize) -> Result<&ZoomLevel, QueryError> {
        if zoom > self.max_zoom {
            return Err(QueryError::IndexOutOfRange {
                what: "zoom",
                index: zoom,
                len: self.max_zoom + 1,
            });
        }
        while self.min_zoom > zoom {
            let level_zoom = self.min_zoom - 1;
            let (level, start) = self.read_section(self.section_end)?;
            debug!(
                "Materialised zoom {}: {} groups of {}, max {}",
                level_zoom,
                level.len(),
                level.group_size,
                level.max_total
            );
            self.levels[level_zoom] = Some(level);
            self.section_end = start;
            self.min_zoom = level_zoom;
        }
        self.level(zoom)
    }

    /// A level that has already been materialised
    pub fn level(&self, zoom: usize) -> Result<&ZoomLevel, QueryError> {
        self.levels
            .get(zoom)
            .and_then(Option::as_ref)
            .ok_or(QueryError::IndexOutOfRange {
                what: "materialised zoom",
                index: zoom,
                len: self.max_zoom + 1,
            })
    }

    /// The current zoom level
    pub fn current(&self) -> Result<&ZoomLevel, QueryError> {
        self.level(self.zoom)
    }

    /// Number of buckets at the current zoom
    pub fn bucket_count(&self) -> usize {
        self.current().map_or(0, ZoomLevel::len)
    }

    fn push_range(out: &mut Vec<BucketRef>, from: usize, to: usize, zoom: usize) {
        out.extend((from..=to).map(|index| BucketRef { zoom, index }));
    }

    fn collect_for_zoom(
        &self,
        from: usize,
        to: usize,
        zoom: usize,
        out: &mut Vec<BucketRef>,
    ) -> Result<(), QueryError> {
        if zoom < self.max_zoom {
            let coarse = self.level(zoom + 1)?;
            let group = coarse.group_size as usize;
            if group > 0 && !coarse.is_empty() {
                let from_next = from.div_ceil(group);
                let to_next = ((to + 1) / group)
                    .checked_sub(1)
                    .map(|t| t.min(coarse.len() - 1));
                if let Some(to_next) = to_next.filter(|&t| from_next <= t) {
                    let head_end = from_next * group;
                    if from < head_end {
                        Self::push_range(out, from, head_end - 1, zoom);
                    }
                    self.collect_for_zoom(from_next, to_next, zoom + 1, out)?;
                    let tail_start = (to_next + 1) * group;
                    if tail_start <= to {
                        Self::push_range(out, tail_start, to, zoom);
                    }
                    return Ok(());
                }
            }
        }
        Self::push_range(out, from, to, zoom);
        Ok(())
    }

    /// Buckets covering fine buckets `from..=to` of the current zoom
    ///
    /// Whole coarse groups are used wherever they fit; the result lists the
    /// leading remainder, the coarse middle, then the trailing remainder.
    pub fn collect_frames(&mut self, from: usize, to: usize) -> Result<Vec<BucketRef>, QueryError> {
        let len = self.heatmap(self.zoom)?.len();
        if from > to {
            return Ok(Vec::new());
        }
        if to >= len {
            return Err(QueryError::IndexOutOfRange {
                what: "bucket",
                index: to,
                len,
            });
        }
        let mut out = Vec::new();
        self.collect_for_zoom(from, to, self.zoom, &mut out)?;
        Ok(out)
    }

    /// Memoised decoding context of a bucket
    pub fn context(&mut self, bucket: BucketRef) -> Result<&mut StackDecodingContext, QueryError> {
        let level = self.level(bucket.zoom)?;
        let offset = *level
            .offsets
            .get(bucket.index)
            .ok_or(QueryError::IndexOutOfRange {
                what: "bucket",
                index: bucket.index,
                len: level.len(),
            })?;
        let data = &self.data;
        let forest = &self.forest;
        Ok(self.contexts[bucket.zoom]
            .entry(bucket.index)
            .or_insert_with(|| StackDecodingContext::open(data, offset, forest)))
    }

    /// Total weight of a bucket at the current zoom
    pub fn total_at(&self, index: usize) -> Result<u64, QueryError> {
        let level = self.current()?;
        level
            .totals
            .get(index)
            .copied()
            .ok_or(QueryError::IndexOutOfRange {
                what: "bucket",
                index,
                len: level.len(),
            })
    }

    /// Weight matched by the last search of a bucket at the current zoom
    ///
    /// Buckets never searched report 0.
    pub fn found_at(&self, index: usize) -> Result<u64, QueryError> {
        let len = self.current()?.len();
        if index >= len {
            return Err(QueryError::IndexOutOfRange {
                what: "bucket",
                index,
                len,
            });
        }
        Ok(self.contexts[self.zoom]
            .get(&index)
            .map_or(0, StackDecodingContext::found))
    }

    /// Fully decode a bucket at the current zoom and search it
    pub fn perform_search_at(
        &mut self,
        index: usize,
        matcher: &mut MethodMatcher,
        methods: &MethodTable,
    ) -> Result<u64, QueryError> {
        let context = self.context(BucketRef::new(self.zoom, index))?;
        if let Err(e) = context.load(usize::MAX) {
            warn!("Search of bucket {} stopped early: {}", index, e);
        }
        Ok(context.perform_search(|id| matcher.matches(id, methods)))
    }

    /// Forget found weights at the current zoom
    pub fn clear_found(&mut self) {
        for context in self.contexts[self.zoom].values_mut() {
            context.reset_found();
        }
    }

    /// Normalised cells for the current zoom
    ///
    /// Buckets below `overlay.executed` show their found weight against the
    /// search maximum; the rest show totals against the level maximum.
    pub fn heat_cells(&self, overlay: Option<SearchOverlay>) -> Result<Vec<HeatCell>, QueryError> {
        let level = self.current()?;
        Ok(level
            .totals
            .iter()
            .enumerate()
            .map(|(index, &total)| match overlay {
                Some(o) if index < o.executed => {
                    Ok(HeatCell::new(index, self.found_at(index)?, o.max, true))
                }
                _ => Ok(HeatCell::new(index, total, level.max_total, false)),
            })
            .collect::<Result<Vec<_>, QueryError>>()?)
    }
}
