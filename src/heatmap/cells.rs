//! Heat cells handed to the colour-scale renderer.

use serde::Serialize;

/// Progress of a running search, used to overlay found weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOverlay {
    /// Buckets `0..executed` have been searched
    pub executed: usize,
    /// Largest found weight so far
    pub max: u64,
}

/// One bucket's value normalised against its scale maximum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatCell {
    pub index: usize,
    pub value: u64,
    /// `value / max` in `[0, 1]`; 0 when the maximum is 0
    pub ratio: f64,
    /// Value is a search hit weight rather than a total
    pub searched: bool,
}

impl HeatCell {
    pub fn new(index: usize, value: u64, max: u64, searched: bool) -> Self {
        let ratio = if max == 0 {
            0.0
        } else {
            (value as f64 / max as f64).min(1.0)
        };
        Self {
            index,
            value,
            ratio,
            searched,
        }
    }

    /// Column and row of the cell in a grid `height` cells tall
    pub fn grid_position(&self, height: usize) -> (usize, usize) {
        let height = height.max(1);
        (self.index / height, self.index % height)
    }
}
