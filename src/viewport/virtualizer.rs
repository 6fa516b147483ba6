use std::ops::Range;

use tracing::debug;

/// Sliding window of materialized rows over a scrolled list.
///
/// Rows without a measured height are estimated with the default row height.
/// Offsets are prefix sums, rebuilt lazily after a height changes.
#[derive(Debug, Clone)]
pub struct Virtualizer {
    row_height: u32,
    buffer_size: usize,
    /// Pixels from a rendered edge at which a scroll triggers a recompute
    threshold: u32,
    heights: Vec<Option<u32>>,
    measured: usize,
    /// offsets[i] is the top of row i; one extra entry for the total height
    offsets: Vec<u32>,
    offsets_dirty: bool,
    range: Range<usize>,
    scroll_top: u32,
    viewport_height: u32,
}

impl Virtualizer {
    pub fn new(row_height: u32, buffer_size: usize, threshold: u32) -> Self {
        Self {
            row_height: row_height.max(1),
            buffer_size,
            threshold,
            heights: Vec::new(),
            measured: 0,
            offsets: vec![0],
            offsets_dirty: false,
            range: 0..0,
            scroll_top: 0,
            viewport_height: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.heights.len()
    }

    /// Rows to materialize
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    fn ensure_offsets(&mut self) {
        if !self.offsets_dirty {
            return;
        }
        self.offsets.clear();
        self.offsets.reserve(self.heights.len() + 1);
        let mut top = 0u32;
        self.offsets.push(top);
        for h in &self.heights {
            top = top.saturating_add(h.unwrap_or(self.row_height));
            self.offsets.push(top);
        }
        self.offsets_dirty = false;
    }

    /// Top of row `row`, or the total height for `row == row_count()`
    pub fn offset_of(&mut self, row: usize) -> u32 {
        let row = row.min(self.heights.len());
        if self.measured == 0 {
            return (row as u32).saturating_mul(self.row_height);
        }
        self.ensure_offsets();
        self.offsets[row]
    }

    pub fn total_height(&mut self) -> u32 {
        self.offset_of(self.heights.len())
    }

    /// Row covering pixel offset `y`, clamped to the last row
    pub fn row_at_offset(&mut self, y: u32) -> usize {
        let last = self.heights.len().saturating_sub(1);
        if self.measured == 0 {
            return ((y / self.row_height) as usize).min(last);
        }
        self.ensure_offsets();
        self.offsets.partition_point(|&top| top <= y).saturating_sub(1).min(last)
    }

    /// Recompute the window for a scroll position. Returns whether it changed.
    pub fn compute(&mut self, scroll_top: u32, viewport_height: u32) -> bool {
        self.scroll_top = scroll_top;
        self.viewport_height = viewport_height;
        let count = self.heights.len();
        let range = if count == 0 {
            0..0
        } else {
            let first_visible = self.row_at_offset(scroll_top);
            let last_visible = self.row_at_offset(scroll_top.saturating_add(viewport_height.saturating_sub(1)));
            let first = first_visible.saturating_sub(self.buffer_size);
            let last = (last_visible + 1).saturating_add(self.buffer_size).min(count);
            first..last
        };
        if range == self.range {
            return false;
        }
        debug!(first = range.start, last = range.end, scroll_top, "virtual window moved");
        self.range = range;
        true
    }

    /// Handle a scroll event. The window is only recomputed when the visible
    /// area comes within the threshold of a rendered edge that is not the
    /// end of the list, or the viewport was resized.
    pub fn on_scroll(&mut self, scroll_top: u32, viewport_height: u32) -> bool {
        if viewport_height != self.viewport_height || self.range.is_empty() {
            return self.compute(scroll_top, viewport_height);
        }
        let top_edge = self.offset_of(self.range.start);
        let bottom_edge = self.offset_of(self.range.end);
        let bottom = scroll_top.saturating_add(viewport_height);

        let near_top = self.range.start > 0 && scroll_top < top_edge.saturating_add(self.threshold);
        let near_bottom =
            self.range.end < self.heights.len() && bottom.saturating_add(self.threshold) > bottom_edge;
        if near_top || near_bottom {
            self.compute(scroll_top, viewport_height)
        } else {
            self.scroll_top = scroll_top;
            false
        }
    }

    /// Resize to `count` rows, keeping measured heights of rows that remain
    pub fn set_row_count(&mut self, count: usize) -> bool {
        if count == self.heights.len() {
            return false;
        }
        if count < self.heights.len() {
            self.measured -= self.heights[count..].iter().filter(|h| h.is_some()).count();
        }
        self.heights.resize(count, None);
        self.offsets_dirty = true;
        self.compute(self.scroll_top, self.viewport_height)
    }

    /// Store a measured height. Returns whether it differed from the estimate.
    pub fn record_height(&mut self, row: usize, height: u32) -> bool {
        let Some(slot) = self.heights.get_mut(row) else {
            return false;
        };
        if *slot == Some(height) {
            return false;
        }
        if slot.is_none() {
            self.measured += 1;
        }
        *slot = Some(height);
        self.offsets_dirty = true;
        true
    }

    pub fn measured_height(&self, row: usize) -> Option<u32> {
        self.heights.get(row).copied().flatten()
    }

    /// Forget every measurement, e.g. after wrapping changed
    pub fn reset_heights(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = None);
        self.measured = 0;
        self.offsets_dirty = true;
    }
}
