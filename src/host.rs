//! The view side of the table.
//!
//! Work that needs a settled layout (measuring text, row heights, cell
//! positions) is not done while state is mutated. Mutators queue a
//! [`Deferred`] task instead, and the host runs the queue through
//! [`crate::DataTable::after_render`] once it has drawn the new state.

use std::collections::VecDeque;

use unicode_width::UnicodeWidthStr;

use crate::index::CellId;
use crate::row::RowKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Measures the pixel width of text as a cell would render it
pub trait TextMeasure {
    fn measure(&self, text: &str) -> u32;
}

/// Measures by terminal display columns (wide characters count twice)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeMeasure {
    pub pixels_per_char: u32,
    pub padding: u32,
}

impl UnicodeMeasure {
    pub fn new(pixels_per_char: u32, padding: u32) -> Self {
        Self { pixels_per_char, padding }
    }
}

impl TextMeasure for UnicodeMeasure {
    fn measure(&self, text: &str) -> u32 {
        let columns = u32::try_from(UnicodeWidthStr::width(text)).unwrap_or(u32::MAX);
        columns.saturating_mul(self.pixels_per_char).saturating_add(self.padding)
    }
}

/// Measurements the host provides after a render pass
pub trait LayoutHost {
    /// Width available to the table's columns
    fn available_width(&self) -> u32;

    fn viewport_height(&self) -> u32;

    fn scroll_top(&self) -> u32;

    /// Rendered height of a row, if the host measured it
    fn row_height(&self, _row: &RowKey) -> Option<u32> {
        None
    }

    /// Where a cell was drawn, used to anchor the edit panel
    fn cell_rect(&self, _cell: &CellId) -> Option<Rect> {
        None
    }

    /// Text measurement for auto width mode; None uses the table's default
    fn text_measure(&self) -> Option<&(dyn TextMeasure + Sync)> {
        None
    }
}

/// Work to run once layout is stable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Reallocate column widths, recomputing auto width ratios when forced
    AdjustWidths { force_ratios: bool },
    /// Move host focus onto the active cell
    RestoreFocus(CellId),
    /// Read rendered heights of the materialized rows
    MeasureRowHeights,
    /// Position the edit panel next to its cell
    PositionEditPanel,
}

/// FIFO of deferred tasks. Identical pending tasks are queued once.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    tasks: VecDeque<Deferred>,
}

impl DeferredQueue {
    pub fn push(&mut self, task: Deferred) {
        if let Deferred::AdjustWidths { force_ratios } = task {
            // a forced adjust subsumes an unforced one
            for pending in self.tasks.iter_mut() {
                if let Deferred::AdjustWidths { force_ratios: f } = pending {
                    *f |= force_ratios;
                    return;
                }
            }
        }
        if !self.tasks.contains(&task) {
            self.tasks.push_back(task);
        }
    }

    pub fn pop(&mut self) -> Option<Deferred> {
        self.tasks.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_measure_counts_wide_chars() {
        let m = UnicodeMeasure::new(8, 0);
        assert_eq!(m.measure("abc"), 24);
        assert_eq!(m.measure("日本"), 32);
        assert_eq!(UnicodeMeasure::new(8, 10).measure(""), 10);
        assert_eq!(UnicodeMeasure::new(u32::MAX, u32::MAX).measure("abc"), u32::MAX);
    }

    #[test]
    fn test_queue_is_fifo_and_deduplicated() {
        let mut q = DeferredQueue::default();
        q.push(Deferred::AdjustWidths { force_ratios: false });
        q.push(Deferred::MeasureRowHeights);
        q.push(Deferred::AdjustWidths { force_ratios: true });
        q.push(Deferred::MeasureRowHeights);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some(Deferred::AdjustWidths { force_ratios: true }));
        assert_eq!(q.pop(), Some(Deferred::MeasureRowHeights));
        assert!(q.pop().is_none());
    }
}
