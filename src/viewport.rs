pub mod infinite;
pub mod virtualizer;

use std::ops::Range;

use crate::config::{InfiniteLoadingConfig, RenderConfig};

pub use infinite::InfiniteLoading;
pub use virtualizer::Virtualizer;

/// How many rows get materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    #[default]
    All,
    /// Grow the rendered prefix as the user scrolls, never shrink it
    Viewport,
    /// Sliding window around the visible rows
    Virtual,
}

impl RenderStrategy {
    pub fn from_config(config: &RenderConfig) -> Self {
        if config.virtualize {
            RenderStrategy::Virtual
        } else if config.viewport_rendering {
            RenderStrategy::Viewport
        } else {
            RenderStrategy::All
        }
    }
}

/// Simple viewport rendering: a monotonically growing count of rendered rows
#[derive(Debug, Clone)]
pub struct ViewportRenderer {
    row_height: u32,
    buffer_size: usize,
    rendered: usize,
}

impl ViewportRenderer {
    pub fn new(row_height: u32, buffer_size: usize) -> Self {
        Self { row_height: row_height.max(1), buffer_size, rendered: 0 }
    }

    /// Rows that fill one viewport plus the buffer
    fn page(&self, viewport_height: u32) -> usize {
        (viewport_height.div_ceil(self.row_height) as usize).saturating_add(self.buffer_size)
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn range(&self, row_count: usize) -> Range<usize> {
        0..self.rendered.min(row_count)
    }

    fn grow_to(&mut self, target: usize) -> bool {
        if target > self.rendered {
            self.rendered = target;
            true
        } else {
            false
        }
    }

    /// Make sure the first page is rendered once rows arrive
    pub fn on_rows(&mut self, row_count: usize, viewport_height: u32) -> bool {
        let before = self.range(row_count);
        self.grow_to(self.page(viewport_height));
        before != self.range(row_count)
    }

    /// Render another page when the visible bottom nears the rendered end
    pub fn on_scroll(&mut self, scroll_top: u32, viewport_height: u32, row_count: usize) -> bool {
        let rendered_bottom = (self.rendered.min(row_count) as u32).saturating_mul(self.row_height);
        let threshold = u32::try_from(self.buffer_size).unwrap_or(u32::MAX).saturating_mul(self.row_height);
        let bottom = scroll_top.saturating_add(viewport_height);
        if self.rendered >= row_count || bottom.saturating_add(threshold) <= rendered_bottom {
            return false;
        }
        let before = self.range(row_count);
        let page = self.page(viewport_height);
        let needed = ((bottom / self.row_height) as usize).saturating_add(self.buffer_size);
        self.grow_to(self.rendered.saturating_add(page).max(needed));
        before != self.range(row_count)
    }

    pub fn reset(&mut self) {
        self.rendered = 0;
    }
}

/// Row materialization for one table
#[derive(Debug, Clone)]
pub struct Viewport {
    strategy: RenderStrategy,
    renderer: ViewportRenderer,
    virtualizer: Virtualizer,
    infinite: InfiniteLoading,
    row_count: usize,
    scroll_top: u32,
    viewport_height: u32,
}

/// Result of a scroll event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOutcome {
    pub range_changed: bool,
    pub load_more: bool,
}

impl Viewport {
    pub fn new(render: &RenderConfig, infinite: &InfiniteLoadingConfig) -> Self {
        Self {
            strategy: RenderStrategy::from_config(render),
            renderer: ViewportRenderer::new(render.row_height, render.buffer_size),
            virtualizer: Virtualizer::new(render.row_height, render.buffer_size, render.scroll_threshold),
            infinite: InfiniteLoading::new(infinite.enabled, infinite.load_more_offset),
            row_count: 0,
            scroll_top: 0,
            viewport_height: 0,
        }
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    pub fn infinite(&self) -> &InfiniteLoading {
        &self.infinite
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.infinite.set_loading(loading);
    }

    pub fn set_infinite_enabled(&mut self, enabled: bool) {
        self.infinite.set_enabled(enabled);
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    /// Rows to materialize
    pub fn range(&self) -> Range<usize> {
        match self.strategy {
            RenderStrategy::All => 0..self.row_count,
            RenderStrategy::Viewport => self.renderer.range(self.row_count),
            RenderStrategy::Virtual => self.virtualizer.range(),
        }
    }

    /// Estimated height of all rows
    pub fn content_height(&mut self) -> u32 {
        self.virtualizer.total_height()
    }

    /// The row set changed size. Measured heights are dropped when the rows
    /// themselves changed.
    pub fn set_row_count(&mut self, row_count: usize, rows_replaced: bool) -> bool {
        let before = self.range();
        self.row_count = row_count;
        if rows_replaced {
            self.virtualizer.reset_heights();
        }
        self.virtualizer.set_row_count(row_count);
        self.renderer.on_rows(row_count, self.viewport_height);
        before != self.range()
    }

    pub fn on_scroll(&mut self, scroll_top: u32, viewport_height: u32) -> ScrollOutcome {
        let before = self.range();
        self.scroll_top = scroll_top;
        self.viewport_height = viewport_height;
        match self.strategy {
            RenderStrategy::All => {}
            RenderStrategy::Viewport => {
                self.renderer.on_rows(self.row_count, viewport_height);
                self.renderer.on_scroll(scroll_top, viewport_height, self.row_count);
            }
            RenderStrategy::Virtual => {
                self.virtualizer.on_scroll(scroll_top, viewport_height);
            }
        }
        let content_height = self.virtualizer.total_height();
        ScrollOutcome {
            range_changed: before != self.range(),
            load_more: self.infinite.check(scroll_top, viewport_height, content_height),
        }
    }

    /// Store a measured row height; the window is recomputed if it moved
    pub fn record_row_height(&mut self, row: usize, height: u32) -> bool {
        if !self.virtualizer.record_height(row, height) {
            return false;
        }
        self.strategy == RenderStrategy::Virtual && self.virtualizer.compute(self.scroll_top, self.viewport_height)
    }

    /// Something that affects row heights changed, e.g. text wrapping
    pub fn reset(&mut self) -> bool {
        let before = self.range();
        self.virtualizer.reset_heights();
        self.virtualizer.compute(self.scroll_top, self.viewport_height);
        self.renderer.reset();
        self.renderer.on_rows(self.row_count, self.viewport_height);
        self.renderer.on_scroll(self.scroll_top, self.viewport_height, self.row_count);
        before != self.range()
    }

    /// Apply a changed render configuration
    pub fn reconfigure(&mut self, render: &RenderConfig, infinite: &InfiniteLoadingConfig) -> bool {
        let before = self.range();
        let loading = self.infinite.is_loading();
        *self = Viewport {
            row_count: self.row_count,
            scroll_top: self.scroll_top,
            viewport_height: self.viewport_height,
            ..Viewport::new(render, infinite)
        };
        self.infinite.set_loading(loading);
        self.virtualizer.set_row_count(self.row_count);
        self.virtualizer.compute(self.scroll_top, self.viewport_height);
        self.renderer.on_rows(self.row_count, self.viewport_height);
        before != self.range()
    }
}
