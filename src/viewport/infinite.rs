use tracing::debug;

/// Load-more trigger for tables whose host appends rows on demand
#[derive(Debug, Clone, Default)]
pub struct InfiniteLoading {
    enabled: bool,
    /// Distance in pixels from the end of the content that triggers a load
    load_more_offset: u32,
    is_loading: bool,
}

impl InfiniteLoading {
    pub fn new(enabled: bool, load_more_offset: u32) -> Self {
        Self { enabled, load_more_offset, is_loading: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The host reports whether a load is in flight; clearing it re-arms the trigger
    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Whether to request more rows. Fires once, then stays quiet until the
    /// host clears the loading flag.
    pub fn check(&mut self, scroll_top: u32, viewport_height: u32, content_height: u32) -> bool {
        if !self.enabled || self.is_loading {
            return false;
        }
        let bottom = scroll_top.saturating_add(viewport_height);
        let unfilled = content_height <= viewport_height;
        let near_end = bottom.saturating_add(self.load_more_offset) >= content_height;
        if unfilled || near_end {
            debug!(scroll_top, content_height, "requesting more rows");
            self.is_loading = true;
            return true;
        }
        false
    }
}
