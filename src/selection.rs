use std::collections::HashSet;

use tracing::{debug, warn};

use crate::index::CellIndex;
use crate::row::RowKey;

/// Aggregate state of the select-all control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkSelection {
    #[default]
    None,
    Some,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionAction {
    SelectRow,
    DeselectRow,
    SelectRange,
    DeselectRange,
    SelectAll,
    DeselectAll,
    Programmatic,
}

/// Rows whose selection or selectability changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDelta {
    pub added: Vec<RowKey>,
    pub removed: Vec<RowKey>,
    /// Unselected rows flipped between enabled and disabled
    pub disabled_toggled: bool,
}

impl SelectionDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.disabled_toggled
    }
}

/// Selected rows by key, bounded by an optional maximum.
///
/// With a maximum of one, selecting replaces the previous row. With a larger
/// maximum, reaching it disables every unselected row until one is deselected.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    max_row_selection: Option<usize>,
    selected: HashSet<RowKey>,
    /// Last explicitly selected row, start of shift-click intervals
    anchor: Option<RowKey>,
}

impl SelectionState {
    pub fn new(max_row_selection: Option<usize>) -> Self {
        Self { max_row_selection, ..Default::default() }
    }

    pub fn max_row_selection(&self) -> Option<usize> {
        self.max_row_selection
    }

    pub fn is_radio(&self) -> bool {
        self.max_row_selection == Some(1)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.selected.contains(key)
    }

    fn at_capacity(&self) -> bool {
        match self.max_row_selection {
            Some(0) => true,
            Some(1) => false,
            Some(max) => self.selected.len() >= max,
            None => false,
        }
    }

    /// Whether an unselected row currently refuses selection
    pub fn is_disabled(&self, key: &RowKey) -> bool {
        !self.is_selected(key) && self.at_capacity()
    }

    /// Selected rows in display order
    pub fn selected_rows(&self, index: &CellIndex) -> Vec<RowKey> {
        let mut rows: Vec<(usize, &RowKey)> = self
            .selected
            .iter()
            .filter_map(|k| index.row(k).map(|r| (r.ordinal, k)))
            .collect();
        rows.sort_by_key(|(ordinal, _)| *ordinal);
        rows.into_iter().map(|(_, k)| k.clone()).collect()
    }

    pub fn bulk_state(&self, index: &CellIndex) -> BulkSelection {
        let count = self.selected.len();
        if count == 0 {
            return BulkSelection::None;
        }
        let full = match self.max_row_selection {
            Some(max) => max.min(index.row_count()),
            None => index.row_count(),
        };
        if count >= full {
            BulkSelection::All
        } else {
            BulkSelection::Some
        }
    }

    fn insert(&mut self, key: &RowKey, delta: &mut SelectionDelta) {
        let was_full = self.at_capacity();
        if self.selected.insert(key.clone()) {
            delta.added.push(key.clone());
        }
        delta.disabled_toggled |= was_full != self.at_capacity();
    }

    fn remove(&mut self, key: &RowKey, delta: &mut SelectionDelta) {
        let was_full = self.at_capacity();
        if self.selected.remove(key) {
            delta.removed.push(key.clone());
        }
        delta.disabled_toggled |= was_full != self.at_capacity();
    }

    pub fn select_row(&mut self, index: &CellIndex, key: &RowKey) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        if !index.contains_row(key) || self.is_selected(key) || self.is_disabled(key) {
            return delta;
        }
        if self.is_radio() {
            let previous: Vec<RowKey> = self.selected.iter().cloned().collect();
            for prev in &previous {
                self.remove(prev, &mut delta);
            }
        }
        self.insert(key, &mut delta);
        self.anchor = Some(key.clone());
        delta
    }

    pub fn deselect_row(&mut self, index: &CellIndex, key: &RowKey) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        if index.contains_row(key) {
            self.remove(key, &mut delta);
            self.anchor = Some(key.clone());
        }
        delta
    }

    /// Ordinals spanned by the anchor and `key`, walking away from the anchor
    fn interval(&self, index: &CellIndex, key: &RowKey) -> Option<Vec<RowKey>> {
        let target = index.row(key)?.ordinal;
        let start = self.anchor.as_ref().and_then(|a| index.row(a)).map(|r| r.ordinal)?;
        let ordinals: Box<dyn Iterator<Item = usize>> = if start <= target {
            Box::new(start..=target)
        } else {
            Box::new((target..=start).rev())
        };
        Some(ordinals.filter_map(|i| index.row_at(i).map(|r| r.key.clone())).collect())
    }

    /// Shift-click: select every row between the anchor and `key`, up to the maximum
    pub fn select_range(&mut self, index: &CellIndex, key: &RowKey) -> SelectionDelta {
        if self.is_radio() {
            return self.select_row(index, key);
        }
        let Some(rows) = self.interval(index, key) else {
            return self.select_row(index, key);
        };
        let mut delta = SelectionDelta::default();
        for row in rows {
            if !self.is_selected(&row) && !self.is_disabled(&row) {
                self.insert(&row, &mut delta);
            }
        }
        self.anchor = Some(key.clone());
        delta
    }

    pub fn deselect_range(&mut self, index: &CellIndex, key: &RowKey) -> SelectionDelta {
        let Some(rows) = self.interval(index, key) else {
            return self.deselect_row(index, key);
        };
        let mut delta = SelectionDelta::default();
        for row in rows {
            self.remove(&row, &mut delta);
        }
        self.anchor = Some(key.clone());
        delta
    }

    /// Select rows in display order until the maximum is reached
    pub fn select_all(&mut self, index: &CellIndex) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        if self.is_radio() {
            return delta;
        }
        for row in index.rows() {
            if self.is_disabled(&row.key) {
                break;
            }
            if !self.is_selected(&row.key) {
                self.insert(&row.key, &mut delta);
            }
        }
        delta
    }

    pub fn deselect_all(&mut self) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        let keys: Vec<RowKey> = self.selected.iter().cloned().collect();
        for key in &keys {
            self.remove(key, &mut delta);
        }
        self.anchor = None;
        delta
    }

    /// Replace the selection. Unknown keys are dropped, extra keys beyond the
    /// maximum are truncated, and only the difference is applied.
    pub fn set_selected_rows(&mut self, index: &CellIndex, keys: &[RowKey]) -> SelectionDelta {
        let mut wanted: Vec<RowKey> = Vec::with_capacity(keys.len());
        let mut seen = HashSet::new();
        for key in keys {
            if index.contains_row(key) && seen.insert(key) {
                wanted.push(key.clone());
            }
        }
        if let Some(max) = self.max_row_selection {
            if wanted.len() > max {
                warn!(requested = wanted.len(), max, "more selected rows than allowed, truncating");
                wanted.truncate(max);
            }
        }

        let wanted_set: HashSet<&RowKey> = wanted.iter().collect();
        let mut delta = SelectionDelta::default();
        let stale: Vec<RowKey> = self.selected.iter().filter(|k| !wanted_set.contains(k)).cloned().collect();
        for key in &stale {
            self.remove(key, &mut delta);
        }
        for key in &wanted {
            if !self.is_selected(key) {
                self.insert(key, &mut delta);
            }
        }
        if let Some(last) = wanted.last() {
            self.anchor = Some(last.clone());
        }
        debug!(added = delta.added.len(), removed = delta.removed.len(), "applied programmatic selection");
        delta
    }

    /// Change the maximum, dropping the last rows (in display order) above it
    pub fn set_max_row_selection(&mut self, index: &CellIndex, max: Option<usize>) -> SelectionDelta {
        let was_full = self.at_capacity();
        self.max_row_selection = max;
        let mut delta = SelectionDelta::default();
        if let Some(max) = max {
            let rows = self.selected_rows(index);
            if rows.len() > max {
                warn!(selected = rows.len(), max, "max row selection lowered, deselecting rows");
                for key in &rows[max..] {
                    self.remove(key, &mut delta);
                }
            }
        }
        delta.disabled_toggled |= was_full != self.at_capacity();
        delta
    }

    /// Drop keys that no longer name a row, after a rebuild
    pub fn retain_valid(&mut self, index: &CellIndex) -> SelectionDelta {
        let stale: Vec<RowKey> = self.selected.iter().filter(|k| !index.contains_row(k)).cloned().collect();
        let mut delta = SelectionDelta::default();
        for key in &stale {
            self.remove(key, &mut delta);
        }
        if self.anchor.as_ref().is_some_and(|a| !index.contains_row(a)) {
            self.anchor = None;
        }
        delta
    }
}

#[cfg(test)]
mod test;
