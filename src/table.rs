use std::collections::HashMap;
use std::ops::Range;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::column::{
    resolve_columns, row_number_width, CellType, CellTypeRegistry, Column, ColumnDefinition, ColumnKey,
    ColumnKind, InternalColumn, InternalColumns, CLIP_TEXT_ACTION, WRAP_TEXT_ACTION,
};
use crate::config::{RenderConfig, TableConfig, TextDirection};
use crate::edit::{CloseReason, DirtyValues, DraftRow, EditPanel, InlineEditSession, TableErrors};
use crate::event::{Changes, TableEvent};
use crate::host::{Deferred, DeferredQueue, LayoutHost};
use crate::index::{CellContext, CellId, CellIndex, RowId};
use crate::keyboard::{KeyOutcome, KeyboardState, NavKey};
use crate::row::tree::{flatten_tree, is_hierarchical, TreeState};
use crate::row::{flatten_flat, Record, RowKey, RowRecord};
use crate::selection::{BulkSelection, SelectionAction, SelectionDelta, SelectionState};
use crate::sort::{SortDirection, SortState};
use crate::viewport::Viewport;
use crate::width::ColumnWidthManager;

/// State of one interactive table.
///
/// Every mutator returns the [`Changes`] it caused and may queue
/// [`TableEvent`]s for the host and [`Deferred`] work for
/// [`DataTable::after_render`]. Rows, columns and the cell index are rebuilt
/// whole whenever data or columns change; focus, selection and dirty values
/// carry over by key.
#[derive(Debug)]
pub struct DataTable {
    config: TableConfig,
    registry: CellTypeRegistry,
    definitions: Vec<ColumnDefinition>,
    columns: Vec<Column>,
    /// Wrap state set through header actions, kept across column changes
    wrap_overrides: HashMap<ColumnKey, bool>,
    records: Vec<Record>,
    tree: TreeState,
    index: CellIndex,
    widths: ColumnWidthManager,
    selection: SelectionState,
    /// Selection from the config, applied once rows exist
    initial_selection: Option<Vec<RowKey>>,
    keyboard: KeyboardState,
    viewport: Viewport,
    edit: InlineEditSession,
    sort: SortState,
    errors: TableErrors,
    deferred: DeferredQueue,
    /// Cell the host should move real focus to
    focus_request: Option<CellId>,
    events: Vec<TableEvent>,
}

impl DataTable {
    pub fn new(config: TableConfig) -> Self {
        Self::with_registry(config, CellTypeRegistry::new())
    }

    pub fn with_registry(config: TableConfig, registry: CellTypeRegistry) -> Self {
        let initial_selection = Some(config.selection.selected_rows.clone()).filter(|s| !s.is_empty());
        let mut table = Self {
            registry,
            definitions: Vec::new(),
            columns: Vec::new(),
            wrap_overrides: HashMap::new(),
            records: Vec::new(),
            tree: TreeState::default(),
            index: CellIndex::new(),
            widths: ColumnWidthManager::new(),
            selection: SelectionState::new(config.selection.max_row_selection),
            initial_selection,
            keyboard: KeyboardState::new(config.text_direction, config.hide_table_header),
            viewport: Viewport::new(&config.render, &config.infinite_loading),
            edit: InlineEditSession::new(),
            sort: SortState::new(
                config.sort.sorted_by.clone(),
                config.sort.sorted_direction,
                config.sort.default_sort_direction,
            ),
            errors: TableErrors::default(),
            deferred: DeferredQueue::default(),
            focus_request: None,
            events: Vec::new(),
            config,
        };
        table.rebuild(false);
        table
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&Column> {
        self.columns.iter().find(|c| &c.key == key)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn index(&self) -> &CellIndex {
        &self.index
    }

    pub fn widths(&self) -> &ColumnWidthManager {
        &self.widths
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn errors(&self) -> &TableErrors {
        &self.errors
    }

    pub fn edit_panel(&self) -> Option<&EditPanel> {
        self.edit.panel()
    }

    pub fn dirty_values(&self) -> &DirtyValues {
        self.edit.dirty()
    }

    pub fn active_cell(&self) -> Option<&CellId> {
        self.keyboard.active()
    }

    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    /// Cell the host should focus, consumed on read
    pub fn take_focus_request(&mut self) -> Option<CellId> {
        self.focus_request.take()
    }

    pub fn has_deferred_work(&self) -> bool {
        !self.deferred.is_empty()
    }

    // --- data and columns ---

    pub fn set_columns(&mut self, definitions: Vec<ColumnDefinition>) -> Changes {
        self.definitions = definitions;
        self.widths.mark_ratios_dirty();
        self.rebuild(false)
    }

    pub fn set_data(&mut self, records: Vec<Record>) -> Changes {
        self.records = records;
        self.widths.mark_ratios_dirty();
        let mut changes = self.rebuild(true);
        if self.index.row_count() > 0 {
            if let Some(keys) = self.initial_selection.take() {
                let delta = self.selection.set_selected_rows(&self.index, &keys);
                changes |= self.selection_changed(&delta);
            }
        }
        changes
    }

    pub fn set_errors(&mut self, errors: TableErrors) -> Changes {
        self.errors = errors;
        self.rebuild(false)
    }

    pub fn set_sort(&mut self, sorted_by: Option<String>, direction: Option<SortDirection>) -> Changes {
        self.sort.set(sorted_by, direction);
        Changes { sort: true, ..self.rebuild(false) }
    }

    pub fn set_render_config(&mut self, render: RenderConfig) -> Changes {
        self.config.render = render;
        if self.viewport.reconfigure(&self.config.render, &self.config.infinite_loading) {
            self.deferred.push(Deferred::MeasureRowHeights);
            Changes::viewport()
        } else {
            Changes::NONE
        }
    }

    pub fn set_max_row_selection(&mut self, max: Option<usize>) -> Changes {
        let before = (self.shows_checkbox(), self.offers_select_all());
        self.config.selection.max_row_selection = max;
        let delta = self.selection.set_max_row_selection(&self.index, max);
        let mut changes = self.selection_changed(&delta);
        if before != (self.shows_checkbox(), self.offers_select_all()) {
            changes |= self.rebuild(false);
        }
        changes
    }

    /// Hide or show the header row. Focus on a hidden header moves to the
    /// first data row.
    pub fn set_hide_table_header(&mut self, hidden: bool) -> Changes {
        if self.config.hide_table_header == hidden {
            return Changes::NONE;
        }
        self.config.hide_table_header = hidden;
        self.keyboard.set_header_hidden(hidden);
        let mut changes = Changes::rows();
        if let Some(previous) = self.keyboard.reconcile(&self.index) {
            debug!(?previous, active = ?self.keyboard.active(), "active cell left the header");
            changes |= self.sync_active(previous.as_ref());
        }
        changes
    }

    /// Left and Right arrows are mirrored for right-to-left tables
    pub fn set_text_direction(&mut self, direction: TextDirection) -> Changes {
        if self.config.text_direction == direction {
            return Changes::NONE;
        }
        self.config.text_direction = direction;
        self.keyboard.set_direction(direction);
        Changes::focus()
    }

    pub fn set_infinite_loading(&mut self, enabled: bool) {
        self.config.infinite_loading.enabled = enabled;
        self.viewport.set_infinite_enabled(enabled);
    }

    fn shows_checkbox(&self) -> bool {
        !self.config.hide_checkbox_column && self.config.selection.max_row_selection != Some(0)
    }

    /// Radio selection has no select-all control
    fn offers_select_all(&self) -> bool {
        self.shows_checkbox() && self.config.selection.max_row_selection != Some(1)
    }

    /// Re-derive rows, columns and cells, then re-resolve everything that
    /// refers to them by key.
    fn rebuild(&mut self, rows_replaced: bool) -> Changes {
        let mut changes = Changes::rows();
        let key_field = self.config.key_field.as_deref();
        let rows = if is_hierarchical(&self.records) {
            flatten_tree(&self.records, key_field, &self.tree)
        } else {
            flatten_flat(&self.records, key_field)
        };

        let internal = InternalColumns {
            row_numbers: self.config.show_row_number_column,
            checkbox: self.shows_checkbox(),
        };
        let max_number = rows.len() + self.config.row_number_offset;
        let mut columns = resolve_columns(
            &self.definitions,
            &self.registry,
            internal,
            row_number_width(max_number, self.config.widths.pixels_per_char),
        );
        for column in columns.iter_mut() {
            if let Some(&wrap) = self.wrap_overrides.get(&column.key) {
                column.wrap_text = wrap;
            }
        }
        if columns.iter().map(|c| &c.key).ne(self.columns.iter().map(|c| &c.key)) {
            changes.columns = true;
            self.widths.mark_ratios_dirty();
        }
        self.columns = columns;
        self.widths.retain_columns(&self.columns);

        let ctx = CellContext {
            registry: &self.registry,
            dirty: self.edit.dirty(),
            errors: &self.errors,
            sort: &self.sort,
            row_number_offset: self.config.row_number_offset,
            select_all: self.offers_select_all(),
        };
        self.index.rebuild(&rows, &self.columns, &ctx);

        let delta = self.selection.retain_valid(&self.index);
        changes.selection = !delta.is_empty();

        if let Some(previous) = self.keyboard.reconcile(&self.index) {
            debug!(?previous, active = ?self.keyboard.active(), "active cell moved by rebuild");
            changes.focus = true;
            if let Some(active) = self.keyboard.active().cloned() {
                self.deferred.push(Deferred::RestoreFocus(active));
            }
        }
        if let Some(active) = self.keyboard.active().cloned() {
            self.index.set_active(&active, true);
        }

        if let Some(panel) = self.edit.panel() {
            if !self.index.contains(&CellId::new(panel.row_key.clone(), panel.column_key.clone())) {
                debug!(row = %panel.row_key, column = %panel.column_key, "edited cell is gone, closing panel");
                self.edit.discard();
                changes.edit = true;
            } else {
                let marked = panel.marked_rows.clone();
                let column = panel.column_key.clone();
                for row in &marked {
                    self.index.set_aria_selected(row, &column, true);
                }
            }
        }

        changes.viewport = self.viewport.set_row_count(self.index.row_count(), rows_replaced);
        if changes.viewport {
            self.deferred.push(Deferred::MeasureRowHeights);
        }
        self.deferred.push(Deferred::AdjustWidths { force_ratios: false });
        changes
    }

    // --- tree data ---

    pub fn expand_row(&mut self, key: &RowKey) -> Changes {
        match self.index.row(key) {
            Some(row) if row.has_children() && !row.is_expanded() => {
                self.tree.expand(key);
                self.rebuild(true)
            }
            _ => Changes::NONE,
        }
    }

    pub fn collapse_row(&mut self, key: &RowKey) -> Changes {
        if self.tree.collapse(key) {
            self.rebuild(true)
        } else {
            Changes::NONE
        }
    }

    pub fn toggle_row(&mut self, key: &RowKey) -> Changes {
        if self.tree.is_expanded(key) {
            self.collapse_row(key)
        } else {
            self.expand_row(key)
        }
    }

    pub fn set_expanded_rows(&mut self, keys: Vec<RowKey>) -> Changes {
        self.tree.set_expanded(keys);
        self.rebuild(true)
    }

    // --- selection ---

    fn selection_changed(&self, delta: &SelectionDelta) -> Changes {
        if delta.is_empty() {
            Changes::NONE
        } else {
            Changes::selection()
        }
    }

    fn emit_selection(&mut self, delta: SelectionDelta, action: SelectionAction, row: Option<&RowKey>) -> Changes {
        if delta.added.is_empty() && delta.removed.is_empty() {
            return self.selection_changed(&delta);
        }
        self.events.push(TableEvent::RowSelectionChanged {
            selected_rows: self.selection.selected_rows(&self.index),
            action,
            changed_row: row.cloned(),
        });
        Changes::selection()
    }

    /// Select a row; with `shift`, the interval from the last selected row
    pub fn select_row(&mut self, key: &RowKey, shift: bool) -> Changes {
        let (delta, action) = if shift {
            (self.selection.select_range(&self.index, key), SelectionAction::SelectRange)
        } else {
            (self.selection.select_row(&self.index, key), SelectionAction::SelectRow)
        };
        self.emit_selection(delta, action, Some(key))
    }

    pub fn deselect_row(&mut self, key: &RowKey, shift: bool) -> Changes {
        let (delta, action) = if shift {
            (self.selection.deselect_range(&self.index, key), SelectionAction::DeselectRange)
        } else {
            (self.selection.deselect_row(&self.index, key), SelectionAction::DeselectRow)
        };
        self.emit_selection(delta, action, Some(key))
    }

    pub fn toggle_row_selection(&mut self, key: &RowKey, shift: bool) -> Changes {
        if self.selection.is_selected(key) {
            self.deselect_row(key, shift)
        } else {
            self.select_row(key, shift)
        }
    }

    pub fn select_all(&mut self) -> Changes {
        let delta = self.selection.select_all(&self.index);
        self.emit_selection(delta, SelectionAction::SelectAll, None)
    }

    pub fn deselect_all(&mut self) -> Changes {
        let delta = self.selection.deselect_all();
        self.emit_selection(delta, SelectionAction::DeselectAll, None)
    }

    /// Replace the selection from the host; no event is emitted
    pub fn set_selected_rows(&mut self, keys: &[RowKey]) -> Changes {
        if self.index.row_count() == 0 {
            self.initial_selection = Some(keys.to_vec());
            return Changes::NONE;
        }
        let delta = self.selection.set_selected_rows(&self.index, keys);
        self.selection_changed(&delta)
    }

    pub fn selected_rows(&self) -> Vec<RowKey> {
        self.selection.selected_rows(&self.index)
    }

    pub fn bulk_selection(&self) -> BulkSelection {
        self.selection.bulk_state(&self.index)
    }

    pub fn is_row_disabled(&self, key: &RowKey) -> bool {
        self.selection.is_disabled(key)
    }

    // --- keyboard and focus ---

    /// Move the active flag from `from` to the keyboard's active cell
    fn sync_active(&mut self, from: Option<&CellId>) -> Changes {
        if let Some(from) = from {
            self.index.set_active(from, false);
        }
        if let Some(to) = self.keyboard.active().cloned() {
            self.index.set_active(&to, true);
            self.deferred.push(Deferred::RestoreFocus(to));
        }
        Changes::focus()
    }

    pub fn focus_cell(&mut self, cell: &CellId) -> Changes {
        let previous = self.keyboard.active().cloned();
        match self.keyboard.focus_cell(cell, &self.index) {
            Some(_) => self.sync_active(previous.as_ref()),
            None => Changes::NONE,
        }
    }

    pub fn handle_key(&mut self, key: NavKey) -> Changes {
        if self.edit.is_open() {
            let reason = match key {
                NavKey::Escape => CloseReason::EditCanceled,
                NavKey::Enter => CloseReason::SubmitAction,
                NavKey::Tab => CloseReason::TabPressedNext,
                NavKey::BackTab => CloseReason::TabPressedPrev,
                _ => return Changes::NONE,
            };
            return self.close_inline_edit(reason);
        }
        let previous = self.keyboard.active().cloned();
        let outcome = self.keyboard.handle_key(key, &self.index);
        self.apply_key_outcome(key, outcome, previous)
    }

    fn apply_key_outcome(&mut self, key: NavKey, outcome: KeyOutcome, previous: Option<CellId>) -> Changes {
        match outcome {
            KeyOutcome::Ignored | KeyOutcome::ExitGrid(_) => Changes::NONE,
            KeyOutcome::Moved { .. } | KeyOutcome::RowFocused(_) => self.sync_active(previous.as_ref()),
            KeyOutcome::EnterAction { .. } | KeyOutcome::ActionElement { .. } | KeyOutcome::ExitAction { .. } => {
                Changes::focus()
            }
            KeyOutcome::Expand(row) => self.expand_row(&row),
            KeyOutcome::Collapse(row) => self.collapse_row(&row),
            KeyOutcome::Activate { cell, element } => self.activate(&cell, element, key),
            KeyOutcome::Edit(cell) => self.open_inline_edit(&cell),
        }
    }

    /// Enter or Space on an actionable element of a cell.
    /// Checkboxes toggle on Space only.
    fn activate(&mut self, cell: &CellId, element: usize, key: NavKey) -> Changes {
        let Some(column) = self.column(&cell.column).cloned() else {
            return Changes::NONE;
        };
        let is_checkbox = column.kind == ColumnKind::Internal(InternalColumn::Checkbox);
        if is_checkbox && key != NavKey::Space {
            return Changes::NONE;
        }
        let row = match &cell.row {
            RowId::Header if is_checkbox => {
                return match self.bulk_selection() {
                    BulkSelection::All => self.deselect_all(),
                    _ => self.select_all(),
                };
            }
            RowId::Header => {
                // the sort button comes first, then the actions menu the host opens
                if column.sortable && element == 0 {
                    self.request_sort(&column.key);
                }
                return Changes::NONE;
            }
            RowId::Row(row) => row.clone(),
        };

        match &column.kind {
            ColumnKind::Internal(InternalColumn::Checkbox) => self.toggle_row_selection(&row, false),
            ColumnKind::Internal(InternalColumn::RowNumber) => Changes::NONE,
            ColumnKind::Data(CellType::Action | CellType::Button | CellType::ButtonIcon) => {
                let action = self
                    .index
                    .cell(&row, &column.key)
                    .and_then(|c| c.type_attributes.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| column.key.to_string());
                self.trigger_row_action(&row, &action);
                Changes::NONE
            }
            ColumnKind::Data(_) => {
                let is_tree_toggle = self.columns.iter().position(|c| !c.is_internal())
                    == self.index.column_index_of(&column.key)
                    && self.index.row(&row).is_some_and(RowRecord::has_children)
                    && element + 1 == self.index.actionable_elements(cell);
                if is_tree_toggle {
                    self.toggle_row(&row)
                } else {
                    Changes::NONE
                }
            }
        }
    }

    // --- sorting, resizing, actions ---

    /// Ask the host to sort by a column. Returns whether a request was emitted.
    pub fn request_sort(&mut self, column: &ColumnKey) -> bool {
        let Some(request) = self.column(column).and_then(|c| self.sort.request(c)) else {
            return false;
        };
        let (field_name, direction) = request;
        info!(field = %field_name, direction = direction.as_str(), "sort requested");
        self.events.push(TableEvent::SortRequested { field_name, direction });
        true
    }

    /// Resize a column by a pixel delta
    pub fn resize_column(&mut self, column: &ColumnKey, delta: i64) -> Changes {
        let Some(col) = self.column(column).cloned() else {
            return Changes::NONE;
        };
        match self.widths.resize_column(&col, delta, &self.config.widths) {
            Some(width) => self.column_resized(col.key, width),
            None => Changes::NONE,
        }
    }

    /// Keyboard resize by the configured step
    pub fn step_column_width(&mut self, column: &ColumnKey, grow: bool) -> Changes {
        let step = self.config.widths.resize_step as i64;
        self.resize_column(column, if grow { step } else { -step })
    }

    pub fn set_column_width(&mut self, column: &ColumnKey, width: u32) -> Changes {
        let Some(col) = self.column(column).cloned() else {
            return Changes::NONE;
        };
        match self.widths.set_column_width(&col, width, &self.config.widths) {
            Some(width) => self.column_resized(col.key, width),
            None => Changes::NONE,
        }
    }

    fn column_resized(&mut self, column_key: ColumnKey, width: u32) -> Changes {
        self.events.push(TableEvent::ColumnResized { column_key, width });
        self.deferred.push(Deferred::AdjustWidths { force_ratios: false });
        Changes::widths()
    }

    /// Returns whether an event was emitted; stale rows are ignored
    pub fn trigger_row_action(&mut self, row: &RowKey, action: &str) -> bool {
        if !self.index.contains_row(row) || action.is_empty() {
            return false;
        }
        self.events.push(TableEvent::RowActionTriggered { row_key: row.clone(), action: action.to_string() });
        true
    }

    /// Run a header action. Wrap and clip are handled here, the rest go to the host.
    pub fn trigger_header_action(&mut self, column: &ColumnKey, action: &str) -> Changes {
        let Some(header_action) = self
            .column(column)
            .and_then(|c| c.actions.iter().find(|a| a.name == action))
            .cloned()
        else {
            warn!(column = %column, action, "unknown header action");
            return Changes::NONE;
        };
        if !header_action.internal {
            self.events.push(TableEvent::HeaderActionTriggered {
                column_key: column.clone(),
                action: header_action.name,
            });
            return Changes::NONE;
        }

        let wrap = match action {
            WRAP_TEXT_ACTION => true,
            CLIP_TEXT_ACTION => false,
            _ => return Changes::NONE,
        };
        if self.column(column).is_some_and(|c| c.wrap_text == wrap) {
            return Changes::NONE;
        }
        self.wrap_overrides.insert(column.clone(), wrap);
        let mut changes = self.rebuild(false);
        changes.columns = true;
        self.widths.mark_ratios_dirty();
        self.deferred.push(Deferred::AdjustWidths { force_ratios: true });
        if self.viewport.reset() {
            changes.viewport = true;
        }
        self.deferred.push(Deferred::MeasureRowHeights);
        changes
    }

    // --- scrolling ---

    pub fn on_scroll(&mut self, scroll_top: u32, viewport_height: u32) -> Changes {
        let outcome = self.viewport.on_scroll(scroll_top, viewport_height);
        if outcome.load_more {
            self.events.push(TableEvent::LoadMoreRequested);
        }
        if outcome.range_changed {
            self.deferred.push(Deferred::MeasureRowHeights);
            Changes::viewport()
        } else {
            Changes::NONE
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.viewport.set_loading(loading);
    }

    pub fn record_row_height(&mut self, row: &RowKey, height: u32) -> Changes {
        let Some(ordinal) = self.index.row(row).map(|r| r.ordinal) else {
            return Changes::NONE;
        };
        if self.viewport.record_row_height(ordinal, height) {
            Changes::viewport()
        } else {
            Changes::NONE
        }
    }

    /// Ordinals of the rows to materialize
    pub fn rendered_range(&self) -> Range<usize> {
        let range = self.viewport.range();
        range.start.min(self.index.row_count())..range.end.min(self.index.row_count())
    }

    pub fn rendered_rows(&self) -> &[RowRecord] {
        &self.index.rows()[self.rendered_range()]
    }

    // --- inline editing ---

    pub fn open_inline_edit(&mut self, cell: &CellId) -> Changes {
        let Some(row) = cell.row_key().cloned() else {
            return Changes::NONE;
        };
        let Some(column) = self.column(&cell.column).cloned() else {
            return Changes::NONE;
        };
        let Some(marked) = self.edit.open(&self.index, &column, &row, &self.selection) else {
            return Changes::NONE;
        };
        for marked_row in &marked {
            self.index.set_aria_selected(marked_row, &column.key, true);
        }
        self.deferred.push(Deferred::PositionEditPanel);
        Changes::edit()
    }

    pub fn set_edit_value(&mut self, value: Value) -> Changes {
        if self.edit.set_value(value) {
            Changes::edit()
        } else {
            Changes::NONE
        }
    }

    pub fn set_edit_validity(&mut self, valid: bool) {
        self.edit.set_validity(valid);
    }

    pub fn set_mass_edit_checked(&mut self, checked: bool) -> Changes {
        if self.edit.set_mass_edit_checked(checked) {
            Changes::edit()
        } else {
            Changes::NONE
        }
    }

    pub fn close_inline_edit(&mut self, reason: CloseReason) -> Changes {
        let Some(outcome) = self.edit.close(reason, &self.index, &self.registry) else {
            return Changes::NONE;
        };
        for row in &outcome.unmarked {
            self.index.set_aria_selected(row, &outcome.column_key, false);
        }
        let mut changes = Changes::edit();
        if !outcome.committed.is_empty() {
            changes |= self.rebuild(false);
            self.events.push(TableEvent::CellValueChanged { draft_values: self.draft_values() });
        }

        // focus goes back to the edited cell, then moves on for tab closes
        let edited = CellId::new(outcome.row_key, outcome.column_key);
        changes |= self.focus_cell(&edited);
        let key = match reason {
            CloseReason::TabPressedNext => NavKey::Tab,
            CloseReason::TabPressedPrev => NavKey::BackTab,
            _ => return changes,
        };
        let previous = self.keyboard.active().cloned();
        let outcome = self.keyboard.handle_key(key, &self.index);
        changes | self.apply_key_outcome(key, outcome, previous)
    }

    pub fn draft_values(&self) -> Vec<DraftRow> {
        self.edit.dirty().to_drafts(&self.columns)
    }

    /// Ask the host to persist the draft values
    pub fn save(&mut self) -> Changes {
        let mut changes = Changes::NONE;
        if self.edit.is_open() {
            changes |= self.close_inline_edit(CloseReason::SubmitAction);
        }
        self.events.push(TableEvent::SaveRequested { draft_values: self.draft_values() });
        changes
    }

    /// Drop every draft value and re-derive the cells
    pub fn cancel(&mut self) -> Changes {
        let mut changes = Changes::NONE;
        if let Some(panel) = self.edit.discard() {
            for row in &panel.marked_rows {
                self.index.set_aria_selected(row, &panel.column_key, false);
            }
            changes |= Changes::edit();
        }
        self.edit.clear_dirty();
        changes |= self.rebuild(false) | Changes::edit();
        self.events.push(TableEvent::CancelRequested);
        changes
    }

    /// Forget draft values after the host persisted them
    pub fn clear_draft_values(&mut self) -> Changes {
        if self.edit.clear_dirty() {
            self.rebuild(false) | Changes::edit()
        } else {
            Changes::NONE
        }
    }

    // --- after render ---

    /// Run the work deferred until layout settled, in the order it was
    /// queued. Work queued while running waits for the next render. Each task
    /// re-checks its target against the current state first.
    pub fn after_render(&mut self, host: &dyn LayoutHost) -> Changes {
        let mut changes = self.on_scroll(host.scroll_top(), host.viewport_height());
        let pending = self.deferred.len();
        for _ in 0..pending {
            let Some(task) = self.deferred.pop() else {
                break;
            };
            match task {
                Deferred::AdjustWidths { force_ratios } => {
                    if force_ratios {
                        self.widths.mark_ratios_dirty();
                    }
                    if self.widths.adjust(
                        &self.columns,
                        &self.index,
                        &self.config.widths,
                        host.available_width(),
                        host.text_measure(),
                    ) {
                        changes |= Changes::widths();
                    }
                }
                Deferred::RestoreFocus(cell) => {
                    if self.keyboard.active() == Some(&cell) && self.index.contains(&cell) {
                        self.focus_request = Some(cell);
                    } else {
                        debug!(?cell, "dropping stale focus restore");
                    }
                }
                Deferred::MeasureRowHeights => {
                    let range = self.rendered_range();
                    let measured: Vec<(usize, u32)> = self.index.rows()[range]
                        .iter()
                        .filter_map(|r| host.row_height(&r.key).map(|h| (r.ordinal, h)))
                        .collect();
                    for (ordinal, height) in measured {
                        if self.viewport.record_row_height(ordinal, height) {
                            changes |= Changes::viewport();
                        }
                    }
                }
                Deferred::PositionEditPanel => {
                    let Some(panel) = self.edit.panel() else {
                        debug!("edit panel closed before it could be positioned");
                        continue;
                    };
                    let cell = CellId::new(panel.row_key.clone(), panel.column_key.clone());
                    let anchor = host.cell_rect(&cell);
                    self.edit.set_anchor(anchor);
                    changes |= Changes::edit();
                }
            }
        }
        changes
    }
}
