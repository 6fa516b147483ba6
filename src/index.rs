use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::column::{
    resolve_type_attributes, CellType, CellTypeRegistry, Column, ColumnKey, ColumnKind, InternalColumn,
};
use crate::edit::{DirtyValues, TableErrors};
use crate::row::{FlatRow, RowKey, RowRecord};
use crate::sort::{AriaSort, SortState};

/// Row index of the header pseudo-row
pub const HEADER_ROW_INDEX: isize = -1;

/// Row part of a cell address: the header pseudo-row or a data row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    Header,
    Row(RowKey),
}

/// Address of a cell by keys, independent of the current ordering
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellId {
    pub row: RowId,
    pub column: ColumnKey,
}

impl CellId {
    pub fn new(row: impl Into<RowKey>, column: impl Into<ColumnKey>) -> Self {
        Self { row: RowId::Row(row.into()), column: column.into() }
    }

    pub fn header(column: impl Into<ColumnKey>) -> Self {
        Self { row: RowId::Header, column: column.into() }
    }

    pub fn row_key(&self) -> Option<&RowKey> {
        match &self.row {
            RowId::Row(key) => Some(key),
            RowId::Header => None,
        }
    }

    pub fn is_header(&self) -> bool {
        self.row == RowId::Header
    }
}

/// Row part of a grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowPos {
    Header,
    Data(usize),
}

impl RowPos {
    pub fn index(&self) -> isize {
        match self {
            RowPos::Header => HEADER_ROW_INDEX,
            RowPos::Data(i) => *i as isize,
        }
    }
}

/// Derived state of one data cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row_key: RowKey,
    pub column_key: ColumnKey,
    pub value: Value,
    /// Pending edit shown instead of `value`
    pub edited_value: Option<Value>,
    pub display: String,
    pub has_error: bool,
    pub is_active: bool,
    pub aria_selected: bool,
    pub actionable_elements: usize,
    pub editable: bool,
    pub wrap_text: bool,
    pub type_attributes: Map<String, Value>,
}

impl Cell {
    pub fn tab_index(&self) -> i32 {
        if self.is_active {
            0
        } else {
            -1
        }
    }

    pub fn current_value(&self) -> &Value {
        self.edited_value.as_ref().unwrap_or(&self.value)
    }

    pub fn is_edited(&self) -> bool {
        self.edited_value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub column_key: ColumnKey,
    pub label: String,
    pub sortable: bool,
    pub aria_sort: AriaSort,
    pub is_active: bool,
    pub actionable_elements: usize,
    pub wrap_text: bool,
}

impl HeaderCell {
    pub fn tab_index(&self) -> i32 {
        if self.is_active {
            0
        } else {
            -1
        }
    }
}

/// Everything besides rows and columns that feeds cell derivation
pub struct CellContext<'a> {
    pub registry: &'a CellTypeRegistry,
    pub dirty: &'a DirtyValues,
    pub errors: &'a TableErrors,
    pub sort: &'a SortState,
    pub row_number_offset: usize,
    /// Whether the checkbox header offers select-all
    pub select_all: bool,
}

/// Two-level index over the visible grid.
///
/// Row keys and column keys map to dense slots; cells live in a row-major
/// matrix addressed by (row slot, column slot). The header row sits beside
/// the matrix. A rebuild starts from empty maps so no stale entry survives.
#[derive(Debug, Clone, Default)]
pub struct CellIndex {
    row_slots: HashMap<RowKey, usize>,
    col_slots: HashMap<ColumnKey, usize>,
    rows: Vec<RowRecord>,
    columns: Vec<ColumnKey>,
    cells: Vec<Cell>,
    header: Vec<HeaderCell>,
}

impl CellIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from scratch. O(rows × columns).
    pub fn rebuild(&mut self, rows: &[FlatRow], columns: &[Column], ctx: &CellContext) {
        self.row_slots.clear();
        self.col_slots.clear();
        self.rows.clear();
        self.columns.clear();
        self.cells.clear();
        self.header.clear();

        for (slot, column) in columns.iter().enumerate() {
            self.col_slots.entry(column.key.clone()).or_insert(slot);
            self.columns.push(column.key.clone());
            self.header.push(HeaderCell {
                column_key: column.key.clone(),
                label: column.label.clone(),
                sortable: column.sortable,
                aria_sort: ctx.sort.aria_sort(column),
                is_active: false,
                actionable_elements: header_actionable_elements(column, ctx),
                wrap_text: column.wrap_text,
            });
        }

        let tree_column = columns.iter().position(|c| !c.is_internal());
        self.cells.reserve(rows.len() * columns.len());

        for (ordinal, row) in rows.iter().enumerate() {
            self.row_slots.insert(row.key.clone(), ordinal);
            let record = RowRecord { key: row.key.clone(), ordinal, tree: row.tree.clone() };

            for (slot, column) in columns.iter().enumerate() {
                let mut cell = derive_cell(&record, row, column, ctx);
                if Some(slot) == tree_column && record.has_children() {
                    cell.actionable_elements += 1;
                }
                self.cells.push(cell);
            }
            self.rows.push(record);
        }

        debug!(rows = self.rows.len(), columns = self.columns.len(), "rebuilt cell index");
    }

    fn slot(&self, row: &RowKey, column: &ColumnKey) -> Option<usize> {
        let r = *self.row_slots.get(row)?;
        let c = *self.col_slots.get(column)?;
        Some(r * self.columns.len() + c)
    }

    pub fn cell(&self, row: &RowKey, column: &ColumnKey) -> Option<&Cell> {
        self.slot(row, column).and_then(|i| self.cells.get(i))
    }

    pub fn cell_mut(&mut self, row: &RowKey, column: &ColumnKey) -> Option<&mut Cell> {
        self.slot(row, column).and_then(|i| self.cells.get_mut(i))
    }

    pub fn header_cell(&self, column: &ColumnKey) -> Option<&HeaderCell> {
        self.col_slots.get(column).and_then(|&c| self.header.get(c))
    }

    pub fn header_cells(&self) -> &[HeaderCell] {
        &self.header
    }

    pub fn row(&self, key: &RowKey) -> Option<&RowRecord> {
        self.row_slots.get(key).and_then(|&r| self.rows.get(r))
    }

    pub fn row_at(&self, ordinal: usize) -> Option<&RowRecord> {
        self.rows.get(ordinal)
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn row_cells(&self, key: &RowKey) -> &[Cell] {
        match self.row_slots.get(key) {
            Some(&r) => &self.cells[r * self.columns.len()..(r + 1) * self.columns.len()],
            None => &[],
        }
    }

    pub fn column_index_of(&self, column: &ColumnKey) -> Option<usize> {
        self.col_slots.get(column).copied()
    }

    pub fn column_key_at(&self, idx: usize) -> Option<&ColumnKey> {
        self.columns.get(idx)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn contains_row(&self, key: &RowKey) -> bool {
        self.row_slots.contains_key(key)
    }

    pub fn contains(&self, id: &CellId) -> bool {
        match &id.row {
            RowId::Header => self.col_slots.contains_key(&id.column),
            RowId::Row(key) => self.slot(key, &id.column).is_some(),
        }
    }

    /// Grid position (row, column slot) of a cell
    pub fn position_of(&self, id: &CellId) -> Option<(RowPos, usize)> {
        let col = self.column_index_of(&id.column)?;
        match &id.row {
            RowId::Header => Some((RowPos::Header, col)),
            RowId::Row(key) => self.row_slots.get(key).map(|&r| (RowPos::Data(r), col)),
        }
    }

    pub fn cell_id_at(&self, row: RowPos, col: usize) -> Option<CellId> {
        let column = self.columns.get(col)?.clone();
        match row {
            RowPos::Header => Some(CellId { row: RowId::Header, column }),
            RowPos::Data(r) => self.rows.get(r).map(|rec| CellId { row: RowId::Row(rec.key.clone()), column }),
        }
    }

    pub fn actionable_elements(&self, id: &CellId) -> usize {
        match &id.row {
            RowId::Header => self.header_cell(&id.column).map_or(0, |h| h.actionable_elements),
            RowId::Row(key) => self.cell(key, &id.column).map_or(0, |c| c.actionable_elements),
        }
    }

    /// Set or clear the active flag (tab index 0) on a cell; stale ids are ignored
    pub fn set_active(&mut self, id: &CellId, active: bool) -> bool {
        match &id.row {
            RowId::Header => match self.col_slots.get(&id.column) {
                Some(&c) => {
                    self.header[c].is_active = active;
                    true
                }
                None => false,
            },
            RowId::Row(key) => match self.cell_mut(key, &id.column) {
                Some(cell) => {
                    cell.is_active = active;
                    true
                }
                None => false,
            },
        }
    }

    pub fn set_aria_selected(&mut self, row: &RowKey, column: &ColumnKey, selected: bool) -> bool {
        match self.cell_mut(row, column) {
            Some(cell) => {
                cell.aria_selected = selected;
                true
            }
            None => false,
        }
    }
}

fn header_actionable_elements(column: &Column, ctx: &CellContext) -> usize {
    match column.kind {
        ColumnKind::Internal(InternalColumn::Checkbox) => usize::from(ctx.select_all),
        _ => column.header_actionable_elements(),
    }
}

fn derive_cell(record: &RowRecord, row: &FlatRow, column: &Column, ctx: &CellContext) -> Cell {
    let mut cell = Cell {
        row_key: record.key.clone(),
        column_key: column.key.clone(),
        value: Value::Null,
        edited_value: None,
        display: String::new(),
        has_error: false,
        is_active: false,
        aria_selected: false,
        actionable_elements: 0,
        editable: column.editable,
        wrap_text: column.wrap_text,
        type_attributes: Map::new(),
    };

    match &column.kind {
        ColumnKind::Internal(InternalColumn::RowNumber) => {
            let number = record.ordinal + ctx.row_number_offset + 1;
            cell.value = Value::from(number);
            cell.display = number.to_string();
            cell.has_error = ctx.errors.row_has_error(&record.key);
        }
        ColumnKind::Internal(InternalColumn::Checkbox) => {
            cell.actionable_elements = 1;
        }
        ColumnKind::Data(cell_type) => {
            if let Some(field) = &column.field_name {
                cell.value = row.data.get(field).cloned().unwrap_or(Value::Null);
                cell.has_error = ctx.errors.field_has_error(&record.key, field);
            }
            cell.edited_value = ctx.dirty.get(&record.key, &column.key).cloned();
            cell.type_attributes = resolve_type_attributes(&column.type_attributes, row.data);
            cell.display = ctx.registry.format(cell_type, cell.current_value(), &cell.type_attributes);
            cell.actionable_elements = actionable_for(ctx.registry, cell_type, cell.current_value());
        }
    }
    cell
}

fn actionable_for(registry: &CellTypeRegistry, cell_type: &CellType, value: &Value) -> usize {
    match cell_type {
        CellType::Action | CellType::Button | CellType::ButtonIcon => registry.actionable_elements(cell_type),
        // links only render when there is something to link to
        CellType::Email | CellType::Phone | CellType::Url if value.is_null() => 0,
        _ => registry.actionable_elements(cell_type),
    }
}

#[cfg(test)]
pub(crate) fn fixture(rows: &[&str], columns: &[&str]) -> CellIndex {
    use crate::column::ColumnDefinition;

    let registry = CellTypeRegistry::new();
    let columns: Vec<Column> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let def = ColumnDefinition {
                column_key: Some(c.to_string()),
                editable: true,
                ..ColumnDefinition::field(c, c)
            };
            Column::from_definition(&def, i, &registry)
        })
        .collect();
    let records: Vec<crate::row::Record> = rows
        .iter()
        .map(|r| {
            let mut record = crate::row::Record::new();
            record.insert("id".into(), Value::from(*r));
            for c in &columns {
                record.insert(c.key.to_string(), Value::from(format!("{}:{}", r, c.key)));
            }
            record
        })
        .collect();
    let flat = crate::row::flatten_flat(&records, Some("id"));
    let ctx = CellContext {
        registry: &registry,
        dirty: &DirtyValues::default(),
        errors: &TableErrors::default(),
        sort: &SortState::default(),
        row_number_offset: 0,
        select_all: false,
    };
    let mut index = CellIndex::new();
    index.rebuild(&flat, &columns, &ctx);
    index
}
