use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::column::{CellType, CellTypeRegistry, Column, ColumnKey};
use crate::host::Rect;
use crate::index::CellIndex;
use crate::row::RowKey;
use crate::selection::SelectionState;

/// Why the edit panel closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    EditCanceled,
    LostFocus,
    TabPressedNext,
    TabPressedPrev,
    SubmitAction,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::EditCanceled => "edit-canceled",
            CloseReason::LostFocus => "lost-focus",
            CloseReason::TabPressedNext => "tab-pressed-next",
            CloseReason::TabPressedPrev => "tab-pressed-prev",
            CloseReason::SubmitAction => "submit-action",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "edit-canceled" => CloseReason::EditCanceled,
            "lost-focus" => CloseReason::LostFocus,
            "tab-pressed-next" => CloseReason::TabPressedNext,
            "tab-pressed-prev" => CloseReason::TabPressedPrev,
            "submit-action" => CloseReason::SubmitAction,
            _ => return None,
        })
    }
}

/// Pending edits, by row then column, kept apart from the host data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyValues {
    rows: BTreeMap<RowKey, BTreeMap<ColumnKey, Value>>,
}

impl DirtyValues {
    pub fn get(&self, row: &RowKey, column: &ColumnKey) -> Option<&Value> {
        self.rows.get(row).and_then(|cols| cols.get(column))
    }

    pub fn set(&mut self, row: RowKey, column: ColumnKey, value: Value) {
        self.rows.entry(row).or_default().insert(column, value);
    }

    pub fn remove(&mut self, row: &RowKey, column: &ColumnKey) -> Option<Value> {
        let cols = self.rows.get_mut(row)?;
        let removed = cols.remove(column);
        if cols.is_empty() {
            self.rows.remove(row);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of edited cells
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn row(&self, row: &RowKey) -> Option<&BTreeMap<ColumnKey, Value>> {
        self.rows.get(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &BTreeMap<ColumnKey, Value>)> {
        self.rows.iter()
    }

    /// Draft values keyed by field name, the shape hosts persist
    pub fn to_drafts(&self, columns: &[Column]) -> Vec<DraftRow> {
        let fields: HashMap<&ColumnKey, &str> = columns
            .iter()
            .filter_map(|c| c.field_name.as_deref().map(|f| (&c.key, f)))
            .collect();
        self.rows
            .iter()
            .map(|(row_key, cols)| DraftRow {
                row_key: row_key.clone(),
                values: cols
                    .iter()
                    .filter_map(|(col, v)| fields.get(col).map(|f| (f.to_string(), v.clone())))
                    .collect(),
            })
            .filter(|d| !d.values.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftRow {
    pub row_key: RowKey,
    pub values: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RowError {
    pub title: Option<String>,
    pub messages: Vec<String>,
    pub field_names: Vec<String>,
}

/// Errors reported by the host, usually after a failed save
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableErrors {
    pub rows: HashMap<RowKey, RowError>,
    pub title: Option<String>,
    pub messages: Vec<String>,
}

impl TableErrors {
    pub fn row_has_error(&self, row: &RowKey) -> bool {
        self.rows.contains_key(row)
    }

    pub fn field_has_error(&self, row: &RowKey, field: &str) -> bool {
        self.rows
            .get(row)
            .is_some_and(|e| e.field_names.iter().any(|f| f == field))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.title.is_none() && self.messages.is_empty()
    }
}

/// The open edit panel
#[derive(Debug, Clone, PartialEq)]
pub struct EditPanel {
    pub row_key: RowKey,
    pub column_key: ColumnKey,
    pub cell_type: CellType,
    pub value: Value,
    /// Value shown when the panel opened
    pub original: Value,
    pub type_attributes: Map<String, Value>,
    pub mass_edit_enabled: bool,
    pub mass_edit_checked: bool,
    pub valid: bool,
    pub anchor: Option<Rect>,
    /// Rows whose cells in this column are marked aria-selected
    pub marked_rows: Vec<RowKey>,
}

impl EditPanel {
    pub fn is_changed(&self) -> bool {
        self.value != self.original
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseOutcome {
    pub reason: CloseReason,
    pub row_key: RowKey,
    pub column_key: ColumnKey,
    /// Rows whose value was committed to the dirty values
    pub committed: Vec<RowKey>,
    /// Rows whose aria-selected mark must be cleared
    pub unmarked: Vec<RowKey>,
}

/// Inline edit state: closed, or open on exactly one cell
#[derive(Debug, Clone, Default)]
pub struct InlineEditSession {
    panel: Option<EditPanel>,
    dirty: DirtyValues,
}

impl InlineEditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.panel.is_some()
    }

    pub fn panel(&self) -> Option<&EditPanel> {
        self.panel.as_ref()
    }

    pub fn dirty(&self) -> &DirtyValues {
        &self.dirty
    }

    /// Open the panel on a cell. Returns the rows to mark aria-selected,
    /// or None when the cell can't be edited or a panel is already open.
    pub fn open(
        &mut self,
        index: &CellIndex,
        column: &Column,
        row_key: &RowKey,
        selection: &SelectionState,
    ) -> Option<Vec<RowKey>> {
        if self.panel.is_some() || !column.editable {
            return None;
        }
        let cell = index.cell(row_key, &column.key)?;
        let cell_type = column.cell_type()?.clone();

        let mass_edit_enabled = selection.is_selected(row_key) && selection.count() > 1;
        let marked_rows = if mass_edit_enabled {
            selection.selected_rows(index)
        } else {
            vec![row_key.clone()]
        };

        debug!(row = %row_key, column = %column.key, mass_edit_enabled, "opening inline edit");
        self.panel = Some(EditPanel {
            row_key: row_key.clone(),
            column_key: column.key.clone(),
            cell_type,
            value: cell.current_value().clone(),
            original: cell.current_value().clone(),
            type_attributes: cell.type_attributes.clone(),
            mass_edit_enabled,
            mass_edit_checked: false,
            valid: true,
            anchor: None,
            marked_rows: marked_rows.clone(),
        });
        Some(marked_rows)
    }

    pub fn set_value(&mut self, value: Value) -> bool {
        match self.panel.as_mut() {
            Some(panel) => {
                panel.value = value;
                true
            }
            None => false,
        }
    }

    pub fn set_validity(&mut self, valid: bool) {
        if let Some(panel) = self.panel.as_mut() {
            panel.valid = valid;
        }
    }

    pub fn set_mass_edit_checked(&mut self, checked: bool) -> bool {
        match self.panel.as_mut() {
            Some(panel) if panel.mass_edit_enabled => {
                panel.mass_edit_checked = checked;
                true
            }
            _ => false,
        }
    }

    pub fn set_anchor(&mut self, anchor: Option<Rect>) {
        if let Some(panel) = self.panel.as_mut() {
            panel.anchor = anchor;
        }
    }

    /// Close the panel, committing the value unless the edit was canceled,
    /// the value is invalid, or nothing changed without mass edit checked.
    pub fn close(
        &mut self,
        reason: CloseReason,
        index: &CellIndex,
        registry: &CellTypeRegistry,
    ) -> Option<CloseOutcome> {
        let panel = self.panel.take()?;
        let valid = panel.valid && registry.validate(&panel.cell_type, &panel.value);
        let should_save = reason != CloseReason::EditCanceled
            && valid
            && (panel.is_changed() || panel.mass_edit_checked);

        let mut committed = Vec::new();
        if should_save {
            let targets = if panel.mass_edit_enabled && panel.mass_edit_checked {
                panel.marked_rows.clone()
            } else {
                vec![panel.row_key.clone()]
            };
            for row in targets {
                // rows removed while the panel was open are skipped
                let Some(cell) = index.cell(&row, &panel.column_key) else {
                    continue;
                };
                if cell.value == panel.value {
                    self.dirty.remove(&row, &panel.column_key);
                } else {
                    self.dirty.set(row.clone(), panel.column_key.clone(), panel.value.clone());
                }
                committed.push(row);
            }
        }
        debug!(reason = reason.as_str(), committed = committed.len(), valid, "closed inline edit");

        Some(CloseOutcome {
            reason,
            row_key: panel.row_key,
            column_key: panel.column_key,
            committed,
            unmarked: panel.marked_rows,
        })
    }

    /// Drop the panel without committing, e.g. when its cell disappeared
    pub fn discard(&mut self) -> Option<EditPanel> {
        self.panel.take()
    }

    pub fn clear_dirty(&mut self) -> bool {
        let had = !self.dirty.is_empty();
        self.dirty.clear();
        had
    }
}

#[cfg(test)]
mod test;
