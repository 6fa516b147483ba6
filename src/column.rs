pub mod registry;
pub mod types;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::config::parse_optional_u32;
use crate::row::Record;

pub use registry::{CellTypeProvider, CellTypeRegistry};
pub use types::CellType;

/// Header action that toggles text wrapping on a column
pub const WRAP_TEXT_ACTION: &str = "wrap_text";
/// Header action that turns text wrapping off again
pub const CLIP_TEXT_ACTION: &str = "clip_text";

/// Width of the selection checkbox column
pub const CHECKBOX_COLUMN_WIDTH: u32 = 32;
const ROW_NUMBER_PADDING: u32 = 24;

/// Stable identifier of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnKey(pub String);

impl ColumnKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColumnKey {
    fn from(s: &str) -> Self {
        ColumnKey(s.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(s: String) -> Self {
        ColumnKey(s)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct HeaderActionDefinition {
    pub name: String,
    pub label: String,
}

/// Column as declared by the host
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    pub label: String,
    pub field_name: Option<String>,
    pub column_key: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub fixed_width: Option<Value>,
    pub initial_width: Option<Value>,
    pub min_width: Option<Value>,
    pub max_width: Option<Value>,
    pub sortable: bool,
    pub editable: bool,
    pub resizable: Option<bool>,
    pub wrap_text: bool,
    pub type_attributes: Map<String, Value>,
    pub actions: Vec<HeaderActionDefinition>,
}

impl ColumnDefinition {
    pub fn labeled(label: &str) -> Self {
        Self { label: label.to_string(), ..Default::default() }
    }

    pub fn field(label: &str, field_name: &str) -> Self {
        Self {
            label: label.to_string(),
            field_name: Some(field_name.to_string()),
            ..Default::default()
        }
    }
}

/// Synthetic columns the table injects next to the host's columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalColumn {
    RowNumber,
    Checkbox,
}

impl InternalColumn {
    pub fn key(&self) -> ColumnKey {
        match self {
            InternalColumn::RowNumber => ColumnKey::from("__row_number"),
            InternalColumn::Checkbox => ColumnKey::from("__checkbox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Data(CellType),
    Internal(InternalColumn),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAction {
    pub name: String,
    pub label: String,
    pub internal: bool,
}

/// A resolved column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: ColumnKey,
    pub label: String,
    pub field_name: Option<String>,
    pub kind: ColumnKind,
    pub fixed_width: Option<u32>,
    pub initial_width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub resizable: bool,
    pub sortable: bool,
    pub editable: bool,
    pub wrap_text: bool,
    pub type_attributes: Map<String, Value>,
    pub actions: Vec<HeaderAction>,
}

impl Column {
    pub fn from_definition(def: &ColumnDefinition, ordinal: usize, registry: &CellTypeRegistry) -> Self {
        let cell_type = registry.resolve(def.type_name.as_deref());
        let field_name = def.field_name.clone().filter(|f| !f.is_empty());

        let key = match def.column_key.as_deref().filter(|k| !k.is_empty()) {
            Some(k) => ColumnKey::from(k),
            None => ColumnKey(format!(
                "{}-{}-{}",
                field_name.as_deref().unwrap_or(""),
                cell_type.name(),
                ordinal
            )),
        };

        let editable = def.editable && registry.editable(&cell_type);
        if def.editable && !editable {
            warn!(column = %key, cell_type = cell_type.name(), "cell type cannot be edited inline");
        }
        let sortable = def.sortable && field_name.is_some();
        if def.sortable && !sortable {
            warn!(column = %key, "sortable column has no field name");
        }

        let mut actions: Vec<HeaderAction> = Vec::new();
        if !matches!(cell_type, CellType::Action | CellType::Button | CellType::ButtonIcon) {
            actions.push(HeaderAction {
                name: WRAP_TEXT_ACTION.to_string(),
                label: "Wrap text".to_string(),
                internal: true,
            });
            actions.push(HeaderAction {
                name: CLIP_TEXT_ACTION.to_string(),
                label: "Clip text".to_string(),
                internal: true,
            });
        }
        actions.extend(def.actions.iter().filter(|a| !a.name.is_empty()).map(|a| HeaderAction {
            name: a.name.clone(),
            label: a.label.clone(),
            internal: false,
        }));

        Self {
            key,
            label: def.label.clone(),
            field_name,
            type_attributes: registry.filter_type_attributes(&cell_type, &def.type_attributes),
            kind: ColumnKind::Data(cell_type),
            fixed_width: parse_optional_u32("fixed_width", def.fixed_width.as_ref()),
            initial_width: parse_optional_u32("initial_width", def.initial_width.as_ref()),
            min_width: parse_optional_u32("min_width", def.min_width.as_ref()),
            max_width: parse_optional_u32("max_width", def.max_width.as_ref()),
            resizable: def.resizable.unwrap_or(true),
            sortable,
            editable,
            wrap_text: def.wrap_text,
            actions,
        }
    }

    pub fn internal(kind: InternalColumn, width: u32) -> Self {
        Self {
            key: kind.key(),
            label: String::new(),
            field_name: None,
            kind: ColumnKind::Internal(kind),
            fixed_width: Some(width),
            initial_width: None,
            min_width: None,
            max_width: None,
            resizable: false,
            sortable: false,
            editable: false,
            wrap_text: false,
            type_attributes: Map::new(),
            actions: Vec::new(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, ColumnKind::Internal(_))
    }

    pub fn cell_type(&self) -> Option<&CellType> {
        match &self.kind {
            ColumnKind::Data(t) => Some(t),
            ColumnKind::Internal(_) => None,
        }
    }

    /// Focusable elements in this column's header: sort button and actions menu
    pub fn header_actionable_elements(&self) -> usize {
        usize::from(self.sortable) + usize::from(!self.actions.is_empty())
    }
}

/// Which synthetic columns to inject
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalColumns {
    pub row_numbers: bool,
    pub checkbox: bool,
}

/// Width of the row number column, wide enough for the largest number shown
pub fn row_number_width(max_row_number: usize, pixels_per_char: u32) -> u32 {
    let digits = max_row_number.max(1).to_string().len() as u32;
    digits.saturating_mul(pixels_per_char).saturating_add(ROW_NUMBER_PADDING)
}

/// Resolve host definitions into columns, synthetic columns first.
/// A duplicate key is reported and the later column gets a unique fallback
/// key, so every column keeps its own slot.
pub fn resolve_columns(
    defs: &[ColumnDefinition],
    registry: &CellTypeRegistry,
    internal: InternalColumns,
    row_number_width: u32,
) -> Vec<Column> {
    let mut columns = Vec::with_capacity(defs.len() + 2);
    if internal.row_numbers {
        columns.push(Column::internal(InternalColumn::RowNumber, row_number_width));
    }
    if internal.checkbox {
        columns.push(Column::internal(InternalColumn::Checkbox, CHECKBOX_COLUMN_WIDTH));
    }

    let mut seen: HashSet<ColumnKey> = columns.iter().map(|c| c.key.clone()).collect();
    for (ordinal, def) in defs.iter().enumerate() {
        let mut column = Column::from_definition(def, ordinal, registry);
        if !seen.insert(column.key.clone()) {
            let mut fallback = ColumnKey(format!("{}-{}", column.key, ordinal));
            let mut attempt = 1;
            while !seen.insert(fallback.clone()) {
                fallback = ColumnKey(format!("{}-{}-{}", column.key, ordinal, attempt));
                attempt += 1;
            }
            error!(column = %column.key, fallback = %fallback, "duplicate column key");
            column.key = fallback;
        }
        columns.push(column);
    }
    columns
}

/// Resolve type attributes that reference row fields, e.g.
/// `{ "label": { "fieldName": "name" } }`, against one row.
pub fn resolve_type_attributes(attributes: &Map<String, Value>, record: &Record) -> Map<String, Value> {
    attributes
        .iter()
        .map(|(name, value)| {
            let resolved = match field_reference(value) {
                Some(field) => record.get(field).cloned().unwrap_or(Value::Null),
                None => value.clone(),
            };
            (name.clone(), resolved)
        })
        .collect()
}

fn field_reference(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get("fieldName").or_else(|| obj.get("field_name"))?.as_str()
}
