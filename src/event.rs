use std::ops::{BitOr, BitOrAssign};

use crate::column::ColumnKey;
use crate::edit::DraftRow;
use crate::row::RowKey;
use crate::selection::SelectionAction;
use crate::sort::SortDirection;

/// Regions of the table a mutation touched, so a view can redraw selectively
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    /// Row set or order
    pub rows: bool,
    pub columns: bool,
    pub widths: bool,
    pub selection: bool,
    /// Active cell or keyboard mode
    pub focus: bool,
    /// Materialized row range
    pub viewport: bool,
    /// Edit panel or dirty values
    pub edit: bool,
    pub sort: bool,
}

impl Changes {
    pub const NONE: Changes = Changes {
        rows: false,
        columns: false,
        widths: false,
        selection: false,
        focus: false,
        viewport: false,
        edit: false,
        sort: false,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    pub fn merge(&mut self, other: Changes) {
        self.rows |= other.rows;
        self.columns |= other.columns;
        self.widths |= other.widths;
        self.selection |= other.selection;
        self.focus |= other.focus;
        self.viewport |= other.viewport;
        self.edit |= other.edit;
        self.sort |= other.sort;
    }

    pub fn rows() -> Self {
        Changes { rows: true, ..Self::NONE }
    }

    pub fn widths() -> Self {
        Changes { widths: true, ..Self::NONE }
    }

    pub fn selection() -> Self {
        Changes { selection: true, ..Self::NONE }
    }

    pub fn focus() -> Self {
        Changes { focus: true, ..Self::NONE }
    }

    pub fn viewport() -> Self {
        Changes { viewport: true, ..Self::NONE }
    }

    pub fn edit() -> Self {
        Changes { edit: true, ..Self::NONE }
    }
}

impl BitOr for Changes {
    type Output = Changes;

    fn bitor(mut self, rhs: Changes) -> Changes {
        self.merge(rhs);
        self
    }
}

impl BitOrAssign for Changes {
    fn bitor_assign(&mut self, rhs: Changes) {
        self.merge(rhs);
    }
}

/// Notifications for the host, drained with [`crate::DataTable::drain_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    RowSelectionChanged {
        selected_rows: Vec<RowKey>,
        action: SelectionAction,
        /// Row the user acted on, None for bulk and programmatic changes
        changed_row: Option<RowKey>,
    },
    ColumnResized {
        column_key: ColumnKey,
        width: u32,
    },
    SortRequested {
        field_name: String,
        direction: SortDirection,
    },
    RowActionTriggered {
        row_key: RowKey,
        action: String,
    },
    HeaderActionTriggered {
        column_key: ColumnKey,
        action: String,
    },
    /// Draft values after an inline edit was committed
    CellValueChanged {
        draft_values: Vec<DraftRow>,
    },
    LoadMoreRequested,
    SaveRequested {
        draft_values: Vec<DraftRow>,
    },
    CancelRequested,
}

impl TableEvent {
    /// Event name as hosts usually dispatch it
    pub fn name(&self) -> &'static str {
        match self {
            TableEvent::RowSelectionChanged { .. } => "rowselection",
            TableEvent::ColumnResized { .. } => "resize",
            TableEvent::SortRequested { .. } => "sort",
            TableEvent::RowActionTriggered { .. } => "rowaction",
            TableEvent::HeaderActionTriggered { .. } => "headeraction",
            TableEvent::CellValueChanged { .. } => "cellchange",
            TableEvent::LoadMoreRequested => "loadmore",
            TableEvent::SaveRequested { .. } => "save",
            TableEvent::CancelRequested => "cancel",
        }
    }
}
