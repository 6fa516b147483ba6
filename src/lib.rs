//! Headless datatable engine.
//!
//! The crate keeps the state of a large interactive table: column widths,
//! the row/column cell index, row selection, keyboard navigation,
//! virtualized row windows and inline editing. Rendering is left to a host,
//! which feeds measurements in through [`host::LayoutHost`] and redraws the
//! regions reported by [`event::Changes`].

pub mod column;
pub mod config;
pub mod edit;
pub mod error;
pub mod event;
pub mod host;
pub mod index;
pub mod keyboard;
pub mod row;
pub mod selection;
pub mod sort;
pub mod table;
pub mod viewport;
pub mod width;

pub use column::{Column, ColumnDefinition, ColumnKey};
pub use config::TableConfig;
pub use error::{ConfigError, RegistryError};
pub use event::{Changes, TableEvent};
pub use index::{CellId, CellIndex, RowId};
pub use row::{Record, RowKey};
pub use table::DataTable;
