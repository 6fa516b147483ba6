use serde::{Deserialize, Serialize};

use crate::column::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// Parse "asc"/"desc" (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Ascending),
            "desc" => Some(SortDirection::Descending),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Value of a header cell's aria-sort attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AriaSort {
    #[default]
    None,
    Ascending,
    Descending,
}

impl AriaSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            AriaSort::None => "none",
            AriaSort::Ascending => "ascending",
            AriaSort::Descending => "descending",
        }
    }
}

/// Which column the host reports as sorted.
///
/// The table never reorders rows itself: a sort request is emitted as an
/// event and the host answers by setting new data and calling [`SortState::set`].
#[derive(Debug, Clone, Default)]
pub struct SortState {
    sorted_by: Option<String>,
    direction: Option<SortDirection>,
    default_direction: SortDirection,
}

impl SortState {
    pub fn new(
        sorted_by: Option<String>,
        direction: Option<SortDirection>,
        default_direction: SortDirection,
    ) -> Self {
        Self { sorted_by, direction, default_direction }
    }

    pub fn sorted_by(&self) -> Option<&str> {
        self.sorted_by.as_deref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction.unwrap_or(self.default_direction)
    }

    pub fn default_direction(&self) -> SortDirection {
        self.default_direction
    }

    pub fn set(&mut self, sorted_by: Option<String>, direction: Option<SortDirection>) {
        self.sorted_by = sorted_by;
        self.direction = direction;
    }

    fn is_sorted_by(&self, column: &Column) -> bool {
        match (&self.sorted_by, &column.field_name) {
            (Some(sorted), Some(field)) => sorted == field,
            _ => false,
        }
    }

    /// Field and direction to request when the user activates a column header.
    /// Toggles when the column is already sorted, else uses the default direction.
    pub fn request(&self, column: &Column) -> Option<(String, SortDirection)> {
        if !column.sortable {
            return None;
        }
        let field = column.field_name.clone()?;
        let direction = if self.is_sorted_by(column) {
            self.direction().toggle()
        } else {
            self.default_direction
        };
        Some((field, direction))
    }

    pub fn aria_sort(&self, column: &Column) -> AriaSort {
        if !column.sortable || !self.is_sorted_by(column) {
            return AriaSort::None;
        }
        match self.direction() {
            SortDirection::Ascending => AriaSort::Ascending,
            SortDirection::Descending => AriaSort::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDefinition;

    fn sortable(field: &str) -> Column {
        let def = ColumnDefinition {
            field_name: Some(field.to_string()),
            sortable: true,
            ..ColumnDefinition::labeled(field)
        };
        Column::from_definition(&def, 0, &Default::default())
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Ascending));
        assert_eq!(SortDirection::parse(" desc "), Some(SortDirection::Descending));
        assert_eq!(SortDirection::parse("up"), None);
    }

    #[test]
    fn test_request_uses_default_for_unsorted_column() {
        let state = SortState::new(None, None, SortDirection::Descending);
        let request = state.request(&sortable("name"));
        assert_eq!(request, Some(("name".to_string(), SortDirection::Descending)));
    }

    #[test]
    fn test_request_toggles_sorted_column() {
        let state = SortState::new(Some("name".into()), Some(SortDirection::Ascending), SortDirection::Ascending);
        let request = state.request(&sortable("name"));
        assert_eq!(request, Some(("name".to_string(), SortDirection::Descending)));
        assert_eq!(state.aria_sort(&sortable("name")), AriaSort::Ascending);
        assert_eq!(state.aria_sort(&sortable("age")), AriaSort::None);
    }

    #[test]
    fn test_unsortable_column_never_requests() {
        let state = SortState::default();
        let column = Column::from_definition(&ColumnDefinition::labeled("x"), 0, &Default::default());
        assert_eq!(state.request(&column), None);
    }
}
