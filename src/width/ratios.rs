use rayon::prelude::*;

use crate::column::Column;
use crate::host::TextMeasure;
use crate::index::CellIndex;

/// Threshold for measuring in parallel (rows * cols)
const PARALLEL_THRESHOLD: usize = 10_000;

/// Smallest ratio a column can get, so empty columns still receive a share
const MIN_RATIO: f64 = 1.0;

/// Measure one ratio per column for auto width mode.
///
/// With rows, a column's ratio is the widest measured cell; without rows it is
/// the measured header label. Wrapped columns are divided by the maximum
/// number of wrapped lines, since their text is allowed to take that many.
pub fn measure_ratios(
    index: &CellIndex,
    columns: &[Column],
    measure: &(dyn TextMeasure + Sync),
    wrap_text_max_lines: Option<u32>,
) -> Vec<f64> {
    let size = index.row_count() * columns.len();

    let measured: Vec<u32> = if index.row_count() == 0 {
        columns.iter().map(|c| measure.measure(&c.label)).collect()
    } else if size >= PARALLEL_THRESHOLD && columns.len() > 1 {
        columns
            .par_iter()
            .map(|column| widest_cell(index, column, measure))
            .collect()
    } else {
        columns
            .iter()
            .map(|column| widest_cell(index, column, measure))
            .collect()
    };

    columns
        .iter()
        .zip(measured)
        .map(|(column, width)| {
            let lines = match wrap_text_max_lines {
                Some(lines) if column.wrap_text && lines > 1 => lines,
                _ => 1,
            };
            (width as f64 / lines as f64).max(MIN_RATIO)
        })
        .collect()
}

fn widest_cell(index: &CellIndex, column: &Column, measure: &(dyn TextMeasure + Sync)) -> u32 {
    let Some(col) = index.column_index_of(&column.key) else {
        return 0;
    };
    index
        .rows()
        .iter()
        .filter_map(|row| index.row_cells(&row.key).get(col))
        .map(|cell| measure.measure(&cell.display))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::UnicodeMeasure;
    use crate::index::fixture;

    #[test]
    fn test_ratios_follow_widest_cell() {
        let index = fixture(&["r1", "row-two"], &["a", "bb"]);
        let columns: Vec<Column> = ["a", "bb"].iter().map(|k| fixture_column(k, false)).collect();
        let ratios = measure_ratios(&index, &columns, &UnicodeMeasure::new(1, 0), None);
        // widest cells are "row-two:a" and "row-two:bb"
        assert_eq!(ratios, vec![9.0, 10.0]);
    }

    #[test]
    fn test_header_labels_without_rows() {
        let index = fixture(&[], &["a", "b"]);
        let mut columns: Vec<Column> = ["a", "b"].iter().map(|k| fixture_column(k, false)).collect();
        columns[0].label = "Name".to_string();
        columns[1].label = "Description".to_string();
        let ratios = measure_ratios(&index, &columns, &UnicodeMeasure::new(2, 0), None);
        assert_eq!(ratios, vec![8.0, 22.0]);
    }

    #[test]
    fn test_wrapped_columns_are_divided() {
        let index = fixture(&["r1"], &["a", "b"]);
        let columns = vec![fixture_column("a", true), fixture_column("b", false)];
        let ratios = measure_ratios(&index, &columns, &UnicodeMeasure::new(3, 0), Some(3));
        // "r1:a" is 4 columns wide
        assert_eq!(ratios, vec![4.0, 12.0]);
    }

    fn fixture_column(key: &str, wrap_text: bool) -> Column {
        use crate::column::{CellTypeRegistry, ColumnDefinition};
        let def = ColumnDefinition {
            column_key: Some(key.to_string()),
            wrap_text,
            ..ColumnDefinition::field(key, key)
        };
        Column::from_definition(&def, 0, &CellTypeRegistry::new())
    }
}
