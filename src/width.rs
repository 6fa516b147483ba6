pub mod allocate;
pub mod ratios;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::column::{Column, ColumnKey};
use crate::config::{WidthConfig, WidthMode, DEFAULT_CELL_PADDING};
use crate::host::{TextMeasure, UnicodeMeasure};
use crate::index::CellIndex;

pub use allocate::{allocate, total_width, Allocation, AllocationPolicy, WidthLimits, WidthSpec};
pub use ratios::measure_ratios;

/// Column widths of a table, with user resizes and the auto-mode ratio cache
#[derive(Debug, Clone, Default)]
pub struct ColumnWidthManager {
    resized: HashMap<ColumnKey, u32>,
    /// Cached auto width ratios, one per column
    ratios: Vec<f64>,
    /// Whether ratios need a full remeasure
    ratios_dirty: bool,
    keys: Vec<ColumnKey>,
    widths: Vec<u32>,
    table_width: u32,
}

impl ColumnWidthManager {
    pub fn new() -> Self {
        Self { ratios_dirty: true, ..Default::default() }
    }

    /// Mark auto width ratios as needing a remeasure
    #[inline]
    pub fn mark_ratios_dirty(&mut self) {
        self.ratios_dirty = true;
    }

    pub fn ratios_dirty(&self) -> bool {
        self.ratios_dirty
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    pub fn table_width(&self) -> u32 {
        self.table_width
    }

    pub fn width_of(&self, key: &ColumnKey) -> Option<u32> {
        let i = self.keys.iter().position(|k| k == key)?;
        self.widths.get(i).copied()
    }

    pub fn resized_width(&self, key: &ColumnKey) -> Option<u32> {
        self.resized.get(key).copied()
    }

    /// Forget resizes of columns that no longer exist
    pub fn retain_columns(&mut self, columns: &[Column]) {
        self.resized.retain(|key, _| columns.iter().any(|c| &c.key == key));
    }

    fn specs(&self, columns: &[Column]) -> Vec<WidthSpec> {
        columns
            .iter()
            .map(|c| WidthSpec {
                fixed: c.fixed_width,
                resized: self.resized.get(&c.key).copied(),
                initial: c.initial_width,
                min: c.min_width,
                max: c.max_width,
            })
            .collect()
    }

    /// Reallocate every column for `available` pixels. Returns whether any
    /// width changed.
    pub fn adjust(
        &mut self,
        columns: &[Column],
        index: &CellIndex,
        config: &WidthConfig,
        available: u32,
        measure: Option<&(dyn TextMeasure + Sync)>,
    ) -> bool {
        let specs = self.specs(columns);
        let limits = WidthLimits { min: config.min_column_width, max: config.max_column_width };

        let allocation = match config.mode {
            WidthMode::Fixed => allocate(&specs, available, limits, AllocationPolicy::Equal),
            WidthMode::Auto => {
                let fallback = UnicodeMeasure::new(config.pixels_per_char, DEFAULT_CELL_PADDING);
                let measure = measure.unwrap_or(&fallback);
                if self.ratios_dirty {
                    self.remeasure(index, columns, measure, config);
                }
                match allocate(&specs, available, limits, AllocationPolicy::Ratios(&self.ratios)) {
                    Some(a) => Some(a),
                    None => {
                        debug!(ratios = self.ratios.len(), columns = columns.len(), "stale width ratios, remeasuring");
                        self.remeasure(index, columns, measure, config);
                        allocate(&specs, available, limits, AllocationPolicy::Ratios(&self.ratios))
                    }
                }
            }
        };

        let Some(Allocation { widths, table_width }) = allocation else {
            warn!(columns = columns.len(), "could not allocate column widths");
            return false;
        };

        let keys: Vec<ColumnKey> = columns.iter().map(|c| c.key.clone()).collect();
        let changed = widths != self.widths || keys != self.keys;
        self.keys = keys;
        self.widths = widths;
        self.table_width = table_width;
        changed
    }

    fn remeasure(
        &mut self,
        index: &CellIndex,
        columns: &[Column],
        measure: &(dyn TextMeasure + Sync),
        config: &WidthConfig,
    ) {
        self.ratios = measure_ratios(index, columns, measure, config.wrap_text_max_lines);
        self.ratios_dirty = false;
    }

    /// Resize a column by `delta` pixels from its current width.
    ///
    /// Returns the new width, or None when the column can't be resized
    /// (not resizable, fixed width, or unknown).
    pub fn resize_column(&mut self, column: &Column, delta: i64, config: &WidthConfig) -> Option<u32> {
        let current = self
            .resized
            .get(&column.key)
            .copied()
            .or_else(|| self.width_of(&column.key))
            .or(column.initial_width)
            .unwrap_or(config.min_column_width);
        let target = (current as i64 + delta).clamp(0, u32::MAX as i64) as u32;
        self.set_column_width(column, target, config)
    }

    /// Keyboard resize by the configured step
    pub fn step_column(&mut self, column: &Column, grow: bool, config: &WidthConfig) -> Option<u32> {
        let step = config.resize_step as i64;
        self.resize_column(column, if grow { step } else { -step }, config)
    }

    /// Set a column's width, clamped to its bounds. The column stops being
    /// flexible from now on.
    pub fn set_column_width(&mut self, column: &Column, width: u32, config: &WidthConfig) -> Option<u32> {
        if !column.resizable || column.fixed_width.is_some() {
            return None;
        }
        let min = column.min_width.unwrap_or(config.min_column_width);
        let max = column.max_width.unwrap_or(config.max_column_width).max(min);
        let width = width.clamp(min, max);

        self.resized.insert(column.key.clone(), width);
        if let Some(i) = self.keys.iter().position(|k| k == &column.key) {
            self.widths[i] = width;
            self.table_width = total_width(self.widths.iter().copied());
        }
        Some(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{CellTypeRegistry, ColumnDefinition};
    use crate::config::TableConfig;
    use crate::index::fixture;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn column(key: &str, def: ColumnDefinition) -> Column {
        let def = ColumnDefinition { column_key: Some(key.to_string()), ..def };
        Column::from_definition(&def, 0, &CellTypeRegistry::new())
    }

    fn config(mode: WidthMode) -> WidthConfig {
        WidthConfig { mode, ..TableConfig::default().widths }
    }

    #[test]
    fn test_fixed_mode_single_flexible_column() {
        let columns = vec![
            column("name", ColumnDefinition::field("Name", "name")),
            column("age", ColumnDefinition { fixed_width: Some(json!(80)), ..ColumnDefinition::field("Age", "age") }),
        ];
        let index = fixture(&["r1"], &["name", "age"]);
        let mut widths = ColumnWidthManager::new();
        assert!(widths.adjust(&columns, &index, &config(WidthMode::Fixed), 300, None));
        assert_eq!(widths.width_of(&"name".into()), Some(220));
        assert_eq!(widths.width_of(&"age".into()), Some(80));
        assert_eq!(widths.table_width(), 300);
        // same input, nothing changes
        assert!(!widths.adjust(&columns, &index, &config(WidthMode::Fixed), 300, None));
    }

    #[test]
    fn test_auto_mode_gives_wider_content_more_room() {
        let columns = vec![column("a", ColumnDefinition::field("A", "a")), column("b", ColumnDefinition::field("B", "b"))];
        let index = fixture(&["r1", "a-much-longer-row-key"], &["a", "b"]);
        let mut widths = ColumnWidthManager::new();
        widths.adjust(&columns, &index, &config(WidthMode::Auto), 600, None);
        assert_eq!(widths.table_width(), 600);
        assert!(!widths.ratios_dirty());
    }

    #[test]
    fn test_stale_ratios_are_remeasured() {
        let mut columns = vec![column("a", ColumnDefinition::field("A", "a"))];
        let index = fixture(&["r1"], &["a", "b"]);
        let mut widths = ColumnWidthManager::new();
        widths.adjust(&columns, &index, &config(WidthMode::Auto), 400, None);

        // a column appears without anyone marking the ratios dirty
        columns.push(column("b", ColumnDefinition::field("B", "b")));
        assert!(widths.adjust(&columns, &index, &config(WidthMode::Auto), 400, None));
        assert_eq!(widths.widths().len(), 2);
        assert_eq!(widths.table_width(), 400);
    }

    #[test]
    fn test_resize_clamps_and_pins_the_column() {
        let columns = vec![column("a", ColumnDefinition::field("A", "a")), column("b", ColumnDefinition::field("B", "b"))];
        let index = fixture(&["r1"], &["a", "b"]);
        let cfg = config(WidthMode::Fixed);
        let mut widths = ColumnWidthManager::new();
        widths.adjust(&columns, &index, &cfg, 400, None);

        assert_eq!(widths.resize_column(&columns[0], -500, &cfg), Some(cfg.min_column_width));
        assert_eq!(widths.step_column(&columns[0], true, &cfg), Some(cfg.min_column_width + cfg.resize_step));

        widths.adjust(&columns, &index, &cfg, 400, None);
        assert_eq!(widths.width_of(&"a".into()), Some(60));
        assert_eq!(widths.width_of(&"b".into()), Some(340));
    }

    #[test]
    fn test_fixed_and_non_resizable_columns_ignore_resize() {
        let cfg = config(WidthMode::Fixed);
        let fixed = column("f", ColumnDefinition { fixed_width: Some(json!(90)), ..ColumnDefinition::field("F", "f") });
        let locked = column("l", ColumnDefinition { resizable: Some(false), ..ColumnDefinition::field("L", "l") });
        let mut widths = ColumnWidthManager::new();
        assert_eq!(widths.resize_column(&fixed, 10, &cfg), None);
        assert_eq!(widths.resize_column(&locked, 10, &cfg), None);
        assert_eq!(widths.resized_width(&"l".into()), None);
    }

    #[test]
    fn test_retain_columns_forgets_removed_resizes() {
        let cfg = config(WidthMode::Fixed);
        let a = column("a", ColumnDefinition::field("A", "a"));
        let mut widths = ColumnWidthManager::new();
        widths.set_column_width(&a, 120, &cfg);
        assert_eq!(widths.resized_width(&"a".into()), Some(120));
        widths.retain_columns(&[]);
        assert_eq!(widths.resized_width(&"a".into()), None);
    }
}
