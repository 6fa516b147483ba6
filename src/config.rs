use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ConfigError;
use crate::row::RowKey;
use crate::sort::SortDirection;

pub const DEFAULT_MIN_COLUMN_WIDTH: u32 = 50;
pub const DEFAULT_MAX_COLUMN_WIDTH: u32 = 1000;
pub const DEFAULT_RESIZE_STEP: u32 = 10;
pub const DEFAULT_BUFFER_SIZE: usize = 5;
pub const DEFAULT_ROW_HEIGHT: u32 = 30;
pub const DEFAULT_LOAD_MORE_OFFSET: u32 = 20;
pub const DEFAULT_WRAP_TEXT_MAX_LINES: u32 = 3;
pub const DEFAULT_PIXELS_PER_CHAR: u32 = 8;
pub const DEFAULT_CELL_PADDING: u32 = 24;

/// Column width allocation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidthMode {
    /// Flexible columns share the remaining width equally
    #[default]
    Fixed,
    /// Flexible columns share the remaining width proportionally to their content
    Auto,
}

impl WidthMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(WidthMode::Fixed),
            "auto" => Some(WidthMode::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Configuration as written by the host, before validation.
///
/// Attribute values are kept loosely typed so that malformed input can be
/// reported and replaced instead of failing the whole load.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTableConfig {
    pub key_field: Option<String>,
    pub min_column_width: Option<Value>,
    pub max_column_width: Option<Value>,
    pub resize_step: Option<Value>,
    pub column_width_mode: Option<Value>,
    pub wrap_text_max_lines: Option<Value>,
    pub pixels_per_char: Option<Value>,
    pub render: RawRenderConfig,
    pub selection: RawSelectionConfig,
    pub sort: RawSortConfig,
    pub enable_infinite_loading: bool,
    pub load_more_offset: Option<Value>,
    pub hide_table_header: bool,
    pub hide_checkbox_column: bool,
    pub show_row_number_column: bool,
    pub row_number_offset: Option<Value>,
    pub text_direction: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRenderConfig {
    pub virtualize: Option<Value>,
    pub buffer_size: Option<Value>,
    pub row_height: Option<Value>,
    pub viewport_rendering: bool,
    pub scroll_threshold: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSelectionConfig {
    pub max_row_selection: Option<Value>,
    pub selected_rows: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSortConfig {
    pub sorted_by: Option<String>,
    pub sorted_direction: Option<Value>,
    pub default_sort_direction: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthConfig {
    pub min_column_width: u32,
    pub max_column_width: u32,
    pub resize_step: u32,
    pub mode: WidthMode,
    /// Divisor applied to measured widths of wrapped columns (None disables it)
    pub wrap_text_max_lines: Option<u32>,
    pub pixels_per_char: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub virtualize: bool,
    pub buffer_size: usize,
    pub row_height: u32,
    pub viewport_rendering: bool,
    /// Distance in pixels from the rendered edge that triggers a recompute
    pub scroll_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionConfig {
    /// None means unlimited
    pub max_row_selection: Option<usize>,
    pub selected_rows: Vec<RowKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub sorted_by: Option<String>,
    pub sorted_direction: Option<SortDirection>,
    pub default_sort_direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfiniteLoadingConfig {
    pub enabled: bool,
    pub load_more_offset: u32,
}

/// Validated table configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTableConfig")]
pub struct TableConfig {
    pub key_field: Option<String>,
    pub widths: WidthConfig,
    pub render: RenderConfig,
    pub selection: SelectionConfig,
    pub sort: SortConfig,
    pub infinite_loading: InfiniteLoadingConfig,
    pub hide_table_header: bool,
    pub hide_checkbox_column: bool,
    pub show_row_number_column: bool,
    pub row_number_offset: usize,
    pub text_direction: TextDirection,
}

impl Default for TableConfig {
    fn default() -> Self {
        RawTableConfig::default().into()
    }
}

impl TableConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

impl From<RawTableConfig> for TableConfig {
    fn from(raw: RawTableConfig) -> Self {
        let min_column_width =
            parse_u32("min_column_width", raw.min_column_width.as_ref(), DEFAULT_MIN_COLUMN_WIDTH);
        let mut max_column_width =
            parse_u32("max_column_width", raw.max_column_width.as_ref(), DEFAULT_MAX_COLUMN_WIDTH);
        if max_column_width < min_column_width {
            warn!(min_column_width, max_column_width, "max column width below min, raising it to min");
            max_column_width = min_column_width;
        }

        let mode = match raw.column_width_mode.as_ref() {
            None | Some(Value::Null) => WidthMode::default(),
            Some(v) => match v.as_str().and_then(WidthMode::parse) {
                Some(mode) => mode,
                None => {
                    warn!(attribute = "column_width_mode", value = %v, fallback = "fixed", "invalid width mode");
                    WidthMode::default()
                }
            },
        };

        let wrap_text_max_lines = match raw.wrap_text_max_lines.as_ref() {
            None => Some(DEFAULT_WRAP_TEXT_MAX_LINES),
            Some(Value::Null) => None,
            Some(v) => match parse_u32("wrap_text_max_lines", Some(v), DEFAULT_WRAP_TEXT_MAX_LINES) {
                0 => None,
                lines => Some(lines),
            },
        };

        let row_height = match parse_u32("row_height", raw.render.row_height.as_ref(), DEFAULT_ROW_HEIGHT) {
            0 => {
                warn!(attribute = "row_height", fallback = DEFAULT_ROW_HEIGHT, "row height must be positive");
                DEFAULT_ROW_HEIGHT
            }
            h => h,
        };
        let buffer_size = parse_u32("buffer_size", raw.render.buffer_size.as_ref(), DEFAULT_BUFFER_SIZE as u32);
        let default_threshold = (row_height.saturating_mul(buffer_size) / 2).max(1);

        let render = RenderConfig {
            virtualize: parse_virtualize(raw.render.virtualize.as_ref()),
            buffer_size: buffer_size as usize,
            row_height,
            viewport_rendering: raw.render.viewport_rendering,
            scroll_threshold: parse_u32("scroll_threshold", raw.render.scroll_threshold.as_ref(), default_threshold),
        };

        let max_row_selection = match raw.selection.max_row_selection.as_ref() {
            None | Some(Value::Null) => None,
            Some(v) => match as_u32(v) {
                Some(n) => Some(n as usize),
                None => {
                    warn!(attribute = "max_row_selection", value = %v, "invalid max row selection, selection is unlimited");
                    None
                }
            },
        };

        let sort = SortConfig {
            sorted_by: raw.sort.sorted_by,
            sorted_direction: raw
                .sort
                .sorted_direction
                .as_ref()
                .and_then(|v| parse_direction("sorted_direction", v)),
            default_sort_direction: raw
                .sort
                .default_sort_direction
                .as_ref()
                .and_then(|v| parse_direction("default_sort_direction", v))
                .unwrap_or_default(),
        };

        let text_direction = match raw.text_direction.as_ref().and_then(|v| v.as_str()) {
            None => TextDirection::Ltr,
            Some(s) if s.eq_ignore_ascii_case("rtl") => TextDirection::Rtl,
            Some(s) if s.eq_ignore_ascii_case("ltr") => TextDirection::Ltr,
            Some(s) => {
                warn!(attribute = "text_direction", value = s, fallback = "ltr", "invalid text direction");
                TextDirection::Ltr
            }
        };

        Self {
            key_field: raw.key_field,
            widths: WidthConfig {
                min_column_width,
                max_column_width,
                resize_step: parse_u32("resize_step", raw.resize_step.as_ref(), DEFAULT_RESIZE_STEP),
                mode,
                wrap_text_max_lines,
                pixels_per_char: parse_u32("pixels_per_char", raw.pixels_per_char.as_ref(), DEFAULT_PIXELS_PER_CHAR),
            },
            render,
            selection: SelectionConfig {
                max_row_selection,
                selected_rows: raw.selection.selected_rows.into_iter().map(RowKey::from).collect(),
            },
            sort,
            infinite_loading: InfiniteLoadingConfig {
                enabled: raw.enable_infinite_loading,
                load_more_offset: parse_u32(
                    "load_more_offset",
                    raw.load_more_offset.as_ref(),
                    DEFAULT_LOAD_MORE_OFFSET,
                ),
            },
            hide_table_header: raw.hide_table_header,
            hide_checkbox_column: raw.hide_checkbox_column,
            show_row_number_column: raw.show_row_number_column,
            row_number_offset: parse_u32("row_number_offset", raw.row_number_offset.as_ref(), 0) as usize,
            text_direction,
        }
    }
}

/// Read a non-negative integer from a number or a numeric string
pub(crate) fn as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Parse an integer attribute, logging and falling back when it is malformed
pub(crate) fn parse_u32(attribute: &str, raw: Option<&Value>, fallback: u32) -> u32 {
    match raw {
        None | Some(Value::Null) => fallback,
        Some(v) => as_u32(v).unwrap_or_else(|| {
            warn!(attribute, value = %v, fallback, "invalid integer attribute");
            fallback
        }),
    }
}

/// Like [`parse_u32`] but an absent or malformed value yields None
pub(crate) fn parse_optional_u32(attribute: &str, raw: Option<&Value>) -> Option<u32> {
    match raw {
        None | Some(Value::Null) => None,
        Some(v) => {
            let parsed = as_u32(v);
            if parsed.is_none() {
                warn!(attribute, value = %v, "invalid integer attribute, ignoring it");
            }
            parsed
        }
    }
}

fn parse_direction(attribute: &str, v: &Value) -> Option<SortDirection> {
    let parsed = v.as_str().and_then(SortDirection::parse);
    if parsed.is_none() {
        warn!(attribute, value = %v, fallback = "asc", "invalid sort direction");
    }
    parsed
}

fn parse_virtualize(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.is_empty() => false,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("vertical") => true,
        Some(v) => {
            warn!(attribute = "virtualize", value = %v, "unsupported virtualization, rendering all rows");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TableConfig::default();
        assert_eq!(config.widths.min_column_width, 50);
        assert_eq!(config.widths.max_column_width, 1000);
        assert_eq!(config.widths.resize_step, 10);
        assert_eq!(config.widths.mode, WidthMode::Fixed);
        assert_eq!(config.render.buffer_size, 5);
        assert_eq!(config.render.row_height, 30);
        assert_eq!(config.infinite_loading.load_more_offset, 20);
        assert_eq!(config.selection.max_row_selection, None);
        assert_eq!(config.text_direction, TextDirection::Ltr);
    }

    #[test]
    fn test_from_toml() {
        let config = TableConfig::from_toml_str(
            r#"
            key_field = "id"
            min_column_width = 60
            max_column_width = "400"
            column_width_mode = "auto"

            [render]
            virtualize = "vertical"
            buffer_size = 10
            row_height = 24

            [selection]
            max_row_selection = 2
            selected_rows = ["a", "b"]

            [sort]
            sorted_by = "name"
            sorted_direction = "desc"
            "#,
        )
        .unwrap();

        assert_eq!(config.key_field.as_deref(), Some("id"));
        assert_eq!(config.widths.min_column_width, 60);
        assert_eq!(config.widths.max_column_width, 400);
        assert_eq!(config.widths.mode, WidthMode::Auto);
        assert!(config.render.virtualize);
        assert_eq!(config.render.buffer_size, 10);
        assert_eq!(config.render.row_height, 24);
        assert_eq!(config.render.scroll_threshold, 120);
        assert_eq!(config.selection.max_row_selection, Some(2));
        assert_eq!(config.selection.selected_rows, vec![RowKey::from("a"), RowKey::from("b")]);
        assert_eq!(config.sort.sorted_direction, Some(SortDirection::Descending));
    }

    #[test]
    fn test_large_render_values_saturate_threshold() {
        let config = TableConfig::from_toml_str("[render]\nrow_height = 70000\nbuffer_size = 70000\n").unwrap();
        assert_eq!(config.render.row_height, 70000);
        assert_eq!(config.render.buffer_size, 70000);
        assert_eq!(config.render.scroll_threshold, u32::MAX / 2);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let config = TableConfig::from_toml_str(
            r#"
            min_column_width = 12.5
            resize_step = -3
            column_width_mode = "stretchy"
            text_direction = "diagonal"

            [selection]
            max_row_selection = "many"

            [sort]
            default_sort_direction = "up"
            "#,
        )
        .unwrap();

        assert_eq!(config.widths.min_column_width, DEFAULT_MIN_COLUMN_WIDTH);
        assert_eq!(config.widths.resize_step, DEFAULT_RESIZE_STEP);
        assert_eq!(config.widths.mode, WidthMode::Fixed);
        assert_eq!(config.text_direction, TextDirection::Ltr);
        assert_eq!(config.selection.max_row_selection, None);
        assert_eq!(config.sort.default_sort_direction, SortDirection::Ascending);
    }

    #[test]
    fn test_max_below_min_is_raised() {
        let config = TableConfig::from_toml_str("min_column_width = 200\nmax_column_width = 100").unwrap();
        assert_eq!(config.widths.max_column_width, 200);
    }

    #[test]
    fn test_zero_wrap_lines_disables_divisor() {
        let config = TableConfig::from_toml_str("wrap_text_max_lines = 0").unwrap();
        assert_eq!(config.widths.wrap_text_max_lines, None);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "key_field = \"uid\"\nhide_table_header = true").unwrap();

        let config = TableConfig::from_path(file.path()).unwrap();
        assert_eq!(config.key_field.as_deref(), Some("uid"));
        assert!(config.hide_table_header);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(
            TableConfig::from_toml_str("key_field = "),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            TableConfig::from_path("/definitely/not/here.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
