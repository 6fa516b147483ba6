use serde_json::Value;

/// Cell type of a data column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellType {
    Text,
    Number,
    Currency,
    Percent,
    Date,
    DateLocal,
    Email,
    Phone,
    Url,
    Boolean,
    Location,
    Action,
    Button,
    ButtonIcon,
    /// Provided by a registered [`super::registry::CellTypeProvider`]
    Custom(String),
}

pub const STANDARD_TYPES: &[&str] = &[
    "text",
    "number",
    "currency",
    "percent",
    "date",
    "date-local",
    "email",
    "phone",
    "url",
    "boolean",
    "location",
    "action",
    "button",
    "button-icon",
];

impl CellType {
    pub fn from_standard_name(name: &str) -> Option<Self> {
        Some(match name {
            "text" => CellType::Text,
            "number" => CellType::Number,
            "currency" => CellType::Currency,
            "percent" => CellType::Percent,
            "date" => CellType::Date,
            "date-local" => CellType::DateLocal,
            "email" => CellType::Email,
            "phone" => CellType::Phone,
            "url" => CellType::Url,
            "boolean" => CellType::Boolean,
            "location" => CellType::Location,
            "action" => CellType::Action,
            "button" => CellType::Button,
            "button-icon" => CellType::ButtonIcon,
            _ => return None,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            CellType::Text => "text",
            CellType::Number => "number",
            CellType::Currency => "currency",
            CellType::Percent => "percent",
            CellType::Date => "date",
            CellType::DateLocal => "date-local",
            CellType::Email => "email",
            CellType::Phone => "phone",
            CellType::Url => "url",
            CellType::Boolean => "boolean",
            CellType::Location => "location",
            CellType::Action => "action",
            CellType::Button => "button",
            CellType::ButtonIcon => "button-icon",
            CellType::Custom(name) => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellType::Number | CellType::Currency | CellType::Percent)
    }

    /// Whether standard cells of this type can be edited inline.
    /// Custom types answer through their provider.
    pub fn supports_inline_edit(&self) -> bool {
        matches!(
            self,
            CellType::Text
                | CellType::Number
                | CellType::Currency
                | CellType::Percent
                | CellType::Date
                | CellType::DateLocal
                | CellType::Email
                | CellType::Phone
                | CellType::Url
                | CellType::Boolean
        )
    }

    /// Number of focusable elements a cell of this type renders
    pub fn actionable_elements(&self) -> usize {
        match self {
            CellType::Email
            | CellType::Phone
            | CellType::Url
            | CellType::Action
            | CellType::Button
            | CellType::ButtonIcon => 1,
            _ => 0,
        }
    }
}

/// Text shown for a value, also what auto width mode measures
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Check an edited value against the expectations of a standard type
pub fn value_is_valid(cell_type: &CellType, value: &Value) -> bool {
    match (cell_type, value) {
        (_, Value::Null) => true,
        (t, Value::Number(_)) if t.is_numeric() => true,
        (t, Value::String(s)) if t.is_numeric() => s.trim().is_empty() || s.trim().parse::<f64>().is_ok(),
        (t, _) if t.is_numeric() => false,
        (CellType::Boolean, v) => v.is_boolean(),
        (CellType::Email, Value::String(s)) => s.is_empty() || s.contains('@'),
        _ => true,
    }
}
