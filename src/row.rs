pub mod tree;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub use tree::{TreeMeta, TreeState, CHILDREN_FIELD};

/// One row of host data, keyed by field name
pub type Record = Map<String, Value>;

/// Stable identifier of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub String);

impl RowKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used for rows without a usable key field
    pub fn synthesized(path: &str) -> Self {
        RowKey(format!("row-{}", path))
    }
}

impl From<&str> for RowKey {
    fn from(s: &str) -> Self {
        RowKey(s.to_string())
    }
}

impl From<String> for RowKey {
    fn from(s: String) -> Self {
        RowKey(s)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row as it appears in the table: a key, its ordinal position among the
/// visible rows and, for hierarchical data, its place in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub key: RowKey,
    pub ordinal: usize,
    pub tree: Option<TreeMeta>,
}

impl RowRecord {
    pub fn has_children(&self) -> bool {
        self.tree.as_ref().is_some_and(|t| t.child_count > 0)
    }

    pub fn is_expanded(&self) -> bool {
        self.tree.as_ref().is_some_and(|t| t.expanded)
    }
}

/// A visible row borrowed from the host data
#[derive(Debug, Clone)]
pub struct FlatRow<'a> {
    pub key: RowKey,
    pub data: &'a Record,
    pub tree: Option<TreeMeta>,
}

/// Read a row key from the configured key field.
/// Strings and numbers are accepted; anything else yields None.
pub fn key_from_field(record: &Record, key_field: Option<&str>) -> Option<RowKey> {
    match record.get(key_field?)? {
        Value::String(s) if !s.is_empty() => Some(RowKey(s.clone())),
        Value::Number(n) => Some(RowKey(n.to_string())),
        _ => None,
    }
}

/// Tracks keys handed out during one flattening pass so that duplicates get
/// a unique fallback instead of aliasing another row's index entries.
#[derive(Debug, Default)]
pub(crate) struct KeyAllocator {
    seen: HashSet<RowKey>,
}

impl KeyAllocator {
    pub fn allocate(&mut self, record: &Record, key_field: Option<&str>, path: &str) -> RowKey {
        let key = key_from_field(record, key_field).unwrap_or_else(|| RowKey::synthesized(path));
        if self.seen.insert(key.clone()) {
            return key;
        }

        let mut fallback = RowKey(format!("{}-{}", key, path));
        let mut attempt = 1;
        while !self.seen.insert(fallback.clone()) {
            fallback = RowKey(format!("{}-{}-{}", key, path, attempt));
            attempt += 1;
        }
        warn!(key = %key, fallback = %fallback, "duplicate row key");
        fallback
    }
}

/// Flatten flat (non hierarchical) data into visible rows
pub fn flatten_flat<'a>(records: &'a [Record], key_field: Option<&str>) -> Vec<FlatRow<'a>> {
    let mut keys = KeyAllocator::default();
    records
        .iter()
        .enumerate()
        .map(|(i, data)| FlatRow {
            key: keys.allocate(data, key_field, &i.to_string()),
            data,
            tree: None,
        })
        .collect()
}
