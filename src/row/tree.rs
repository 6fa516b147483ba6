use std::collections::HashSet;

use serde_json::Value;

use super::{FlatRow, KeyAllocator, Record, RowKey};

/// Field holding a row's child records in hierarchical data
pub const CHILDREN_FIELD: &str = "_children";

/// Position of a visible row inside the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMeta {
    /// 1-based depth
    pub level: usize,
    pub set_size: usize,
    /// 1-based position among siblings
    pub pos_in_set: usize,
    pub child_count: usize,
    pub expanded: bool,
    pub parent: Option<RowKey>,
}

/// Expanded rows of hierarchical data. Survives data changes by key.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    expanded: HashSet<RowKey>,
}

impl TreeState {
    pub fn is_expanded(&self, key: &RowKey) -> bool {
        self.expanded.contains(key)
    }

    /// Returns true if the state changed
    pub fn expand(&mut self, key: &RowKey) -> bool {
        self.expanded.insert(key.clone())
    }

    pub fn collapse(&mut self, key: &RowKey) -> bool {
        self.expanded.remove(key)
    }

    pub fn set_expanded(&mut self, keys: impl IntoIterator<Item = RowKey>) {
        self.expanded = keys.into_iter().collect();
    }

    pub fn expanded_rows(&self) -> impl Iterator<Item = &RowKey> {
        self.expanded.iter()
    }
}

fn children(record: &Record) -> Option<&Vec<Value>> {
    record.get(CHILDREN_FIELD).and_then(Value::as_array)
}

/// True if any top level record carries a children array
pub fn is_hierarchical(records: &[Record]) -> bool {
    records.iter().any(|r| children(r).is_some())
}

/// Flatten hierarchical data into its visible rows, descending only into
/// expanded branches.
pub fn flatten_tree<'a>(
    records: &'a [Record],
    key_field: Option<&str>,
    state: &TreeState,
) -> Vec<FlatRow<'a>> {
    let mut out = Vec::new();
    let mut keys = KeyAllocator::default();
    let top: Vec<&Record> = records.iter().collect();
    visit(&top, 1, None, "", key_field, state, &mut keys, &mut out);
    out
}

#[allow(clippy::too_many_arguments)]
fn visit<'a>(
    level_records: &[&'a Record],
    level: usize,
    parent: Option<&RowKey>,
    path_prefix: &str,
    key_field: Option<&str>,
    state: &TreeState,
    keys: &mut KeyAllocator,
    out: &mut Vec<FlatRow<'a>>,
) {
    let set_size = level_records.len();
    for (i, &data) in level_records.iter().enumerate() {
        let path = if path_prefix.is_empty() {
            i.to_string()
        } else {
            format!("{}-{}", path_prefix, i)
        };
        let key = keys.allocate(data, key_field, &path);
        let kids: Vec<&'a Record> = children(data)
            .map(|c| c.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        let expanded = !kids.is_empty() && state.is_expanded(&key);

        out.push(FlatRow {
            key: key.clone(),
            data,
            tree: Some(TreeMeta {
                level,
                set_size,
                pos_in_set: i + 1,
                child_count: kids.len(),
                expanded,
                parent: parent.cloned(),
            }),
        });

        if expanded {
            visit(&kids, level + 1, Some(&key), &path, key_field, state, keys, out);
        }
    }
}
