use super::*;
use crate::index::fixture;

use pretty_assertions::assert_eq;

fn key(s: &str) -> RowKey {
    RowKey::from(s)
}

fn keys(v: &[&str]) -> Vec<RowKey> {
    v.iter().map(|s| key(s)).collect()
}

#[test]
fn test_radio_replaces_previous_row() {
    let index = fixture(&["a", "b", "c"], &["x"]);
    let mut sel = SelectionState::new(Some(1));

    sel.select_row(&index, &key("a"));
    let delta = sel.select_row(&index, &key("b"));

    assert_eq!(sel.selected_rows(&index), keys(&["b"]));
    assert_eq!(delta.added, keys(&["b"]));
    assert_eq!(delta.removed, keys(&["a"]));
    assert!(!delta.disabled_toggled);
    assert!(!sel.is_disabled(&key("c")));
}

#[test]
fn test_max_selection_disables_and_reenables() {
    let index = fixture(&["r1", "r2", "r3"], &["x"]);
    let mut sel = SelectionState::new(Some(2));

    sel.select_row(&index, &key("r1"));
    assert!(!sel.is_disabled(&key("r3")));
    let delta = sel.select_row(&index, &key("r2"));
    assert!(delta.disabled_toggled);
    assert!(sel.is_disabled(&key("r3")));
    assert!(!sel.is_disabled(&key("r1")));

    // disabled rows refuse selection
    assert!(sel.select_row(&index, &key("r3")).is_empty());
    assert_eq!(sel.count(), 2);

    let delta = sel.deselect_row(&index, &key("r1"));
    assert!(delta.disabled_toggled);
    assert!(!sel.is_disabled(&key("r3")));
}

#[test]
fn test_range_selection_from_anchor() {
    let index = fixture(&["a", "b", "c", "d", "e"], &["x"]);
    let mut sel = SelectionState::default();

    sel.select_row(&index, &key("b"));
    sel.select_range(&index, &key("d"));
    assert_eq!(sel.selected_rows(&index), keys(&["b", "c", "d"]));

    sel.deselect_range(&index, &key("c"));
    assert_eq!(sel.selected_rows(&index), keys(&["b"]));
}

#[test]
fn test_range_selection_walks_backwards() {
    let index = fixture(&["a", "b", "c", "d", "e"], &["x"]);
    let mut sel = SelectionState::new(Some(3));

    sel.select_row(&index, &key("e"));
    sel.select_range(&index, &key("a"));
    // closest to the anchor win when the maximum cuts the interval
    assert_eq!(sel.selected_rows(&index), keys(&["c", "d", "e"]));
}

#[test]
fn test_range_without_anchor_selects_single_row() {
    let index = fixture(&["a", "b"], &["x"]);
    let mut sel = SelectionState::default();
    sel.select_range(&index, &key("b"));
    assert_eq!(sel.selected_rows(&index), keys(&["b"]));
}

#[test]
fn test_select_all_respects_maximum() {
    let index = fixture(&["a", "b", "c", "d"], &["x"]);
    let mut sel = SelectionState::new(Some(3));
    sel.select_all(&index);
    assert_eq!(sel.selected_rows(&index), keys(&["a", "b", "c"]));
    assert_eq!(sel.bulk_state(&index), BulkSelection::All);

    sel.deselect_all();
    assert_eq!(sel.bulk_state(&index), BulkSelection::None);
}

#[test]
fn test_select_all_is_unavailable_for_radio() {
    let index = fixture(&["a", "b"], &["x"]);
    let mut sel = SelectionState::new(Some(1));
    assert!(sel.select_all(&index).is_empty());
}

#[test]
fn test_bulk_state() {
    let index = fixture(&["a", "b", "c"], &["x"]);
    let mut sel = SelectionState::default();
    assert_eq!(sel.bulk_state(&index), BulkSelection::None);
    sel.select_row(&index, &key("a"));
    assert_eq!(sel.bulk_state(&index), BulkSelection::Some);
    sel.select_all(&index);
    assert_eq!(sel.bulk_state(&index), BulkSelection::All);
}

#[test]
fn test_programmatic_selection_diffs() {
    let index = fixture(&["a", "b", "c", "d"], &["x"]);
    let mut sel = SelectionState::default();
    sel.set_selected_rows(&index, &keys(&["a", "b"]));

    let delta = sel.set_selected_rows(&index, &keys(&["b", "c", "ghost", "c"]));
    assert_eq!(delta.added, keys(&["c"]));
    assert_eq!(delta.removed, keys(&["a"]));
    assert_eq!(sel.selected_rows(&index), keys(&["b", "c"]));
}

#[test]
fn test_programmatic_selection_truncates_to_max() {
    let index = fixture(&["a", "b", "c", "d"], &["x"]);
    let mut sel = SelectionState::new(Some(2));
    sel.set_selected_rows(&index, &keys(&["d", "c", "b"]));
    assert_eq!(sel.selected_rows(&index), keys(&["c", "d"]));
    assert!(sel.is_disabled(&key("b")));
}

#[test]
fn test_lowering_max_truncates() {
    let index = fixture(&["a", "b", "c"], &["x"]);
    let mut sel = SelectionState::default();
    sel.select_all(&index);
    let delta = sel.set_max_row_selection(&index, Some(2));
    assert_eq!(delta.removed, keys(&["c"]));
    assert!(delta.disabled_toggled);
    assert!(sel.is_disabled(&key("c")));
}

#[test]
fn test_zero_max_disables_everything() {
    let index = fixture(&["a"], &["x"]);
    let mut sel = SelectionState::new(Some(0));
    assert!(sel.is_disabled(&key("a")));
    assert!(sel.select_row(&index, &key("a")).is_empty());
}

#[test]
fn test_retain_valid_after_rebuild() {
    let index = fixture(&["a", "b", "c"], &["x"]);
    let mut sel = SelectionState::default();
    sel.set_selected_rows(&index, &keys(&["a", "c"]));

    let rebuilt = fixture(&["a", "b"], &["x"]);
    let delta = sel.retain_valid(&rebuilt);
    assert_eq!(delta.removed, keys(&["c"]));
    assert_eq!(sel.selected_rows(&rebuilt), keys(&["a"]));
}
