use super::*;
use crate::column::ColumnDefinition;
use crate::index::fixture;

use pretty_assertions::assert_eq;
use serde_json::json;

fn column(key: &str) -> Column {
    let def = ColumnDefinition {
        column_key: Some(key.to_string()),
        editable: true,
        ..ColumnDefinition::field(key, key)
    };
    Column::from_definition(&def, 0, &CellTypeRegistry::new())
}

fn key(s: &str) -> RowKey {
    RowKey::from(s)
}

#[test]
fn test_close_reason_strings() {
    for reason in [
        CloseReason::EditCanceled,
        CloseReason::LostFocus,
        CloseReason::TabPressedNext,
        CloseReason::TabPressedPrev,
        CloseReason::SubmitAction,
    ] {
        assert_eq!(CloseReason::parse(reason.as_str()), Some(reason));
    }
}

#[test]
fn test_commit_on_tab_then_cancel_all() {
    let index = fixture(&["r1", "r2"], &["c1"]);
    let registry = CellTypeRegistry::new();
    let mut session = InlineEditSession::new();

    let marked = session.open(&index, &column("c1"), &key("r1"), &SelectionState::default());
    assert_eq!(marked, Some(vec![key("r1")]));
    assert_eq!(session.panel().unwrap().value, json!("r1:c1"));

    session.set_value(json!("b"));
    let outcome = session.close(CloseReason::TabPressedNext, &index, &registry).unwrap();
    assert_eq!(outcome.committed, vec![key("r1")]);
    assert!(!session.is_open());
    assert_eq!(session.dirty().get(&key("r1"), &ColumnKey::from("c1")), Some(&json!("b")));
    assert_eq!(session.dirty().len(), 1);

    assert!(session.clear_dirty());
    assert!(session.dirty().is_empty());
}

#[test]
fn test_cancel_never_commits() {
    let index = fixture(&["r1"], &["c1"]);
    let mut session = InlineEditSession::new();
    session.open(&index, &column("c1"), &key("r1"), &SelectionState::default());
    session.set_value(json!("changed"));

    let outcome = session.close(CloseReason::EditCanceled, &index, &CellTypeRegistry::new()).unwrap();
    assert!(outcome.committed.is_empty());
    assert!(session.dirty().is_empty());
}

#[test]
fn test_unchanged_value_is_not_committed() {
    let index = fixture(&["r1"], &["c1"]);
    let mut session = InlineEditSession::new();
    session.open(&index, &column("c1"), &key("r1"), &SelectionState::default());

    let outcome = session.close(CloseReason::LostFocus, &index, &CellTypeRegistry::new()).unwrap();
    assert!(outcome.committed.is_empty());
}

#[test]
fn test_invalid_value_is_not_committed() {
    let index = fixture(&["r1"], &["c1"]);
    let mut session = InlineEditSession::new();
    session.open(&index, &column("c1"), &key("r1"), &SelectionState::default());
    session.set_value(json!("x"));
    session.set_validity(false);

    let outcome = session.close(CloseReason::SubmitAction, &index, &CellTypeRegistry::new()).unwrap();
    assert!(outcome.committed.is_empty());
}

#[test]
fn test_mass_edit_propagates_to_selected_rows() {
    let index = fixture(&["r1", "r2", "r3"], &["c1"]);
    let registry = CellTypeRegistry::new();
    let mut selection = SelectionState::default();
    selection.set_selected_rows(&index, &[key("r1"), key("r3")]);

    let mut session = InlineEditSession::new();
    let marked = session.open(&index, &column("c1"), &key("r3"), &selection).unwrap();
    assert_eq!(marked, vec![key("r1"), key("r3")]);
    assert!(session.panel().unwrap().mass_edit_enabled);

    session.set_value(json!("same"));
    assert!(session.set_mass_edit_checked(true));
    let outcome = session.close(CloseReason::SubmitAction, &index, &registry).unwrap();

    assert_eq!(outcome.committed, vec![key("r1"), key("r3")]);
    assert_eq!(session.dirty().get(&key("r1"), &ColumnKey::from("c1")), Some(&json!("same")));
    assert_eq!(session.dirty().get(&key("r2"), &ColumnKey::from("c1")), None);
}

#[test]
fn test_mass_edit_unavailable_for_unselected_row() {
    let index = fixture(&["r1", "r2", "r3"], &["c1"]);
    let mut selection = SelectionState::default();
    selection.set_selected_rows(&index, &[key("r1"), key("r3")]);

    let mut session = InlineEditSession::new();
    session.open(&index, &column("c1"), &key("r2"), &selection);
    assert!(!session.panel().unwrap().mass_edit_enabled);
    assert!(!session.set_mass_edit_checked(true));
}

#[test]
fn test_open_refuses_stale_or_readonly_cells() {
    let index = fixture(&["r1"], &["c1"]);
    let mut session = InlineEditSession::new();
    assert_eq!(session.open(&index, &column("c1"), &key("gone"), &SelectionState::default()), None);

    let mut readonly = column("c1");
    readonly.editable = false;
    assert_eq!(session.open(&index, &readonly, &key("r1"), &SelectionState::default()), None);
}

#[test]
fn test_number_columns_validate_values() {
    let index = fixture(&["r1"], &["c1"]);
    let mut col = column("c1");
    col.kind = crate::column::ColumnKind::Data(CellType::Number);
    let mut session = InlineEditSession::new();
    session.open(&index, &col, &key("r1"), &SelectionState::default());
    session.set_value(json!("not a number"));

    let outcome = session.close(CloseReason::SubmitAction, &index, &CellTypeRegistry::new()).unwrap();
    assert!(outcome.committed.is_empty());
}

#[test]
fn test_drafts_use_field_names() {
    let mut dirty = DirtyValues::default();
    dirty.set(key("r1"), ColumnKey::from("c1"), json!(5));
    let drafts = dirty.to_drafts(&[column("c1")]);
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].row_key, key("r1"));
    assert_eq!(drafts[0].values.get("c1"), Some(&json!(5)));
}
