mod common;

use std::collections::HashMap;

use common::priced_unit;
use packsync_api::models::{GroupedSnapshot, PendingEdit, SnapshotGroup, Unit};
use packsync_api::services::reconciliation::EditReconciliationStore;
use rust_decimal_macros::dec;

fn snapshot_unit(id: i64, code: &str, master: Option<i64>) -> Unit {
    priced_unit(
        id,
        code,
        if master.is_none() { dec!(24) } else { dec!(1) },
        master,
        dec!(10_000),
        dec!(12_000),
        dec!(5),
    )
}

fn two_item_snapshot() -> GroupedSnapshot {
    let mut groups = HashMap::new();
    groups.insert(
        "A".to_string(),
        SnapshotGroup::from_units(vec![
            snapshot_unit(1, "A", None),
            snapshot_unit(2, "A-1", Some(1)),
        ]),
    );
    groups.insert(
        "B".to_string(),
        SnapshotGroup::from_units(vec![snapshot_unit(3, "B", None)]),
    );
    GroupedSnapshot::new(groups)
}

fn edit_of(mut unit: Unit, original_code: &str, group_key: &str) -> PendingEdit {
    unit.edited = true;
    PendingEdit::new(
        unit,
        original_code.to_string(),
        String::new(),
        group_key.to_string(),
    )
}

#[test]
fn record_merge_clear_round_trip_applies_each_edit_once() {
    let store = EditReconciliationStore::new();
    let mut snapshot = two_item_snapshot();

    let mut changed_anchor = snapshot_unit(1, "A", None);
    changed_anchor.cost = dec!(11_000);
    let mut changed_child = snapshot_unit(2, "A-1", Some(1));
    changed_child.cost = dec!(460);
    store.record(edit_of(changed_anchor, "A", "A"));
    store.record(edit_of(changed_child, "A-1", "A"));
    assert_eq!(store.len(), 2);

    let report = store.merge_into(&mut snapshot);
    store.clear();

    assert_eq!(report.applied, 2);
    assert!(report.orphans.is_empty());
    assert!(store.is_empty());

    let group_a = &snapshot.groups["A"];
    assert_eq!(group_a.units[0].cost, dec!(11_000));
    assert!(group_a.units[0].edited);
    assert_eq!(group_a.units[1].cost, dec!(460));
}

#[test]
fn merge_leaves_unmatched_groups_untouched() {
    let store = EditReconciliationStore::new();
    let mut snapshot = two_item_snapshot();
    let group_b_before = snapshot.groups["B"].clone();

    let mut changed = snapshot_unit(1, "A", None);
    changed.base_price = dec!(13_000);
    store.record(edit_of(changed, "A", "A"));

    store.merge_into(&mut snapshot);

    assert_eq!(snapshot.groups["B"], group_b_before);
}

#[test]
fn merge_preserves_the_group_roster() {
    let store = EditReconciliationStore::new();
    let mut snapshot = two_item_snapshot();
    let roster_before = snapshot.groups["A"].roster.clone();

    let mut renamed = snapshot_unit(2, "A-1-NEW", Some(1));
    renamed.cost = dec!(470);
    store.record(edit_of(renamed, "A-1", "A"));

    store.merge_into(&mut snapshot);

    let group_a = &snapshot.groups["A"];
    assert_eq!(group_a.roster, roster_before);
    // The unit itself did move to the new code.
    assert_eq!(group_a.units[1].code, "A-1-NEW");
    // And the roster still remembers what it was called at snapshot time.
    assert_eq!(group_a.original_code(2), Some("A-1"));
}

#[test]
fn renamed_edit_is_found_through_its_original_code() {
    let store = EditReconciliationStore::new();

    // The edit's unit id does not exist in the snapshot (the id was
    // unavailable when the edit was recorded), so only the original-code
    // tier can match it.
    let mut renamed = snapshot_unit(501, "A-RENAMED", None);
    renamed.cost = dec!(14_000);
    store.record(edit_of(renamed, "A", "A"));

    let mut snapshot = two_item_snapshot();
    let report = store.merge_into(&mut snapshot);

    assert_eq!(report.applied, 1);
    assert!(report.orphans.is_empty());
    let group_a = &snapshot.groups["A"];
    assert_eq!(group_a.units[0].code, "A-RENAMED");
    assert_eq!(group_a.units[0].cost, dec!(14_000));
}

#[test]
fn lookup_prefers_id_then_code_then_original_code() {
    let store = EditReconciliationStore::new();
    let mut renamed = snapshot_unit(7, "NEW", None);
    renamed.cost = dec!(9_999);
    store.record(edit_of(renamed, "OLD", "A"));

    assert!(store.lookup(7, "whatever").is_some());
    assert!(store.lookup(0, "NEW").is_some());
    assert!(store.lookup(0, "OLD").is_some());
    assert!(store.lookup(0, "NEITHER").is_none());
}

#[test]
fn unmatched_edit_is_kept_as_an_orphan_addition() {
    let store = EditReconciliationStore::new();
    let mut snapshot = two_item_snapshot();

    let stray = snapshot_unit(999, "GONE", None);
    store.record(edit_of(stray, "GONE", "A"));

    let report = store.merge_into(&mut snapshot);

    assert_eq!(report.applied, 0);
    assert_eq!(report.orphans.len(), 1);
    assert_eq!(report.orphans[0].id, 999);
    // Data loss is worse than an extra row: the edit landed in its group.
    let group_a = &snapshot.groups["A"];
    assert_eq!(group_a.units.len(), 3);
    assert!(group_a.units.iter().any(|u| u.id == 999));
}

#[test]
fn orphan_with_unknown_group_creates_one() {
    let store = EditReconciliationStore::new();
    let mut snapshot = two_item_snapshot();

    let stray = snapshot_unit(999, "GONE", None);
    store.record(edit_of(stray, "GONE", "VANISHED"));

    store.merge_into(&mut snapshot);

    assert!(snapshot.groups.contains_key("VANISHED"));
    assert_eq!(snapshot.groups["VANISHED"].units.len(), 1);
}

#[test]
fn rerecording_a_unit_replaces_its_earlier_edit() {
    let store = EditReconciliationStore::new();
    let mut snapshot = two_item_snapshot();

    let mut first = snapshot_unit(1, "A", None);
    first.cost = dec!(10_500);
    store.record(edit_of(first, "A", "A"));
    let mut second = snapshot_unit(1, "A", None);
    second.cost = dec!(10_900);
    store.record(edit_of(second, "A", "A"));

    assert_eq!(store.len(), 1);
    let report = store.merge_into(&mut snapshot);
    assert_eq!(report.applied, 1);
    assert_eq!(snapshot.groups["A"].units[0].cost, dec!(10_900));
}
