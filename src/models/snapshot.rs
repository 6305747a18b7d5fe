use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::unit::{Unit, UnitKey};

/// All units of one underlying item, keyed by the anchor's code.
///
/// Invariant: in a non-empty group exactly one member is the anchor, the
/// anchor carries the largest conversion value, and every other member's
/// `master_unit_id` points at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGroup {
    pub key: String,
    pub anchor_id: i64,
    pub units: Vec<Unit>,
}

impl UnitGroup {
    pub fn anchor(&self) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == self.anchor_id)
    }

    pub fn siblings(&self) -> impl Iterator<Item = &Unit> {
        let anchor_id = self.anchor_id;
        self.units.iter().filter(move |u| u.id != anchor_id)
    }

    pub fn contains(&self, unit_id: i64) -> bool {
        self.units.iter().any(|u| u.id == unit_id)
    }
}

/// One group inside a [`GroupedSnapshot`].
///
/// `roster` is the group's sibling-list metadata as fetched: the identity of
/// every member at snapshot time. Merging edits rewrites `units` in place but
/// must never touch the roster — it is what later lets a renamed unit be
/// matched back to its upstream sub-entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotGroup {
    pub units: Vec<Unit>,
    pub roster: Vec<UnitKey>,
}

impl SnapshotGroup {
    pub fn from_units(units: Vec<Unit>) -> Self {
        let roster = units.iter().map(Unit::key).collect();
        Self { units, roster }
    }

    /// The code a member carried when the snapshot was taken.
    pub fn original_code(&self, unit_id: i64) -> Option<&str> {
        self.roster
            .iter()
            .find(|k| k.id == unit_id)
            .map(|k| k.fallback_code.as_str())
    }
}

/// The last fetched/computed grouping of units, anchor code to group.
///
/// Replaced wholesale whenever a fresh search happens for an item; individual
/// entries are updated in place when edits are merged at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedSnapshot {
    pub groups: HashMap<String, SnapshotGroup>,
    pub fetched_at: DateTime<Utc>,
}

impl GroupedSnapshot {
    pub fn new(groups: HashMap<String, SnapshotGroup>) -> Self {
        Self {
            groups,
            fetched_at: Utc::now(),
        }
    }

    pub fn from_groups(groups: Vec<UnitGroup>) -> Self {
        Self::new(
            groups
                .into_iter()
                .map(|g| (g.key, SnapshotGroup::from_units(g.units)))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Finds a unit by its current code across every group.
    pub fn find_unit_by_code(&self, code: &str) -> Option<&Unit> {
        self.groups
            .values()
            .flat_map(|g| g.units.iter())
            .find(|u| u.code == code)
    }
}

impl Default for GroupedSnapshot {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

/// A working copy of a unit with an in-flight edit, plus the identity the
/// unit had when the session began. Lives in the reconciliation store until
/// a successful save-and-merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub unit: Unit,
    pub original_code: String,
    pub original_full_name: String,
    /// Anchor code of the group the unit belonged to when recorded; used to
    /// place the edit if it cannot be matched at merge time.
    pub group_key: String,
    pub recorded_at: DateTime<Utc>,
}

impl PendingEdit {
    pub fn new(
        unit: Unit,
        original_code: String,
        original_full_name: String,
        group_key: String,
    ) -> Self {
        Self {
            unit,
            original_code,
            original_full_name,
            group_key,
            recorded_at: Utc::now(),
        }
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            id: self.unit.id,
            fallback_code: self.original_code.clone(),
        }
    }
}
