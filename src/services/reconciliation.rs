//! Identity-stable accumulator of in-flight edits.
//!
//! Edits are keyed by unit id and indexed by current and original code, so
//! an edit survives the user renaming the unit's code mid-session. Merging
//! folds every edit into the last grouped snapshot exactly once; edits that
//! match nothing are kept as orphan additions — an extra row is recoverable,
//! a silently dropped edit is not.

use std::collections::HashSet;

use dashmap::DashMap;
use tracing::debug;

use crate::models::{GroupedSnapshot, PendingEdit, SnapshotGroup, UnitKey};

/// Outcome of merging the store into a snapshot.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub applied: usize,
    pub orphans: Vec<UnitKey>,
}

#[derive(Debug, Default)]
pub struct EditReconciliationStore {
    by_id: DashMap<i64, PendingEdit>,
    code_index: DashMap<String, i64>,
    original_code_index: DashMap<String, i64>,
}

impl EditReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edit, replacing any earlier edit of the same unit and
    /// re-pointing the code indexes at the latest state.
    pub fn record(&self, edit: PendingEdit) {
        if let Some(previous) = self.by_id.get(&edit.unit.id) {
            if previous.unit.code != edit.unit.code {
                self.code_index.remove(&previous.unit.code);
            }
        }
        if !edit.unit.code.is_empty() {
            self.code_index.insert(edit.unit.code.clone(), edit.unit.id);
        }
        if !edit.original_code.is_empty() {
            self.original_code_index
                .insert(edit.original_code.clone(), edit.unit.id);
        }
        self.by_id.insert(edit.unit.id, edit);
    }

    pub fn get(&self, unit_id: i64) -> Option<PendingEdit> {
        self.by_id.get(&unit_id).map(|e| e.value().clone())
    }

    /// Three-tier lookup: id, then current code, then original code. The
    /// string tiers exist because a snapshot entry still carries the code
    /// the unit had before a rename.
    pub fn lookup(&self, unit_id: i64, code: &str) -> Option<PendingEdit> {
        if let Some(edit) = self.by_id.get(&unit_id) {
            return Some(edit.value().clone());
        }
        if let Some(id) = self.code_index.get(code).map(|e| *e.value()) {
            if let Some(edit) = self.by_id.get(&id) {
                return Some(edit.value().clone());
            }
        }
        if let Some(id) = self.original_code_index.get(code).map(|e| *e.value()) {
            if let Some(edit) = self.by_id.get(&id) {
                return Some(edit.value().clone());
            }
        }
        None
    }

    /// Folds every recorded edit into `snapshot`, replacing the matched
    /// units' editable fields in place. Group rosters are never touched.
    /// Each edit applies at most once even if several entries match it.
    pub fn merge_into(&self, snapshot: &mut GroupedSnapshot) -> MergeReport {
        let mut applied: HashSet<i64> = HashSet::new();

        for group in snapshot.groups.values_mut() {
            for unit in group.units.iter_mut() {
                let Some(edit) = self.lookup(unit.id, &unit.code) else {
                    continue;
                };
                if !applied.insert(edit.unit.id) {
                    continue;
                }
                unit.code = edit.unit.code.clone();
                unit.full_name = edit.unit.full_name.clone();
                unit.base_price = edit.unit.base_price;
                unit.cost = edit.unit.cost;
                unit.on_hand = edit.unit.on_hand;
                unit.edited = edit.unit.edited;
            }
        }

        let mut orphans = Vec::new();
        for entry in self.by_id.iter() {
            if applied.contains(entry.key()) {
                continue;
            }
            let edit = entry.value();
            debug!(
                unit_id = edit.unit.id,
                code = %edit.unit.code,
                group_key = %edit.group_key,
                "edit matched no snapshot entry; keeping as orphan addition"
            );
            orphans.push(edit.key());

            let group_key = if edit.group_key.is_empty() {
                edit.unit.code.clone()
            } else {
                edit.group_key.clone()
            };
            let group = snapshot
                .groups
                .entry(group_key)
                .or_insert_with(|| SnapshotGroup {
                    units: Vec::new(),
                    roster: Vec::new(),
                });
            group.roster.push(edit.key());
            group.units.push(edit.unit.clone());
        }

        MergeReport {
            applied: applied.len(),
            orphans,
        }
    }

    /// Empties the store. Call only after a successful merge-and-persist
    /// round-trip.
    pub fn clear(&self) {
        self.by_id.clear();
        self.code_index.clear();
        self.original_code_index.clear();
    }

    pub fn edits(&self) -> Vec<PendingEdit> {
        self.by_id.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
