//! Partitions a flat unit list into groups and elects each group's anchor.
//!
//! Anchor election is a pure function of the members' conversion values: the
//! unit with the strictly largest conversion value wins, first-seen wins
//! ties, and any pre-existing anchor flags or links are overwritten. The
//! largest packaging unit is always treated as price-authoritative.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{Unit, UnitGroup};

/// Result of grouping a unit list.
///
/// `flagged` lists groups with no member carrying a positive conversion
/// value; those groups are returned unmodified. `skipped` counts units with
/// no derivable group key. The engine reports both and logs neither — the
/// caller decides how loud to be.
#[derive(Debug, Clone, Default)]
pub struct GroupingOutcome {
    pub groups: Vec<UnitGroup>,
    pub flagged: Vec<String>,
    pub skipped: usize,
}

/// Groups units by their anchor reference (own identity when absent),
/// deduplicates by id, and (re-)elects every group's anchor.
pub fn group_units(units: &[Unit]) -> GroupingOutcome {
    let mut outcome = GroupingOutcome::default();
    if units.is_empty() {
        return outcome;
    }

    let mut order: Vec<i64> = Vec::new();
    let mut buckets: HashMap<i64, Vec<Unit>> = HashMap::new();

    for unit in units {
        let bucket_key = match unit.master_unit_id {
            Some(master_id) if master_id > 0 => master_id,
            _ if unit.id > 0 => unit.id,
            _ => {
                outcome.skipped += 1;
                continue;
            }
        };

        let members = buckets.entry(bucket_key).or_insert_with(|| {
            order.push(bucket_key);
            Vec::new()
        });
        // Idempotent insertion: the same unit may arrive once through its own
        // row and again through a sibling expansion.
        if !members.iter().any(|m| m.id == unit.id) {
            members.push(unit.clone());
        }
    }

    for bucket_key in order {
        let mut members = match buckets.remove(&bucket_key) {
            Some(m) if !m.is_empty() => m,
            _ => continue,
        };

        let anchor_index = elect_anchor(&members);
        let Some(anchor_index) = anchor_index else {
            // No electable anchor: hand the group back untouched and flag it.
            let key = members
                .first()
                .map(|m| m.code.clone())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| bucket_key.to_string());
            outcome.flagged.push(key.clone());
            outcome.groups.push(UnitGroup {
                key,
                anchor_id: 0,
                units: members,
            });
            continue;
        };

        let anchor_id = members[anchor_index].id;
        for (i, member) in members.iter_mut().enumerate() {
            if i == anchor_index {
                member.is_master = true;
                member.master_unit_id = None;
            } else {
                member.is_master = false;
                member.master_unit_id = Some(anchor_id);
            }
        }

        let anchor = &members[anchor_index];
        let key = if anchor.code.is_empty() {
            anchor.id.to_string()
        } else {
            anchor.code.clone()
        };

        outcome.groups.push(UnitGroup {
            key,
            anchor_id,
            units: members,
        });
    }

    outcome
}

/// Index of the member with the strictly largest positive conversion value;
/// ties keep the first-seen member.
fn elect_anchor(members: &[Unit]) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;
    for (i, member) in members.iter().enumerate() {
        if member.conversion_value <= Decimal::ZERO {
            continue;
        }
        match best {
            Some((_, value)) if member.conversion_value <= value => {}
            _ => best = Some((i, member.conversion_value)),
        }
    }
    best.map(|(i, _)| i)
}
