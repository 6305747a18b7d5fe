//! Captures each unit's figures once, at the moment it enters an editing
//! session, and serves signed deltas against that snapshot from then on.
//!
//! Capture is first-write-wins: re-encountering a unit never moves its
//! baseline. Sources prefer a previously fetched grouped snapshot matching
//! the unit's code; a unit never seen before is its own baseline and diffs
//! as zero until edited.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{Baseline, DeltaKind, GroupedSnapshot, Unit, UnitDiff};

#[derive(Debug, Default)]
pub struct BaselineTracker {
    baselines: HashMap<i64, Baseline>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures a baseline for `unit`, preferring the prior snapshot's entry
    /// for the same code. Returns the baseline in effect afterwards, which
    /// is the original one if the unit was captured before.
    pub fn capture(&mut self, unit: &Unit, prior: Option<&GroupedSnapshot>) -> Baseline {
        if let Some(existing) = self.baselines.get(&unit.id) {
            return *existing;
        }
        let baseline = prior
            .and_then(|snapshot| snapshot.find_unit_by_code(&unit.code))
            .map(Baseline::of)
            .unwrap_or_else(|| Baseline::of(unit));
        self.baselines.insert(unit.id, baseline);
        baseline
    }

    pub fn get(&self, unit_id: i64) -> Option<Baseline> {
        self.baselines.get(&unit_id).copied()
    }

    /// The unit's baseline, or its live figures when it was never captured.
    pub fn baseline_or_live(&self, unit: &Unit) -> Baseline {
        self.get(unit.id).unwrap_or_else(|| Baseline::of(unit))
    }

    pub fn diff(&self, unit: &Unit) -> UnitDiff {
        let baseline = self.baseline_or_live(unit);
        UnitDiff {
            cost_delta: unit.cost - baseline.cost,
            price_delta: unit.base_price - baseline.base_price,
            on_hand_delta: unit.on_hand - baseline.on_hand,
        }
    }

    pub fn classify(delta: Decimal) -> DeltaKind {
        DeltaKind::of(delta)
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}
