use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::unit::Unit;

/// A purchase/receiving entry applied to a group's anchor unit.
///
/// `box_count` is expressed in the group's largest packaging unit,
/// `retail_count` in the base scale. A retail count that exceeds the largest
/// conversion value is folded into boxes before anything else happens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    #[serde(default)]
    pub box_count: Decimal,
    #[serde(default)]
    pub retail_count: Decimal,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub discount_per_unit: Decimal,
    #[serde(default)]
    pub discount_on_total: Decimal,
    /// Weighted-average costing instead of direct division.
    #[serde(default)]
    pub use_weighted_average: bool,
}

impl PurchaseEvent {
    /// An empty event must never perturb figures, not even via rounding.
    pub fn is_empty(&self) -> bool {
        self.box_count.is_zero() && self.retail_count.is_zero() && self.total_price.is_zero()
    }

    /// Stock received with no price information: on-hand moves, cost does not.
    pub fn is_stock_only(&self) -> bool {
        (self.box_count > Decimal::ZERO || self.retail_count > Decimal::ZERO)
            && self.total_price.is_zero()
    }
}

/// Immutable snapshot of a unit's figures at the moment it entered the
/// editing session. Captured once per unit, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub cost: Decimal,
    pub base_price: Decimal,
    pub on_hand: Decimal,
}

impl Baseline {
    pub fn of(unit: &Unit) -> Self {
        Self {
            cost: unit.cost,
            base_price: unit.base_price,
            on_hand: unit.on_hand,
        }
    }
}

/// Anchor figures threaded explicitly through the sibling cascade.
///
/// This is a plain value argument, never shared state: the cascade must be a
/// pure function of the anchor it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorContext {
    pub code: String,
    pub conversion_value: Decimal,
    pub cost: Decimal,
    pub on_hand: Decimal,
    pub discount_per_unit: Decimal,
}

impl AnchorContext {
    pub fn new(anchor: &Unit, discount_per_unit: Decimal) -> Self {
        Self {
            code: anchor.code.clone(),
            conversion_value: anchor.conversion_value,
            cost: anchor.cost,
            on_hand: anchor.on_hand,
            discount_per_unit,
        }
    }
}

/// Direction of a baseline delta, for display classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    Increase,
    Decrease,
    Unchanged,
}

impl DeltaKind {
    pub fn of(delta: Decimal) -> Self {
        if delta > Decimal::ZERO {
            Self::Increase
        } else if delta < Decimal::ZERO {
            Self::Decrease
        } else {
            Self::Unchanged
        }
    }
}

/// Signed deltas of a unit's figures against its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitDiff {
    pub cost_delta: Decimal,
    pub price_delta: Decimal,
    pub on_hand_delta: Decimal,
}

impl UnitDiff {
    pub fn cost_kind(&self) -> DeltaKind {
        DeltaKind::of(self.cost_delta)
    }

    pub fn price_kind(&self) -> DeltaKind {
        DeltaKind::of(self.price_delta)
    }

    pub fn on_hand_kind(&self) -> DeltaKind {
        DeltaKind::of(self.on_hand_delta)
    }

    pub fn is_unchanged(&self) -> bool {
        self.cost_delta.is_zero() && self.price_delta.is_zero() && self.on_hand_delta.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_event_requires_all_three_zero() {
        let mut event = PurchaseEvent::default();
        assert!(event.is_empty());
        event.retail_count = dec!(2);
        assert!(!event.is_empty());
        assert!(event.is_stock_only());
        event.total_price = dec!(50_000);
        assert!(!event.is_stock_only());
    }

    #[test]
    fn delta_classification_is_strict_sign() {
        assert_eq!(DeltaKind::of(dec!(0.01)), DeltaKind::Increase);
        assert_eq!(DeltaKind::of(dec!(-0.01)), DeltaKind::Decrease);
        assert_eq!(DeltaKind::of(Decimal::ZERO), DeltaKind::Unchanged);
    }
}
