//! Applies a purchase event to a group's anchor and cascades the resulting
//! cost/price/stock change to every sibling unit.
//!
//! Everything here is a pure function of its arguments: the engine reads no
//! ambient state, does no I/O, and always returns a fully populated anchor
//! and sibling list, even on degenerate input (zeros in, baseline values
//! out). Numeric guards resolve to the pre-event baseline rather than
//! letting a division by zero poison a price.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ServiceError;
use crate::models::{AnchorContext, Baseline, PurchaseEvent, Unit, UnitKey};
use crate::services::baseline::BaselineTracker;

/// The two base-price rounding steps, one per recomputation path.
///
/// Production rounds to 100 on the per-row path and to 1000 on the
/// whole-list path. They are kept as two independent values on purpose;
/// see the configuration module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSteps {
    pub row: Decimal,
    pub list: Decimal,
}

/// A per-unit condition hit during propagation. One malformed sibling must
/// not abort the rest of the cascade, so these ride along with the result.
#[derive(Debug)]
pub struct PropagationIssue {
    pub unit: UnitKey,
    pub error: ServiceError,
}

/// Outcome of applying one purchase event to a group.
#[derive(Debug)]
pub struct Propagation {
    pub anchor: Unit,
    pub siblings: Vec<Unit>,
    pub issues: Vec<PropagationIssue>,
}

/// Rounds `value` to the nearest multiple of `step`. A non-positive step
/// leaves the value as-is.
pub fn round_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    (value / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
}

/// Rounds to a whole number, halves away from zero.
pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn at_baseline(unit: &Unit, baseline: &Baseline) -> Unit {
    let mut reset = unit.clone();
    reset.cost = baseline.cost;
    reset.base_price = baseline.base_price;
    reset.on_hand = baseline.on_hand;
    reset
}

/// Applies `event` to `anchor`, then derives every sibling's figures from
/// the anchor's new state.
///
/// `step` is the base-price rounding step of the calling path (row or list).
/// Baselines come from the tracker; a unit never captured is its own
/// baseline.
pub fn apply_purchase(
    anchor: &Unit,
    siblings: &[Unit],
    baselines: &BaselineTracker,
    event: &PurchaseEvent,
    step: Decimal,
) -> Propagation {
    let anchor_baseline = baselines.baseline_or_live(anchor);
    let mut issues = Vec::new();

    if anchor.conversion_value <= Decimal::ZERO {
        // Nothing can be scaled through a degenerate anchor: report it and
        // hand the whole group back at baseline.
        issues.push(PropagationIssue {
            unit: anchor.key(),
            error: ServiceError::InvalidConversion {
                unit_id: anchor.id,
                value: anchor.conversion_value,
            },
        });
        return Propagation {
            anchor: at_baseline(anchor, &anchor_baseline),
            siblings: siblings
                .iter()
                .map(|s| at_baseline(s, &baselines.baseline_or_live(s)))
                .collect(),
            issues,
        };
    }

    let largest_conversion = siblings
        .iter()
        .map(|s| s.conversion_value)
        .fold(anchor.conversion_value, Decimal::max);

    // A retail count larger than the largest packaging secretly holds whole
    // boxes; fold them out before counting received stock.
    let mut box_count = event.box_count;
    let mut retail_count = event.retail_count;
    if retail_count > largest_conversion {
        let extra_boxes = (retail_count / largest_conversion).floor();
        retail_count -= extra_boxes * largest_conversion;
        box_count += extra_boxes;
    }

    let total_units = box_count * largest_conversion + retail_count;
    let added_on_hand = total_units / anchor.conversion_value;

    let mut next = anchor.clone();

    if event.is_empty() {
        // An empty entry must leave figures exactly at baseline, not merely
        // close to them.
        next.cost = anchor_baseline.cost;
        next.base_price = anchor_baseline.base_price;
        next.on_hand = anchor_baseline.on_hand;
        return Propagation {
            anchor: next,
            siblings: siblings
                .iter()
                .map(|s| at_baseline(s, &baselines.baseline_or_live(s)))
                .collect(),
            issues,
        };
    }

    if event.is_stock_only() {
        // Stock with no price information: on-hand moves, cost must not be
        // invented. Siblings keep their figures until a priced entry runs.
        next.cost = anchor_baseline.cost;
        next.base_price = anchor_baseline.base_price;
        next.on_hand = anchor_baseline.on_hand + added_on_hand;
        next.edited = true;
        return Propagation {
            anchor: next,
            siblings: siblings.to_vec(),
            issues,
        };
    }

    next.cost = if event.use_weighted_average {
        weighted_average_cost(&anchor_baseline, added_on_hand, event)
    } else {
        direct_cost(
            &anchor_baseline,
            total_units,
            anchor.conversion_value,
            event,
        )
    };
    next.on_hand = anchor_baseline.on_hand + added_on_hand;
    next.base_price = round_to_step(
        anchor_baseline.base_price + (next.cost - anchor_baseline.cost),
        step,
    );
    next.edited = true;

    let ctx = AnchorContext::new(&next, event.discount_per_unit);
    let mut cascaded = Vec::with_capacity(siblings.len());
    for sibling in siblings {
        let sibling_baseline = baselines.baseline_or_live(sibling);
        if sibling.conversion_value <= Decimal::ZERO {
            issues.push(PropagationIssue {
                unit: sibling.key(),
                error: ServiceError::InvalidConversion {
                    unit_id: sibling.id,
                    value: sibling.conversion_value,
                },
            });
            cascaded.push(at_baseline(sibling, &sibling_baseline));
            continue;
        }
        cascaded.push(cascade_to(sibling, &sibling_baseline, &ctx, step));
    }

    Propagation {
        anchor: next,
        siblings: cascaded,
        issues,
    }
}

/// Blends the received goods into the existing stock at their combined
/// average unit cost.
fn weighted_average_cost(
    baseline: &Baseline,
    added_on_hand: Decimal,
    event: &PurchaseEvent,
) -> Decimal {
    if added_on_hand <= Decimal::ZERO {
        return baseline.cost;
    }
    let net_price = (event.total_price - event.discount_on_total).max(Decimal::ZERO);
    let new_unit_cost = net_price / added_on_hand;
    let combined_on_hand = baseline.on_hand + added_on_hand;
    if combined_on_hand <= Decimal::ZERO {
        return baseline.cost;
    }
    (baseline.cost * baseline.on_hand + new_unit_cost * added_on_hand) / combined_on_hand
}

/// Direct policy: the purchase total divided over the received base units,
/// scaled back up to the anchor's packaging.
///
/// When both discounts are present the per-unit discount wins and the total
/// discount is ignored; they are deliberately not combined. The precedence
/// mirrors long-standing production behavior and is pinned by a regression
/// test — do not "fix" it here without a product decision.
fn direct_cost(
    baseline: &Baseline,
    total_units: Decimal,
    conversion_value: Decimal,
    event: &PurchaseEvent,
) -> Decimal {
    if total_units <= Decimal::ZERO {
        return baseline.cost;
    }
    // Multiply before dividing: a whole box bought for a round total must
    // come out at exactly that total, not a hair off it.
    if event.discount_per_unit > Decimal::ZERO {
        (event.total_price - event.discount_per_unit * total_units) * conversion_value
            / total_units
    } else if event.discount_on_total > Decimal::ZERO {
        (event.total_price - event.discount_on_total) * conversion_value / total_units
    } else {
        event.total_price * conversion_value / total_units
    }
}

/// Derives one sibling's figures from the anchor context.
fn cascade_to(sibling: &Unit, baseline: &Baseline, ctx: &AnchorContext, step: Decimal) -> Unit {
    let mut child = sibling.clone();

    let mut cost = round_whole(ctx.cost / ctx.conversion_value * child.conversion_value);
    if ctx.discount_per_unit > Decimal::ZERO {
        cost -= ctx.discount_per_unit * child.conversion_value;
    }
    child.cost = cost;
    child.on_hand = ctx.on_hand * ctx.conversion_value / child.conversion_value;
    child.base_price = round_to_step(baseline.base_price + (cost - baseline.cost), step);
    child.edited = true;
    child
}
