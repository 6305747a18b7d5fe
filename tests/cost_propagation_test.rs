mod common;

use common::priced_unit;
use packsync_api::models::{Baseline, PurchaseEvent, Unit};
use packsync_api::services::baseline::BaselineTracker;
use packsync_api::services::cost::{self, round_whole};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ROW_STEP: Decimal = dec!(100);
const LIST_STEP: Decimal = dec!(1000);

fn anchor_24() -> Unit {
    priced_unit(
        1,
        "COLA-CTN",
        dec!(24),
        None,
        dec!(90_000),
        dec!(110_000),
        dec!(3),
    )
}

fn siblings_of_24() -> Vec<Unit> {
    vec![
        priced_unit(
            2,
            "COLA-PACK",
            dec!(6),
            Some(1),
            dec!(22_500),
            dec!(27_500),
            dec!(12),
        ),
        priced_unit(
            3,
            "COLA-BTL",
            dec!(1),
            Some(1),
            dec!(3_750),
            dec!(4_600),
            dec!(72),
        ),
    ]
}

fn tracker_for(anchor: &Unit, siblings: &[Unit]) -> BaselineTracker {
    let mut tracker = BaselineTracker::new();
    tracker.capture(anchor, None);
    for sibling in siblings {
        tracker.capture(sibling, None);
    }
    tracker
}

#[test]
fn empty_event_leaves_anchor_and_siblings_at_baseline() {
    let anchor = anchor_24();
    let siblings = siblings_of_24();
    let tracker = tracker_for(&anchor, &siblings);

    let result = cost::apply_purchase(
        &anchor,
        &siblings,
        &tracker,
        &PurchaseEvent::default(),
        ROW_STEP,
    );

    assert!(result.issues.is_empty());
    assert_eq!(
        Baseline::of(&result.anchor),
        tracker.baseline_or_live(&anchor)
    );
    for (out, original) in result.siblings.iter().zip(&siblings) {
        assert_eq!(Baseline::of(out), tracker.baseline_or_live(original));
    }
}

#[test]
fn stock_only_entry_moves_on_hand_and_nothing_else() {
    let anchor = anchor_24();
    let siblings = siblings_of_24();
    let tracker = tracker_for(&anchor, &siblings);

    let event = PurchaseEvent {
        box_count: dec!(2),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &siblings, &tracker, &event, ROW_STEP);

    assert_eq!(result.anchor.on_hand, dec!(5));
    assert_eq!(result.anchor.cost, dec!(90_000));
    assert_eq!(result.anchor.base_price, dec!(110_000));
    assert!(result.anchor.edited);
    // No price information, no cascade: siblings keep their figures.
    assert_eq!(result.siblings, siblings);
}

#[test]
fn direct_policy_conserves_a_whole_box_total() {
    // One box of 24 for 100_000, no discounts: anchor cost is exactly the
    // purchase total.
    let anchor = anchor_24();
    let tracker = tracker_for(&anchor, &[]);

    let event = PurchaseEvent {
        box_count: dec!(1),
        total_price: dec!(100_000),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &[], &tracker, &event, ROW_STEP);

    assert_eq!(result.anchor.cost, dec!(100_000));
    assert_eq!(result.anchor.on_hand, dec!(4));
}

#[test]
fn direct_policy_halved_unit_count_doubles_cost() {
    // Same spend over half the received base units: 12 retail units instead
    // of a 24-box. Unit cost doubles, so the anchor cost doubles.
    let anchor = anchor_24();
    let tracker = tracker_for(&anchor, &[]);

    let event = PurchaseEvent {
        retail_count: dec!(12),
        total_price: dec!(100_000),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &[], &tracker, &event, ROW_STEP);

    assert_eq!(result.anchor.cost, dec!(200_000));
}

#[test]
fn weighted_average_blends_old_and_new_stock() {
    let anchor = priced_unit(
        1,
        "RICE",
        dec!(1),
        None,
        dec!(10_000),
        dec!(12_000),
        dec!(5),
    );
    let tracker = tracker_for(&anchor, &[]);

    // Adds 5 units at a net 100_000: new unit cost 20_000, blended with 5
    // on-hand at 10_000 the result is 15_000.
    let event = PurchaseEvent {
        box_count: dec!(5),
        total_price: dec!(100_000),
        use_weighted_average: true,
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &[], &tracker, &event, ROW_STEP);

    assert_eq!(result.anchor.cost, dec!(15_000));
    assert_eq!(result.anchor.on_hand, dec!(10));
}

#[test]
fn weighted_average_respects_total_discount() {
    let anchor = priced_unit(
        1,
        "RICE",
        dec!(1),
        None,
        dec!(10_000),
        dec!(12_000),
        dec!(5),
    );
    let tracker = tracker_for(&anchor, &[]);

    let event = PurchaseEvent {
        box_count: dec!(5),
        total_price: dec!(110_000),
        discount_on_total: dec!(10_000),
        use_weighted_average: true,
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &[], &tracker, &event, ROW_STEP);

    assert_eq!(result.anchor.cost, dec!(15_000));
}

#[test]
fn retail_overflow_folds_into_boxes_before_counting() {
    let anchor = anchor_24();
    let siblings = siblings_of_24();
    let tracker = tracker_for(&anchor, &siblings);

    // 50 retail units secretly hold two 24-boxes.
    let overflowing = PurchaseEvent {
        box_count: dec!(1),
        retail_count: dec!(50),
        total_price: dec!(300_000),
        ..PurchaseEvent::default()
    };
    let prefolded = PurchaseEvent {
        box_count: dec!(3),
        retail_count: dec!(2),
        total_price: dec!(300_000),
        ..PurchaseEvent::default()
    };

    let from_overflow = cost::apply_purchase(&anchor, &siblings, &tracker, &overflowing, ROW_STEP);
    let from_prefolded = cost::apply_purchase(&anchor, &siblings, &tracker, &prefolded, ROW_STEP);

    assert_eq!(from_overflow.anchor.on_hand, from_prefolded.anchor.on_hand);
    assert_eq!(from_overflow.anchor.cost, from_prefolded.anchor.cost);
    assert_eq!(
        from_overflow.anchor.base_price,
        from_prefolded.anchor.base_price
    );
}

#[test]
fn cascade_keeps_sibling_costs_proportional() {
    let anchor = anchor_24();
    let siblings = siblings_of_24();
    let tracker = tracker_for(&anchor, &siblings);

    let event = PurchaseEvent {
        box_count: dec!(2),
        total_price: dec!(240_000),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &siblings, &tracker, &event, ROW_STEP);

    assert_eq!(result.anchor.cost, dec!(120_000));
    for sibling in &result.siblings {
        let expected = round_whole(
            result.anchor.cost / result.anchor.conversion_value * sibling.conversion_value,
        );
        assert_eq!(sibling.cost, expected);
        assert!(sibling.edited);
    }
    // Sibling on-hand re-expresses the anchor stock in the sibling's scale.
    let pack = &result.siblings[0];
    assert_eq!(pack.on_hand, result.anchor.on_hand * dec!(24) / dec!(6));
}

#[test]
fn per_unit_discount_overrides_total_discount_in_direct_policy() {
    // Regression pin: when both discounts are present, the per-unit discount
    // wins and the total discount is ignored. The two are not combined even
    // though that looks like the intent; changing this changes posted costs.
    let anchor = priced_unit(
        1,
        "OIL-BOX",
        dec!(12),
        None,
        dec!(50_000),
        dec!(60_000),
        dec!(1),
    );
    let tracker = tracker_for(&anchor, &[]);

    let event = PurchaseEvent {
        box_count: dec!(1),
        total_price: dec!(120_000),
        discount_per_unit: dec!(1_000),
        discount_on_total: dec!(60_000),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &[], &tracker, &event, ROW_STEP);

    // (120_000 - 1_000 * 12) / 12 * 12 — the 60_000 total discount plays no
    // part.
    assert_eq!(result.anchor.cost, dec!(108_000));
}

#[test]
fn per_unit_discount_also_reduces_cascaded_sibling_costs() {
    let anchor = anchor_24();
    let siblings = siblings_of_24();
    let tracker = tracker_for(&anchor, &siblings);

    let event = PurchaseEvent {
        box_count: dec!(1),
        total_price: dec!(120_000),
        discount_per_unit: dec!(500),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &siblings, &tracker, &event, ROW_STEP);

    for sibling in &result.siblings {
        let undiscounted = round_whole(
            result.anchor.cost / result.anchor.conversion_value * sibling.conversion_value,
        );
        assert_eq!(
            sibling.cost,
            undiscounted - dec!(500) * sibling.conversion_value
        );
    }
}

#[test]
fn row_and_list_paths_round_prices_to_their_own_steps() {
    let anchor = priced_unit(
        1,
        "TEA-CTN",
        dec!(24),
        None,
        dec!(90_000),
        dec!(123_400),
        dec!(0),
    );
    let tracker = tracker_for(&anchor, &[]);

    let event = PurchaseEvent {
        box_count: dec!(1),
        total_price: dec!(91_250),
        ..PurchaseEvent::default()
    };

    // Cost moves from 90_000 to 91_250: price delta +1_250 over 123_400.
    let row = cost::apply_purchase(&anchor, &[], &tracker, &event, ROW_STEP);
    let list = cost::apply_purchase(&anchor, &[], &tracker, &event, LIST_STEP);

    assert_eq!(row.anchor.base_price, dec!(124_700));
    assert_eq!(list.anchor.base_price, dec!(125_000));
}

#[test]
fn zero_conversion_anchor_is_a_reported_no_op() {
    let mut anchor = anchor_24();
    anchor.conversion_value = Decimal::ZERO;
    let siblings = siblings_of_24();
    let tracker = tracker_for(&anchor, &siblings);

    let event = PurchaseEvent {
        box_count: dec!(1),
        total_price: dec!(100_000),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &siblings, &tracker, &event, ROW_STEP);

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.anchor.cost, dec!(90_000));
    assert_eq!(result.anchor.on_hand, dec!(3));
    for (out, original) in result.siblings.iter().zip(&siblings) {
        assert_eq!(Baseline::of(out), tracker.baseline_or_live(original));
    }
}

#[test]
fn malformed_sibling_is_skipped_without_aborting_the_cascade() {
    let anchor = anchor_24();
    let mut siblings = siblings_of_24();
    siblings[0].conversion_value = Decimal::ZERO;
    let tracker = tracker_for(&anchor, &siblings);

    let event = PurchaseEvent {
        box_count: dec!(1),
        total_price: dec!(120_000),
        ..PurchaseEvent::default()
    };
    let result = cost::apply_purchase(&anchor, &siblings, &tracker, &event, ROW_STEP);

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].unit.id, 2);
    // The malformed sibling stays at baseline...
    assert_eq!(result.siblings[0].cost, dec!(22_500));
    // ...while the healthy one still cascades.
    assert_eq!(
        result.siblings[1].cost,
        round_whole(result.anchor.cost / dec!(24))
    );
}
