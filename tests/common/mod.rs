#![allow(dead_code)]

use packsync_api::models::{PurchaseEntry, Unit};
use rust_decimal::Decimal;

/// Builds a unit with sane figure defaults; tests override what they assert.
pub fn unit(id: i64, code: &str, conversion: Decimal, master: Option<i64>) -> Unit {
    Unit {
        id,
        code: code.into(),
        name: format!("Item {}", code),
        unit_label: String::new(),
        attributes: Vec::new(),
        full_name: format!("Item {}", code),
        conversion_value: conversion,
        cost: Decimal::ZERO,
        base_price: Decimal::ZERO,
        on_hand: Decimal::ZERO,
        master_unit_id: master,
        is_master: master.is_none(),
        averaging_enabled: false,
        entry: PurchaseEntry::default(),
        edited: false,
    }
}

pub fn priced_unit(
    id: i64,
    code: &str,
    conversion: Decimal,
    master: Option<i64>,
    cost: Decimal,
    base_price: Decimal,
    on_hand: Decimal,
) -> Unit {
    let mut u = unit(id, code, conversion, master);
    u.cost = cost;
    u.base_price = base_price;
    u.on_hand = on_hand;
    u
}
