use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One attribute variant attached to a unit (e.g. flavour, colour).
/// Attribute values participate in the derived display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAttribute {
    pub name: String,
    pub value: String,
}

/// Identity of a unit that survives a mid-session code rename.
///
/// The numeric id is authoritative; the fallback code is the code the unit
/// carried when the key was taken, used when the id is unavailable at a
/// lookup site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub id: i64,
    pub fallback_code: String,
}

impl UnitKey {
    pub fn of(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            fallback_code: unit.code.clone(),
        }
    }
}

/// Purchase-entry scratch fields typed into a row before a purchase event
/// is applied. These never feed the diff baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEntry {
    #[serde(default)]
    pub box_count: Decimal,
    #[serde(default)]
    pub retail_count: Decimal,
    #[serde(default)]
    pub discount_per_unit: Decimal,
    #[serde(default)]
    pub discount_on_total: Decimal,
    #[serde(default)]
    pub total_price_entered: Decimal,
}

/// One packaging/sale unit of a catalog item.
///
/// Units sharing the same underlying item form a group; the member with the
/// largest conversion value is the group's anchor and is price-authoritative
/// for cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable numeric identity, never reused.
    pub id: i64,
    /// Mutable display identifier.
    pub code: String,
    pub name: String,
    /// Packaging label, e.g. "bottle", "carton".
    #[serde(default)]
    pub unit_label: String,
    #[serde(default)]
    pub attributes: Vec<UnitAttribute>,
    /// Derived display name; see [`Unit::derived_full_name`].
    #[serde(default)]
    pub full_name: String,
    /// How many base-scale units this packaging unit represents.
    pub conversion_value: Decimal,
    pub cost: Decimal,
    pub base_price: Decimal,
    /// Quantity on hand, expressed in this unit's own scale.
    pub on_hand: Decimal,
    /// Back-reference to the group anchor; `None` on the anchor itself.
    #[serde(default)]
    pub master_unit_id: Option<i64>,
    #[serde(default)]
    pub is_master: bool,
    /// Costing-policy switch: weighted average instead of direct division.
    #[serde(default)]
    pub averaging_enabled: bool,
    #[serde(default)]
    pub entry: PurchaseEntry,
    /// Set once any field has been user-modified in the session.
    #[serde(default)]
    pub edited: bool,
}

impl Unit {
    pub fn key(&self) -> UnitKey {
        UnitKey::of(self)
    }

    /// Display name: name, then attribute values, then the packaging label.
    /// The upstream system regenerates this server-side, so it is never
    /// submitted directly; it only has to match for local display and diffs.
    pub fn derived_full_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(2 + self.attributes.len());
        if !self.name.is_empty() {
            parts.push(&self.name);
        }
        for attr in &self.attributes {
            if !attr.value.is_empty() {
                parts.push(&attr.value);
            }
        }
        if !self.unit_label.is_empty() {
            parts.push(&self.unit_label);
        }
        parts.join(" ")
    }

    pub fn refresh_full_name(&mut self) {
        self.full_name = self.derived_full_name();
    }
}
