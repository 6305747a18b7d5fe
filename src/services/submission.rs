//! Folds a finalized batch of edited units into the upstream update
//! template, one call per group.
//!
//! The template carrier is the group member with the smallest conversion
//! value — deliberately the opposite of anchor election, because the
//! upstream API expects the smallest-unit representation as its root
//! object. Sub-entries are matched by their own code, then by the code the
//! member carried at snapshot time, then by id.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::clients::inventory::{ExternalUnitTemplate, InventoryApi};
use crate::errors::ServiceError;
use crate::models::{Unit, UnitKey};

/// One group of edited units ready for submission, with the roster of
/// identities its members had when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct SubmissionGroup {
    pub key: String,
    pub units: Vec<Unit>,
    pub roster: Vec<UnitKey>,
}

impl SubmissionGroup {
    /// The member with the smallest conversion value; ties keep first-seen.
    pub fn carrier(&self) -> Option<&Unit> {
        let mut best: Option<&Unit> = None;
        for unit in &self.units {
            match best {
                Some(current) if unit.conversion_value >= current.conversion_value => {}
                _ => best = Some(unit),
            }
        }
        best
    }

    fn original_code(&self, unit_id: i64) -> Option<&str> {
        self.roster
            .iter()
            .find(|k| k.id == unit_id)
            .map(|k| k.fallback_code.as_str())
    }

    /// Finds the member a template entry refers to: current code first, the
    /// recorded original code second (the entry still carries the pre-rename
    /// code), id last.
    fn find_member(&self, entry_code: &str, entry_id: i64) -> Option<&Unit> {
        self.units
            .iter()
            .find(|u| u.code == entry_code)
            .or_else(|| {
                self.units
                    .iter()
                    .find(|u| self.original_code(u.id) == Some(entry_code))
            })
            .or_else(|| self.units.iter().find(|u| u.id == entry_id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionReport {
    pub submitted: usize,
    pub group_keys: Vec<String>,
}

#[derive(Clone)]
pub struct SubmissionMergeService {
    inventory: Arc<dyn InventoryApi>,
}

impl SubmissionMergeService {
    pub fn new(inventory: Arc<dyn InventoryApi>) -> Self {
        Self { inventory }
    }

    /// Submits every group, one upstream call each. Stops at the first
    /// upstream failure and surfaces it verbatim; retrying is the caller's
    /// decision.
    #[instrument(skip(self, groups))]
    pub async fn submit_groups(
        &self,
        groups: &[SubmissionGroup],
    ) -> Result<SubmissionReport, ServiceError> {
        let mut report = SubmissionReport::default();
        for group in groups {
            self.submit_group(group).await?;
            report.submitted += 1;
            report.group_keys.push(group.key.clone());
        }
        Ok(report)
    }

    #[instrument(skip(self, group), fields(group_key = %group.key))]
    pub async fn submit_group(&self, group: &SubmissionGroup) -> Result<(), ServiceError> {
        let carrier = group.carrier().ok_or_else(|| {
            ServiceError::InvalidOperation(format!("Group {} has no units to submit", group.key))
        })?;

        let mut template = self.inventory.fetch_unit_template(carrier.id).await?;
        fold_group(&mut template, group);
        self.inventory.submit_update(&template).await?;

        info!(
            group_key = %group.key,
            carrier_id = carrier.id,
            units = group.units.len(),
            "group submitted upstream"
        );
        Ok(())
    }
}

/// Folds the group's edited fields into the fetched template, populating the
/// `Compare*` echo fields from the template's own prior values.
pub fn fold_group(template: &mut ExternalUnitTemplate, group: &SubmissionGroup) {
    let product = &mut template.product;

    if let Some(member) = group.find_member(&product.code, product.id) {
        let old_code = product.code.clone();
        let old_base_price = product.base_price;
        let old_cost = product.cost;
        let old_on_hand = product.on_hand;

        if !member.code.is_empty() && member.code != product.code {
            product.code = member.code.clone();
            product.compare_code = Some(old_code);
        }
        if !member.full_name.is_empty() {
            product.full_name = member.full_name.clone();
        }
        product.base_price = member.base_price;
        product.compare_base_price = Some(old_base_price);
        product.cost = member.cost;
        product.compare_cost = Some(old_cost);
        product.on_hand = member.on_hand;
        product.compare_on_hand = Some(old_on_hand);
    }

    for entry in product.product_units.iter_mut() {
        let Some(member) = group.find_member(&entry.code, entry.id) else {
            continue;
        };
        let old_code = entry.code.clone();
        let old_base_price = entry.base_price;
        let old_cost = entry.cost;
        let old_on_hand = entry.on_hand;

        if !member.code.is_empty() && member.code != entry.code {
            entry.code = member.code.clone();
            entry.compare_code = Some(old_code);
        }
        if !member.full_name.is_empty() {
            entry.full_name = member.full_name.clone();
        }
        entry.base_price = member.base_price;
        entry.compare_base_price = Some(old_base_price);
        entry.cost = member.cost;
        entry.compare_cost = Some(old_cost);
        entry.on_hand = member.on_hand;
        entry.compare_on_hand = Some(old_on_hand);
    }
}
