//! One editing session per item search: owns the grouped snapshot, the
//! baseline tracker, and the edit reconciliation store, and wires the pure
//! engines to the external collaborators.
//!
//! A session is a single logical thread of user interaction. Each session
//! lives behind an async `RwLock`, so one purchase event is fully applied
//! before the next is accepted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clients::documents::GroupHistoryStore;
use crate::clients::scratch::{ScratchStore, EDITING_PREFIX, GROUPED_PREFIX};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{GroupedSnapshot, PendingEdit, PurchaseEvent, Unit, UnitDiff, UnitGroup};
use crate::services::baseline::BaselineTracker;
use crate::services::cost::{self, PriceSteps};
use crate::services::grouping;
use crate::services::reconciliation::{EditReconciliationStore, MergeReport};
use crate::services::submission::{SubmissionGroup, SubmissionMergeService, SubmissionReport};

/// Patch of the user-editable unit fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub base_price: Option<Decimal>,
    pub averaging_enabled: Option<bool>,
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.name.is_none()
            && self.base_price.is_none()
            && self.averaging_enabled.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    pub unit: Unit,
    pub diff: UnitDiff,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub key: String,
    pub anchor_id: i64,
    pub units: Vec<UnitView>,
    /// Per-unit conditions hit while applying the last operation.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub groups: usize,
    pub units: usize,
    pub flagged_groups: Vec<String>,
    pub skipped_units: usize,
    pub restored_edits: usize,
}

struct EditSession {
    groups: Vec<UnitGroup>,
    snapshot: GroupedSnapshot,
    baselines: BaselineTracker,
    edits: EditReconciliationStore,
}

impl EditSession {
    fn group_index_of_unit(&self, unit_id: i64) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(unit_id))
    }

    fn group_index_by_key(&self, key: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.key == key)
    }
}

pub struct EditSessionService {
    history: Option<Arc<dyn GroupHistoryStore>>,
    scratch: Arc<dyn ScratchStore>,
    submission: Arc<SubmissionMergeService>,
    events: EventSender,
    steps: PriceSteps,
    sessions: DashMap<Uuid, Arc<RwLock<EditSession>>>,
}

impl EditSessionService {
    pub fn new(
        history: Option<Arc<dyn GroupHistoryStore>>,
        scratch: Arc<dyn ScratchStore>,
        submission: Arc<SubmissionMergeService>,
        events: EventSender,
        steps: PriceSteps,
    ) -> Self {
        Self {
            history,
            scratch,
            submission,
            events,
            steps,
            sessions: DashMap::new(),
        }
    }

    /// Opens a session over a freshly fetched unit list: groups the units,
    /// captures baselines (preferring the document store's prior snapshot
    /// when one exists for the item), and restores pending edits an
    /// interrupted session left in the scratch store.
    #[instrument(skip(self, units), fields(units = units.len()))]
    pub async fn open(
        &self,
        item_code: Option<String>,
        units: Vec<Unit>,
    ) -> Result<SessionSummary, ServiceError> {
        let outcome = grouping::group_units(&units);
        if outcome.skipped > 0 {
            warn!(
                skipped = outcome.skipped,
                "units without a derivable group key were skipped"
            );
        }
        for key in &outcome.flagged {
            warn!(group_key = %key, "group has no electable anchor");
        }

        let prior = match (&item_code, &self.history) {
            (Some(code), Some(history)) => history.fetch_group_history(code).await?,
            _ => None,
        };

        let mut baselines = BaselineTracker::new();
        for group in &outcome.groups {
            for unit in &group.units {
                baselines.capture(unit, prior.as_ref());
            }
        }

        let snapshot = GroupedSnapshot::from_groups(outcome.groups.clone());
        let edits = EditReconciliationStore::new();
        let mut groups = outcome.groups;

        let mut restored = 0;
        for group in groups.iter_mut() {
            for unit in group.units.iter_mut() {
                let Some(edit) = self.load_pending_edit(unit).await? else {
                    continue;
                };
                unit.code = edit.unit.code.clone();
                unit.full_name = edit.unit.full_name.clone();
                unit.base_price = edit.unit.base_price;
                unit.cost = edit.unit.cost;
                unit.on_hand = edit.unit.on_hand;
                unit.edited = edit.unit.edited;
                edits.record(edit);
                restored += 1;
            }
        }

        let summary = SessionSummary {
            session_id: Uuid::new_v4(),
            groups: groups.len(),
            units: groups.iter().map(|g| g.units.len()).sum(),
            flagged_groups: outcome.flagged,
            skipped_units: outcome.skipped,
            restored_edits: restored,
        };

        self.sessions.insert(
            summary.session_id,
            Arc::new(RwLock::new(EditSession {
                groups,
                snapshot,
                baselines,
                edits,
            })),
        );

        self.events
            .send_or_log(Event::SessionOpened {
                session_id: summary.session_id,
                groups: summary.groups,
                units: summary.units,
            })
            .await;

        Ok(summary)
    }

    /// All groups with their current figures and baseline deltas.
    pub async fn units(&self, session_id: Uuid) -> Result<Vec<GroupView>, ServiceError> {
        let session = self.session(session_id)?;
        let session = session.read().await;
        Ok(session
            .groups
            .iter()
            .map(|g| view_of(g, &session.baselines, Vec::new()))
            .collect())
    }

    pub async fn diff(&self, session_id: Uuid, unit_id: i64) -> Result<UnitDiff, ServiceError> {
        let session = self.session(session_id)?;
        let session = session.read().await;
        let unit = session
            .groups
            .iter()
            .flat_map(|g| g.units.iter())
            .find(|u| u.id == unit_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Unit {} not in session", unit_id)))?;
        Ok(session.baselines.diff(unit))
    }

    /// Applies a purchase event entered on a group's anchor unit: the
    /// per-row recomputation path.
    #[instrument(skip(self, event))]
    pub async fn apply_purchase(
        &self,
        session_id: Uuid,
        unit_id: i64,
        event: PurchaseEvent,
    ) -> Result<GroupView, ServiceError> {
        let session = self.session(session_id)?;
        let mut session = session.write().await;

        let group_index = session.group_index_of_unit(unit_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Unit {} not in session", unit_id))
        })?;
        if session.groups[group_index].anchor_id != unit_id {
            return Err(ServiceError::InvalidOperation(
                "Purchase entries are applied to the group's anchor unit".to_string(),
            ));
        }

        let view = self
            .apply_event_to_group(&mut session, group_index, &event, self.steps.row)
            .await?;

        if let Some(anchor) = view.units.iter().find(|v| v.unit.id == unit_id) {
            self.events
                .send_or_log(Event::PurchaseApplied {
                    session_id,
                    group_key: view.key.clone(),
                    unit_id,
                    added_on_hand: anchor.diff.on_hand_delta,
                    new_cost: anchor.unit.cost,
                })
                .await;
        }
        Ok(view)
    }

    /// Re-applies a purchase event to a whole group: the whole-list
    /// recomputation path, which rounds prices to its own coarser step.
    #[instrument(skip(self, event))]
    pub async fn recalculate_group(
        &self,
        session_id: Uuid,
        group_key: &str,
        event: PurchaseEvent,
    ) -> Result<GroupView, ServiceError> {
        let session = self.session(session_id)?;
        let mut session = session.write().await;

        let group_index = session.group_index_by_key(group_key).ok_or_else(|| {
            ServiceError::NotFound(format!("Group {} not in session", group_key))
        })?;

        self.apply_event_to_group(&mut session, group_index, &event, self.steps.list)
            .await
    }

    /// Applies a direct field edit (rename, manual price, costing-policy
    /// toggle) to one unit and records it.
    #[instrument(skip(self, patch))]
    pub async fn record_field_edit(
        &self,
        session_id: Uuid,
        unit_id: i64,
        patch: FieldPatch,
    ) -> Result<UnitView, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::ValidationError(
                "Edit contains no fields".to_string(),
            ));
        }

        let session = self.session(session_id)?;
        let mut session = session.write().await;

        let group_index = session.group_index_of_unit(unit_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Unit {} not in session", unit_id))
        })?;
        let group_key = session.groups[group_index].key.clone();

        let unit = {
            let unit = session.groups[group_index]
                .units
                .iter_mut()
                .find(|u| u.id == unit_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Unit {} not in session", unit_id))
                })?;

            if let Some(code) = &patch.code {
                let trimmed = code.trim();
                if trimmed.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "Unit code cannot be empty".to_string(),
                    ));
                }
                unit.code = trimmed.to_string();
            }
            if let Some(name) = &patch.name {
                unit.name = name.trim().to_string();
                unit.refresh_full_name();
            }
            if let Some(base_price) = patch.base_price {
                unit.base_price = base_price;
            }
            if let Some(averaging) = patch.averaging_enabled {
                unit.averaging_enabled = averaging;
            }
            unit.edited = true;
            unit.clone()
        };

        self.record_edit(&session.edits, &session.snapshot, &group_key, unit.clone())
            .await?;

        self.events
            .send_or_log(Event::FieldEdited {
                session_id,
                unit_id,
                code: unit.code.clone(),
            })
            .await;

        Ok(UnitView {
            diff: session.baselines.diff(&unit),
            unit,
        })
    }

    /// Merges all pending edits into the snapshot, persists the merged
    /// groups, and clears the store. The store is emptied only after the
    /// persist round-trip succeeds.
    #[instrument(skip(self))]
    pub async fn save(&self, session_id: Uuid) -> Result<MergeReport, ServiceError> {
        let session = self.session(session_id)?;
        let mut session = session.write().await;

        let session = &mut *session;
        let report = session.edits.merge_into(&mut session.snapshot);

        for (key, group) in &session.snapshot.groups {
            let bytes = serde_json::to_vec(group)?;
            self.scratch
                .put(&format!("{}{}", GROUPED_PREFIX, key), bytes)
                .await?;
        }
        self.scratch.delete_by_prefix(EDITING_PREFIX).await?;
        session.edits.clear();

        info!(
            applied = report.applied,
            orphans = report.orphans.len(),
            "edits merged into snapshot"
        );
        self.events
            .send_or_log(Event::EditsMerged {
                session_id,
                applied: report.applied,
                orphaned: report.orphans.len(),
                merged_at: Utc::now(),
            })
            .await;

        Ok(report)
    }

    /// Submits every group that still differs from baseline, one upstream
    /// call per group. Unchanged units are no-ops and stay home.
    #[instrument(skip(self))]
    pub async fn submit(&self, session_id: Uuid) -> Result<SubmissionReport, ServiceError> {
        let session = self.session(session_id)?;
        let session = session.read().await;

        let mut batch = Vec::new();
        for (key, group) in &session.snapshot.groups {
            let changed: Vec<Unit> = group
                .units
                .iter()
                .filter(|u| u.edited || !session.baselines.diff(u).is_unchanged())
                .cloned()
                .collect();
            if changed.is_empty() {
                continue;
            }
            batch.push(SubmissionGroup {
                key: key.clone(),
                units: changed,
                roster: group.roster.clone(),
            });
        }

        let mut report = SubmissionReport::default();
        for group in &batch {
            match self.submission.submit_group(group).await {
                Ok(()) => {
                    report.submitted += 1;
                    report.group_keys.push(group.key.clone());
                    self.events
                        .send_or_log(Event::SubmissionCompleted {
                            session_id,
                            group_key: group.key.clone(),
                        })
                        .await;
                }
                Err(err) => {
                    self.events
                        .send_or_log(Event::SubmissionFailed {
                            session_id,
                            group_key: group.key.clone(),
                            reason: err.to_string(),
                        })
                        .await;
                    return Err(err);
                }
            }
        }
        Ok(report)
    }

    pub async fn close(&self, session_id: Uuid) -> Result<(), ServiceError> {
        self.sessions
            .remove(&session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        self.events
            .send_or_log(Event::SessionClosed { session_id })
            .await;
        Ok(())
    }

    fn session(&self, id: Uuid) -> Result<Arc<RwLock<EditSession>>, ServiceError> {
        self.sessions
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", id)))
    }

    async fn apply_event_to_group(
        &self,
        session: &mut EditSession,
        group_index: usize,
        event: &PurchaseEvent,
        step: Decimal,
    ) -> Result<GroupView, ServiceError> {
        let group = &session.groups[group_index];
        let anchor = group
            .anchor()
            .ok_or_else(|| ServiceError::MissingAnchor(group.key.clone()))?
            .clone();
        let siblings: Vec<Unit> = group.siblings().cloned().collect();

        let propagation = cost::apply_purchase(&anchor, &siblings, &session.baselines, event, step);

        let mut next_anchor = propagation.anchor;
        next_anchor.entry.box_count = event.box_count;
        next_anchor.entry.retail_count = event.retail_count;
        next_anchor.entry.discount_per_unit = event.discount_per_unit;
        next_anchor.entry.discount_on_total = event.discount_on_total;
        next_anchor.entry.total_price_entered = event.total_price;
        next_anchor.averaging_enabled = event.use_weighted_average;

        let mut replacements: HashMap<i64, Unit> = propagation
            .siblings
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        replacements.insert(next_anchor.id, next_anchor);

        let group = &mut session.groups[group_index];
        for unit in group.units.iter_mut() {
            if let Some(next) = replacements.remove(&unit.id) {
                *unit = next;
            }
        }

        let group_key = group.key.clone();
        // An empty event left everything at baseline; recording it would
        // perturb the pending-edit store.
        let changed: Vec<Unit> = if event.is_empty() {
            Vec::new()
        } else {
            group.units.iter().filter(|u| u.edited).cloned().collect()
        };
        for unit in changed {
            self.record_edit(&session.edits, &session.snapshot, &group_key, unit)
                .await?;
        }

        let issues = propagation
            .issues
            .iter()
            .map(|i| i.error.to_string())
            .collect();
        Ok(view_of(
            &session.groups[group_index],
            &session.baselines,
            issues,
        ))
    }

    /// Builds a pending edit for `unit` (keeping the originals an earlier
    /// edit already captured) and persists it under both scratch keys.
    async fn record_edit(
        &self,
        edits: &EditReconciliationStore,
        snapshot: &GroupedSnapshot,
        group_key: &str,
        unit: Unit,
    ) -> Result<(), ServiceError> {
        let (original_code, original_full_name) = match edits.get(unit.id) {
            Some(existing) => (existing.original_code, existing.original_full_name),
            None => {
                let snapshot_group = snapshot.groups.get(group_key);
                let original_code = snapshot_group
                    .and_then(|g| g.original_code(unit.id))
                    .unwrap_or(&unit.code)
                    .to_string();
                let original_full_name = snapshot_group
                    .and_then(|g| g.units.iter().find(|u| u.id == unit.id))
                    .map(|u| u.full_name.clone())
                    .unwrap_or_else(|| unit.full_name.clone());
                (original_code, original_full_name)
            }
        };

        let edit = PendingEdit::new(
            unit,
            original_code,
            original_full_name,
            group_key.to_string(),
        );
        let bytes = serde_json::to_vec(&edit)?;
        self.scratch
            .put(&format!("{}{}", EDITING_PREFIX, edit.unit.id), bytes.clone())
            .await?;
        if !edit.unit.code.is_empty() {
            // Second key by code: recovers the edit when only the code
            // survives an interruption.
            self.scratch
                .put(&format!("{}{}", EDITING_PREFIX, edit.unit.code), bytes)
                .await?;
        }
        edits.record(edit);
        Ok(())
    }

    async fn load_pending_edit(&self, unit: &Unit) -> Result<Option<PendingEdit>, ServiceError> {
        let bytes = match self
            .scratch
            .get(&format!("{}{}", EDITING_PREFIX, unit.id))
            .await?
        {
            Some(bytes) => Some(bytes),
            None => {
                self.scratch
                    .get(&format!("{}{}", EDITING_PREFIX, unit.code))
                    .await?
            }
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        match serde_json::from_slice::<PendingEdit>(&bytes) {
            Ok(edit)
                if edit.unit.id == unit.id
                    || edit.unit.code == unit.code
                    || edit.original_code == unit.code =>
            {
                Ok(Some(edit))
            }
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(unit_id = unit.id, error = %err, "discarding unreadable pending edit");
                Ok(None)
            }
        }
    }
}

fn view_of(group: &UnitGroup, baselines: &BaselineTracker, issues: Vec<String>) -> GroupView {
    GroupView {
        key: group.key.clone(),
        anchor_id: group.anchor_id,
        units: group
            .units
            .iter()
            .map(|u| UnitView {
                diff: baselines.diff(u),
                unit: u.clone(),
            })
            .collect(),
        issues,
    }
}
