//! HTTP surface for edit sessions. Thin by design: every handler parses,
//! delegates to the session service, and wraps the result.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{PurchaseEvent, Unit};
use crate::services::reconciliation::MergeReport;
use crate::services::session::FieldPatch;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// Item code used to look up the prior grouped snapshot, when known.
    pub item_code: Option<String>,
    /// Units as fetched from the caller's product search.
    pub units: Vec<Unit>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    #[serde(flatten)]
    pub event: PurchaseEvent,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub applied: usize,
    pub orphans: usize,
}

impl From<MergeReport> for SaveResponse {
    fn from(report: MergeReport) -> Self {
        Self {
            applied: report.applied,
            orphans: report.orphans.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submitted: usize,
    pub group_keys: Vec<String>,
}

pub fn edit_session_router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_session))
        .route("/:id", delete(close_session))
        .route("/:id/units", get(list_units))
        .route("/:id/units/:unit_id", put(edit_unit))
        .route("/:id/units/:unit_id/diff", get(unit_diff))
        .route("/:id/units/:unit_id/purchase", post(apply_purchase))
        .route("/:id/groups/:key/recalculate", post(recalculate_group))
        .route("/:id/save", post(save_session))
        .route("/:id/submit", post(submit_session))
}

async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if request.units.is_empty() {
        return Err(ServiceError::ValidationError(
            "A session needs at least one unit".to_string(),
        ));
    }
    let summary = state
        .services
        .sessions
        .open(request.item_code, request.units)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.sessions.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_units(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let groups = state.services.sessions.units(id).await?;
    Ok(Json(groups))
}

async fn edit_unit(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(Uuid, i64)>,
    Json(patch): Json<FieldPatch>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state
        .services
        .sessions
        .record_field_edit(id, unit_id, patch)
        .await?;
    Ok(Json(view))
}

async fn unit_diff(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(Uuid, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    let diff = state.services.sessions.diff(id, unit_id).await?;
    Ok(Json(diff))
}

async fn apply_purchase(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(Uuid, i64)>,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state
        .services
        .sessions
        .apply_purchase(id, unit_id, request.event)
        .await?;
    Ok(Json(view))
}

async fn recalculate_group(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state
        .services
        .sessions
        .recalculate_group(id, &key, request.event)
        .await?;
    Ok(Json(view))
}

async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.sessions.save(id).await?;
    Ok(Json(ApiResponse::ok(SaveResponse::from(report))))
}

async fn submit_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.sessions.submit(id).await?;
    Ok(Json(ApiResponse::ok(SubmitResponse {
        submitted: report.submitted,
        group_keys: report.group_keys,
    })))
}
