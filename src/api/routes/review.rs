//! Analysis and review endpoints.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{post, put},
    Router,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::{dispatch, ApiCommand, AppState};
use crate::backlog::ActionItemPatch;

#[derive(Debug, serde::Deserialize)]
pub struct ToggleRequest {
    pub id: Uuid,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/toggle", post(toggle_select))
        .route("/items/:id", put(edit_item).delete(delete_item))
        .route("/approve", post(approve))
        .route("/cancel", post(cancel))
        .with_state(state)
}

async fn analyze(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    info!("Analyze command received via API");

    let report = dispatch(&state.tx, |reply| ApiCommand::Analyze { reply }).await?;
    Ok(Json(json!({
        "success": true,
        "report": report,
    })))
}

async fn toggle_select(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<Json<Value>> {
    let view = dispatch(&state.tx, |reply| ApiCommand::ToggleSelect { id: req.id, reply }).await?;
    Ok(Json(json!({
        "success": true,
        "review": view,
    })))
}

async fn edit_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ActionItemPatch>,
) -> ApiResult<Json<Value>> {
    let view = dispatch(&state.tx, |reply| ApiCommand::EditItem { id, patch, reply }).await?;
    Ok(Json(json!({
        "success": true,
        "review": view,
    })))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let view = dispatch(&state.tx, |reply| ApiCommand::DeleteItem { id, reply }).await?;
    Ok(Json(json!({
        "success": true,
        "review": view,
    })))
}

/// Create backlog entities from the selected items and complete the
/// meeting. Per-item failures are reported, not swallowed.
async fn approve(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    info!("Approve command received via API");

    let response = dispatch(&state.tx, |reply| ApiCommand::Approve { reply }).await?;
    Ok(Json(json!({
        "success": true,
        "message": response.summary,
        "partial": response.partial,
        "counts": response.report.counts,
        "outcomes": response.report.outcomes,
    })))
}

async fn cancel(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    dispatch(&state.tx, |reply| ApiCommand::CancelReview { reply }).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Review discarded",
    })))
}
