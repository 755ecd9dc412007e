//! Meeting record endpoints. These read and write the store directly; they
//! do not touch the live room session.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::meeting::NewMeeting;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_meetings))
        .route("/", post(create_meeting))
        .route("/:id", get(get_meeting))
        .with_state(state)
}

async fn list_meetings(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(state.history_limit);

    let meetings = state.meetings.list(limit).await?;
    Ok(Json(json!({ "meetings": meetings })))
}

async fn create_meeting(
    State(state): State<AppState>,
    Json(req): Json<NewMeeting>,
) -> ApiResult<Json<Value>> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("meeting title must not be empty"));
    }

    let id = state.meetings.create(req).await?;
    info!("Created meeting {}", id);

    Ok(Json(json!({
        "success": true,
        "id": id,
    })))
}

async fn get_meeting(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    match state.meetings.get(&id).await? {
        Some(meeting) => Ok(Json(json!({ "meeting": meeting }))),
        None => Err(ApiError::not_found(format!("meeting {} not found", id))),
    }
}
