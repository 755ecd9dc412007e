//! Meeting-room and recording control endpoints.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::{dispatch, ApiCommand, AppState};
use crate::app::RoomStatus;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRoomRequest {
    pub meeting_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/open", post(open_room))
        .route("/close", post(close_room))
        .route("/start", post(start_recording))
        .route("/pause", post(pause_recording))
        .route("/resume", post(resume_recording))
        .route("/stop", post(stop_recording))
        .route("/save", post(save_transcript))
        .route("/download", post(download_transcript))
        .route("/status", get(room_status))
        .with_state(state)
}

fn status_response(status: RoomStatus) -> Json<Value> {
    Json(json!({
        "success": true,
        "status": status,
    }))
}

async fn open_room(
    State(state): State<AppState>,
    Json(req): Json<OpenRoomRequest>,
) -> ApiResult<Json<Value>> {
    info!("Open room command received via API for {}", req.meeting_id);

    let status = dispatch(&state.tx, |reply| ApiCommand::OpenRoom {
        meeting_id: req.meeting_id,
        reply,
    })
    .await?;

    Ok(status_response(status))
}

async fn close_room(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    dispatch(&state.tx, |reply| ApiCommand::CloseRoom { reply }).await?;
    Ok(Json(json!({ "success": true })))
}

async fn start_recording(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = dispatch(&state.tx, |reply| ApiCommand::StartRecording { reply }).await?;
    Ok(status_response(status))
}

async fn pause_recording(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = dispatch(&state.tx, |reply| ApiCommand::PauseRecording { reply }).await?;
    Ok(status_response(status))
}

async fn resume_recording(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = dispatch(&state.tx, |reply| ApiCommand::ResumeRecording { reply }).await?;
    Ok(status_response(status))
}

async fn stop_recording(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = dispatch(&state.tx, |reply| ApiCommand::StopRecording { reply }).await?;
    Ok(status_response(status))
}

async fn save_transcript(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    dispatch(&state.tx, |reply| ApiCommand::SaveTranscript { reply }).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Transcript saved",
    })))
}

async fn download_transcript(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let path = dispatch(&state.tx, |reply| ApiCommand::DownloadTranscript { reply }).await?;
    Ok(Json(json!({
        "success": true,
        "path": path.to_string_lossy(),
    })))
}

/// Current room status, including recognition availability so the UI can
/// hide recording controls when capture is impossible.
async fn room_status(State(state): State<AppState>) -> Json<RoomStatus> {
    Json(state.status.get().await)
}
