//! REST API for the meeting-room review UI.
//!
//! Provides HTTP endpoints for:
//! - Meeting records (list, get, create)
//! - Opening a room and controlling recording
//! - Transcript save and download
//! - Analysis, review edits, and approval
//!
//! Mutating endpoints hand an `ApiCommand` to the service event loop and
//! await the reply on a oneshot channel; status reads go through the shared
//! `RoomStatusHandle`.

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tower::ServiceBuilder;
use tracing::info;
use uuid::Uuid;

use crate::analysis::AnalysisReport;
use crate::app::{AppError, ApprovalResponse, ReviewView, RoomStatus, RoomStatusHandle};
use crate::backlog::ActionItemPatch;
use crate::config::Config;
use crate::meeting::MeetingStore;

use error::{ApiError, ApiResult};

pub type Reply<T> = oneshot::Sender<Result<T, AppError>>;

/// Commands the API sends to the service event loop.
pub enum ApiCommand {
    OpenRoom { meeting_id: String, reply: Reply<RoomStatus> },
    CloseRoom { reply: Reply<()> },
    StartRecording { reply: Reply<RoomStatus> },
    PauseRecording { reply: Reply<RoomStatus> },
    ResumeRecording { reply: Reply<RoomStatus> },
    StopRecording { reply: Reply<RoomStatus> },
    SaveTranscript { reply: Reply<()> },
    DownloadTranscript { reply: Reply<PathBuf> },
    Analyze { reply: Reply<AnalysisReport> },
    ToggleSelect { id: Uuid, reply: Reply<ReviewView> },
    EditItem { id: Uuid, patch: ActionItemPatch, reply: Reply<ReviewView> },
    DeleteItem { id: Uuid, reply: Reply<ReviewView> },
    CancelReview { reply: Reply<()> },
    Approve { reply: Reply<ApprovalResponse> },
}

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub tx: mpsc::Sender<ApiCommand>,
    pub status: RoomStatusHandle,
    pub meetings: Arc<dyn MeetingStore>,
    pub history_limit: usize,
}

/// Send a command to the event loop and wait for its reply.
pub(crate) async fn dispatch<T>(
    tx: &mpsc::Sender<ApiCommand>,
    build: impl FnOnce(Reply<T>) -> ApiCommand,
) -> ApiResult<T> {
    let (reply_tx, reply_rx) = oneshot::channel();

    tx.send(build(reply_tx))
        .await
        .map_err(|_| ApiError::internal("service loop is not running"))?;

    let result = reply_rx
        .await
        .map_err(|_| ApiError::internal("service loop dropped the request"))?;

    result.map_err(Into::into)
}

pub struct ApiServer {
    port: u16,
    state: AppState,
}

impl ApiServer {
    pub fn new(
        tx: mpsc::Sender<ApiCommand>,
        status: RoomStatusHandle,
        meetings: Arc<dyn MeetingStore>,
        config: &Config,
    ) -> Self {
        Self {
            port: config.api.port,
            state: AppState {
                tx,
                status,
                meetings,
                history_limit: config.behavior.history_limit,
            },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(service_info))
            .route("/version", get(version))
            .nest("/recording", routes::recording::router(self.state.clone()))
            .nest("/review", routes::review::router(self.state.clone()))
            .nest("/meetings", routes::meetings::router(self.state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET    /                    - Service info");
        info!("  GET    /version             - Version info");
        info!("  GET    /meetings            - List meetings");
        info!("  POST   /meetings            - Create a meeting");
        info!("  GET    /meetings/:id        - Get a meeting");
        info!("  POST   /recording/open      - Open a meeting room");
        info!("  POST   /recording/close     - Close the meeting room");
        info!("  POST   /recording/start     - Start recording");
        info!("  POST   /recording/pause     - Pause recording");
        info!("  POST   /recording/resume    - Resume recording");
        info!("  POST   /recording/stop      - Stop recording");
        info!("  POST   /recording/save      - Save transcript to the meeting");
        info!("  POST   /recording/download  - Export transcript to a file");
        info!("  GET    /recording/status    - Room status");
        info!("  POST   /review/analyze      - Analyze the transcript");
        info!("  POST   /review/toggle       - Toggle an item's selection");
        info!("  PUT    /review/items/:id    - Edit an item");
        info!("  DELETE /review/items/:id    - Delete an item");
        info!("  POST   /review/approve      - Create backlog entities");
        info!("  POST   /review/cancel       - Discard the candidate set");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "scrumscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "scrumscribe"
    }))
}
