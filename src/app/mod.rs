//! Service wiring: one meeting-room session driven by an event loop.
//!
//! The loop multiplexes three sources with `tokio::select!`: API commands,
//! a 1-second tick for the elapsed timer, and the recognition event stream
//! of the open session. A `RoomSession` is constructed per meeting and torn
//! down when the room closes; the recognition subscription lives and dies
//! with it.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisEngine, AnalysisError, AnalysisReport, AnalysisRequest};
use crate::api::{ApiCommand, ApiServer};
use crate::backlog::{
    materialize, ActionItem, ActionItemPatch, BacklogStore, InMemoryBacklogStore,
    MaterializationReport, MeetingProvenance,
};
use crate::config::Config;
use crate::meeting::{
    Meeting, MeetingPatch, MeetingStatus, MeetingStore, Project, Sprint, SqliteMeetingStore,
};
use crate::recognition::{self, RecognitionEvent, SpeechRecognizer};
use crate::recording::{export_transcript, EventOutcome, RecordingController, RecordingError};
use crate::review::{ReviewError, ReviewSession, TypeTally};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no meeting room is open")]
    NoSession,
    #[error("no review session is open; run analysis first")]
    NoReview,
    #[error("meeting {0} not found")]
    MeetingNotFound(String),
    #[error(transparent)]
    Recording(#[from] RecordingError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    /// Backlog entities were already created when completing the meeting
    /// record failed. Carries the materialization report so partial
    /// success is never lost; the review session is gone at this point,
    /// so a retry cannot re-create the entities.
    #[error("{} but completing the meeting failed: {:#}", .report.counts.summary(), .source)]
    MeetingCompleteFailed {
        report: MaterializationReport,
        #[source]
        source: anyhow::Error,
    },
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Snapshot of the room for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatus {
    pub open: bool,
    pub meeting_id: Option<String>,
    pub title: Option<String>,
    pub state: String,
    pub elapsed_seconds: u64,
    pub elapsed_display: String,
    pub interim: String,
    pub transcript_chars: usize,
    pub recognition_available: bool,
    pub analyzing: bool,
    pub review_open: bool,
    pub selected_count: usize,
    pub last_error: Option<String>,
}

impl Default for RoomStatus {
    fn default() -> Self {
        Self {
            open: false,
            meeting_id: None,
            title: None,
            state: "closed".to_string(),
            elapsed_seconds: 0,
            elapsed_display: "00:00:00".to_string(),
            interim: String::new(),
            transcript_chars: 0,
            recognition_available: false,
            analyzing: false,
            review_open: false,
            selected_count: 0,
            last_error: None,
        }
    }
}

/// Shared room status, updated by the event loop and read by API handlers.
#[derive(Clone, Default)]
pub struct RoomStatusHandle {
    inner: Arc<Mutex<RoomStatus>>,
}

impl RoomStatusHandle {
    pub async fn get(&self) -> RoomStatus {
        self.inner.lock().await.clone()
    }

    pub async fn set(&self, status: RoomStatus) {
        *self.inner.lock().await = status;
    }
}

/// The candidate set as the review UI sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub items: Vec<ActionItem>,
    pub selected: Vec<Uuid>,
    pub tally: TypeTally,
}

/// Result of approving a review: created entities plus the completed
/// meeting's summary line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub summary: String,
    pub partial: bool,
    pub report: MaterializationReport,
}

/// Collaborators a room session is wired with at construction.
#[derive(Clone)]
pub struct SessionDeps {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub engine: Arc<AnalysisEngine>,
    pub meeting_store: Arc<dyn MeetingStore>,
    pub backlog_store: Arc<dyn BacklogStore>,
    pub export_dir: PathBuf,
}

/// One meeting's live session: recording controller, optional review
/// session, and the meeting record being worked on.
pub struct RoomSession {
    meeting: Meeting,
    controller: RecordingController,
    review: Option<ReviewSession>,
    analyzing: bool,
    last_error: Option<String>,
    projects: Vec<Project>,
    sprints: Vec<Sprint>,
    deps: SessionDeps,
}

impl RoomSession {
    /// Open a room over an existing meeting record. Resumes the saved
    /// transcript when one exists.
    pub async fn open(meeting_id: &str, deps: &SessionDeps) -> Result<Self, AppError> {
        let meeting = deps
            .meeting_store
            .get(meeting_id)
            .await?
            .ok_or_else(|| AppError::MeetingNotFound(meeting_id.to_string()))?;

        let controller = RecordingController::with_transcript(
            deps.recognizer.clone(),
            meeting.transcript.clone(),
        );

        info!("Opened meeting room for '{}' ({})", meeting.title, meeting.id);

        Ok(Self {
            meeting,
            controller,
            review: None,
            analyzing: false,
            last_error: None,
            projects: Vec::new(),
            sprints: Vec::new(),
            deps: deps.clone(),
        })
    }

    pub fn meeting(&self) -> &Meeting {
        &self.meeting
    }

    pub async fn start_recording(&mut self) -> Result<(), AppError> {
        self.controller.start()?;
        if self.meeting.status == MeetingStatus::Scheduled {
            self.deps.meeting_store.start(&self.meeting.id).await?;
            self.meeting.status = MeetingStatus::InProgress;
        }
        self.last_error = None;
        Ok(())
    }

    pub fn pause_recording(&mut self) -> Result<(), AppError> {
        self.controller.pause().map_err(Into::into)
    }

    pub fn resume_recording(&mut self) -> Result<(), AppError> {
        self.controller.resume().map_err(Into::into)
    }

    pub fn stop_recording(&mut self) -> Result<(), AppError> {
        self.controller.stop().map_err(Into::into)
    }

    pub fn tick(&mut self) {
        self.controller.tick();
    }

    /// Await the next recognition event of the open handle.
    pub async fn next_event(&mut self) -> RecognitionEvent {
        self.controller.next_event().await
    }

    /// Feed one recognition event through the controller. Fatal recognition
    /// errors stop the recording and are kept for the status endpoint.
    pub fn handle_recognition_event(&mut self, event: RecognitionEvent) {
        if let EventOutcome::Fatal(kind) = self.controller.handle_event(event) {
            self.last_error = Some(format!("speech recognition failed: {}", kind.as_str()));
            if let Err(e) = self.controller.stop() {
                warn!("Could not stop recording after fatal error: {}", e);
            }
        }
    }

    /// Persist the current transcript buffer onto the meeting record.
    /// Allowed in any state.
    pub async fn save_transcript(&self) -> Result<(), AppError> {
        self.deps
            .meeting_store
            .update(
                &self.meeting.id,
                MeetingPatch {
                    transcript: Some(self.controller.transcript().to_string()),
                    action_items: None,
                },
            )
            .await?;
        info!("Saved transcript for meeting {}", self.meeting.id);
        Ok(())
    }

    /// Write the transcript to a file in the export directory.
    pub fn download_transcript(&self) -> Result<PathBuf, AppError> {
        export_transcript(
            self.controller.transcript(),
            &self.meeting.title,
            &self.deps.export_dir,
        )
        .map_err(Into::into)
    }

    /// Reserve the analysis slot. Fails while a run is outstanding so the
    /// same transcript is never analyzed concurrently.
    pub fn begin_analysis(&mut self) -> Result<(), AppError> {
        if self.analyzing {
            return Err(AnalysisError::InFlight.into());
        }
        self.analyzing = true;
        Ok(())
    }

    /// Run the reserved analysis over the current transcript. A fresh
    /// candidate set replaces any prior unreviewed one.
    pub async fn run_analysis(&mut self) -> Result<AnalysisReport, AppError> {
        let result = self
            .deps
            .engine
            .analyze(AnalysisRequest {
                transcript: self.controller.transcript(),
                meeting: &self.meeting,
                projects: &self.projects,
                sprints: &self.sprints,
            })
            .await;
        self.analyzing = false;

        let report = result?;
        self.review = Some(ReviewSession::new(report.action_items.clone()));
        Ok(report)
    }

    pub async fn analyze(&mut self) -> Result<AnalysisReport, AppError> {
        self.begin_analysis()?;
        self.run_analysis().await
    }

    pub fn review_view(&self) -> Result<ReviewView, AppError> {
        let review = self.review.as_ref().ok_or(AppError::NoReview)?;
        Ok(ReviewView {
            items: review.items().to_vec(),
            selected: review
                .items()
                .iter()
                .filter(|item| review.is_selected(item.id))
                .map(|item| item.id)
                .collect(),
            tally: review.tally(),
        })
    }

    pub fn toggle_select(&mut self, id: Uuid) -> Result<ReviewView, AppError> {
        self.review
            .as_mut()
            .ok_or(AppError::NoReview)?
            .toggle_select(id);
        self.review_view()
    }

    pub fn edit_item(&mut self, id: Uuid, patch: ActionItemPatch) -> Result<ReviewView, AppError> {
        self.review
            .as_mut()
            .ok_or(AppError::NoReview)?
            .edit(id, patch)?;
        self.review_view()
    }

    pub fn delete_item(&mut self, id: Uuid) -> Result<ReviewView, AppError> {
        self.review.as_mut().ok_or(AppError::NoReview)?.delete(id)?;
        self.review_view()
    }

    pub fn cancel_review(&mut self) {
        self.review = None;
    }

    /// Materialize the selected items and complete the meeting with the
    /// final transcript and the approved set. Item failures do not abort
    /// the batch; the response reports them per item.
    ///
    /// The review session is consumed before any entity is created, so a
    /// retry after a failure never re-submits the same item ids.
    pub async fn approve_and_create(&mut self) -> Result<ApprovalResponse, AppError> {
        let review = self.review.take().ok_or(AppError::NoReview)?;
        let approved = match review.approve() {
            Ok(approved) => approved,
            Err(e) => {
                // Nothing was created; the set stays open for curation.
                self.review = Some(review);
                return Err(e.into());
            }
        };

        let provenance = MeetingProvenance {
            meeting_id: self.meeting.id.clone(),
            meeting_title: self.meeting.title.clone(),
            project_id: self.meeting.project_id.clone(),
            sprint_id: self.meeting.sprint_id.clone(),
        };

        let report =
            materialize(self.deps.backlog_store.as_ref(), &approved, &provenance).await;

        if let Err(e) = self
            .deps
            .meeting_store
            .complete(&self.meeting.id, self.controller.transcript(), &approved)
            .await
        {
            error!(
                "Backlog entities were created but meeting {} could not be completed: {:#}",
                self.meeting.id, e
            );
            return Err(AppError::MeetingCompleteFailed { report, source: e });
        }

        self.meeting.status = MeetingStatus::Completed;
        self.meeting.transcript = self.controller.transcript().to_string();
        self.meeting.action_items = approved;

        Ok(ApprovalResponse {
            summary: report.counts.summary(),
            partial: report.is_partial(),
            report,
        })
    }

    pub fn status(&self) -> RoomStatus {
        RoomStatus {
            open: true,
            meeting_id: Some(self.meeting.id.clone()),
            title: Some(self.meeting.title.clone()),
            state: self.controller.state().as_str().to_string(),
            elapsed_seconds: self.controller.elapsed_seconds(),
            elapsed_display: self.controller.elapsed_display(),
            interim: self.controller.interim().to_string(),
            transcript_chars: self.controller.transcript().len(),
            recognition_available: self.controller.is_available(),
            analyzing: self.analyzing,
            review_open: self.review.is_some(),
            selected_count: self
                .review
                .as_ref()
                .map(ReviewSession::selected_count)
                .unwrap_or(0),
            last_error: self.last_error.clone(),
        }
    }
}

fn snapshot(session: Option<&RoomSession>) -> RoomStatus {
    session.map(RoomSession::status).unwrap_or_default()
}

enum Wakeup {
    Command(Option<ApiCommand>),
    Tick,
    Recognition(RecognitionEvent),
}

async fn next_room_event(session: &mut Option<RoomSession>) -> RecognitionEvent {
    match session.as_mut() {
        Some(session) => session.next_event().await,
        None => std::future::pending().await,
    }
}

pub async fn run_service(config: Config) -> Result<()> {
    info!("Starting ScrumScribe service");

    let recognizer = recognition::build_recognizer(&config.recognition)?;
    let engine = Arc::new(AnalysisEngine::with_provider(
        &config.analysis.provider,
        &config.analysis,
    )?);
    let meeting_store: Arc<dyn MeetingStore> = Arc::new(SqliteMeetingStore::open_default()?);
    let backlog_store: Arc<dyn BacklogStore> = Arc::new(InMemoryBacklogStore::new());
    let export_dir = match &config.behavior.export_dir {
        Some(dir) => dir.clone(),
        None => crate::global::exports_dir()?,
    };

    let deps = SessionDeps {
        recognizer,
        engine,
        meeting_store: meeting_store.clone(),
        backlog_store,
        export_dir,
    };

    let (tx, mut rx) = mpsc::channel::<ApiCommand>(16);
    let status_handle = RoomStatusHandle::default();

    let api_server = ApiServer::new(tx, status_handle.clone(), meeting_store, &config);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("ScrumScribe is ready");

    let mut session: Option<RoomSession> = None;
    // Missed ticks burst once the loop is free again, so elapsed time
    // stays aligned with the wall clock across a slow analysis call.
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));

    loop {
        let wakeup = tokio::select! {
            command = rx.recv() => Wakeup::Command(command),
            _ = ticker.tick() => Wakeup::Tick,
            event = next_room_event(&mut session) => Wakeup::Recognition(event),
        };

        match wakeup {
            Wakeup::Command(Some(command)) => {
                handle_command(&mut session, &deps, &status_handle, command).await;
            }
            Wakeup::Command(None) => break,
            Wakeup::Tick => {
                if let Some(session) = session.as_mut() {
                    session.tick();
                }
            }
            Wakeup::Recognition(event) => {
                if let Some(session) = session.as_mut() {
                    session.handle_recognition_event(event);
                }
            }
        }

        status_handle.set(snapshot(session.as_ref())).await;
    }

    Ok(())
}

async fn handle_command(
    session: &mut Option<RoomSession>,
    deps: &SessionDeps,
    status: &RoomStatusHandle,
    command: ApiCommand,
) {
    match command {
        ApiCommand::OpenRoom { meeting_id, reply } => {
            let result = RoomSession::open(&meeting_id, deps).await;
            let _ = match result {
                Ok(opened) => {
                    let status = opened.status();
                    *session = Some(opened);
                    reply.send(Ok(status))
                }
                Err(e) => reply.send(Err(e)),
            };
        }
        ApiCommand::CloseRoom { reply } => {
            if let Some(closed) = session.take() {
                info!("Closed meeting room for {}", closed.meeting().id);
            }
            let _ = reply.send(Ok(()));
        }
        ApiCommand::StartRecording { reply } => {
            let result = match session.as_mut() {
                Some(s) => s.start_recording().await,
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result.map(|_| snapshot(session.as_ref())));
        }
        ApiCommand::PauseRecording { reply } => {
            let result = match session.as_mut() {
                Some(s) => s.pause_recording(),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result.map(|_| snapshot(session.as_ref())));
        }
        ApiCommand::ResumeRecording { reply } => {
            let result = match session.as_mut() {
                Some(s) => s.resume_recording(),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result.map(|_| snapshot(session.as_ref())));
        }
        ApiCommand::StopRecording { reply } => {
            let result = match session.as_mut() {
                Some(s) => s.stop_recording(),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result.map(|_| snapshot(session.as_ref())));
        }
        ApiCommand::SaveTranscript { reply } => {
            let result = match session.as_ref() {
                Some(s) => s.save_transcript().await,
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::DownloadTranscript { reply } => {
            let result = match session.as_ref() {
                Some(s) => s.download_transcript(),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::Analyze { reply } => {
            let result = match session.as_mut() {
                Some(s) => match s.begin_analysis() {
                    // Publish the in-flight flag before awaiting the
                    // provider so status reads see it while the call runs.
                    Ok(()) => {
                        status.set(s.status()).await;
                        s.run_analysis().await
                    }
                    Err(e) => Err(e),
                },
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::ToggleSelect { id, reply } => {
            let result = match session.as_mut() {
                Some(s) => s.toggle_select(id),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::EditItem { id, patch, reply } => {
            let result = match session.as_mut() {
                Some(s) => s.edit_item(id, patch),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::DeleteItem { id, reply } => {
            let result = match session.as_mut() {
                Some(s) => s.delete_item(id),
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::CancelReview { reply } => {
            let result = match session.as_mut() {
                Some(s) => {
                    s.cancel_review();
                    Ok(())
                }
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
        ApiCommand::Approve { reply } => {
            let result = match session.as_mut() {
                Some(s) => s.approve_and_create().await,
                None => Err(AppError::NoSession),
            };
            let _ = reply.send(result);
        }
    }
}
