//! Meeting model and the meeting record store collaborator.
//!
//! The pipeline mutates a meeting's `transcript`, `action_items` and
//! `status` only through explicit store operations, never silently.

pub mod sqlite_store;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::backlog::ActionItem;

pub use sqlite_store::SqliteMeetingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl std::str::FromStr for MeetingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub title: String,
    /// Meeting category, e.g. "standup", "sprint-planning". Free-form.
    #[serde(rename = "type")]
    pub meeting_type: String,
    pub description: String,
    pub scheduled_date: String,
    pub scheduled_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<String>,
    pub status: MeetingStatus,
    pub transcript: String,
    pub action_items: Vec<ActionItem>,
}

/// Fields for creating a meeting. Status starts at `Scheduled` with an
/// empty transcript and no action items.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeeting {
    pub title: String,
    #[serde(rename = "type", default)]
    pub meeting_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scheduled_date: String,
    #[serde(default)]
    pub scheduled_time: String,
    pub project_id: Option<String>,
    pub sprint_id: Option<String>,
}

/// Explicit partial update of the pipeline-owned fields.
#[derive(Debug, Clone, Default)]
pub struct MeetingPatch {
    pub transcript: Option<String>,
    pub action_items: Option<Vec<ActionItem>>,
}

/// Project context handed to the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// Sprint context handed to the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub name: String,
}

/// The meeting record store collaborator.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn create(&self, meeting: NewMeeting) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<Meeting>>;

    async fn update(&self, id: &str, patch: MeetingPatch) -> Result<()>;

    /// Mark the meeting in progress (recording started).
    async fn start(&self, id: &str) -> Result<()>;

    /// Mark `Completed` and persist the final transcript and action items
    /// atomically from the pipeline's perspective.
    async fn complete(
        &self,
        id: &str,
        transcript: &str,
        action_items: &[ActionItem],
    ) -> Result<()>;

    async fn list(&self, limit: usize) -> Result<Vec<Meeting>>;
}

/// In-memory meeting store for tests and embedding. Keeps creation order
/// so `list` returns newest-first, same as the SQLite store.
#[derive(Default)]
pub struct InMemoryMeetingStore {
    meetings: Mutex<Vec<Meeting>>,
}

impl InMemoryMeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_meeting<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Meeting) -> T,
    ) -> Result<T> {
        let mut meetings = self.meetings.lock().expect("meeting store lock poisoned");
        let meeting = meetings
            .iter_mut()
            .find(|meeting| meeting.id == id)
            .ok_or_else(|| anyhow::anyhow!("meeting {} not found", id))?;
        Ok(f(meeting))
    }
}

#[async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn create(&self, meeting: NewMeeting) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let record = Meeting {
            id: id.clone(),
            title: meeting.title,
            meeting_type: meeting.meeting_type,
            description: meeting.description,
            scheduled_date: meeting.scheduled_date,
            scheduled_time: meeting.scheduled_time,
            project_id: meeting.project_id,
            sprint_id: meeting.sprint_id,
            status: MeetingStatus::Scheduled,
            transcript: String::new(),
            action_items: Vec::new(),
        };
        self.meetings
            .lock()
            .expect("meeting store lock poisoned")
            .push(record);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Meeting>> {
        Ok(self
            .meetings
            .lock()
            .expect("meeting store lock poisoned")
            .iter()
            .find(|meeting| meeting.id == id)
            .cloned())
    }

    async fn update(&self, id: &str, patch: MeetingPatch) -> Result<()> {
        self.with_meeting(id, |meeting| {
            if let Some(transcript) = patch.transcript {
                meeting.transcript = transcript;
            }
            if let Some(action_items) = patch.action_items {
                meeting.action_items = action_items;
            }
        })
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.with_meeting(id, |meeting| {
            meeting.status = MeetingStatus::InProgress;
        })
    }

    async fn complete(
        &self,
        id: &str,
        transcript: &str,
        action_items: &[ActionItem],
    ) -> Result<()> {
        self.with_meeting(id, |meeting| {
            meeting.status = MeetingStatus::Completed;
            meeting.transcript = transcript.to_string();
            meeting.action_items = action_items.to_vec();
        })
    }

    async fn list(&self, limit: usize) -> Result<Vec<Meeting>> {
        let meetings = self.meetings.lock().expect("meeting store lock poisoned");
        Ok(meetings.iter().rev().take(limit).cloned().collect())
    }
}
