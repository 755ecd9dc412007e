//! Backlog entity types and the backlog store collaborator.
//!
//! The surrounding project-management system owns four creatable work-item
//! types: Epic, Feature, Story, Task. This module defines the closed type
//! set, the candidate `ActionItem` extracted from a meeting transcript, and
//! the `BacklogStore` trait the materializer dispatches against.

pub mod materialize;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

pub use materialize::{
    materialize, CreatedCounts, ItemOutcome, MaterializationReport, MeetingProvenance,
};

/// The four creatable backlog entity types. Any other value is a validation
/// failure at the analysis boundary, never a fall-through downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Epic,
    Feature,
    Story,
    Task,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Story => "story",
            Self::Task => "task",
        }
    }
}

impl FromStr for ItemType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "epic" => Ok(Self::Epic),
            "feature" => Ok(Self::Feature),
            "story" => Ok(Self::Story),
            "task" => Ok(Self::Task),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

/// A candidate backlog entity extracted from a meeting transcript.
///
/// Ephemeral until materialized; after materialization the created backlog
/// entity is a separately-owned object and the item never mutates again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Atomic replacement of an action item's editable fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItemPatch {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
}

/// Fields shared by all four entity creation payloads, including meeting
/// provenance stamps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemCommon {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: String,
    pub assigned_to: String,
    pub project_id: String,
    pub sprint_id: String,
    pub created_from: String,
    pub meeting_id: String,
    pub meeting_title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEpic {
    #[serde(flatten)]
    pub common: WorkItemCommon,
    pub target_date: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeature {
    #[serde(flatten)]
    pub common: WorkItemCommon,
    pub epic_id: String,
    pub target_date: String,
    pub stories: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStory {
    #[serde(flatten)]
    pub common: WorkItemCommon,
    pub feature_id: String,
    pub story_points: u32,
    pub acceptance_criteria: String,
    pub tasks: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(flatten)]
    pub common: WorkItemCommon,
    pub story_id: String,
    pub due_date: String,
    pub tags: Vec<String>,
}

/// The backlog store collaborator: four independent, non-transactional
/// create operations, each returning the created entity's id.
#[async_trait]
pub trait BacklogStore: Send + Sync {
    async fn create_epic(&self, epic: NewEpic) -> Result<String>;
    async fn create_feature(&self, feature: NewFeature) -> Result<String>;
    async fn create_story(&self, story: NewStory) -> Result<String>;
    async fn create_task(&self, task: NewTask) -> Result<String>;
}

/// A created entity as recorded by the in-memory store.
#[derive(Debug, Clone)]
pub struct CreatedEntity {
    pub id: String,
    pub item_type: ItemType,
    pub common: WorkItemCommon,
}

/// In-memory backlog store for tests and standalone operation. Titles
/// registered via `fail_on` make the corresponding create call fail, which
/// exercises the partial-failure path.
#[derive(Default)]
pub struct InMemoryBacklogStore {
    created: Mutex<Vec<CreatedEntity>>,
    fail_titles: Mutex<HashSet<String>>,
}

impl InMemoryBacklogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, title: impl Into<String>) {
        self.fail_titles
            .lock()
            .expect("backlog store lock poisoned")
            .insert(title.into());
    }

    pub fn created(&self) -> Vec<CreatedEntity> {
        self.created
            .lock()
            .expect("backlog store lock poisoned")
            .clone()
    }

    fn record(&self, item_type: ItemType, common: WorkItemCommon) -> Result<String> {
        if self
            .fail_titles
            .lock()
            .expect("backlog store lock poisoned")
            .contains(&common.title)
        {
            anyhow::bail!("backlog store rejected '{}'", common.title);
        }

        let id = Uuid::new_v4().to_string();
        self.created
            .lock()
            .expect("backlog store lock poisoned")
            .push(CreatedEntity {
                id: id.clone(),
                item_type,
                common,
            });
        Ok(id)
    }
}

#[async_trait]
impl BacklogStore for InMemoryBacklogStore {
    async fn create_epic(&self, epic: NewEpic) -> Result<String> {
        self.record(ItemType::Epic, epic.common)
    }

    async fn create_feature(&self, feature: NewFeature) -> Result<String> {
        self.record(ItemType::Feature, feature.common)
    }

    async fn create_story(&self, story: NewStory) -> Result<String> {
        self.record(ItemType::Story, story.common)
    }

    async fn create_task(&self, task: NewTask) -> Result<String> {
        self.record(ItemType::Task, task.common)
    }
}
