//! Approved action items become persisted backlog entities.
//!
//! Items are processed in the order presented, dispatched by type to one of
//! the four store create operations. Creation continues past individual
//! failures; the report carries a per-item outcome list so partial success
//! is never lost.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    ActionItem, BacklogStore, ItemType, NewEpic, NewFeature, NewStory, NewTask, WorkItemCommon,
};

/// Provenance from the meeting the items were extracted from. Stamped onto
/// every created entity; `project_id`/`sprint_id` are inherited unless the
/// item carries its own.
#[derive(Debug, Clone)]
pub struct MeetingProvenance {
    pub meeting_id: String,
    pub meeting_title: String,
    pub project_id: Option<String>,
    pub sprint_id: Option<String>,
}

/// Per-type summary of what was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreatedCounts {
    pub epics: usize,
    pub features: usize,
    pub stories: usize,
    pub tasks: usize,
}

impl CreatedCounts {
    pub fn total(&self) -> usize {
        self.epics + self.features + self.stories + self.tasks
    }

    fn bump(&mut self, item_type: ItemType) {
        match item_type {
            ItemType::Epic => self.epics += 1,
            ItemType::Feature => self.features += 1,
            ItemType::Story => self.stories += 1,
            ItemType::Task => self.tasks += 1,
        }
    }

    /// Human-readable summary, e.g. `Created: 1 Epic(s), 2 Task(s)`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.epics > 0 {
            parts.push(format!("{} Epic(s)", self.epics));
        }
        if self.features > 0 {
            parts.push(format!("{} Feature(s)", self.features));
        }
        if self.stories > 0 {
            parts.push(format!("{} Story(ies)", self.stories));
        }
        if self.tasks > 0 {
            parts.push(format!("{} Task(s)", self.tasks));
        }

        if parts.is_empty() {
            "Nothing created".to_string()
        } else {
            format!("Created: {}", parts.join(", "))
        }
    }
}

/// Outcome of one item's creation attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created {
        item_id: Uuid,
        entity_id: String,
        item_type: ItemType,
    },
    Failed {
        item_id: Uuid,
        title: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializationReport {
    pub counts: CreatedCounts,
    pub outcomes: Vec<ItemOutcome>,
}

impl MaterializationReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Failed { .. }))
            .count()
    }

    pub fn is_partial(&self) -> bool {
        self.failed_count() > 0
    }
}

fn common_fields(item: &ActionItem, provenance: &MeetingProvenance) -> WorkItemCommon {
    WorkItemCommon {
        title: item.title.clone(),
        description: item.description.clone(),
        priority: item.priority,
        status: item
            .status
            .clone()
            .unwrap_or_else(|| "planning".to_string()),
        assigned_to: item.assignee.clone().unwrap_or_default(),
        project_id: provenance.project_id.clone().unwrap_or_default(),
        sprint_id: provenance.sprint_id.clone().unwrap_or_default(),
        created_from: "meeting".to_string(),
        meeting_id: provenance.meeting_id.clone(),
        meeting_title: provenance.meeting_title.clone(),
    }
}

/// Create backlog entities for `items` in presented order.
pub async fn materialize(
    store: &dyn BacklogStore,
    items: &[ActionItem],
    provenance: &MeetingProvenance,
) -> MaterializationReport {
    let mut counts = CreatedCounts::default();
    let mut outcomes = Vec::with_capacity(items.len());

    for item in items {
        let common = common_fields(item, provenance);
        let due_date = item.due_date.clone().unwrap_or_default();

        let created = match item.item_type {
            ItemType::Epic => {
                store
                    .create_epic(NewEpic {
                        common,
                        target_date: due_date,
                        features: Vec::new(),
                    })
                    .await
            }
            ItemType::Feature => {
                store
                    .create_feature(NewFeature {
                        common,
                        epic_id: String::new(),
                        target_date: due_date,
                        stories: Vec::new(),
                    })
                    .await
            }
            ItemType::Story => {
                store
                    .create_story(NewStory {
                        common,
                        feature_id: String::new(),
                        story_points: 0,
                        acceptance_criteria: String::new(),
                        tasks: Vec::new(),
                        notes: Vec::new(),
                    })
                    .await
            }
            ItemType::Task => {
                store
                    .create_task(NewTask {
                        common,
                        story_id: String::new(),
                        due_date,
                        tags: vec!["meeting-action".to_string()],
                    })
                    .await
            }
        };

        match created {
            Ok(entity_id) => {
                counts.bump(item.item_type);
                outcomes.push(ItemOutcome::Created {
                    item_id: item.id,
                    entity_id,
                    item_type: item.item_type,
                });
            }
            Err(e) => {
                warn!(
                    "Failed to create {} '{}': {}",
                    item.item_type.as_str(),
                    item.title,
                    e
                );
                outcomes.push(ItemOutcome::Failed {
                    item_id: item.id,
                    title: item.title.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let report = MaterializationReport { counts, outcomes };
    info!(
        "Materialized {} of {} action items for meeting {} ({})",
        report.counts.total(),
        items.len(),
        provenance.meeting_id,
        report.counts.summary(),
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::{InMemoryBacklogStore, Priority};

    fn item(item_type: ItemType, title: &str) -> ActionItem {
        ActionItem {
            id: Uuid::new_v4(),
            item_type,
            title: title.to_string(),
            description: format!("{} description", title),
            priority: Priority::Medium,
            assignee: None,
            due_date: None,
            status: None,
        }
    }

    fn provenance() -> MeetingProvenance {
        MeetingProvenance {
            meeting_id: "meeting-7".to_string(),
            meeting_title: "Sprint Planning".to_string(),
            project_id: Some("proj-1".to_string()),
            sprint_id: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_counts_and_provenance() {
        let store = InMemoryBacklogStore::new();
        let items = vec![
            item(ItemType::Epic, "Payments revamp"),
            item(ItemType::Task, "Fix login"),
            item(ItemType::Task, "Update docs"),
        ];

        let report = materialize(&store, &items, &provenance()).await;

        assert_eq!(
            report.counts,
            CreatedCounts {
                epics: 1,
                features: 0,
                stories: 0,
                tasks: 2,
            }
        );
        assert!(!report.is_partial());

        let created = store.created();
        assert_eq!(created.len(), 3);
        for entity in &created {
            assert_eq!(entity.common.meeting_id, "meeting-7");
            assert_eq!(entity.common.meeting_title, "Sprint Planning");
            assert_eq!(entity.common.created_from, "meeting");
            assert_eq!(entity.common.project_id, "proj-1");
        }
        // Presented order is preserved.
        assert_eq!(created[0].item_type, ItemType::Epic);
        assert_eq!(created[1].common.title, "Fix login");
        assert_eq!(created[2].common.title, "Update docs");
    }

    #[tokio::test]
    async fn test_continues_past_failures_with_outcomes() {
        let store = InMemoryBacklogStore::new();
        store.fail_on("Broken one");

        let items = vec![
            item(ItemType::Story, "Good one"),
            item(ItemType::Story, "Broken one"),
            item(ItemType::Task, "Also good"),
        ];

        let report = materialize(&store, &items, &provenance()).await;

        assert!(report.is_partial());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.counts.stories, 1);
        assert_eq!(report.counts.tasks, 1);
        assert_eq!(store.created().len(), 2);

        match &report.outcomes[1] {
            ItemOutcome::Failed { title, .. } => assert_eq!(title, "Broken one"),
            other => panic!("expected failure outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_message() {
        let counts = CreatedCounts {
            epics: 1,
            features: 0,
            stories: 0,
            tasks: 2,
        };
        assert_eq!(counts.summary(), "Created: 1 Epic(s), 2 Task(s)");
        assert_eq!(CreatedCounts::default().summary(), "Nothing created");
    }
}
