//! Built-in keyword heuristic provider.
//!
//! Splits the transcript into sentences and keeps the ones that sound like
//! commitments. No network access, so it always works offline and is the
//! default provider.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use super::{extract_emails, split_sentences, AnalysisProvider, AnalysisRequest, RawActionItem};

const ACTION_KEYWORDS: &[&str] = &[
    "need to",
    "should",
    "must",
    "have to",
    "will",
    "create",
    "update",
    "fix",
    "implement",
    "develop",
    "action item",
    "task",
    "todo",
    "follow up",
    "assign",
    "responsible",
    "owner",
];

const ENTITY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "epic",
        &["epic", "major feature", "initiative", "theme", "large scale"],
    ),
    ("feature", &["feature", "capability", "functionality", "module"]),
    (
        "story",
        &["story", "user story", "requirement", "ticket", "issue"],
    ),
    ("task", &["task", "subtask", "work item", "action"]),
];

const PRIORITY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "critical",
        &["critical", "urgent", "asap", "immediately", "blocker"],
    ),
    ("high", &["high priority", "important", "soon", "needed"]),
    ("medium", &["medium", "normal"]),
    (
        "low",
        &["low priority", "nice to have", "optional", "eventually"],
    ),
];

/// Sentences shorter than this are noise, not commitments.
const MIN_SENTENCE_LEN: usize = 20;

const MAX_TITLE_LEN: usize = 100;

fn date_regexes() -> &'static [Regex; 4] {
    static RES: OnceLock<[Regex; 4]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            Regex::new(r"\d{4}-\d{2}-\d{2}").expect("date regex is valid"),
            Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").expect("date regex is valid"),
            Regex::new(
                r"(?i)(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}",
            )
            .expect("date regex is valid"),
            Regex::new(r"(?i)(next week|next month|tomorrow)").expect("date regex is valid"),
        ]
    })
}

fn extract_date(text: &str) -> Option<String> {
    date_regexes()
        .iter()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

fn determine_entity_type(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    for (entity, keywords) in ENTITY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return entity;
        }
    }
    "story"
}

fn determine_priority(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    for (priority, keywords) in PRIORITY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return priority;
        }
    }
    "medium"
}

fn extract_action(sentence: &str) -> Option<RawActionItem> {
    let lower = sentence.to_lowercase();
    if !ACTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return None;
    }

    let assignee = extract_emails(sentence).into_iter().next();
    let due_date = extract_date(sentence);

    let mut title = sentence.trim().trim_end_matches('.').to_string();
    if title.chars().count() > MAX_TITLE_LEN {
        title = title.chars().take(MAX_TITLE_LEN).collect::<String>() + "...";
    }

    Some(RawActionItem {
        title,
        description: sentence.trim().to_string(),
        item_type: determine_entity_type(sentence).to_string(),
        priority: determine_priority(sentence).to_string(),
        assignee,
        due_date,
        status: Some("planning".to_string()),
    })
}

#[derive(Default)]
pub struct KeywordProvider;

impl KeywordProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalysisProvider for KeywordProvider {
    fn name(&self) -> &'static str {
        "keyword heuristics"
    }

    async fn extract(&self, request: &AnalysisRequest<'_>) -> Result<Vec<RawActionItem>> {
        Ok(split_sentences(request.transcript)
            .filter(|s| s.trim().len() > MIN_SENTENCE_LEN)
            .filter_map(extract_action)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_without_action_keyword_skipped() {
        assert!(extract_action("the weather was lovely this morning everyone").is_none());
    }

    #[test]
    fn test_action_sentence_extracted_with_defaults() {
        let item = extract_action("we need to rework the onboarding emails before launch").unwrap();
        assert_eq!(item.item_type, "story");
        assert_eq!(item.priority, "medium");
        assert_eq!(item.status.as_deref(), Some("planning"));
        assert!(item.assignee.is_none());
    }

    #[test]
    fn test_entity_and_priority_keywords_detected() {
        let item =
            extract_action("this is an urgent task, we must fix the billing export today").unwrap();
        assert_eq!(item.item_type, "task");
        assert_eq!(item.priority, "critical");
    }

    #[test]
    fn test_assignee_and_due_date_extracted() {
        let item = extract_action(
            "alice@example.com will follow up on the contract by 2026-09-01 at the latest",
        )
        .unwrap();
        assert_eq!(item.assignee.as_deref(), Some("alice@example.com"));
        assert_eq!(item.due_date.as_deref(), Some("2026-09-01"));
    }

    #[test]
    fn test_relative_dates_detected() {
        let item = extract_action("bob should update the roadmap deck by next week").unwrap();
        assert_eq!(item.due_date.as_deref(), Some("next week"));
    }

    #[test]
    fn test_long_titles_truncated() {
        let sentence = format!("we need to {}", "x".repeat(200));
        let item = extract_action(&sentence).unwrap();
        assert_eq!(item.title.chars().count(), 103);
        assert!(item.title.ends_with("..."));
    }

    #[tokio::test]
    async fn test_short_sentences_filtered() {
        use crate::meeting::{Meeting, MeetingStatus};

        let meeting = Meeting {
            id: "m1".to_string(),
            title: "Standup".to_string(),
            meeting_type: "standup".to_string(),
            description: String::new(),
            scheduled_date: String::new(),
            scheduled_time: String::new(),
            project_id: None,
            sprint_id: None,
            status: MeetingStatus::InProgress,
            transcript: String::new(),
            action_items: Vec::new(),
        };

        let provider = KeywordProvider::new();
        let items = provider
            .extract(&AnalysisRequest {
                transcript: "fix it. we should really update the release checklist this sprint.",
                meeting: &meeting,
                projects: &[],
                sprints: &[],
            })
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert!(items[0].title.contains("release checklist"));
    }
}
