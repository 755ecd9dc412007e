//! Transcript analysis engine.
//!
//! Takes the full transcript plus meeting/project/sprint context and
//! produces a typed, structured list of candidate action items. The actual
//! extraction is delegated to a provider (built-in keyword heuristics or a
//! remote model); this module owns the input/output contract and the
//! validation boundary.
//!
//! Validation is deliberately lenient per item and strict per field: a
//! malformed suggestion is dropped with a warning, never failing the whole
//! call, and the free-text `type` coming back from a provider is parsed
//! into the closed `ItemType` set exactly once, here.

mod keyword;
mod openai_api;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backlog::{ActionItem, ItemType, Priority};
use crate::config::AnalysisConfig;
use crate::meeting::{Meeting, Project, Sprint};

pub use keyword::KeywordProvider;
pub use openai_api::OpenAiProvider;

/// Everything the engine needs for one analysis call.
pub struct AnalysisRequest<'a> {
    pub transcript: &'a str,
    pub meeting: &'a Meeting,
    pub projects: &'a [Project],
    pub sprints: &'a [Sprint],
}

/// An action item as a provider emitted it, before validation. `item_type`
/// and `priority` are free strings at this point.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActionItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptStats {
    pub total_words: usize,
    pub total_sentences: usize,
    pub action_item_count: usize,
    pub attendee_count: usize,
}

/// Result of one analysis call, handed to the review session as a fresh,
/// unsaved candidate set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub action_items: Vec<ActionItem>,
    pub topics: Vec<String>,
    pub mentioned_attendees: Vec<String>,
    pub stats: TranscriptStats,
    pub summary: String,
    /// Suggestions dropped at the validation boundary.
    pub dropped: usize,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no transcript available to analyze")]
    EmptyTranscript,
    #[error("an analysis is already in progress for this meeting")]
    InFlight,
    #[error("analysis failed: {0}")]
    Provider(#[source] anyhow::Error),
}

/// An action-item extraction backend.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, request: &AnalysisRequest<'_>) -> Result<Vec<RawActionItem>>;
}

pub struct AnalysisEngine {
    provider: Box<dyn AnalysisProvider>,
}

impl AnalysisEngine {
    pub fn with_provider(provider_name: &str, config: &AnalysisConfig) -> Result<Self> {
        let provider: Box<dyn AnalysisProvider> = match provider_name {
            "keyword" => Box::new(KeywordProvider::new()),
            "openai-api" => {
                let api_key = config
                    .api_key
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("api_key is required for the OpenAI provider"))?;
                Box::new(OpenAiProvider::new(
                    api_key,
                    config.api_endpoint.clone(),
                    config.model.clone(),
                ))
            }
            other => anyhow::bail!(
                "Unknown analysis provider '{}'. Supported providers: keyword, openai-api",
                other
            ),
        };

        info!("Using {} for transcript analysis", provider.name());
        Ok(Self { provider })
    }

    pub fn from_provider(provider: Box<dyn AnalysisProvider>) -> Self {
        Self { provider }
    }

    /// Run one analysis. Fails before any provider call when the transcript
    /// is empty or whitespace-only.
    pub async fn analyze(
        &self,
        request: AnalysisRequest<'_>,
    ) -> Result<AnalysisReport, AnalysisError> {
        if request.transcript.trim().is_empty() {
            return Err(AnalysisError::EmptyTranscript);
        }

        let raw = self
            .provider
            .extract(&request)
            .await
            .map_err(AnalysisError::Provider)?;

        let suggested = raw.len();
        let action_items = validate_items(raw);
        let dropped = suggested - action_items.len();

        let topics = extract_topics(request.transcript, 10);
        let mentioned_attendees = unique_emails(request.transcript);
        let stats = TranscriptStats {
            total_words: request.transcript.split_whitespace().count(),
            total_sentences: split_sentences(request.transcript).count(),
            action_item_count: action_items.len(),
            attendee_count: mentioned_attendees.len(),
        };
        let summary = generate_summary(&action_items, &topics, &stats);

        info!(
            "Analysis of meeting {} produced {} action items ({} dropped)",
            request.meeting.id,
            action_items.len(),
            dropped
        );

        Ok(AnalysisReport {
            action_items,
            topics,
            mentioned_attendees,
            stats,
            summary,
            dropped,
        })
    }
}

/// Validate provider output into typed action items. Items with an empty
/// title or a type outside the closed set are dropped with a warning.
fn validate_items(raw: Vec<RawActionItem>) -> Vec<ActionItem> {
    let mut items = Vec::with_capacity(raw.len());

    for candidate in raw {
        let title = candidate.title.trim().to_string();
        if title.is_empty() {
            warn!("Dropping suggested action item with empty title");
            continue;
        }

        let item_type: ItemType = match candidate.item_type.parse() {
            Ok(t) => t,
            Err(()) => {
                warn!(
                    "Dropping action item '{}' with invalid type '{}'",
                    title, candidate.item_type
                );
                continue;
            }
        };

        let priority = candidate
            .priority
            .parse::<Priority>()
            .unwrap_or(Priority::Medium);

        let description = if candidate.description.trim().is_empty() {
            title.clone()
        } else {
            candidate.description.trim().to_string()
        };

        items.push(ActionItem {
            id: Uuid::new_v4(),
            item_type,
            title,
            description,
            priority,
            assignee: candidate.assignee.filter(|a| !a.trim().is_empty()),
            due_date: candidate.due_date.filter(|d| !d.trim().is_empty()),
            status: candidate.status,
        });
    }

    items
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("email regex is valid")
    })
}

pub(crate) fn extract_emails(text: &str) -> Vec<String> {
    email_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn unique_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_emails(text)
        .into_iter()
        .filter(|email| seen.insert(email.clone()))
        .collect()
}

pub(crate) fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence regex is valid"));
    re.split(text).filter(|s| !s.trim().is_empty())
}

/// Most frequent words longer than four characters, as rough topics.
fn extract_topics(transcript: &str, limit: usize) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in transcript.to_lowercase().split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.len() > 4 {
            *freq.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<(String, usize)> = freq.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(limit).map(|(w, _)| w).collect()
}

fn generate_summary(
    action_items: &[ActionItem],
    topics: &[String],
    stats: &TranscriptStats,
) -> String {
    let mut lines = Vec::new();

    lines.push("Meeting Summary".to_string());
    lines.push("--------------".to_string());
    lines.push(format!("Total Words: {}", stats.total_words));
    lines.push(format!("Total Sentences: {}", stats.total_sentences));
    lines.push(format!(
        "Action Items Identified: {}",
        stats.action_item_count
    ));
    lines.push(String::new());

    if !topics.is_empty() {
        lines.push("Key Topics Discussed:".to_string());
        for topic in topics.iter().take(5) {
            lines.push(format!("- {}", topic));
        }
        lines.push(String::new());
    }

    if !action_items.is_empty() {
        lines.push("Action Items by Type:".to_string());
        let mut by_type: HashMap<ItemType, usize> = HashMap::new();
        for item in action_items {
            *by_type.entry(item.item_type).or_insert(0) += 1;
        }
        for item_type in [
            ItemType::Epic,
            ItemType::Feature,
            ItemType::Story,
            ItemType::Task,
        ] {
            if let Some(count) = by_type.get(&item_type) {
                lines.push(format!("- {}: {}", item_type.as_str(), count));
            }
        }
    }

    lines.join("\n")
}
