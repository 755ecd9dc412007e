//! OpenAI chat-completions provider.
//!
//! Sends the transcript plus meeting context and asks for JSON back. The
//! engine validates whatever comes out, so this module only has to get a
//! well-formed `actionItems` array.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{AnalysisProvider, AnalysisRequest, RawActionItem};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatPayload {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExtractionResult {
    #[serde(rename = "actionItems", default)]
    action_items: Vec<RawActionItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    r#type: Option<String>,
    code: Option<String>,
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, endpoint: Option<String>, model: Option<String>) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        info!(
            "Initialized OpenAI provider with endpoint {} and model {}",
            endpoint, model
        );

        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            model,
        }
    }

    fn build_prompt(request: &AnalysisRequest<'_>) -> String {
        let meeting = request.meeting;
        let project = meeting.project_id.as_deref().unwrap_or("none");
        let sprint = meeting.sprint_id.as_deref().unwrap_or("none");

        format!(
            "Analyze the following meeting transcript and extract action items.\n\
             For each action item, identify:\n\
             - Title (brief description)\n\
             - Type (epic, feature, story, or task)\n\
             - Priority (critical, high, medium, low)\n\
             - Assignee (if mentioned)\n\
             - Due date (if mentioned)\n\
             - Description\n\
             \n\
             Meeting Context:\n\
             - Title: {}\n\
             - Type: {}\n\
             - Project: {}\n\
             - Sprint: {}\n\
             \n\
             Transcript:\n\
             {}\n\
             \n\
             Return the results as a JSON object with a single \"actionItems\" array, \
             where each entry has the fields \"title\", \"type\", \"priority\", \
             \"assignee\", \"dueDate\", and \"description\".",
            meeting.title, meeting.meeting_type, project, sprint, request.transcript
        )
    }
}

#[async_trait]
impl AnalysisProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI API"
    }

    async fn extract(&self, request: &AnalysisRequest<'_>) -> Result<Vec<RawActionItem>> {
        let body = ChatPayload {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert Agile project manager analyzing meeting transcripts."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::build_prompt(request),
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        debug!("Sending analysis request to OpenAI API");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            error!(
                "OpenAI API request failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(anyhow::anyhow!(
                    "OpenAI API error: {} (type: {:?}, code: {:?})",
                    error_response.error.message,
                    error_response.error.r#type,
                    error_response.error.code
                ));
            }

            return Err(anyhow::anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let chat: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("OpenAI API returned no choices")?;

        let extraction: ExtractionResult =
            serde_json::from_str(content).context("Failed to parse extracted action items")?;

        info!(
            "OpenAI analysis returned {} action items",
            extraction.action_items.len()
        );

        Ok(extraction.action_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_result_parses_model_output() {
        let content = r#"{
            "actionItems": [
                {
                    "title": "Fix the login flow",
                    "type": "story",
                    "priority": "high",
                    "assignee": "dev@example.com",
                    "dueDate": "2026-09-01",
                    "description": "Users get logged out after refresh"
                }
            ]
        }"#;

        let parsed: ExtractionResult = serde_json::from_str(content).unwrap();
        assert_eq!(parsed.action_items.len(), 1);
        assert_eq!(parsed.action_items[0].item_type, "story");
        assert_eq!(parsed.action_items[0].due_date.as_deref(), Some("2026-09-01"));
    }

    #[test]
    fn test_missing_action_items_is_empty() {
        let parsed: ExtractionResult = serde_json::from_str("{}").unwrap();
        assert!(parsed.action_items.is_empty());
    }

    #[test]
    fn test_prompt_includes_context() {
        use crate::meeting::{Meeting, MeetingStatus};

        let meeting = Meeting {
            id: "m1".to_string(),
            title: "Sprint Planning".to_string(),
            meeting_type: "sprint-planning".to_string(),
            description: String::new(),
            scheduled_date: String::new(),
            scheduled_time: String::new(),
            project_id: Some("proj-9".to_string()),
            sprint_id: None,
            status: MeetingStatus::InProgress,
            transcript: String::new(),
            action_items: Vec::new(),
        };

        let prompt = OpenAiProvider::build_prompt(&AnalysisRequest {
            transcript: "we should ship the thing",
            meeting: &meeting,
            projects: &[],
            sprints: &[],
        });

        assert!(prompt.contains("Title: Sprint Planning"));
        assert!(prompt.contains("Project: proj-9"));
        assert!(prompt.contains("Sprint: none"));
        assert!(prompt.contains("we should ship the thing"));
    }
}
