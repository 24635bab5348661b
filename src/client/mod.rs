pub mod models;
pub mod prompts;

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{MentorError, Result};
use crate::server::handlers::{ErrorEnvelope, InvocationResponse};

use models::{ChatMessage, Roadmap, RoadmapStatus, SkillLevel, TaskStatus, TaskSummary};

pub const CHAT_FALLBACK: &str =
    "I apologize, but I cannot provide a response right now. Please try again.";
pub const QUOTE_FALLBACK: &str =
    "Every expert was once a beginner. Keep learning, keep growing! 🚀";
pub const PROGRESS_FALLBACK: &str =
    "You're making great progress! Keep up the excellent work.";

/// Chat history entries forwarded as context.
const HISTORY_WINDOW: usize = 5;

#[derive(Serialize)]
struct InvocationBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a serde_json::Value>,
}

/// Typed caller for the mentor proxy contract.
pub struct MentorClient {
    client: Client,
    endpoint: String,
}

impl MentorClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MentorError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// One round trip through the proxy.  A non-2xx reply surfaces the
    /// envelope's `error` text; callers never see the fallback as content.
    pub async fn invoke(
        &self,
        prompt: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<InvocationResponse> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&InvocationBody { prompt, context })
            .send()
            .await
            .map_err(|e| {
                MentorError::ProviderTransport(format!("failed to connect to AI service: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error)
                .unwrap_or(text);
            warn!(status = %status, error = %detail, "AI service error");
            return Err(MentorError::ProviderTransport(format!(
                "failed to get AI response ({status}): {detail}"
            )));
        }

        let body: InvocationResponse = resp.json().await.map_err(|e| {
            MentorError::ProviderResponse(format!("malformed AI service response: {e}"))
        })?;
        debug!(content_len = body.content.len(), "AI service response received");
        Ok(body)
    }

    pub async fn chat_reply(&self, message: &str, history: &[ChatMessage]) -> Result<String> {
        let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
        let context = json!({
            "type": "chat",
            "history": recent,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let resp = self.invoke(&prompts::chat_prompt(message), Some(&context)).await?;
        Ok(or_fallback(resp.content, CHAT_FALLBACK))
    }

    pub async fn motivational_quote(&self) -> Result<String> {
        let resp = self.invoke(prompts::quote_prompt(), None).await?;
        Ok(or_fallback(resp.content, QUOTE_FALLBACK))
    }

    pub async fn generate_roadmap(&self, skill: &str, level: SkillLevel) -> Result<Roadmap> {
        let resp = self.invoke(&prompts::roadmap_prompt(skill, level), None).await?;
        parse_roadmap(&resp.content, chrono::Utc::now().timestamp_millis())
    }

    pub async fn analyze_progress(&self, tasks: &[TaskSummary], streak_days: u32) -> Result<String> {
        let resp = self
            .invoke(&prompts::progress_prompt(tasks, streak_days), None)
            .await?;
        Ok(or_fallback(resp.content, PROGRESS_FALLBACK))
    }

    pub async fn suggest_next_steps(
        &self,
        roadmaps: &[String],
        completed_tasks: &[TaskSummary],
    ) -> Result<Vec<String>> {
        let completed = completed_tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let resp = self
            .invoke(&prompts::next_steps_prompt(roadmaps, completed), None)
            .await?;
        Ok(parse_next_steps(&resp.content))
    }
}

fn or_fallback(content: String, fallback: &str) -> String {
    if content.trim().is_empty() {
        fallback.to_string()
    } else {
        content
    }
}

/// Models often wrap JSON in a ```json fence; peel it off before parsing.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_roadmap(content: &str, now_millis: i64) -> Result<Roadmap> {
    let mut roadmap: Roadmap = serde_json::from_str(strip_code_fence(content)).map_err(|e| {
        warn!(error = %e, "failed to parse roadmap");
        MentorError::ProviderResponse("failed to generate roadmap".into())
    })?;
    roadmap.id = format!("roadmap_{now_millis}");
    roadmap.status = RoadmapStatus::NotStarted;
    roadmap.progress = 0;
    Ok(roadmap)
}

fn parse_next_steps(content: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(strip_code_fence(content)).unwrap_or_else(|_| {
        vec![
            "Review your completed tasks and identify knowledge gaps".to_string(),
            "Set a specific learning goal for this week".to_string(),
            "Find a practice project to apply your skills".to_string(),
        ]
    })
}
