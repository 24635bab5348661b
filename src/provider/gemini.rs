use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::{MentorError, Result};

/// Ceiling applied when `timeout_secs = 0`; an outbound call never hangs forever.
const MAX_TIMEOUT_SECS: u64 = 300;

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
const SAFETY_CATEGORIES: [&str; 2] = ["HARM_CATEGORY_HARASSMENT", "HARM_CATEGORY_HATE_SPEECH"];

/// Provider backed by the Google Gemini `generateContent` REST endpoint.
///
/// One POST per prompt, no retry.  The API key travels in the
/// `x-goog-api-key` header so it never shows up in URLs or error strings.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    generation: GenerationConfig,
}

// -- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: &'a GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

// -- Response schema ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiProvider {
    /// Build the provider from its config section and an already-validated key.
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self> {
        let timeout_secs = if config.timeout_secs > 0 {
            config.timeout_secs.min(MAX_TIMEOUT_SECS)
        } else {
            MAX_TIMEOUT_SECS
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MentorError::Config(format!("failed to create HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        info!(
            model = %config.model,
            endpoint = %endpoint,
            timeout_secs,
            "Gemini provider initialized"
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
            generation: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            },
        })
    }

    /// Send the prompt to Gemini and return the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: &self.generation,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "invoking Gemini API");

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MentorError::ProviderTransport(format!("Gemini request failed: {e}")))?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Gemini API error");
            return Err(MentorError::ProviderTransport(format!(
                "Gemini API error: {}",
                status.as_u16()
            )));
        }

        let text = resp.text().await.map_err(|e| {
            MentorError::ProviderTransport(format!("failed to read Gemini response: {e}"))
        })?;

        let generated = decode_response(&text)?;

        info!(
            response_len = generated.len(),
            model = %self.model,
            "Gemini response received"
        );

        Ok(generated)
    }
}

/// Decode a `generateContent` body into the first candidate's first text part.
pub(crate) fn decode_response(body: &str) -> Result<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Gemini response did not match schema");
        invalid_response()
    })?;

    if let Some(ref usage) = parsed.usage_metadata {
        debug!(
            prompt_tokens = usage.prompt_token_count,
            candidates_tokens = usage.candidates_token_count,
            total_tokens = usage.total_token_count,
            "Gemini usage"
        );
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            warn!(block_reason = %reason, "Gemini blocked the prompt");
            return Err(MentorError::ProviderResponse(format!(
                "Invalid response from Gemini API: prompt blocked ({reason})"
            )));
        }
        return Err(invalid_response());
    };

    if let Some(ref reason) = candidate.finish_reason {
        debug!(finish_reason = %reason, "Gemini candidate finished");
    }

    candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or_else(invalid_response)
}

fn invalid_response() -> MentorError {
    MentorError::ProviderResponse("Invalid response from Gemini API".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn provider_for(server: &MockServer) -> GeminiProvider {
        let config = ProviderConfig {
            base_url: server.base_url(),
            ..ProviderConfig::default()
        };
        GeminiProvider::new(&config, "test-key".into()).unwrap()
    }

    #[test]
    fn decode_extracts_first_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Build a to-do list app."},{"text":"ignored"}]}},
            {"content":{"parts":[{"text":"second"}]}}]}"#;
        assert_eq!(decode_response(body).unwrap(), "Build a to-do list app.");
    }

    #[test]
    fn decode_rejects_missing_structure() {
        for body in [
            "{}",
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{}}]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#,
            "not json",
            r#"{"candidates":"nope"}"#,
        ] {
            let err = decode_response(body).unwrap_err();
            assert!(
                matches!(err, MentorError::ProviderResponse(_)),
                "body {body} gave {err:?}"
            );
        }
    }

    #[test]
    fn decode_names_block_reason() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = decode_response(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn request_payload_shape() {
        let generation = GenerationConfig {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 2048,
        };
        let body = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: "hello" }],
            }],
            generation_config: &generation,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(v["generationConfig"]["topK"], 40);
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(v["safetySettings"][1]["category"], "HARM_CATEGORY_HATE_SPEECH");
        assert_eq!(v["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[tokio::test]
    async fn generate_posts_prompt_and_returns_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-1.5-flash-latest:generateContent")
                    .header("x-goog-api-key", "test-key")
                    .body_contains("Suggest a beginner web development task")
                    .body_contains("HARM_CATEGORY_HARASSMENT");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"candidates":[{"content":{"parts":[{"text":"Build a to-do list app."}]}}]}"#);
            })
            .await;

        let provider = provider_for(&server);
        let text = provider
            .generate("Suggest a beginner web development task")
            .await
            .unwrap();

        assert_eq!(text, "Build a to-do list app.");
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn generate_non_success_is_transport_error_with_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body(r#"{"error":{"message":"quota"}}"#);
            })
            .await;

        let err = provider_for(&server).generate("hi").await.unwrap_err();

        assert!(matches!(err, MentorError::ProviderTransport(_)));
        assert_eq!(err.to_string(), "Gemini API error: 429");
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn generate_malformed_body_is_response_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).body(r#"{"candidates":[{"content":{}}]}"#);
            })
            .await;

        let err = provider_for(&server).generate("hi").await.unwrap_err();
        assert!(matches!(err, MentorError::ProviderResponse(_)));
    }

    #[tokio::test]
    async fn generate_unreachable_is_transport_error() {
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..ProviderConfig::default()
        };
        let provider = GeminiProvider::new(&config, "k".into()).unwrap();
        let err = provider.generate("hi").await.unwrap_err();
        assert!(matches!(err, MentorError::ProviderTransport(_)));
    }
}
