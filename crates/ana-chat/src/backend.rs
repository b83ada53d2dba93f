//! Generative-language backends.
//!
//! - [`GeminiBackend`] calls Google's `generateContent` REST endpoint.
//! - Tests plug in their own [`GenerativeBackend`] to script outcomes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ana_core::config::LlmConfig;
use ana_core::types::{ConversationTurn, Role};

use crate::error::InterpreterError;

/// Everything the backend needs for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    /// Prior turns (already windowed) followed by the new user message.
    pub contents: Vec<ConversationTurn>,
    /// JSON schema the answer must conform to.
    pub response_schema: Value,
}

/// A text-generation capability returning the raw answer text.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Perform one call and return the model's answer text.
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<String, InterpreterError>;
}

// ---------------------------------------------------------------------------
// GeminiBackend
// ---------------------------------------------------------------------------

/// Backend for the Gemini `generateContent` API.
pub struct GeminiBackend {
    client: HttpClient,
    api_base: String,
    model: String,
    /// Per-request limit. `None` lets the call run as long as the server takes.
    timeout: Option<Duration>,
}

impl GeminiBackend {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            client: HttpClient::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_base.clone(),
            config.model.clone(),
            match config.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        )
    }

    /// Replace the HTTP client, e.g. to set proxies or TLS roots.
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    /// Build the wire request body.
    fn build_body(request: &GenerationRequest) -> GeminiRequest {
        let contents = request
            .contents
            .iter()
            .map(|turn| GeminiContent {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
                parts: vec![GeminiTextPart {
                    text: turn.content.clone(),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: request.system_instruction.clone(),
                }],
            },
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: request.response_schema.clone(),
            },
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(response: GeminiResponse) -> Result<String, InterpreterError> {
        if let Some(error) = response.error {
            return Err(classify_status(
                error.code.unwrap_or(500),
                error.status.unwrap_or_default() + ": " + &error.message,
            ));
        }

        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or(InterpreterError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(InterpreterError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Map an HTTP failure to an error, separating rejected keys from transient failures.
fn classify_status(status: u16, body: String) -> InterpreterError {
    if status == 401 || status == 403 || body.contains("API_KEY_INVALID") {
        InterpreterError::CredentialRejected(format!("HTTP {}", status))
    } else {
        InterpreterError::Status { status, body }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<String, InterpreterError> {
        let body = Self::build_body(request);

        tracing::debug!(
            model = %self.model,
            turns = body.contents.len(),
            "Sending generateContent request"
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let text = response.text().await?;
        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| InterpreterError::MalformedResponse(e.to_string()))?;

        Self::extract_text(parsed)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiSystemInstruction,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}
