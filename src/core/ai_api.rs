//! AI API client
//!
//! Talks to an OpenAI-compatible chat completions endpoint (OpenRouter by
//! default) and implements [`SchemaProposer`] on top of it. The API key comes
//! from the [`CredentialStore`] and is read when the client is first needed.

use super::ai_config::{AiConfig, ChatMessage, ChatRequest, ChatResponse};
use super::credentials::{API_KEY_CREDENTIAL, CredentialStore};
use super::error::AiError;
use super::proposal::{ProposedSchema, SchemaProposer, parse_schema_response};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex, PoisonError};

const SYSTEM_PROMPT: &str =
    "You convert database schema descriptions into JSON. Reply with a single JSON object.";

/// Longest response body written to debug logs
const LOG_BODY_LIMIT: usize = 500;

/// Chat completions client bound to one API key
#[derive(Clone)]
pub struct AiClient {
    config: AiConfig,
    api_key: String,
    http: reqwest::Client,
}

impl AiClient {
    pub fn new(config: AiConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Send one prompt and return the first choice's text
    pub async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };

        tracing::info!(
            "AI chat request: model={}, prompt_len={}",
            request.model,
            prompt.len()
        );

        let response = self
            .http
            .post(&self.config.api_base)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "schemachat")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        tracing::info!("AI API response status: {}", status);
        let body = response.text().await?;
        tracing::debug!("AI API response body: {}", truncate_for_log(&body));

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            tracing::warn!("AI API error response: {}", truncate_for_log(&body));
            return Err(AiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AiError::InvalidSchema(format!("unexpected API response: {}", e)))?;

        Ok(parsed.first_content().unwrap_or_default().to_string())
    }
}

fn truncate_for_log(body: &str) -> String {
    if body.len() > LOG_BODY_LIMIT {
        let cut = (0..=LOG_BODY_LIMIT)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!(
            "{}... (truncated, total {} bytes)",
            &body[..cut],
            body.len()
        )
    } else {
        body.to_string()
    }
}

/// [`SchemaProposer`] backed by the AI API.
///
/// The client is created lazily from the stored API key and cached until
/// [`SchemaProposer::reset`] is called.
pub struct AiSchemaProposer {
    config: AiConfig,
    credentials: Arc<dyn CredentialStore>,
    client: Mutex<Option<AiClient>>,
}

impl AiSchemaProposer {
    pub fn new(config: AiConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            credentials,
            client: Mutex::new(None),
        }
    }

    /// Cached client, creating it from the stored key on first use
    fn client(&self) -> Result<AiClient, AiError> {
        let mut cached = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }

        let api_key = self
            .credentials
            .get(API_KEY_CREDENTIAL)?
            .filter(|key| !key.trim().is_empty())
            .ok_or(AiError::MissingApiKey)?;

        tracing::info!("Initialized AI client for model {}", self.config.model);
        let client = AiClient::new(self.config.clone(), api_key.trim());
        *cached = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl SchemaProposer for AiSchemaProposer {
    async fn propose_schema(&self, description: &str) -> Result<ProposedSchema, AiError> {
        let client = self.client()?;
        let prompt = self.config.render_prompt(description);
        let text = client.complete(&prompt).await?;

        parse_schema_response(&text).inspect_err(|e| {
            tracing::warn!("Error parsing AI response: {}", e);
        })
    }

    fn is_configured(&self) -> bool {
        self.credentials.contains(API_KEY_CREDENTIAL)
    }

    fn reset(&self) {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
