//! AI Assistant Configuration
//!
//! This module provides configuration for the schema assistant, including:
//! - API endpoint configuration (base URL)
//! - Model selection
//! - The instruction template wrapped around schema descriptions
//! - Wire types for OpenAI-compatible chat completions

use serde::{Deserialize, Serialize};

/// Default API base URL for OpenRouter
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model to use
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";

/// Placeholder replaced by the user's description in [`SCHEMA_PROMPT`]
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";

/// Instruction template for converting a description into schema JSON
pub const SCHEMA_PROMPT: &str = r#"Convert this database schema description to JSON format:
"{description}"

Expected format:
{
  "tables": [
    {
      "name": "table_name",
      "fields": [
        {
          "name": "field_name",
          "type": "field_type",
          "isPrimary": boolean,
          "isForeignKey": boolean,
          "references": { "table": "table_name", "field": "field_name" }
        }
      ]
    }
  ],
  "relationships": [
    {
      "from": { "table": "table_name", "field": "field_name" },
      "to": { "table": "table_name", "field": "field_name" },
      "type": "one-to-one" | "one-to-many" | "many-to-one" | "many-to-many"
    }
  ]
}

Rules:
1. DO NOT add any default fields (like 'id')
2. Only include fields that are explicitly mentioned
3. Detect and specify relationship types:
   - one-to-one: When each record in both tables has exactly one matching record
   - one-to-many: When a record in one table can have multiple matching records in another
   - many-to-one: When multiple records in one table match a single record in another
   - many-to-many: When multiple records in both tables can match each other
4. Use standard SQL types (text, varchar, integer, etc.)
5. Keep table and field names in snake_case
6. Mark foreign key fields with isForeignKey=true
7. Include references for foreign key fields
8. Reply with the JSON object only"#;

/// Command reference shown to users
pub const HELP_TEXT: &str = r#"Describe tables in plain language, e.g.
  Create a blog with users (name, email), posts (title, content), and comments (content, created_at)

Or edit the diagram directly:
  add [table_name].[column_name] [type]     e.g. add users.email varchar(100)
  remove [table_name].[column_name]         e.g. remove users.email
  change [table_name].[column_name] to [type]   e.g. change users.email to text
  primary [table_name].[field_name]         e.g. primary users.id
  remove [table_name]                       e.g. remove users

Schema format returned by the assistant:
  {"tables": [{"name", "fields": [{"name", "type", "isPrimary", "isForeignKey", "references"}]}],
   "relationships": [{"from": {"table", "field"}, "to": {"table", "field"}, "type"}]}"#;

/// AI Assistant configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiConfig {
    /// API base URL (OpenRouter compatible chat completions endpoint)
    pub api_base: String,

    /// Model identifier (e.g., "openai/gpt-4o", "google/gemini-2.5-flash-lite")
    pub model: String,

    /// Instruction template containing [`DESCRIPTION_PLACEHOLDER`]
    pub schema_prompt: String,

    /// Temperature for generation (0.0 - 2.0)
    pub temperature: f32,

    /// Max tokens for response
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            schema_prompt: SCHEMA_PROMPT.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

impl AiConfig {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults
    #[cfg(feature = "ssr")]
    pub fn from_env() -> Self {
        let api_base =
            std::env::var("OPENAPI_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let model = std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self::new(api_base, model)
    }

    /// Set the instruction template
    pub fn with_schema_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.schema_prompt = prompt.into();
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Instruction prompt for one description
    pub fn render_prompt(&self, description: &str) -> String {
        self.schema_prompt
            .replace(DESCRIPTION_PLACEHOLDER, description.trim())
    }
}

/// Chat message role
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat completion message
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Chat completion request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Chat completion response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<Choice>,
}

/// Response choice
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
