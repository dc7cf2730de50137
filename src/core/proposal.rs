//! Schema proposals from the AI assistant
//!
//! [`SchemaProposer`] is the narrow seam between the conversation and whatever
//! turns a description into tables: the HTTP client in production, a fake in
//! tests. The parsing helpers here turn the assistant's free-form reply into a
//! normalized [`ProposedSchema`].

use super::error::AiError;
use super::schema::{Field, FieldRef, RelationshipType, null_as_default};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Table proposed by the assistant
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ProposedTable {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
}

/// Relationship proposed by the assistant
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ProposedRelationship {
    pub from: FieldRef,
    pub to: FieldRef,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub relationship_type: RelationshipType,
}

/// Structured schema extracted from an assistant reply.
///
/// Deserialization normalizes the payload: field flags default to `false`,
/// `references` to `None`, relationship type to one-to-many, and a missing
/// relationship list to empty. A missing `tables` key is an error.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ProposedSchema {
    pub tables: Vec<ProposedTable>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<ProposedRelationship>,
}

/// Turns a natural-language description into a schema
#[async_trait]
pub trait SchemaProposer: Send + Sync {
    async fn propose_schema(&self, description: &str) -> Result<ProposedSchema, AiError>;

    /// Whether the proposer has what it needs (e.g. an API key) to run
    fn is_configured(&self) -> bool {
        true
    }

    /// Drop any cached client so the next call re-reads its configuration
    fn reset(&self) {}
}

/// First top-level `{ ... }` object in `text`, with string literals respected
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the assistant's raw reply into a normalized schema
pub fn parse_schema_response(text: &str) -> Result<ProposedSchema, AiError> {
    let json = extract_json_object(text).ok_or(AiError::NoJson)?;
    serde_json::from_str(json).map_err(|e| AiError::InvalidSchema(e.to_string()))
}
