//! Core domain models and business logic for chat-driven schema editing

#[cfg(feature = "ssr")]
pub mod ai_api;
pub mod ai_config;
pub mod auto_layout;
pub mod command;
#[cfg(feature = "ssr")]
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod diagram;
pub mod error;
pub mod proposal;
mod schema;
pub mod store;

#[cfg(feature = "ssr")]
pub use ai_api::{AiClient, AiSchemaProposer};
pub use ai_config::{AiConfig, HELP_TEXT};
pub use auto_layout::{LayoutConfig, calculate_circular_layout, circular_positions, positions_for_new_tables};
pub use command::{Command, CommandKind};
pub use conversation::{
    ChatEntry, Conversation, Sender, TurnError, TurnOutcome, TurnReport, TurnState,
};
#[cfg(feature = "ssr")]
pub use credentials::FileCredentialStore;
pub use credentials::{API_KEY_CREDENTIAL, CredentialStore, MemoryCredentialStore};
pub use diagram::*;
pub use error::{AiError, CredentialError, ErrorCategory};
pub use proposal::{
    ProposedRelationship, ProposedSchema, ProposedTable, SchemaProposer, extract_json_object,
    parse_schema_response,
};
pub use schema::*;
pub use store::{FieldUpdate, RelationshipView, SchemaStore};
