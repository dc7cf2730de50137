//! Conversation controller
//!
//! Runs one chat turn at a time: classify the input, apply a modification
//! command to the store or ask the [`SchemaProposer`] for a schema and merge
//! it, then narrate the outcome in the transcript.
//!
//! The controller owns the [`SchemaStore`]. Its lock is only held for
//! synchronous sections, never across the assistant call, so the diagram stays
//! readable while a turn is in flight.

use super::auto_layout::positions_for_new_tables;
use super::command::Command;
use super::diagram::Diagram;
use super::error::{AiError, ErrorCategory};
use super::proposal::{ProposedSchema, SchemaProposer};
use super::schema::{Cardinality, Relationship};
use super::store::{FieldUpdate, SchemaStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const WELCOME_MESSAGE: &str =
    "Welcome! Please set your API key using the API Key setting to get started.";
pub const PARSE_FAILED_MESSAGE: &str =
    "Failed to parse schema. See the help reference for example commands and the schema format.";
pub const NOTHING_NEW_MESSAGE: &str =
    "Nothing new to add: these tables and relationships already exist.";

/// Who wrote a transcript entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// One message in the chat transcript
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4()),
            sender,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    #[default]
    Idle,
    Processing,
}

/// What a turn did to the diagram
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// A modification command ran; `applied` is the store's result
    Modified { applied: bool },
    /// A proposed schema was merged
    Merged {
        tables_added: usize,
        relationships_added: usize,
    },
    /// The proposed schema contained nothing that was not already there
    NothingNew,
    /// The assistant call failed; the error is narrated in the transcript
    Failed { category: ErrorCategory },
}

/// Entries produced by one turn, starting with the user's own message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub entries: Vec<ChatEntry>,
    pub outcome: TurnOutcome,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("A request is already being processed")]
    Busy,
    #[error("Input is empty")]
    EmptyInput,
}

#[derive(Default)]
struct Session {
    store: SchemaStore,
    transcript: Vec<ChatEntry>,
    turn: TurnState,
}

impl Session {
    fn push(&mut self, entries: &mut Vec<ChatEntry>, sender: Sender, text: impl Into<String>) {
        let entry = ChatEntry::new(sender, text);
        self.transcript.push(entry.clone());
        entries.push(entry);
    }
}

/// Returns the session to idle when a turn ends, even if its future is dropped
struct TurnGuard<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .turn = TurnState::Idle;
    }
}

/// Chat-driven schema editor session
pub struct Conversation {
    session: Mutex<Session>,
    proposer: Arc<dyn SchemaProposer>,
}

impl Conversation {
    pub fn new(proposer: Arc<dyn SchemaProposer>) -> Self {
        let conversation = Self {
            session: Mutex::new(Session::default()),
            proposer,
        };
        conversation.greet();
        conversation
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn greet(&self) {
        if !self.proposer.is_configured() {
            self.lock()
                .transcript
                .push(ChatEntry::new(Sender::System, WELCOME_MESSAGE));
        }
    }

    pub fn turn_state(&self) -> TurnState {
        self.lock().turn
    }

    pub fn transcript(&self) -> Vec<ChatEntry> {
        self.lock().transcript.clone()
    }

    /// Render records for the current diagram
    pub fn snapshot(&self) -> Diagram {
        self.lock().store.to_diagram()
    }

    /// Run `f` against the store, e.g. for renderer-driven edits
    pub fn with_store<R>(&self, f: impl FnOnce(&mut SchemaStore) -> R) -> R {
        f(&mut self.lock().store)
    }

    /// Reset the diagram and the chat
    pub fn clear(&self) {
        {
            let mut session = self.lock();
            session.store.clear();
            session.transcript.clear();
        }
        self.greet();
        tracing::info!("Conversation cleared");
    }

    /// Forget the proposer's cached client after a credential change
    pub fn reconfigure(&self) {
        self.proposer.reset();
    }

    /// Process one user message.
    ///
    /// Only one turn may run at a time; input arriving while a turn is
    /// processing is rejected with [`TurnError::Busy`]. Assistant failures are
    /// narrated in the transcript rather than returned.
    pub async fn submit(&self, input: &str) -> Result<TurnReport, TurnError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let mut entries = Vec::new();
        let command = {
            let mut session = self.lock();
            if session.turn == TurnState::Processing {
                tracing::debug!("Rejected input while processing");
                return Err(TurnError::Busy);
            }
            session.turn = TurnState::Processing;
            session.push(&mut entries, Sender::User, input);
            Command::parse(input)
        };
        let _guard = TurnGuard {
            session: &self.session,
        };

        tracing::info!("Processing turn: {}", command.kind());

        let outcome = match command {
            Command::Describe(description) => {
                let proposal = self.proposer.propose_schema(&description).await;
                let mut session = self.lock();
                match proposal {
                    Ok(schema) => merge_schema(&mut session, &mut entries, schema),
                    Err(err) => narrate_error(&mut session, &mut entries, &err),
                }
            }
            command => {
                let mut session = self.lock();
                apply_command(&mut session, &mut entries, command)
            }
        };

        Ok(TurnReport { entries, outcome })
    }
}

fn apply_command(session: &mut Session, entries: &mut Vec<ChatEntry>, command: Command) -> TurnOutcome {
    let store = &mut session.store;
    let (applied, text) = match command {
        Command::RemoveTable { table } => {
            if store.remove_table(&table) {
                (true, format!("Successfully removed table '{}'", table))
            } else {
                (
                    false,
                    format!("Table '{}' not found. Please check the table name.", table),
                )
            }
        }
        Command::RemoveColumn { table, column } => {
            if store.remove_column(&table, &column) {
                (
                    true,
                    format!("Successfully removed column '{}' from table '{}'", column, table),
                )
            } else {
                (
                    false,
                    format!(
                        "Could not remove column '{}' from table '{}'. Please check table and column names.",
                        column, table
                    ),
                )
            }
        }
        Command::AddColumn { table, field } => {
            let description = format!("'{}' ({})", field.name, field.data_type);
            if store.add_column(&table, field) {
                (
                    true,
                    format!("Added new column {} to table '{}'", description, table),
                )
            } else {
                (
                    false,
                    format!(
                        "Could not add column to table '{}'. The table might not exist or the column name is already in use.",
                        table
                    ),
                )
            }
        }
        Command::SetPrimaryKey { table, field } => {
            if store.set_primary_key(&table, &field) {
                (
                    true,
                    format!("Set '{}' as primary key for table '{}'", field, table),
                )
            } else {
                (
                    false,
                    format!(
                        "Could not set primary key in table '{}'. Please check table and field names.",
                        table
                    ),
                )
            }
        }
        Command::ChangeType {
            table,
            field,
            new_type,
        } => {
            let text = format!(
                "Updated field '{}' in table '{}' to type {}",
                field, table, new_type
            );
            if store.update_field(&table, &field, FieldUpdate::data_type(new_type)) {
                (true, text)
            } else {
                (
                    false,
                    "Could not update field type. Please check table and field names.".to_string(),
                )
            }
        }
        Command::Describe(_) => unreachable!("descriptions are sent to the proposer"),
    };

    session.push(entries, Sender::Assistant, text);
    TurnOutcome::Modified { applied }
}

/// Merge a proposed schema: add unknown tables on the layout circle, then the
/// relationships whose tables exist and whose direction is not yet linked.
fn merge_schema(session: &mut Session, entries: &mut Vec<ChatEntry>, schema: ProposedSchema) -> TurnOutcome {
    if schema.tables.is_empty() {
        session.push(entries, Sender::Assistant, PARSE_FAILED_MESSAGE);
        return TurnOutcome::Failed {
            category: ErrorCategory::Parse,
        };
    }

    let store = &mut session.store;
    let mut seen: HashSet<&str> = HashSet::new();
    let new_tables: Vec<_> = schema
        .tables
        .iter()
        .filter(|table| !store.has_table(&table.name) && seen.insert(table.name.as_str()))
        .collect();

    let positions = positions_for_new_tables(store.table_count(), new_tables.len());
    let mut table_lines = Vec::with_capacity(new_tables.len());
    for (table, position) in new_tables.iter().zip(positions) {
        store.add_table(table.name.clone(), table.fields.clone(), position);
        let field_count = store.table(&table.name).map_or(0, |t| t.fields.len());
        table_lines.push(format!("• {}: {} fields", table.name, field_count));
    }

    let mut added_relationships = Vec::new();
    for rel in &schema.relationships {
        if !store.has_table(&rel.from.table)
            || !store.has_table(&rel.to.table)
            || store.has_relationship_between(&rel.from.table, &rel.to.table)
        {
            continue;
        }

        let relationship = Relationship::between_fields(&rel.from.field, &rel.to.field)
            .with_cardinality(
                rel.relationship_type.source_cardinality(),
                Cardinality::One,
            );
        if store.add_relationship(&rel.from.table, &rel.to.table, relationship) {
            added_relationships.push(rel);
        }
    }

    let tables_added = new_tables.len();
    let relationships_added = added_relationships.len();
    tracing::info!(
        "Merged schema: {} tables, {} relationships added",
        tables_added,
        relationships_added
    );

    if tables_added == 0 && relationships_added == 0 {
        session.push(entries, Sender::Assistant, NOTHING_NEW_MESSAGE);
        return TurnOutcome::NothingNew;
    }

    if tables_added > 0 {
        let text = format!(
            "Added {} new table(s):\n{}",
            tables_added,
            table_lines.join("\n")
        );
        session.push(entries, Sender::Assistant, text);
    }

    if relationships_added > 0 {
        let lines: Vec<String> = added_relationships
            .iter()
            .map(|r| {
                format!(
                    "• {}.{} → {}.{} ({})",
                    r.from.table,
                    r.from.field,
                    r.to.table,
                    r.to.field,
                    r.relationship_type
                )
            })
            .collect();
        let text = format!(
            "Added {} new relationship(s):\n{}",
            relationships_added,
            lines.join("\n")
        );
        session.push(entries, Sender::Assistant, text);
    }

    TurnOutcome::Merged {
        tables_added,
        relationships_added,
    }
}

fn narrate_error(session: &mut Session, entries: &mut Vec<ChatEntry>, err: &AiError) -> TurnOutcome {
    let category = err.category();
    tracing::error!("Schema assistant failed ({}): {}", category, err);

    match category {
        ErrorCategory::Configuration => session.push(
            entries,
            Sender::System,
            format!("{} Use the API key setting to add a valid key.", err),
        ),
        ErrorCategory::Collaborator => session.push(
            entries,
            Sender::System,
            format!(
                "{}\nThere was a problem reaching the AI service. Please check your API key and try again.",
                err
            ),
        ),
        ErrorCategory::Parse => session.push(entries, Sender::Assistant, PARSE_FAILED_MESSAGE),
    }

    TurnOutcome::Failed { category }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::proposal::parse_schema_response;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Replays a canned assistant reply through the real parser
    struct FakeProposer {
        reply: Mutex<Result<String, fn() -> AiError>>,
        calls: AtomicUsize,
        configured: bool,
    }

    impl FakeProposer {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Ok(reply.to_string())),
                calls: AtomicUsize::new(0),
                configured: true,
            })
        }

        fn failing(err: fn() -> AiError) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Err(err)),
                calls: AtomicUsize::new(0),
                configured: true,
            })
        }

        fn set_reply(&self, reply: &str) {
            *self.reply.lock().unwrap() = Ok(reply.to_string());
        }
    }

    #[async_trait]
    impl SchemaProposer for FakeProposer {
        async fn propose_schema(&self, _description: &str) -> Result<ProposedSchema, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.reply.lock().unwrap().clone();
            match reply {
                Ok(text) => parse_schema_response(&text),
                Err(make) => Err(make()),
            }
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    /// Blocks until released, to observe the processing state
    struct GatedProposer {
        gate: Notify,
    }

    #[async_trait]
    impl SchemaProposer for GatedProposer {
        async fn propose_schema(&self, _description: &str) -> Result<ProposedSchema, AiError> {
            self.gate.notified().await;
            parse_schema_response(r#"{"tables": [{"name": "slow", "fields": []}]}"#)
        }
    }

    const USERS_SCHEMA: &str = r#"```json
    {"tables": [{"name": "users", "fields": [
        {"name": "name", "type": "varchar(100)"},
        {"name": "email", "type": "varchar(255)"}
    ]}], "relationships": []}
    ```"#;

    const BLOG_SCHEMA: &str = r#"{
        "tables": [
            {"name": "users", "fields": [{"name": "id", "type": "integer", "isPrimary": true}]},
            {"name": "posts", "fields": [
                {"name": "title", "type": "text"},
                {"name": "user_id", "type": "integer", "isForeignKey": true, "references": {"table": "users", "field": "id"}}
            ]}
        ],
        "relationships": [
            {"from": {"table": "posts", "field": "user_id"}, "to": {"table": "users", "field": "id"}, "type": "many-to-one"},
            {"from": {"table": "posts", "field": "title"}, "to": {"table": "users", "field": "id"}, "type": "many-to-one"},
            {"from": {"table": "posts", "field": "user_id"}, "to": {"table": "ghosts", "field": "id"}, "type": "many-to-one"}
        ]
    }"#;

    fn last_text(report: &TurnReport) -> &str {
        &report.entries.last().unwrap().text
    }

    #[tokio::test]
    async fn test_new_schema_then_nothing_new() {
        let proposer = FakeProposer::replying(USERS_SCHEMA);
        let conversation = Conversation::new(proposer.clone());

        let report = conversation
            .submit("Create a users table with name and email")
            .await
            .unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Merged {
                tables_added: 1,
                relationships_added: 0
            }
        );
        assert_eq!(report.entries[0].sender, Sender::User);
        assert!(last_text(&report).starts_with("Added 1 new table(s):"));
        assert!(last_text(&report).contains("• users: 2 fields"));

        let before = conversation.snapshot();
        assert_eq!(before.nodes.len(), 1);
        assert_eq!(before.nodes[0].id, "users");

        let report = conversation
            .submit("Create a users table with name and email")
            .await
            .unwrap();
        assert_eq!(report.outcome, TurnOutcome::NothingNew);
        assert_eq!(last_text(&report), NOTHING_NEW_MESSAGE);
        assert_eq!(conversation.snapshot(), before);
        assert_eq!(proposer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_relationships_filtered_and_deduplicated() {
        let conversation = Conversation::new(FakeProposer::replying(BLOG_SCHEMA));

        let report = conversation.submit("a blog").await.unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Merged {
                tables_added: 2,
                relationships_added: 1
            }
        );

        let diagram = conversation.snapshot();
        assert_eq!(diagram.edges.len(), 1);
        let edge = &diagram.edges[0];
        assert_eq!(edge.source, "posts");
        assert_eq!(edge.target, "users");
        assert_eq!(edge.source_handle.as_deref(), Some("user_id-right"));
        assert_eq!(edge.target_handle.as_deref(), Some("id-left"));
        assert_eq!(edge.data.source_cardinality, Cardinality::Many);
        assert_eq!(edge.data.target_cardinality, Cardinality::One);

        assert!(last_text(&report).contains("• posts.user_id → users.id (many-to-one)"));
    }

    #[tokio::test]
    async fn test_relationship_to_existing_table_is_new() {
        let proposer = FakeProposer::replying(USERS_SCHEMA);
        let conversation = Conversation::new(proposer.clone());
        conversation.submit("users").await.unwrap();

        proposer.set_reply(
            r#"{"tables": [
                {"name": "users", "fields": []},
                {"name": "orders", "fields": [{"name": "user_id", "type": "integer"}]}
            ], "relationships": [
                {"from": {"table": "orders", "field": "user_id"}, "to": {"table": "users", "field": "id"}}
            ]}"#,
        );
        let report = conversation.submit("orders for users").await.unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Merged {
                tables_added: 1,
                relationships_added: 1
            }
        );

        let diagram = conversation.snapshot();
        assert_eq!(diagram.nodes.len(), 2);
        // one-to-many keeps a single source
        assert_eq!(
            diagram.edges[0].data.source_cardinality,
            Cardinality::One
        );
    }

    #[tokio::test]
    async fn test_new_tables_placed_after_existing() {
        let proposer = FakeProposer::replying(USERS_SCHEMA);
        let conversation = Conversation::new(proposer.clone());
        conversation.submit("users").await.unwrap();

        let first = conversation.snapshot().nodes[0].position;
        assert!((first.x - 600.0).abs() < 0.001);
        assert!((first.y - 300.0).abs() < 0.001);

        proposer.set_reply(r#"{"tables": [{"name": "tags", "fields": []}]}"#);
        conversation.submit("tags").await.unwrap();

        let expected = positions_for_new_tables(1, 1)[0];
        assert_eq!(conversation.snapshot().nodes[1].position, expected);
    }

    #[tokio::test]
    async fn test_merged_table_keeps_field_invariants() {
        let conversation = Conversation::new(FakeProposer::replying(
            r#"{"tables": [{"name": "users", "fields": [
                {"name": "id", "type": "integer", "isPrimary": true},
                {"name": "email", "type": "varchar(255)", "isPrimary": true},
                {"name": "email", "type": "text"}
            ]}]}"#,
        ));

        let report = conversation.submit("users").await.unwrap();
        assert!(last_text(&report).contains("• users: 2 fields"));

        let fields = conversation.with_store(|store| store.table("users").unwrap().fields.clone());
        let summary: Vec<_> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.data_type.as_str(), f.is_primary))
            .collect();
        assert_eq!(
            summary,
            vec![("id", "integer", true), ("email", "varchar(255)", false)]
        );

        conversation.submit("remove users.email").await.unwrap();
        assert!(conversation.with_store(|store| !store.table("users").unwrap().has_field("email")));

        let report = conversation.submit("add users.email text").await.unwrap();
        assert_eq!(report.outcome, TurnOutcome::Modified { applied: true });
    }

    #[tokio::test]
    async fn test_empty_tables_is_parse_failure() {
        let conversation = Conversation::new(FakeProposer::replying(r#"{"tables": []}"#));

        let report = conversation.submit("nothing").await.unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Failed {
                category: ErrorCategory::Parse
            }
        );
        assert_eq!(last_text(&report), PARSE_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_unparseable_reply() {
        let conversation = Conversation::new(FakeProposer::replying("Sorry, I can't help."));

        let report = conversation.submit("users").await.unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Failed {
                category: ErrorCategory::Parse
            }
        );
        assert_eq!(report.entries.last().unwrap().sender, Sender::Assistant);
        assert_eq!(conversation.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_missing_key_is_system_message() {
        let conversation = Conversation::new(FakeProposer::failing(|| AiError::MissingApiKey));

        let report = conversation.submit("users").await.unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Failed {
                category: ErrorCategory::Configuration
            }
        );
        let last = report.entries.last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert!(last.text.contains("API key"));
    }

    #[tokio::test]
    async fn test_network_error_hints_at_key() {
        let conversation = Conversation::new(FakeProposer::failing(|| {
            AiError::Network("connection refused".into())
        }));

        let report = conversation.submit("users").await.unwrap();
        let last = report.entries.last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert!(last.text.contains("connection refused"));
        assert!(last.text.contains("check your API key"));
    }

    #[tokio::test]
    async fn test_modification_commands() {
        let proposer = FakeProposer::replying(USERS_SCHEMA);
        let conversation = Conversation::new(proposer.clone());
        conversation.submit("users").await.unwrap();

        let report = conversation.submit("add users.age integer").await.unwrap();
        assert_eq!(report.outcome, TurnOutcome::Modified { applied: true });
        assert_eq!(
            last_text(&report),
            "Added new column 'age' (integer) to table 'users'"
        );

        let report = conversation.submit("add users.age integer").await.unwrap();
        assert_eq!(report.outcome, TurnOutcome::Modified { applied: false });

        let report = conversation.submit("primary users.email").await.unwrap();
        assert_eq!(last_text(&report), "Set 'email' as primary key for table 'users'");

        let report = conversation
            .submit("change users.name to varchar(50)")
            .await
            .unwrap();
        assert_eq!(
            last_text(&report),
            "Updated field 'name' in table 'users' to type varchar(50)"
        );

        let report = conversation.submit("remove users.age").await.unwrap();
        assert_eq!(
            last_text(&report),
            "Successfully removed column 'age' from table 'users'"
        );

        let fields = conversation.with_store(|store| store.table("users").unwrap().fields.clone());
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].data_type, "varchar(50)");
        assert!(fields[1].is_primary);

        let report = conversation.submit("remove users").await.unwrap();
        assert_eq!(last_text(&report), "Successfully removed table 'users'");
        assert!(conversation.snapshot().nodes.is_empty());

        // commands never reach the assistant
        assert_eq!(proposer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_modifications_are_narrated() {
        let conversation = Conversation::new(FakeProposer::replying(USERS_SCHEMA));

        let report = conversation.submit("remove ghosts").await.unwrap();
        assert_eq!(report.outcome, TurnOutcome::Modified { applied: false });
        assert_eq!(
            last_text(&report),
            "Table 'ghosts' not found. Please check the table name."
        );

        let report = conversation.submit("change ghosts.x to int").await.unwrap();
        assert_eq!(
            last_text(&report),
            "Could not update field type. Please check table and field names."
        );
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let conversation = Conversation::new(FakeProposer::replying(USERS_SCHEMA));
        assert_eq!(conversation.submit("   ").await, Err(TurnError::EmptyInput));
        assert!(conversation.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_busy_while_processing() {
        let proposer = Arc::new(GatedProposer {
            gate: Notify::new(),
        });
        let conversation = Arc::new(Conversation::new(proposer.clone()));

        let pending = tokio::spawn({
            let conversation = conversation.clone();
            async move { conversation.submit("slow schema").await }
        });

        while conversation.turn_state() != TurnState::Processing {
            tokio::task::yield_now().await;
        }

        assert_eq!(conversation.submit("users").await, Err(TurnError::Busy));
        // the diagram is still readable mid-turn
        assert!(conversation.snapshot().nodes.is_empty());

        proposer.gate.notify_one();
        let report = pending.await.unwrap().unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Merged {
                tables_added: 1,
                relationships_added: 0
            }
        );
        assert_eq!(conversation.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_turn_returns_to_idle() {
        let proposer = Arc::new(GatedProposer {
            gate: Notify::new(),
        });
        let conversation = Conversation::new(proposer);

        let turn = conversation.submit("never finishes");
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(10), turn).await;
        assert!(result.is_err());
        assert_eq!(conversation.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_welcome_and_clear() {
        let proposer = Arc::new(FakeProposer {
            reply: Mutex::new(Ok(USERS_SCHEMA.to_string())),
            calls: AtomicUsize::new(0),
            configured: false,
        });
        let conversation = Conversation::new(proposer);

        let transcript = conversation.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].sender, Sender::System);
        assert_eq!(transcript[0].text, WELCOME_MESSAGE);

        conversation.submit("users").await.unwrap();
        assert_eq!(conversation.transcript().len(), 3);

        conversation.clear();
        assert!(conversation.snapshot().nodes.is_empty());
        assert_eq!(conversation.transcript().len(), 1);
    }
}
