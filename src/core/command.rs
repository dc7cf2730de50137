//! Short-form modification commands
//!
//! User input is first matched against a fixed list of command shapes. Anything
//! that matches none of them is a free-text schema description for the AI
//! assistant.

use super::schema::Field;
use derive_more::Display;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Identifier: table or field name
const IDENT: &str = r"(\w+)";
/// Type label with an optional size suffix, e.g. `varchar(100)` or `decimal(10,2)`
const TYPE_LABEL: &str = r"(\w+(?:\(\s*\d+\s*(?:,\s*\d+\s*)?\))?)";

/// Modification command shapes, in matching priority.
///
/// The dotted `remove table.column` form must come before the bare
/// `remove table` form, which would otherwise swallow it.
static COMMAND_PATTERNS: LazyLock<Vec<(CommandKind, Regex)>> = LazyLock::new(|| {
    [
        (
            CommandKind::AddColumn,
            format!(r"(?i)\badd\s+{IDENT}\.{IDENT}\s+{TYPE_LABEL}"),
        ),
        (
            CommandKind::RemoveColumn,
            format!(r"(?i)\b(?:remove|delete)\s+{IDENT}\.{IDENT}"),
        ),
        (
            CommandKind::RemoveTable,
            format!(r"(?i)\b(?:remove|delete)\s+{IDENT}"),
        ),
        (
            CommandKind::SetPrimaryKey,
            format!(r"(?i)\bprimary\s+{IDENT}\.{IDENT}"),
        ),
        (
            CommandKind::ChangeType,
            format!(r"(?i)\bchange\s+{IDENT}\.{IDENT}\s+to\s+{TYPE_LABEL}"),
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        let regex = Regex::new(&pattern).expect("command pattern is a valid regex");
        (kind, regex)
    })
    .collect()
});

/// Discriminant of [`Command`], used for logging
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum CommandKind {
    #[display("add_column")]
    AddColumn,
    #[display("remove_column")]
    RemoveColumn,
    #[display("remove_table")]
    RemoveTable,
    #[display("set_primary_key")]
    SetPrimaryKey,
    #[display("change_type")]
    ChangeType,
    #[display("describe")]
    Describe,
}

/// Classified user input
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    AddColumn { table: String, field: Field },
    RemoveColumn { table: String, column: String },
    RemoveTable { table: String },
    SetPrimaryKey { table: String, field: String },
    ChangeType {
        table: String,
        field: String,
        new_type: String,
    },
    /// Free-text schema description for the AI assistant
    Describe(String),
}

impl Command {
    /// Classify `input`. The first matching command shape wins; input matching
    /// none of them is a schema description.
    pub fn parse(input: &str) -> Self {
        COMMAND_PATTERNS
            .iter()
            .find_map(|(kind, regex)| regex.captures(input).map(|caps| Self::build(*kind, &caps)))
            .unwrap_or_else(|| Command::Describe(input.trim().to_string()))
    }

    fn build(kind: CommandKind, caps: &Captures<'_>) -> Self {
        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        match kind {
            CommandKind::AddColumn => Command::AddColumn {
                table: group(1),
                field: Field::new(group(2), compact_type(&group(3))),
            },
            CommandKind::RemoveColumn => Command::RemoveColumn {
                table: group(1),
                column: group(2),
            },
            CommandKind::RemoveTable => Command::RemoveTable { table: group(1) },
            CommandKind::SetPrimaryKey => Command::SetPrimaryKey {
                table: group(1),
                field: group(2),
            },
            CommandKind::ChangeType => Command::ChangeType {
                table: group(1),
                field: group(2),
                new_type: compact_type(&group(3)),
            },
            CommandKind::Describe => unreachable!("describe has no command pattern"),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddColumn { .. } => CommandKind::AddColumn,
            Command::RemoveColumn { .. } => CommandKind::RemoveColumn,
            Command::RemoveTable { .. } => CommandKind::RemoveTable,
            Command::SetPrimaryKey { .. } => CommandKind::SetPrimaryKey,
            Command::ChangeType { .. } => CommandKind::ChangeType,
            Command::Describe(_) => CommandKind::Describe,
        }
    }

    /// Whether this command is applied directly, without the AI assistant
    pub fn is_modification(&self) -> bool {
        !matches!(self, Command::Describe(_))
    }
}

/// `decimal( 10, 2 )` -> `decimal(10,2)`
fn compact_type(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace()).collect()
}
