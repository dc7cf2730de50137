use derive_more::Display;
use petgraph::Directed;
use petgraph::stable_graph::StableGraph;
use serde::{Deserialize, Deserializer, Serialize};

/// Handle suffix for the source end of an edge (`<field>-right`)
pub const SOURCE_HANDLE_SUFFIX: &str = "-right";
/// Handle suffix for the target end of an edge (`<field>-left`)
pub const TARGET_HANDLE_SUFFIX: &str = "-left";

/// Treat an explicit JSON `null` the same as a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Reference from a foreign key field to `table.field`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub table: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
        }
    }
}

/// Table column
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// Free-text type label, e.g. `varchar(100)`
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_primary: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub references: Option<FieldRef>,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_primary: false,
            is_foreign_key: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn foreign_key(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.is_foreign_key = true;
        self.references = Some(FieldRef::new(table, field));
        self
    }
}

/// Canvas coordinates. Only used for layout.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Graph node: a database table. Its name is its identity.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TableNode {
    pub name: String,
    pub fields: Vec<Field>,
    pub position: Position,
}

impl TableNode {
    /// Find a field by name, returning its index and a reference
    pub fn find_field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.find_field(name).is_some()
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_primary)
    }
}

/// Whether one or many records sit on one side of a relationship
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    #[display("one")]
    One,
    #[display("many")]
    Many,
}

impl Cardinality {
    pub fn toggled(self) -> Self {
        match self {
            Cardinality::One => Cardinality::Many,
            Cardinality::Many => Cardinality::One,
        }
    }
}

/// Relationship classification proposed by the schema assistant
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Display)]
#[serde(from = "String", rename_all = "kebab-case")]
pub enum RelationshipType {
    #[display("one-to-one")]
    OneToOne,
    #[default]
    #[display("one-to-many")]
    OneToMany,
    #[display("many-to-one")]
    ManyToOne,
    #[display("many-to-many")]
    ManyToMany,
}

impl RelationshipType {
    /// Cardinality drawn at the source end. Every `many-*` type starts with many.
    pub fn source_cardinality(self) -> Cardinality {
        match self {
            RelationshipType::ManyToOne | RelationshipType::ManyToMany => Cardinality::Many,
            RelationshipType::OneToOne | RelationshipType::OneToMany => Cardinality::One,
        }
    }
}

impl From<String> for RelationshipType {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "one-to-one" | "onetoone" | "1:1" => RelationshipType::OneToOne,
            "many-to-one" | "manytoone" | "n:1" => RelationshipType::ManyToOne,
            "many-to-many" | "manytomany" | "n:m" => RelationshipType::ManyToMany,
            _ => RelationshipType::OneToMany,
        }
    }
}

/// Graph edge: a relationship between two tables.
///
/// Source and target tables are the edge endpoints in [`SchemaGraph`]; the
/// handles encode the anchoring field names (`<field>-right` / `<field>-left`).
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub source_cardinality: Cardinality,
    pub target_cardinality: Cardinality,
}

impl Relationship {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_handle: None,
            target_handle: None,
            source_cardinality: Cardinality::One,
            target_cardinality: Cardinality::One,
        }
    }

    /// Edge anchored at `source_field -> target_field` with generated id
    pub fn between_fields(source_field: &str, target_field: &str) -> Self {
        Self::new(new_edge_id())
            .with_handles(
                Some(source_handle_for(source_field)),
                Some(target_handle_for(target_field)),
            )
    }

    pub fn with_handles(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_handle = source;
        self.target_handle = target;
        self
    }

    pub fn with_cardinality(mut self, source: Cardinality, target: Cardinality) -> Self {
        self.source_cardinality = source;
        self.target_cardinality = target;
        self
    }

    pub fn target_field(&self) -> Option<&str> {
        self.target_handle.as_deref().map(field_of_handle)
    }
}

pub fn new_edge_id() -> String {
    format!("edge-{}", uuid::Uuid::new_v4())
}

pub fn source_handle_for(field: &str) -> String {
    format!("{field}{SOURCE_HANDLE_SUFFIX}")
}

pub fn target_handle_for(field: &str) -> String {
    format!("{field}{TARGET_HANDLE_SUFFIX}")
}

/// Field name encoded in a connection handle
pub fn field_of_handle(handle: &str) -> &str {
    [SOURCE_HANDLE_SUFFIX, TARGET_HANDLE_SUFFIX, "-source", "-target"]
        .iter()
        .find_map(|suffix| handle.strip_suffix(suffix))
        .unwrap_or(handle)
}

/// Whether `handle` is anchored at `field` (`field` itself or `field-<side>`)
pub fn handle_anchored_at(handle: &str, field: &str) -> bool {
    handle
        .strip_prefix(field)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('-'))
}

/// Graph type: nodes are tables, edges are relationships
pub type SchemaGraph = StableGraph<TableNode, Relationship, Directed>;
