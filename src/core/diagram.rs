//! Render records exchanged with the front-end graph renderer
//!
//! The renderer consumes [`Diagram`] snapshots and reports user interaction
//! back as change-sets ([`NodeChange`], [`EdgeChange`]) and new [`Connection`]s,
//! which the store folds into its collections.

use super::schema::{Cardinality, Field, Position};
use serde::{Deserialize, Serialize};

pub const TABLE_NODE_TYPE: &str = "tableNode";
pub const RELATIONSHIP_EDGE_TYPE: &str = "relationship";

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TableData {
    pub name: String,
    pub fields: Vec<Field>,
}

/// Node record `{id, type, position, data: {name, fields}}`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DiagramNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: TableData,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    pub source_cardinality: Cardinality,
    pub target_cardinality: Cardinality,
}

/// Edge record `{id, source, target, sourceHandle, targetHandle, type, data}`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub data: EdgeData,
}

/// Full snapshot handed to the renderer
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

/// A connection drawn by the user between two table handles
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

/// Which end of an edge an operation targets
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EdgeEnd {
    Source,
    Target,
}

/// Node change emitted by the renderer
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    /// Drag in progress or finished. `position` is absent on drag end.
    Position {
        id: String,
        #[serde(default)]
        position: Option<Position>,
    },
    Remove {
        id: String,
    },
    /// Selection and measurement changes carry no schema meaning
    #[serde(other)]
    Ignored,
}

/// Edge change emitted by the renderer
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Remove {
        id: String,
    },
    #[serde(other)]
    Ignored,
}
