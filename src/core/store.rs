//! In-memory schema graph store
//!
//! Holds every table, field and relationship of the diagram and exposes the
//! mutation operations used by the conversation and by the renderer. All
//! operations are synchronous and total: failures are reported as `false` or
//! `None`, never as panics.

use super::auto_layout::circular_positions;
use super::diagram::{
    Connection, Diagram, DiagramEdge, DiagramNode, EdgeChange, EdgeData, EdgeEnd, NodeChange,
    RELATIONSHIP_EDGE_TYPE, TABLE_NODE_TYPE, TableData,
};
use super::schema::{
    Cardinality, Field, FieldRef, Position, Relationship, SchemaGraph, TableNode,
    handle_anchored_at, new_edge_id,
};
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashSet;

/// Partial field update. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldUpdate {
    pub data_type: Option<String>,
    pub is_primary: Option<bool>,
    pub is_foreign_key: Option<bool>,
    /// `Some(None)` clears the reference
    pub references: Option<Option<FieldRef>>,
}

impl FieldUpdate {
    pub fn data_type(data_type: impl Into<String>) -> Self {
        Self {
            data_type: Some(data_type.into()),
            ..Default::default()
        }
    }
}

/// Relationship together with the names of the tables it joins
#[derive(Clone, Copy, Debug)]
pub struct RelationshipView<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub relationship: &'a Relationship,
}

/// Schema graph with table-name lookup and stable insertion order.
///
/// `StableGraph` reuses vacant indices, so insertion order is tracked
/// separately for tables and edges.
#[derive(Clone, Debug, Default)]
pub struct SchemaStore {
    graph: SchemaGraph,
    table_order: Vec<NodeIndex>,
    edge_order: Vec<EdgeIndex>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Tables in insertion order
    pub fn tables(&self) -> impl Iterator<Item = &TableNode> + '_ {
        self.table_order
            .iter()
            .filter_map(|idx| self.graph.node_weight(*idx))
    }

    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.find_table(name)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.find_table(name).is_some()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|t| t.name.clone()).collect()
    }

    pub fn table_count(&self) -> usize {
        self.table_order.len()
    }

    /// Relationships in insertion order
    pub fn relationships(&self) -> impl Iterator<Item = RelationshipView<'_>> + '_ {
        self.edge_order.iter().filter_map(|idx| self.view(*idx))
    }

    pub fn relationship(&self, id: &str) -> Option<RelationshipView<'_>> {
        self.find_relationship(id).and_then(|idx| self.view(idx))
    }

    pub fn relationship_count(&self) -> usize {
        self.edge_order.len()
    }

    /// Whether an edge `source -> target` already exists (same direction only)
    pub fn has_relationship_between(&self, source: &str, target: &str) -> bool {
        match (self.find_table(source), self.find_table(target)) {
            (Some(from), Some(to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.table_order.is_empty()
    }

    // ========================================================================
    // Table operations
    // ========================================================================

    /// Insert a table.
    ///
    /// A repeated field name keeps its first occurrence and only the first
    /// primary key stays primary. Returns the table id, or `None` if a table
    /// with this name exists.
    pub fn add_table(
        &mut self,
        name: impl Into<String>,
        fields: Vec<Field>,
        position: Position,
    ) -> Option<String> {
        let name = name.into();
        if self.has_table(&name) {
            tracing::debug!("add_table: '{}' already exists", name);
            return None;
        }

        let idx = self.graph.add_node(TableNode {
            name: name.clone(),
            fields: unique_fields(fields),
            position,
        });
        self.table_order.push(idx);
        tracing::debug!("Added table '{}'", name);
        Some(name)
    }

    /// Remove a table and every relationship touching it
    pub fn remove_table(&mut self, name: &str) -> bool {
        let Some(idx) = self.find_table(name) else {
            return false;
        };

        self.graph.remove_node(idx);
        self.prune();
        tracing::debug!("Removed table '{}'", name);
        true
    }

    pub fn move_table(&mut self, name: &str, position: Position) -> bool {
        match self.table_mut(name) {
            Some(table) => {
                table.position = position;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Field operations
    // ========================================================================

    /// Append a field. Fails if the table is missing or the name is taken.
    pub fn add_column(&mut self, table_name: &str, field: Field) -> bool {
        let Some(table) = self.table_mut(table_name) else {
            return false;
        };
        if table.has_field(&field.name) {
            return false;
        }

        tracing::debug!("Added column '{}.{}'", table_name, field.name);
        table.fields.push(field);
        true
    }

    /// Remove a field and the relationships anchored at it
    pub fn remove_column(&mut self, table_name: &str, field_name: &str) -> bool {
        let Some(idx) = self.find_table(table_name) else {
            return false;
        };
        let Some(table) = self.graph.node_weight_mut(idx) else {
            return false;
        };
        let Some((position, _)) = table.find_field(field_name) else {
            return false;
        };
        table.fields.remove(position);

        let anchored = self.relationships_anchored_at(idx, field_name);

        for edge in &anchored {
            self.graph.remove_edge(*edge);
        }
        self.prune();

        tracing::debug!(
            "Removed column '{}.{}' ({} relationships dropped)",
            table_name,
            field_name,
            anchored.len()
        );
        true
    }

    /// Shallow-merge `update` into a field
    pub fn update_field(&mut self, table_name: &str, field_name: &str, update: FieldUpdate) -> bool {
        let Some(table) = self.table_mut(table_name) else {
            return false;
        };
        if !table.has_field(field_name) {
            return false;
        }

        if update.is_primary == Some(true) {
            for field in table.fields.iter_mut() {
                field.is_primary = false;
            }
        }

        let Some(field) = table.find_field_mut(field_name) else {
            return false;
        };
        if let Some(data_type) = update.data_type {
            field.data_type = data_type;
        }
        if let Some(is_primary) = update.is_primary {
            field.is_primary = is_primary;
        }
        if let Some(is_foreign_key) = update.is_foreign_key {
            field.is_foreign_key = is_foreign_key;
        }
        if let Some(references) = update.references {
            field.references = references;
        }
        true
    }

    /// Make `field_name` the single primary key of the table
    pub fn set_primary_key(&mut self, table_name: &str, field_name: &str) -> bool {
        let Some(table) = self.table_mut(table_name) else {
            return false;
        };
        if !table.has_field(field_name) {
            return false;
        }

        for field in table.fields.iter_mut() {
            field.is_primary = field.name == field_name;
        }
        true
    }

    // ========================================================================
    // Relationship operations
    // ========================================================================

    /// Append an edge between two existing tables. Duplicates are allowed.
    pub fn add_relationship(&mut self, source: &str, target: &str, relationship: Relationship) -> bool {
        let (Some(from), Some(to)) = (self.find_table(source), self.find_table(target)) else {
            return false;
        };

        tracing::debug!(
            "Added relationship {} ({} -> {})",
            relationship.id,
            source,
            target
        );
        let idx = self.graph.add_edge(from, to, relationship);
        self.edge_order.push(idx);
        true
    }

    /// Add a user-drawn connection with one-to-one cardinality
    pub fn connect(&mut self, connection: Connection) -> Option<String> {
        let relationship = Relationship::new(new_edge_id())
            .with_handles(connection.source_handle, connection.target_handle)
            .with_cardinality(Cardinality::One, Cardinality::One);
        let id = relationship.id.clone();

        self.add_relationship(&connection.source, &connection.target, relationship)
            .then_some(id)
    }

    pub fn remove_relationship(&mut self, id: &str) -> bool {
        let Some(idx) = self.find_relationship(id) else {
            return false;
        };

        self.graph.remove_edge(idx);
        self.prune();
        tracing::debug!("Removed relationship {}", id);
        true
    }

    pub fn set_cardinality(&mut self, id: &str, end: EdgeEnd, cardinality: Cardinality) -> bool {
        let Some(relationship) = self.relationship_mut(id) else {
            return false;
        };

        match end {
            EdgeEnd::Source => relationship.source_cardinality = cardinality,
            EdgeEnd::Target => relationship.target_cardinality = cardinality,
        }
        true
    }

    /// Flip one/many on one end of an edge, returning the new value
    pub fn toggle_cardinality(&mut self, id: &str, end: EdgeEnd) -> Option<Cardinality> {
        let relationship = self.relationship_mut(id)?;
        let slot = match end {
            EdgeEnd::Source => &mut relationship.source_cardinality,
            EdgeEnd::Target => &mut relationship.target_cardinality,
        };
        *slot = slot.toggled();
        Some(*slot)
    }

    // ========================================================================
    // Whole-diagram operations
    // ========================================================================

    /// Re-place every table on a circle, in insertion order
    pub fn arrange(&mut self) {
        let positions = circular_positions(self.table_order.len(), 0.0);
        for (idx, position) in self.table_order.iter().zip(positions) {
            if let Some(table) = self.graph.node_weight_mut(*idx) {
                table.position = position;
            }
        }
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.table_order.clear();
        self.edge_order.clear();
        tracing::debug!("Cleared diagram");
    }

    /// Fold renderer node changes. Returns how many changed the graph.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> usize {
        changes
            .iter()
            .filter(|change| match change {
                NodeChange::Position {
                    id,
                    position: Some(position),
                } => self.move_table(id, *position),
                NodeChange::Remove { id } => self.remove_table(id),
                NodeChange::Position { position: None, .. } | NodeChange::Ignored => false,
            })
            .count()
    }

    /// Fold renderer edge changes. Returns how many changed the graph.
    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) -> usize {
        changes
            .iter()
            .filter(|change| match change {
                EdgeChange::Remove { id } => self.remove_relationship(id),
                EdgeChange::Ignored => false,
            })
            .count()
    }

    /// Render records for the current graph
    pub fn to_diagram(&self) -> Diagram {
        let nodes = self
            .tables()
            .map(|table| DiagramNode {
                id: table.name.clone(),
                node_type: TABLE_NODE_TYPE.to_string(),
                position: table.position,
                data: TableData {
                    name: table.name.clone(),
                    fields: table.fields.clone(),
                },
            })
            .collect();

        let edges = self
            .relationships()
            .map(|view| DiagramEdge {
                id: view.relationship.id.clone(),
                source: view.source.to_string(),
                target: view.target.to_string(),
                source_handle: view.relationship.source_handle.clone(),
                target_handle: view.relationship.target_handle.clone(),
                edge_type: RELATIONSHIP_EDGE_TYPE.to_string(),
                data: EdgeData {
                    source_cardinality: view.relationship.source_cardinality,
                    target_cardinality: view.relationship.target_cardinality,
                },
            })
            .collect();

        Diagram { nodes, edges }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn find_table(&self, name: &str) -> Option<NodeIndex> {
        self.table_order
            .iter()
            .copied()
            .find(|idx| self.graph.node_weight(*idx).is_some_and(|t| t.name == name))
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut TableNode> {
        let idx = self.find_table(name)?;
        self.graph.node_weight_mut(idx)
    }

    fn find_relationship(&self, id: &str) -> Option<EdgeIndex> {
        self.edge_order
            .iter()
            .copied()
            .find(|idx| self.graph.edge_weight(*idx).is_some_and(|r| r.id == id))
    }

    fn relationship_mut(&mut self, id: &str) -> Option<&mut Relationship> {
        let idx = self.find_relationship(id)?;
        self.graph.edge_weight_mut(idx)
    }

    /// Edges whose endpoint on table `idx` is anchored at `field`, each once
    fn relationships_anchored_at(&self, idx: NodeIndex, field: &str) -> Vec<EdgeIndex> {
        let mut anchored: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .filter(|e| {
                e.weight()
                    .source_handle
                    .as_deref()
                    .is_some_and(|h| handle_anchored_at(h, field))
            })
            .chain(
                self.graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .filter(|e| {
                        e.weight()
                            .target_handle
                            .as_deref()
                            .is_some_and(|h| handle_anchored_at(h, field))
                    }),
            )
            .map(|e| e.id())
            .collect();
        // a self-loop anchored at the field on both ends is listed twice
        anchored.sort();
        anchored.dedup();
        anchored
    }

    fn view(&self, idx: EdgeIndex) -> Option<RelationshipView<'_>> {
        let (from, to) = self.graph.edge_endpoints(idx)?;
        Some(RelationshipView {
            source: &self.graph.node_weight(from)?.name,
            target: &self.graph.node_weight(to)?.name,
            relationship: self.graph.edge_weight(idx)?,
        })
    }

    /// Drop order entries whose node or edge is gone. Must run after every
    /// removal, before anything is added, so reused indices are never stale.
    fn prune(&mut self) {
        let graph = &self.graph;
        self.table_order
            .retain(|idx| graph.node_weight(*idx).is_some());
        self.edge_order
            .retain(|idx| graph.edge_weight(*idx).is_some());
    }
}

fn unique_fields(fields: Vec<Field>) -> Vec<Field> {
    let mut seen = HashSet::new();
    let mut has_primary = false;

    fields
        .into_iter()
        .filter(|field| seen.insert(field.name.clone()))
        .map(|mut field| {
            if field.is_primary {
                field.is_primary = !has_primary;
                has_primary = true;
            }
            field
        })
        .collect()
}
