//! The lineage graph: tables, columns, edges, and traversal indices.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{CoreError, CoreResult};
use crate::model::{Column, ColumnEdge, LineageEdge, Table, TableEdge, TableKind};
use crate::statement::TableRef;
use crate::table_id::TableId;

/// Deduplication key for edges. Column names are compared case-insensitively,
/// matching table identity; the expression is deliberately excluded so the
/// same column pair is recorded once per statement set.
#[derive(Debug, PartialEq, Eq, Hash)]
enum EdgeKey {
    Table(TableId, TableId),
    Column(Option<TableId>, String, TableId, String),
}

impl EdgeKey {
    fn of(edge: &LineageEdge) -> Self {
        match edge {
            LineageEdge::Table(e) => EdgeKey::Table(e.source.clone(), e.target.clone()),
            LineageEdge::Column(e) => EdgeKey::Column(
                e.source_table.clone(),
                e.source_column.to_lowercase(),
                e.target_table.clone(),
                e.target_column.to_lowercase(),
            ),
        }
    }
}

/// A unified lineage graph over every statement of every input file.
///
/// Mutation is funnelled through [`get_or_create_table`](Self::get_or_create_table)
/// and [`get_or_create_column`](Self::get_or_create_column) (plus crate-private
/// entry points used by the resolver), so the invariants hold by construction:
/// ids are unique, every edge endpoint is materialized, self-edges and
/// duplicate edges are rejected. Once resolution finishes the graph is
/// read-only and safe to share across query callers.
#[derive(Debug, Default)]
pub struct LineageGraph {
    /// Table.id -> Table, in first-appearance order
    tables: IndexMap<TableId, Table>,
    /// Table.id -> column names (lowercase key -> first-seen casing)
    columns: IndexMap<TableId, IndexMap<String, String>>,
    /// All edges, in emission order
    edges: Vec<LineageEdge>,
    edge_keys: HashSet<EdgeKey>,
    /// target -> direct sources (table edges only)
    upstream: HashMap<TableId, Vec<TableId>>,
    /// source -> direct targets (table edges only)
    downstream: HashMap<TableId, Vec<TableId>>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the table for `reference`, creating a placeholder if the graph
    /// has never seen it. Idempotent.
    pub fn get_or_create_table(&mut self, reference: &TableRef) -> TableId {
        let id = reference.id();
        if !self.tables.contains_key(&id) {
            self.tables.insert(
                id.clone(),
                Table::placeholder(id.clone(), reference.name.clone(), reference.schema.clone()),
            );
        }
        id
    }

    /// Register a column on a table, creating the table as a placeholder if
    /// absent. Idempotent per (table, name) with case-insensitive names.
    pub fn get_or_create_column(&mut self, table_id: &TableId, name: &str) {
        if !self.tables.contains_key(table_id) {
            let table = placeholder_from_id(table_id);
            self.tables.insert(table_id.clone(), table);
        }
        self.columns
            .entry(table_id.clone())
            .or_default()
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
    }

    /// Mark a table as defined by `origin_file` with the given kind. The
    /// first definition wins; later redefinitions keep their edges but do
    /// not reassign ownership.
    pub(crate) fn define_table(
        &mut self,
        reference: &TableRef,
        kind: TableKind,
        origin_file: &str,
    ) -> TableId {
        let id = self.get_or_create_table(reference);
        let table = &mut self.tables[&id];
        if table.origin_file.is_none() {
            table.kind = kind;
            table.origin_file = Some(origin_file.to_string());
        } else {
            log::warn!(
                "table '{}' redefined in {} (first defined in {})",
                id,
                origin_file,
                table.origin_file.as_deref().unwrap_or("?")
            );
        }
        id
    }

    /// Add an edge, rejecting self-edges and duplicates. Endpoints that the
    /// graph has not seen yet are materialized as placeholders so lineage to
    /// external sources stays representable.
    pub(crate) fn add_edge(&mut self, edge: LineageEdge) -> bool {
        if edge.is_self_edge() {
            return false;
        }
        let key = EdgeKey::of(&edge);
        if self.edge_keys.contains(&key) {
            return false;
        }

        match &edge {
            LineageEdge::Table(e) => {
                self.ensure_table(&e.source);
                self.ensure_table(&e.target);
                self.upstream
                    .entry(e.target.clone())
                    .or_default()
                    .push(e.source.clone());
                self.downstream
                    .entry(e.source.clone())
                    .or_default()
                    .push(e.target.clone());
            }
            LineageEdge::Column(e) => {
                if let Some(source_table) = &e.source_table {
                    self.ensure_table(source_table);
                }
                self.ensure_table(&e.target_table);
            }
        }

        self.edge_keys.insert(key);
        self.edges.push(edge);
        true
    }

    fn ensure_table(&mut self, id: &TableId) {
        if !self.tables.contains_key(id) {
            self.tables.insert(id.clone(), placeholder_from_id(id));
        }
    }

    /// Look up a table by id (case-insensitive).
    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.get(&TableId::new(id))
    }

    /// Whether a table with this id exists.
    pub fn contains_table(&self, id: &str) -> bool {
        self.tables.contains_key(&TableId::new(id))
    }

    /// All tables, in first-appearance order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Columns of a table, in first-appearance order and original casing.
    /// Empty when the table has no known columns.
    pub fn columns(&self, id: &TableId) -> Vec<Column> {
        self.columns
            .get(id)
            .map(|cols| {
                cols.values()
                    .map(|name| Column {
                        table_id: id.clone(),
                        name: name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All edges in emission order.
    pub fn edges(&self) -> &[LineageEdge] {
        &self.edges
    }

    /// Table-level edges only.
    pub fn table_edges(&self) -> impl Iterator<Item = &TableEdge> {
        self.edges.iter().filter_map(|edge| match edge {
            LineageEdge::Table(e) => Some(e),
            LineageEdge::Column(_) => None,
        })
    }

    /// Column-level edges only.
    pub fn column_edges(&self) -> impl Iterator<Item = &ColumnEdge> {
        self.edges.iter().filter_map(|edge| match edge {
            LineageEdge::Column(e) => Some(e),
            LineageEdge::Table(_) => None,
        })
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.values().map(IndexMap::len).sum()
    }

    pub fn table_edge_count(&self) -> usize {
        self.table_edges().count()
    }

    pub fn column_edge_count(&self) -> usize {
        self.column_edges().count()
    }

    /// All tables reachable by following table edges backward (transitive).
    pub fn get_upstream(&self, id: &str) -> CoreResult<Vec<TableId>> {
        self.traverse(id, &self.upstream)
    }

    /// All tables reachable by following table edges forward (transitive).
    pub fn get_downstream(&self, id: &str) -> CoreResult<Vec<TableId>> {
        self.traverse(id, &self.downstream)
    }

    /// BFS over one adjacency index; discovery order, which is deterministic
    /// because neighbor lists are kept in edge-emission order.
    fn traverse(
        &self,
        id: &str,
        adjacency: &HashMap<TableId, Vec<TableId>>,
    ) -> CoreResult<Vec<TableId>> {
        let start = TableId::new(id);
        if !self.tables.contains_key(&start) {
            return Err(CoreError::TableNotFound {
                id: start.into_inner(),
            });
        }

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(start.clone());
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = adjacency.get(&current) {
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        result.push(neighbor.clone());
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }

        Ok(result)
    }
}

/// Build a placeholder table from a bare id when no written-form reference
/// is available (casing was already lost in the id).
fn placeholder_from_id(id: &TableId) -> Table {
    Table::placeholder(
        id.clone(),
        id.bare_name().to_string(),
        id.schema().map(str::to_string),
    )
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
