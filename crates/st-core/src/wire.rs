//! Wire-format serialization of a resolved lineage graph.
//!
//! This is the JSON contract the visualization layer consumes: a flat node
//! list (tables always, columns only when column lineage was requested), a
//! link list where column links always spell out their table+column pairs,
//! summary stats, the input file list, and the execution order when the
//! graph is acyclic.

use serde::Serialize;

use crate::error::CoreResult;
use crate::model::TableKind;
use crate::resolver::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireLevel {
    Table,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireNodeType {
    Table,
    View,
    Cte,
    Column,
}

impl From<TableKind> for WireNodeType {
    fn from(kind: TableKind) -> Self {
        match kind {
            TableKind::Table => WireNodeType::Table,
            TableKind::View => WireNodeType::View,
            TableKind::Cte => WireNodeType::Cte,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireLinkType {
    TableToTable,
    ColumnToColumn,
}

#[derive(Debug, Serialize)]
pub struct WireNode {
    pub id: String,
    pub name: String,
    pub schema: Option<String>,
    pub level: WireLevel,
    #[serde(rename = "type")]
    pub node_type: WireNodeType,
    /// Owning table id; only present on column nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub source_file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WireLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: WireLinkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    pub expression: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WireStats {
    pub total_tables: usize,
    pub total_columns: usize,
    pub table_edges: usize,
    pub column_edges: usize,
}

#[derive(Debug, Serialize)]
pub struct WireGraph {
    pub nodes: Vec<WireNode>,
    pub links: Vec<WireLink>,
    pub stats: WireStats,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<Vec<String>>,
}

impl WireGraph {
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Resolution {
    /// Serialize to the wire document. Column nodes appear only when the
    /// graph carries column data; column links always carry the table and
    /// column pair fields for every endpoint that was resolved.
    pub fn to_wire(&self) -> WireGraph {
        let graph = &self.graph;
        let mut nodes = Vec::with_capacity(graph.table_count() + graph.column_count());

        for table in graph.tables() {
            nodes.push(WireNode {
                id: table.id.to_string(),
                name: table.name.clone(),
                schema: table.schema.clone(),
                level: WireLevel::Table,
                node_type: table.kind.into(),
                table: None,
                source_file: table.origin_file.clone(),
            });
        }

        for table in graph.tables() {
            for column in graph.columns(&table.id) {
                nodes.push(WireNode {
                    id: format!("{}.{}", table.id, column.name.to_lowercase()),
                    name: column.name,
                    schema: table.schema.clone(),
                    level: WireLevel::Column,
                    node_type: WireNodeType::Column,
                    table: Some(table.id.to_string()),
                    source_file: table.origin_file.clone(),
                });
            }
        }

        let links = graph
            .edges()
            .iter()
            .map(|edge| match edge {
                crate::model::LineageEdge::Table(e) => WireLink {
                    source: e.source.to_string(),
                    target: e.target.to_string(),
                    link_type: WireLinkType::TableToTable,
                    source_table: None,
                    source_column: None,
                    target_table: None,
                    target_column: None,
                    expression: None,
                },
                crate::model::LineageEdge::Column(e) => {
                    let source = match &e.source_table {
                        Some(table) => format!("{}.{}", table, e.source_column.to_lowercase()),
                        None => e.source_column.to_lowercase(),
                    };
                    WireLink {
                        source,
                        target: format!("{}.{}", e.target_table, e.target_column.to_lowercase()),
                        link_type: WireLinkType::ColumnToColumn,
                        source_table: e.source_table.as_ref().map(ToString::to_string),
                        source_column: Some(e.source_column.clone()),
                        target_table: Some(e.target_table.to_string()),
                        target_column: Some(e.target_column.clone()),
                        expression: e.expression.clone(),
                    }
                }
            })
            .collect();

        WireGraph {
            nodes,
            links,
            stats: WireStats {
                total_tables: graph.table_count(),
                total_columns: graph.column_count(),
                table_edges: graph.table_edge_count(),
                column_edges: graph.column_edge_count(),
            },
            files: self.files.clone(),
            execution_order: self
                .execution_order
                .as_ref()
                .map(|order| order.iter().map(ToString::to_string).collect()),
        }
    }
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
