//! Entity model: tables, columns, and lineage edges.
//!
//! These are pure data definitions. All graph mutation goes through
//! [`LineageGraph`](crate::graph::LineageGraph) so the invariants (unique
//! ids, no self-edges, edges only between materialized tables) hold by
//! construction.

use serde::{Deserialize, Serialize};

use crate::table_id::TableId;

/// What kind of relation a graph node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// A base or created table
    Table,
    /// A view created with CREATE VIEW
    View,
    /// A common table expression. CTEs are inlined during extraction and
    /// normally never surface as graph nodes; the variant exists because the
    /// wire contract reserves the value.
    Cte,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Table => write!(f, "table"),
            TableKind::View => write!(f, "view"),
            TableKind::Cte => write!(f, "cte"),
        }
    }
}

/// A named relation in the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Canonical schema-qualified id, e.g. `raw.customers`
    pub id: TableId,
    /// Unqualified name in first-seen casing
    pub name: String,
    /// Schema prefix in first-seen casing, if qualified
    pub schema: Option<String>,
    /// Relation kind
    pub kind: TableKind,
    /// Input file that defined this table; `None` for tables that are only
    /// referenced (external sources)
    pub origin_file: Option<String>,
}

impl Table {
    /// A placeholder for a table that is referenced but never defined in the
    /// input set.
    pub fn placeholder(id: TableId, name: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            schema,
            kind: TableKind::Table,
            origin_file: None,
        }
    }

    /// Whether this table was defined by one of the input files.
    pub fn is_defined(&self) -> bool {
        self.origin_file.is_some()
    }
}

/// A named attribute of exactly one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Owning table id
    pub table_id: TableId,
    /// Column name in first-seen casing
    pub name: String,
}

/// A table-level dependency: the target's definition reads from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEdge {
    pub source: TableId,
    pub target: TableId,
}

/// A column-level dependency, optionally annotated with the transformation
/// expression. `source_table` is `None` when the extractor could not
/// unambiguously attribute an unqualified column to a single FROM source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEdge {
    pub source_table: Option<TableId>,
    pub source_column: String,
    pub target_table: TableId,
    pub target_column: String,
    /// Raw transformation text, e.g. `SUM(amount)`; absent when the target
    /// is a direct pass-through of the source
    pub expression: Option<String>,
}

/// A directed lineage dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineageEdge {
    Table(TableEdge),
    Column(ColumnEdge),
}

impl LineageEdge {
    /// Self-edges are never materialized: a statement that reads and writes
    /// the same relation name must be filtered at emission time.
    pub fn is_self_edge(&self) -> bool {
        match self {
            LineageEdge::Table(e) => e.source == e.target,
            LineageEdge::Column(e) => {
                e.source_table.as_ref() == Some(&e.target_table)
                    && e.source_column.eq_ignore_ascii_case(&e.target_column)
            }
        }
    }
}
