//! Per-statement extraction results.
//!
//! The statement extractor (st-sql) produces one [`StatementLineage`] per
//! parsed statement with no cross-statement knowledge; the resolver folds
//! them into a shared [`LineageGraph`](crate::graph::LineageGraph). These
//! exchange types carry references as written in the SQL; unification to
//! canonical graph ids happens only in the resolver.

use serde::{Deserialize, Serialize};

use crate::model::TableKind;
use crate::table_id::TableId;

/// A table reference as written in a statement, before identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Schema/catalog prefix, if the reference was qualified
    pub schema: Option<String>,
    /// Unqualified table name
    pub name: String,
}

impl TableRef {
    /// An unqualified reference.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// A schema-qualified reference.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Canonical id for this reference as written.
    pub fn id(&self) -> TableId {
        TableId::from_parts(self.schema.as_deref(), &self.name)
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The write target of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDef {
    pub table: TableRef,
    pub kind: TableKind,
    /// Column names declared in the DDL (`CREATE TABLE t (a INT, ...)`),
    /// empty when the statement declares none
    pub columns: Vec<String>,
}

/// One base-column input to an output column. `table` is `None` when the
/// extractor could not attribute the column to a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSource {
    pub table: Option<TableRef>,
    pub column: String,
}

/// Lineage for a single output column of the statement's target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFlow {
    /// Output column name on the target
    pub target_column: String,
    /// Base columns the output expression transitively reads
    pub sources: Vec<ColumnSource>,
    /// Raw expression text minus any trailing alias; `None` for direct
    /// pass-throughs
    pub expression: Option<String>,
}

/// Everything extracted from one parsed statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLineage {
    /// Write target; `None` for bare SELECTs and unrecognized statements
    pub target: Option<TargetDef>,
    /// Base tables the statement reads, deduplicated, in first-appearance
    /// order, with CTE references already inlined
    pub sources: Vec<TableRef>,
    /// Column-level flows into the target's projection
    pub columns: Vec<ColumnFlow>,
}

impl StatementLineage {
    /// Whether this statement writes anywhere. Statements with no target
    /// produce no edges and are reported, not silently dropped.
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

/// The extraction results of one input file, in statement order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileExtraction {
    pub file: String,
    pub statements: Vec<StatementLineage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_id() {
        assert_eq!(TableRef::qualified("Raw", "Customers").id(), "raw.customers");
        assert_eq!(TableRef::bare("orders").id(), "orders");
    }

    #[test]
    fn test_table_ref_display() {
        assert_eq!(TableRef::qualified("raw", "customers").to_string(), "raw.customers");
        assert_eq!(TableRef::bare("orders").to_string(), "orders");
    }
}
