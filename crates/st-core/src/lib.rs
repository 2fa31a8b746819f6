//! st-core - Core library for sqltrace
//!
//! This crate provides the lineage entity model (tables, columns, edges),
//! the shared lineage graph with its invariant-enforcing constructors, the
//! multi-file resolver that folds per-statement extractions into one graph,
//! table-edge DAG ordering with cycle detection, and the wire-format
//! serialization consumed by the CLI and HTTP surfaces.

pub mod dag;
pub mod error;
pub mod graph;
pub mod model;
pub mod resolver;
pub mod statement;
pub mod table_id;
pub mod wire;

pub use dag::TableDag;
pub use error::{CoreError, CoreResult};
pub use graph::LineageGraph;
pub use model::{Column, ColumnEdge, LineageEdge, Table, TableEdge, TableKind};
pub use resolver::{Resolution, ResolveWarning, Resolver};
pub use statement::{ColumnFlow, ColumnSource, FileExtraction, StatementLineage, TableRef, TargetDef};
pub use table_id::TableId;
pub use wire::{WireGraph, WireLink, WireNode, WireStats};
