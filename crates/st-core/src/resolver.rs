//! Multi-file resolver: folds per-statement extractions into one graph.
//!
//! Resolution is a single-owner, strictly-ordered fold: one `Resolver` owns
//! the graph while edges are applied in input-file order, then the finished
//! [`Resolution`] is immutable. Extraction can run in parallel upstream of
//! this; the fold itself is sequential because every step reads and may
//! write the identity-resolution index.

use std::collections::HashMap;

use crate::dag::TableDag;
use crate::error::CoreError;
use crate::graph::LineageGraph;
use crate::model::{ColumnEdge, LineageEdge, TableEdge};
use crate::statement::{FileExtraction, TableRef};
use crate::table_id::TableId;

/// A non-fatal finding recorded during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// A bare table reference matched more than one schema-qualified table;
    /// the reference was kept as its own node rather than guessed.
    AmbiguousReference {
        reference: String,
        candidates: Vec<String>,
        file: String,
    },
    /// An unqualified column could not be attributed to a single source
    /// table; the column edge carries no source table.
    UnresolvedColumn {
        column: String,
        target: String,
        file: String,
    },
    /// A statement produced no write target (e.g. a bare SELECT).
    EmptyWrite { file: String, statement: usize },
}

impl std::fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveWarning::AmbiguousReference {
                reference,
                candidates,
                file,
            } => write!(
                f,
                "ambiguous reference '{}' in {} (candidates: {})",
                reference,
                file,
                candidates.join(", ")
            ),
            ResolveWarning::UnresolvedColumn {
                column,
                target,
                file,
            } => write!(
                f,
                "column '{}' feeding {} in {} has no determinable source table",
                column, target, file
            ),
            ResolveWarning::EmptyWrite { file, statement } => {
                write!(f, "statement {} in {} produced no writes", statement, file)
            }
        }
    }
}

/// The immutable result of resolving a set of extracted files.
#[derive(Debug)]
pub struct Resolution {
    pub graph: LineageGraph,
    /// Topological execution order; `None` when the table edges contain a
    /// cycle (the graph itself is still fully populated and queryable)
    pub execution_order: Option<Vec<TableId>>,
    /// Member tables of the detected cycle, if any
    pub cycle: Option<Vec<String>>,
    pub warnings: Vec<ResolveWarning>,
    /// Input file names, in input order
    pub files: Vec<String>,
}

impl Resolution {
    /// Whether resolution completed without a cycle.
    pub fn is_ordered(&self) -> bool {
        self.execution_order.is_some()
    }
}

/// Folds extraction results into a shared [`LineageGraph`].
#[derive(Debug, Default)]
pub struct Resolver {
    graph: LineageGraph,
    /// bare lowercase name -> schema-qualified ids of defined tables
    qualified_by_bare: HashMap<String, Vec<TableId>>,
    warnings: Vec<ResolveWarning>,
}

impl Resolver {
    /// Resolve extractions from all files into one graph. `include_columns`
    /// controls whether column-level flows are folded; table-level lineage
    /// is always produced.
    pub fn resolve(extractions: &[FileExtraction], include_columns: bool) -> Resolution {
        let mut resolver = Resolver::default();

        // First pass: register every write target so a bare reference in an
        // early file can unify with a qualified definition anywhere in the
        // input set.
        for extraction in extractions {
            for statement in &extraction.statements {
                if let Some(target) = &statement.target {
                    let id = resolver.graph.define_table(
                        &target.table,
                        target.kind,
                        &extraction.file,
                    );
                    resolver.index_qualified(&id);
                    if include_columns {
                        for column in &target.columns {
                            resolver.graph.get_or_create_column(&id, column);
                        }
                    }
                }
            }
        }

        // Second pass: fold edges in input order.
        for extraction in extractions {
            for (index, statement) in extraction.statements.iter().enumerate() {
                resolver.fold_statement(&extraction.file, index, statement, include_columns);
            }
        }

        let dag = TableDag::from_graph(&resolver.graph);
        let (execution_order, cycle) = match dag.execution_order() {
            Ok(order) => (Some(order), None),
            Err(CoreError::CircularDependency { tables }) => (None, Some(tables)),
            Err(_) => (None, None),
        };

        Resolution {
            graph: resolver.graph,
            execution_order,
            cycle,
            warnings: resolver.warnings,
            files: extractions
                .iter()
                .map(|extraction| extraction.file.clone())
                .collect(),
        }
    }

    fn fold_statement(
        &mut self,
        file: &str,
        index: usize,
        statement: &crate::statement::StatementLineage,
        include_columns: bool,
    ) {
        let Some(target) = &statement.target else {
            self.warnings.push(ResolveWarning::EmptyWrite {
                file: file.to_string(),
                statement: index + 1,
            });
            return;
        };
        let target_id = target.table.id();

        for source in &statement.sources {
            let source_id = self.resolve_reference(source, file);
            self.graph.add_edge(LineageEdge::Table(TableEdge {
                source: source_id,
                target: target_id.clone(),
            }));
        }

        if !include_columns {
            return;
        }

        for flow in &statement.columns {
            self.graph
                .get_or_create_column(&target_id, &flow.target_column);

            for source in &flow.sources {
                let source_table = match &source.table {
                    Some(reference) => {
                        let id = self.resolve_reference(reference, file);
                        self.graph.get_or_create_column(&id, &source.column);
                        Some(id)
                    }
                    None => {
                        self.warnings.push(ResolveWarning::UnresolvedColumn {
                            column: source.column.clone(),
                            target: format!("{}.{}", target_id, flow.target_column),
                            file: file.to_string(),
                        });
                        None
                    }
                };

                self.graph.add_edge(LineageEdge::Column(ColumnEdge {
                    source_table,
                    source_column: source.column.clone(),
                    target_table: target_id.clone(),
                    target_column: flow.target_column.clone(),
                    expression: flow.expression.clone(),
                }));
            }
        }
    }

    /// Resolve a reference to a graph id. Exact ids win; a bare name with
    /// exactly one schema-qualified *defined* match unifies with it;
    /// anything else materializes the reference as written. Tables that are
    /// only referenced (external sources) never participate in unification.
    fn resolve_reference(&mut self, reference: &TableRef, file: &str) -> TableId {
        let exact = reference.id();
        if self.graph.contains_table(exact.as_str()) {
            return exact;
        }

        if reference.schema.is_some() {
            return self.graph.get_or_create_table(reference);
        }

        let bare = reference.name.to_lowercase();
        let candidates = self
            .qualified_by_bare
            .get(&bare)
            .cloned()
            .unwrap_or_default();
        match candidates.len() {
            1 => candidates.into_iter().next().unwrap_or(exact),
            0 => self.graph.get_or_create_table(reference),
            _ => {
                self.warnings.push(ResolveWarning::AmbiguousReference {
                    reference: reference.to_string(),
                    candidates: candidates.iter().map(ToString::to_string).collect(),
                    file: file.to_string(),
                });
                self.graph.get_or_create_table(reference)
            }
        }
    }

    fn index_qualified(&mut self, id: &TableId) {
        if id.schema().is_none() {
            return;
        }
        let bare = id.bare_name().to_string();
        let entries = self.qualified_by_bare.entry(bare).or_default();
        if !entries.contains(id) {
            entries.push(id.clone());
        }
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
