//! Column-level resolution: FROM-scope bookkeeping and expression walking.
//!
//! Qualified column references resolve through the alias map; unqualified
//! ones resolve by the known column sets of CTE and derived-table catalogs.
//! A column that could live in several sources (or none) stays
//! source-table-less rather than guessed.

use std::collections::{HashMap, HashSet};

use sqlparser::ast::{
    Expr, FunctionArg, FunctionArgExpr, FunctionArguments, Query, WindowType,
};

use st_core::statement::{ColumnSource, TableRef};

use crate::extractor::{extract_query, OutputColumn, ScopeStack};

pub(crate) type ColumnSourceList = Vec<ColumnSource>;

/// The relations visible to a SELECT's expressions.
#[derive(Debug, Default)]
pub(crate) struct FromScope {
    pub(crate) entries: Vec<FromEntry>,
    sources: Vec<TableRef>,
    seen: HashSet<String>,
}

impl FromScope {
    pub(crate) fn add_source(&mut self, reference: TableRef) {
        if self.seen.insert(reference.id().into_inner()) {
            self.sources.push(reference);
        }
    }

    pub(crate) fn into_sources(self) -> Vec<TableRef> {
        self.sources
    }
}

/// One FROM/JOIN relation: a base table, or a CTE/derived table with a
/// known column catalog.
#[derive(Debug)]
pub(crate) struct FromEntry {
    /// Alias or bare name, lowercase
    pub(crate) key: String,
    /// Full qualified id (lowercase) for `schema.table.column` references
    pub(crate) qualified: Option<String>,
    /// The base table, for real relations
    pub(crate) table: Option<TableRef>,
    /// Known output columns, for CTEs and derived tables
    pub(crate) catalog: Option<Catalog>,
}

/// Known columns of an inlined relation, resolved to base tables.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catalog {
    /// Output column names, lowercase
    pub(crate) columns: Vec<String>,
    sources: HashMap<String, ColumnSourceList>,
    expressions: HashMap<String, Option<String>>,
    /// Single base table to attribute unknown columns to (e.g. behind a
    /// `SELECT *`), when the relation reads exactly one
    fallback: Option<TableRef>,
}

impl Catalog {
    pub(crate) fn from_outputs(outputs: &[OutputColumn], fallback: Option<TableRef>) -> Self {
        let mut catalog = Catalog {
            fallback,
            ..Catalog::default()
        };
        for output in outputs {
            if let Some(name) = &output.name {
                catalog.insert(name, output);
            }
        }
        catalog
    }

    pub(crate) fn from_renamed_outputs(
        names: &[String],
        outputs: &[OutputColumn],
        fallback: Option<TableRef>,
    ) -> Self {
        let mut catalog = Catalog {
            fallback,
            ..Catalog::default()
        };
        for (index, name) in names.iter().enumerate() {
            if let Some(output) = outputs.get(index) {
                catalog.insert(name, output);
            } else {
                catalog.columns.push(name.to_lowercase());
            }
        }
        catalog
    }

    fn insert(&mut self, name: &str, output: &OutputColumn) {
        let key = name.to_lowercase();
        self.columns.push(key.clone());
        self.sources.insert(key.clone(), output.sources.clone());
        self.expressions.insert(key, output.expression.clone());
    }

    pub(crate) fn contains(&self, column_lower: &str) -> bool {
        self.columns.iter().any(|name| name == column_lower)
    }
}

/// Result of resolving one column reference.
#[derive(Debug)]
pub(crate) struct ResolvedColumn {
    pub(crate) sources: ColumnSourceList,
    /// Expression the column was derived with inside a CTE/derived table,
    /// carried outward when the outer projection is a pass-through
    pub(crate) inner_expression: Option<String>,
}

/// Resolve a (possibly qualified) column reference against the FROM scope.
pub(crate) fn resolve_column(
    qualifier: Option<&str>,
    column: &str,
    scope: &FromScope,
) -> ResolvedColumn {
    match qualifier {
        Some(qualifier) => {
            let lower = qualifier.to_lowercase();
            let entry = scope.entries.iter().find(|entry| {
                entry.key == lower || entry.qualified.as_deref() == Some(lower.as_str())
            });
            match entry {
                Some(entry) => resolve_in_entry(entry, column),
                // Unknown qualifier (correlated outer alias, or a relation
                // the walker does not model): taken as written
                None => ResolvedColumn {
                    sources: vec![ColumnSource {
                        table: Some(table_ref_from_qualifier(qualifier)),
                        column: column.to_string(),
                    }],
                    inner_expression: None,
                },
            }
        }
        None => {
            if scope.entries.len() == 1 {
                return resolve_in_entry(&scope.entries[0], column);
            }
            if scope.entries.is_empty() {
                // SELECT without FROM: nothing to read
                return ResolvedColumn {
                    sources: Vec::new(),
                    inner_expression: None,
                };
            }

            let key = column.to_lowercase();
            let candidates: Vec<&FromEntry> = scope
                .entries
                .iter()
                .filter(|entry| {
                    entry
                        .catalog
                        .as_ref()
                        .map_or(false, |catalog| catalog.contains(&key))
                })
                .collect();
            if candidates.len() == 1 {
                resolve_in_entry(candidates[0], column)
            } else {
                // More than one possible source, or none that is known to
                // carry the column: keep the name, leave the table open
                ResolvedColumn {
                    sources: vec![ColumnSource {
                        table: None,
                        column: column.to_string(),
                    }],
                    inner_expression: None,
                }
            }
        }
    }
}

fn resolve_in_entry(entry: &FromEntry, column: &str) -> ResolvedColumn {
    if let Some(catalog) = &entry.catalog {
        let key = column.to_lowercase();
        if let Some(sources) = catalog.sources.get(&key) {
            return ResolvedColumn {
                sources: sources.clone(),
                inner_expression: catalog.expressions.get(&key).cloned().flatten(),
            };
        }
        let table = catalog.fallback.clone();
        return ResolvedColumn {
            sources: vec![ColumnSource {
                table,
                column: column.to_string(),
            }],
            inner_expression: None,
        };
    }

    ResolvedColumn {
        sources: vec![ColumnSource {
            table: entry.table.clone(),
            column: column.to_string(),
        }],
        inner_expression: None,
    }
}

fn table_ref_from_qualifier(qualifier: &str) -> TableRef {
    match qualifier.rsplit_once('.') {
        Some((schema, name)) => TableRef::qualified(schema, name),
        None => TableRef::bare(qualifier),
    }
}

/// If the expression is a bare column reference, return its qualifier and
/// column name.
pub(crate) fn bare_column_ref(expr: &Expr) -> Option<(Option<String>, String)> {
    match expr {
        Expr::Identifier(ident) => Some((None, ident.value.clone())),
        Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
            let column = idents.last()?.value.clone();
            let qualifier = idents[..idents.len() - 1]
                .iter()
                .map(|ident| ident.value.clone())
                .collect::<Vec<_>>()
                .join(".");
            Some((Some(qualifier), column))
        }
        _ => None,
    }
}

/// Shared state threaded through expression walking.
pub(crate) struct ExprContext<'a> {
    pub(crate) scope: &'a FromScope,
    pub(crate) scopes: &'a mut ScopeStack,
    /// Tables read by subqueries nested in expressions; surfaced as
    /// statement sources by the caller
    pub(crate) extra_sources: &'a mut Vec<TableRef>,
    pub(crate) depth: usize,
}

/// Collect every base column an expression transitively reads.
pub(crate) fn collect_expr_sources(expr: &Expr, ctx: &mut ExprContext<'_>) -> ColumnSourceList {
    let mut sources = Vec::new();
    walk_expr(expr, ctx, &mut sources);
    sources
}

fn walk_expr(expr: &Expr, ctx: &mut ExprContext<'_>, acc: &mut ColumnSourceList) {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
            if let Some((qualifier, column)) = bare_column_ref(expr) {
                acc.extend(resolve_column(qualifier.as_deref(), &column, ctx.scope).sources);
            }
        }
        Expr::Function(func) => {
            walk_function_arguments(&func.args, ctx, acc);
            if let Some(WindowType::WindowSpec(spec)) = &func.over {
                for partition in &spec.partition_by {
                    walk_expr(partition, ctx, acc);
                }
                for order in &spec.order_by {
                    walk_expr(&order.expr, ctx, acc);
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            walk_expr(left, ctx, acc);
            walk_expr(right, ctx, acc);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => walk_expr(expr, ctx, acc),
        Expr::Cast { expr, .. } => walk_expr(expr, ctx, acc),
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, ctx, acc);
            }
            for case_when in conditions {
                walk_expr(&case_when.condition, ctx, acc);
                walk_expr(&case_when.result, ctx, acc);
            }
            if let Some(else_result) = else_result {
                walk_expr(else_result, ctx, acc);
            }
        }
        Expr::IsNull(inner) | Expr::IsNotNull(inner) => walk_expr(inner, ctx, acc),
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(expr, ctx, acc);
            walk_expr(low, ctx, acc);
            walk_expr(high, ctx, acc);
        }
        Expr::InList { expr, list, .. } => {
            walk_expr(expr, ctx, acc);
            for item in list {
                walk_expr(item, ctx, acc);
            }
        }
        Expr::InSubquery { expr, subquery, .. } => {
            walk_expr(expr, ctx, acc);
            walk_subquery(subquery, ctx, acc);
        }
        Expr::Exists { subquery, .. } => walk_subquery(subquery, ctx, acc),
        Expr::Subquery(query) => walk_subquery(query, ctx, acc),
        Expr::Like { expr, pattern, .. }
        | Expr::ILike { expr, pattern, .. }
        | Expr::SimilarTo { expr, pattern, .. } => {
            walk_expr(expr, ctx, acc);
            walk_expr(pattern, ctx, acc);
        }
        Expr::Trim {
            expr, trim_what, ..
        } => {
            walk_expr(expr, ctx, acc);
            if let Some(trim_what) = trim_what {
                walk_expr(trim_what, ctx, acc);
            }
        }
        Expr::Substring {
            expr,
            substring_from,
            substring_for,
            ..
        } => {
            walk_expr(expr, ctx, acc);
            if let Some(from) = substring_from {
                walk_expr(from, ctx, acc);
            }
            if let Some(length) = substring_for {
                walk_expr(length, ctx, acc);
            }
        }
        Expr::Extract { expr, .. } | Expr::Ceil { expr, .. } | Expr::Floor { expr, .. } => {
            walk_expr(expr, ctx, acc)
        }
        Expr::Position { expr, r#in } => {
            walk_expr(expr, ctx, acc);
            walk_expr(r#in, ctx, acc);
        }
        Expr::Tuple(exprs) => {
            for item in exprs {
                walk_expr(item, ctx, acc);
            }
        }
        // Literals and everything else contribute no column reads
        _ => {}
    }
}

fn walk_subquery(query: &Query, ctx: &mut ExprContext<'_>, acc: &mut ColumnSourceList) {
    let inner = extract_query(query, ctx.scopes, ctx.depth + 1);
    ctx.extra_sources.extend(inner.sources);
    for output in inner.outputs {
        acc.extend(output.sources);
    }
}

fn walk_function_arguments(
    args: &FunctionArguments,
    ctx: &mut ExprContext<'_>,
    acc: &mut ColumnSourceList,
) {
    match args {
        FunctionArguments::List(list) => {
            for arg in &list.args {
                let arg_expr = match arg {
                    FunctionArg::Unnamed(expr)
                    | FunctionArg::Named { arg: expr, .. }
                    | FunctionArg::ExprNamed { arg: expr, .. } => expr,
                };
                match arg_expr {
                    FunctionArgExpr::Expr(expr) => walk_expr(expr, ctx, acc),
                    // COUNT(*) and friends read no particular column
                    FunctionArgExpr::QualifiedWildcard(_) | FunctionArgExpr::Wildcard => {}
                }
            }
        }
        FunctionArguments::Subquery(query) => walk_subquery(query, ctx, acc),
        FunctionArguments::None => {}
    }
}

/// Dedup column sources by (table, column), case-insensitive, keeping
/// first-appearance order.
pub(crate) fn dedup_column_sources(sources: ColumnSourceList) -> ColumnSourceList {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(sources.len());
    for source in sources {
        let key = (
            source.table.as_ref().map(|table| table.id().into_inner()),
            source.column.to_lowercase(),
        );
        if seen.insert(key) {
            result.push(source);
        }
    }
    result
}
