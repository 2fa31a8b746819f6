//! Statement lineage extraction from SQL AST.
//!
//! One parsed statement in, one [`StatementLineage`] out: the write target
//! (if any), the base tables read, and per-output-column flows. CTEs are
//! transparent: a `WITH` binding pushes a scope frame, references to it
//! inline the body's base tables and column catalogs, and the binding never
//! surfaces as a source of its own. Extraction is pure and carries no
//! cross-statement state.

use std::collections::HashSet;

use sqlparser::ast::{
    MergeAction, MergeInsertKind, Query, Select, SetExpr, Statement, TableAlias, TableFactor,
    TableObject, TableWithJoins,
};

use st_core::statement::{ColumnFlow, StatementLineage, TableRef, TargetDef};
use st_core::TableKind;

use crate::columns::{
    bare_column_ref, collect_expr_sources, dedup_column_sources, resolve_column, Catalog,
    ColumnSourceList, ExprContext, FromEntry, FromScope,
};
use crate::{object_name_parts, table_ref_from_object_name};

/// Query nesting deeper than this stops contributing lineage. Guards against
/// stack overflow on adversarially nested SQL.
const MAX_QUERY_DEPTH: usize = 64;

/// Extract lineage from every statement in order.
pub fn extract_statements(statements: &[Statement]) -> Vec<StatementLineage> {
    statements.iter().map(extract_statement).collect()
}

/// Extract lineage from a single parsed statement.
pub fn extract_statement(statement: &Statement) -> StatementLineage {
    let mut scopes = ScopeStack::default();

    match statement {
        Statement::CreateTable(create) => {
            let target = TargetDef {
                table: table_ref_from_object_name(&create.name),
                kind: TableKind::Table,
                columns: create
                    .columns
                    .iter()
                    .map(|column| column.name.value.clone())
                    .collect(),
            };
            match create.query.as_deref() {
                Some(query) => {
                    let lineage = extract_query(query, &mut scopes, 0);
                    assemble(target, lineage, None)
                }
                // Plain DDL: defines the table, reads nothing
                None => StatementLineage {
                    target: Some(target),
                    sources: Vec::new(),
                    columns: Vec::new(),
                },
            }
        }

        Statement::CreateView(create_view) => {
            let renames: Option<Vec<String>> = if create_view.columns.is_empty() {
                None
            } else {
                Some(
                    create_view
                        .columns
                        .iter()
                        .map(|column| column.name.value.clone())
                        .collect(),
                )
            };
            let target = TargetDef {
                table: table_ref_from_object_name(&create_view.name),
                kind: TableKind::View,
                columns: renames.clone().unwrap_or_default(),
            };
            let lineage = extract_query(&create_view.query, &mut scopes, 0);
            assemble(target, lineage, renames)
        }

        Statement::Insert(insert) => {
            let table = match &insert.table {
                TableObject::TableName(name) => table_ref_from_object_name(name),
                // INSERT into a table function has no graph target
                _ => return StatementLineage::default(),
            };
            let target = TargetDef {
                table,
                kind: TableKind::Table,
                columns: Vec::new(),
            };
            let renames: Option<Vec<String>> = if insert.columns.is_empty() {
                None
            } else {
                Some(
                    insert
                        .columns
                        .iter()
                        .map(|column| column.value.clone())
                        .collect(),
                )
            };
            match insert.source.as_deref() {
                Some(query) => {
                    let lineage = extract_query(query, &mut scopes, 0);
                    assemble(target, lineage, renames)
                }
                None => StatementLineage {
                    target: Some(target),
                    sources: Vec::new(),
                    columns: Vec::new(),
                },
            }
        }

        Statement::Merge(merge) => {
            extract_merge(&merge.table, &merge.source, &merge.on, &merge.clauses, &mut scopes)
        }

        Statement::Query(query) => {
            // Bare SELECT: no target, no edges. Sources are still collected
            // so callers can report what the statement read.
            let lineage = extract_query(query, &mut scopes, 0);
            StatementLineage {
                target: None,
                sources: lineage.sources,
                columns: Vec::new(),
            }
        }

        _ => StatementLineage::default(),
    }
}

/// Everything extracted from one query block.
#[derive(Debug, Default)]
pub(crate) struct QueryLineage {
    /// Base tables read, deduplicated, first-appearance order
    pub(crate) sources: Vec<TableRef>,
    /// Projection outputs, in projection order
    pub(crate) outputs: Vec<OutputColumn>,
}

/// One projection output and the base columns feeding it.
#[derive(Debug, Clone)]
pub(crate) struct OutputColumn {
    /// Output name; `None` for wildcards and unnamed expressions
    pub(crate) name: Option<String>,
    pub(crate) sources: ColumnSourceList,
    /// Expression text; `None` for direct pass-throughs
    pub(crate) expression: Option<String>,
}

/// In-scope CTE bindings. Each `WITH` clause pushes a frame; lookups walk
/// innermost-first so a CTE shadows both outer CTEs and real tables of the
/// same name.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<Vec<(String, CteInfo)>>,
}

impl ScopeStack {
    fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn insert(&mut self, name: String, info: CteInfo) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((name, info));
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&CteInfo> {
        for frame in self.frames.iter().rev() {
            if let Some((_, info)) = frame
                .iter()
                .rev()
                .find(|(bound, _)| bound.eq_ignore_ascii_case(name))
            {
                return Some(info);
            }
        }
        None
    }
}

/// An inlined CTE: the base tables its body reads and the column catalog of
/// its projection, already resolved to base tables.
#[derive(Debug, Clone)]
pub(crate) struct CteInfo {
    pub(crate) sources: Vec<TableRef>,
    pub(crate) catalog: Catalog,
}

/// Extract one query, honoring its WITH clause.
pub(crate) fn extract_query(query: &Query, scopes: &mut ScopeStack, depth: usize) -> QueryLineage {
    if depth > MAX_QUERY_DEPTH {
        log::warn!("query nesting exceeds {} levels, truncating lineage", MAX_QUERY_DEPTH);
        return QueryLineage::default();
    }

    let has_with = query.with.is_some();
    if let Some(with) = &query.with {
        scopes.push();
        for cte in &with.cte_tables {
            let name = cte.alias.name.value.clone();
            // Later CTEs in the same WITH see the earlier bindings
            let body = extract_query(&cte.query, scopes, depth + 1);
            let info = cte_info(body, &cte.alias, &name);
            scopes.insert(name, info);
        }
    }

    let lineage = extract_set_expr(&query.body, scopes, depth);

    if has_with {
        scopes.pop();
    }
    lineage
}

/// Build a CTE's inlined view from its extracted body.
fn cte_info(body: QueryLineage, alias: &TableAlias, cte_name: &str) -> CteInfo {
    // A recursive CTE's reference to its own name is not a base table
    let sources: Vec<TableRef> = body
        .sources
        .iter()
        .filter(|reference| {
            !(reference.schema.is_none() && reference.name.eq_ignore_ascii_case(cte_name))
        })
        .cloned()
        .collect();

    let fallback = single_source(&sources);
    let catalog = if alias.columns.is_empty() {
        Catalog::from_outputs(&body.outputs, fallback)
    } else {
        // WITH c(x, y) AS (...) renames the outputs positionally
        let names: Vec<String> = alias
            .columns
            .iter()
            .map(|column| column.name.value.clone())
            .collect();
        Catalog::from_renamed_outputs(&names, &body.outputs, fallback)
    };

    CteInfo { sources, catalog }
}

fn single_source(sources: &[TableRef]) -> Option<TableRef> {
    match sources {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn extract_set_expr(set_expr: &SetExpr, scopes: &mut ScopeStack, depth: usize) -> QueryLineage {
    match set_expr {
        SetExpr::Select(select) => extract_select(select, scopes, depth),
        SetExpr::Query(query) => extract_query(query, scopes, depth + 1),
        SetExpr::SetOperation { left, right, .. } => {
            // Output names come from the leftmost branch by SQL convention;
            // every branch contributes its own source set, and column
            // sources merge positionally.
            let mut lineage = extract_set_expr(left, scopes, depth);
            let right_lineage = extract_set_expr(right, scopes, depth);

            let mut seen: HashSet<String> = lineage
                .sources
                .iter()
                .map(|reference| reference.id().into_inner())
                .collect();
            for reference in right_lineage.sources {
                if seen.insert(reference.id().into_inner()) {
                    lineage.sources.push(reference);
                }
            }

            for (output, right_output) in
                lineage.outputs.iter_mut().zip(right_lineage.outputs)
            {
                output.sources.extend(right_output.sources);
            }
            lineage
        }
        _ => QueryLineage::default(),
    }
}

fn extract_select(select: &Select, scopes: &mut ScopeStack, depth: usize) -> QueryLineage {
    let mut scope = FromScope::default();
    for table in &select.from {
        collect_table_with_joins(table, scopes, &mut scope, depth);
    }

    let mut extra_sources: Vec<TableRef> = Vec::new();
    let mut outputs = Vec::new();

    {
        let mut ctx = ExprContext {
            scope: &scope,
            scopes,
            extra_sources: &mut extra_sources,
            depth,
        };

        for item in &select.projection {
            outputs.push(project_item(item, &mut ctx));
        }

        // WHERE/HAVING never produce column edges, but subqueries inside
        // them read tables that must surface as statement sources.
        if let Some(selection) = &select.selection {
            let _ = collect_expr_sources(selection, &mut ctx);
        }
        if let Some(having) = &select.having {
            let _ = collect_expr_sources(having, &mut ctx);
        }
    }

    let mut lineage = QueryLineage {
        sources: scope.into_sources(),
        outputs,
    };
    let mut seen: HashSet<String> = lineage
        .sources
        .iter()
        .map(|reference| reference.id().into_inner())
        .collect();
    for reference in extra_sources {
        if seen.insert(reference.id().into_inner()) {
            lineage.sources.push(reference);
        }
    }
    lineage
}

fn project_item(
    item: &sqlparser::ast::SelectItem,
    ctx: &mut ExprContext<'_>,
) -> OutputColumn {
    use sqlparser::ast::SelectItem;

    match item {
        SelectItem::UnnamedExpr(expr) => {
            if let Some((qualifier, column)) = bare_column_ref(expr) {
                // Bare unaliased reference: pass-through unless the column
                // came out of a CTE that itself derived it
                let resolved = resolve_column(qualifier.as_deref(), &column, ctx.scope);
                OutputColumn {
                    name: Some(column),
                    sources: resolved.sources,
                    expression: resolved.inner_expression,
                }
            } else {
                OutputColumn {
                    name: None,
                    sources: collect_expr_sources(expr, ctx),
                    expression: Some(expr.to_string()),
                }
            }
        }
        SelectItem::ExprWithAlias { expr, alias } => {
            let alias_name = alias.value.clone();
            if let Some((qualifier, column)) = bare_column_ref(expr) {
                let resolved = resolve_column(qualifier.as_deref(), &column, ctx.scope);
                let expression = if alias_name.eq_ignore_ascii_case(&column) {
                    resolved.inner_expression
                } else {
                    Some(expr.to_string())
                };
                OutputColumn {
                    name: Some(alias_name),
                    sources: resolved.sources,
                    expression,
                }
            } else {
                OutputColumn {
                    name: Some(alias_name),
                    sources: collect_expr_sources(expr, ctx),
                    expression: Some(expr.to_string()),
                }
            }
        }
        // Wildcards contribute table-level lineage only; without the source
        // schemas their column membership is unknowable here
        SelectItem::QualifiedWildcard(..) | SelectItem::Wildcard(_) => OutputColumn {
            name: None,
            sources: Vec::new(),
            expression: None,
        },
    }
}

fn collect_table_with_joins(
    table_with_joins: &TableWithJoins,
    scopes: &mut ScopeStack,
    scope: &mut FromScope,
    depth: usize,
) {
    collect_table_factor(&table_with_joins.relation, scopes, scope, depth);
    for join in &table_with_joins.joins {
        collect_table_factor(&join.relation, scopes, scope, depth);
    }
}

fn collect_table_factor(
    factor: &TableFactor,
    scopes: &mut ScopeStack,
    scope: &mut FromScope,
    depth: usize,
) {
    match factor {
        TableFactor::Table {
            name, alias, args, ..
        } => {
            // Table functions (UNNEST, read_csv, ...) are not relations
            if args.is_some() {
                return;
            }
            let parts = object_name_parts(name);
            if parts.len() == 1 {
                if let Some(info) = scopes.lookup(&parts[0]) {
                    let info = info.clone();
                    let key = alias
                        .as_ref()
                        .map(|a| a.name.value.clone())
                        .unwrap_or_else(|| parts[0].clone());
                    for reference in &info.sources {
                        scope.add_source(reference.clone());
                    }
                    scope.entries.push(FromEntry {
                        key: key.to_lowercase(),
                        qualified: None,
                        table: None,
                        catalog: Some(info.catalog),
                    });
                    return;
                }
            }

            let reference = table_ref_from_object_name(name);
            let key = alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .unwrap_or_else(|| reference.name.clone());
            scope.add_source(reference.clone());
            scope.entries.push(FromEntry {
                key: key.to_lowercase(),
                qualified: reference
                    .schema
                    .as_ref()
                    .map(|_| reference.id().into_inner()),
                table: Some(reference),
                catalog: None,
            });
        }
        TableFactor::Derived {
            subquery, alias, ..
        } => {
            let inner = extract_query(subquery, scopes, depth + 1);
            let fallback = single_source(&inner.sources);
            for reference in &inner.sources {
                scope.add_source(reference.clone());
            }
            if let Some(alias) = alias {
                let catalog = if alias.columns.is_empty() {
                    Catalog::from_outputs(&inner.outputs, fallback)
                } else {
                    let names: Vec<String> = alias
                        .columns
                        .iter()
                        .map(|column| column.name.value.clone())
                        .collect();
                    Catalog::from_renamed_outputs(&names, &inner.outputs, fallback)
                };
                scope.entries.push(FromEntry {
                    key: alias.name.value.to_lowercase(),
                    qualified: None,
                    table: None,
                    catalog: Some(catalog),
                });
            }
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_table_with_joins(table_with_joins, scopes, scope, depth);
        }
        _ => {}
    }
}

/// Turn a query's outputs into column flows on the target, applying an
/// optional positional rename list (INSERT column lists, view column lists).
fn assemble(
    target: TargetDef,
    lineage: QueryLineage,
    renames: Option<Vec<String>>,
) -> StatementLineage {
    let mut columns = Vec::new();
    for (index, output) in lineage.outputs.into_iter().enumerate() {
        let name = renames
            .as_ref()
            .and_then(|names| names.get(index).cloned())
            .or(output.name);
        let Some(target_column) = name else { continue };
        columns.push(ColumnFlow {
            target_column,
            sources: dedup_column_sources(output.sources),
            expression: output.expression,
        });
    }

    StatementLineage {
        target: Some(target),
        sources: lineage.sources,
        columns,
    }
}

fn extract_merge(
    table: &TableFactor,
    source: &TableFactor,
    on: &sqlparser::ast::Expr,
    clauses: &[sqlparser::ast::MergeClause],
    scopes: &mut ScopeStack,
) -> StatementLineage {
    let Some(target_ref) = table_ref_from_factor(table) else {
        return StatementLineage::default();
    };

    // Both relations join the scope so assignment expressions can resolve
    // either side's aliases; the target's own columns fall out later as
    // self-edges.
    let mut scope = FromScope::default();
    collect_table_factor(table, scopes, &mut scope, 0);
    collect_table_factor(source, scopes, &mut scope, 0);

    let mut extra_sources: Vec<TableRef> = Vec::new();
    let mut columns = Vec::new();

    {
        let mut ctx = ExprContext {
            scope: &scope,
            scopes,
            extra_sources: &mut extra_sources,
            depth: 0,
        };

        let _ = collect_expr_sources(on, &mut ctx);

        for clause in clauses {
            if let Some(predicate) = &clause.predicate {
                let _ = collect_expr_sources(predicate, &mut ctx);
            }
            match &clause.action {
                MergeAction::Update(update) => {
                    for assignment in &update.assignments {
                        let Some(target_column) = assignment_target_name(&assignment.target)
                        else {
                            continue;
                        };
                        columns.push(merge_flow(target_column, &assignment.value, &mut ctx));
                    }
                }
                MergeAction::Insert(insert) => {
                    if let MergeInsertKind::Values(values) = &insert.kind {
                        for row in &values.rows {
                            for (index, expr) in row.iter().enumerate() {
                                let Some(column) = insert.columns.get(index) else {
                                    continue;
                                };
                                let column_name =
                                    object_name_parts(column).last().cloned().unwrap_or_default();
                                columns.push(merge_flow(column_name, expr, &mut ctx));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let mut sources = scope.into_sources();
    let mut seen: HashSet<String> = sources
        .iter()
        .map(|reference| reference.id().into_inner())
        .collect();
    for reference in extra_sources {
        if seen.insert(reference.id().into_inner()) {
            sources.push(reference);
        }
    }
    // The merge target joined the scope for alias resolution only
    let target_id = target_ref.id();
    sources.retain(|reference| reference.id() != target_id);

    StatementLineage {
        target: Some(TargetDef {
            table: target_ref,
            kind: TableKind::Table,
            columns: Vec::new(),
        }),
        sources,
        columns,
    }
}

fn merge_flow(
    target_column: String,
    expr: &sqlparser::ast::Expr,
    ctx: &mut ExprContext<'_>,
) -> ColumnFlow {
    if let Some((qualifier, column)) = bare_column_ref(expr) {
        let resolved = resolve_column(qualifier.as_deref(), &column, ctx.scope);
        let expression = if target_column.eq_ignore_ascii_case(&column) {
            resolved.inner_expression
        } else {
            Some(expr.to_string())
        };
        ColumnFlow {
            target_column,
            sources: dedup_column_sources(resolved.sources),
            expression,
        }
    } else {
        ColumnFlow {
            target_column,
            sources: dedup_column_sources(collect_expr_sources(expr, ctx)),
            expression: Some(expr.to_string()),
        }
    }
}

fn assignment_target_name(target: &sqlparser::ast::AssignmentTarget) -> Option<String> {
    match target {
        sqlparser::ast::AssignmentTarget::ColumnName(name) => {
            object_name_parts(name).into_iter().next_back()
        }
        _ => None,
    }
}

fn table_ref_from_factor(factor: &TableFactor) -> Option<TableRef> {
    match factor {
        TableFactor::Table { name, .. } => Some(table_ref_from_object_name(name)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
