//! Analyze command implementation

use anyhow::{bail, Context, Result};
use st_core::resolver::{Resolution, Resolver};
use st_core::statement::{FileExtraction, StatementLineage};
use st_sql::{extract_statements, SqlError, SqlParser};
use std::path::Path;

use crate::cli::{AnalyzeArgs, GlobalArgs, OutputFormat};

/// Execute the analyze command
pub async fn execute(args: &AnalyzeArgs, global: &GlobalArgs) -> Result<()> {
    // Validate the dialect once up front; each worker builds its own parser
    SqlParser::from_dialect_name(&args.dialect).context("Invalid SQL dialect")?;

    let mut payloads = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let path = Path::new(file);
        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", file))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file)
            .to_string();
        payloads.push((name, sql));
    }

    if global.verbose {
        eprintln!(
            "[verbose] Analyzing {} file(s) with dialect '{}'",
            payloads.len(),
            args.dialect
        );
    }

    // Extraction is a pure function of one file's statements: fan out per
    // file, join in input order, then fold sequentially.
    let handles: Vec<_> = payloads
        .into_iter()
        .map(|(name, sql)| {
            let dialect = args.dialect.clone();
            tokio::task::spawn_blocking(move || {
                let outcome = parse_and_extract(&dialect, &sql);
                (name, outcome)
            })
        })
        .collect();

    let mut extractions: Vec<FileExtraction> = Vec::new();
    let mut failures: Vec<(String, SqlError)> = Vec::new();
    for joined in futures::future::join_all(handles).await {
        let (name, outcome) = joined.context("extraction task failed")?;
        match outcome {
            Ok(statements) => extractions.push(FileExtraction {
                file: name,
                statements,
            }),
            Err(err) => {
                log::debug!("extraction failed for {}: {}", name, err);
                failures.push((name, err));
            }
        }
    }

    // A file that fails to parse aborts only its own contribution
    for (file, err) in &failures {
        eprintln!("error: {}: {}", file, err);
    }

    let resolution = Resolver::resolve(&extractions, args.columns);

    match args.format {
        OutputFormat::Json => println!("{}", resolution.to_wire().to_json_pretty()?),
        OutputFormat::Text => print_report(&resolution, args.columns),
    }

    if let Some(cycle) = &resolution.cycle {
        eprintln!("error: circular dependency detected: {}", cycle.join(" -> "));
    }
    if !failures.is_empty() || resolution.cycle.is_some() {
        bail!("analysis completed with errors");
    }
    Ok(())
}

fn parse_and_extract(dialect: &str, sql: &str) -> Result<Vec<StatementLineage>, SqlError> {
    let parser = SqlParser::from_dialect_name(dialect)?;
    let statements = parser.parse(sql)?;
    Ok(extract_statements(&statements))
}

/// Print a human-readable lineage report
fn print_report(resolution: &Resolution, include_columns: bool) {
    let graph = &resolution.graph;

    println!(
        "Lineage analysis: {} file(s), {} table(s)",
        resolution.files.len(),
        graph.table_count()
    );

    println!();
    println!("Tables:");
    for table in graph.tables() {
        let origin = match &table.origin_file {
            Some(file) => format!("from {}", file),
            None => "external".to_string(),
        };
        println!("  {} [{}] ({})", table.id, table.kind, origin);
    }

    let table_edges: Vec<_> = graph.table_edges().collect();
    if !table_edges.is_empty() {
        println!();
        println!("Table lineage ({} edges):", table_edges.len());
        for edge in &table_edges {
            println!("  {} -> {}", edge.source, edge.target);
        }
    }

    if include_columns {
        let column_edges: Vec<_> = graph.column_edges().collect();
        if !column_edges.is_empty() {
            println!();
            println!("Column lineage ({} edges):", column_edges.len());
            for edge in &column_edges {
                let source = match &edge.source_table {
                    Some(table) => format!("{}.{}", table, edge.source_column),
                    None => format!("?.{}", edge.source_column),
                };
                let annotation = edge
                    .expression
                    .as_deref()
                    .map(|expression| format!("  [{}]", expression))
                    .unwrap_or_default();
                println!(
                    "  {} -> {}.{}{}",
                    source, edge.target_table, edge.target_column, annotation
                );
            }
        }
    }

    if !resolution.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &resolution.warnings {
            println!("  {}", warning);
        }
    }

    if let Some(order) = &resolution.execution_order {
        println!();
        println!("Execution order:");
        for (position, id) in order.iter().enumerate() {
            println!("  {}. {}", position + 1, id);
        }
    }
}
