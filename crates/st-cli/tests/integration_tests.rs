//! End-to-end pipeline tests: files on disk -> parse -> extract -> resolve.

use std::fs;
use std::path::Path;

use st_core::resolver::{Resolution, Resolver};
use st_core::statement::FileExtraction;
use st_sql::{extract_statements, SqlParser};

fn analyze_files(paths: &[&Path], include_columns: bool) -> Resolution {
    let parser = SqlParser::generic();
    let mut extractions = Vec::new();
    for path in paths {
        let sql = fs::read_to_string(path).unwrap();
        let statements = parser.parse(&sql).unwrap();
        extractions.push(FileExtraction {
            file: path.file_name().unwrap().to_str().unwrap().to_string(),
            statements: extract_statements(&statements),
        });
    }
    Resolver::resolve(&extractions, include_columns)
}

fn write_pipeline(dir: &Path) -> Vec<std::path::PathBuf> {
    let files = [
        (
            "01_staging.sql",
            "CREATE TABLE staging.customers AS \
             SELECT id, LOWER(TRIM(email)) AS email, name FROM raw.customers;",
        ),
        (
            "02_intermediate.sql",
            "CREATE TABLE intermediate.customers AS \
             WITH active AS (SELECT id, email, name FROM staging.customers) \
             SELECT id, email, name FROM active;",
        ),
        (
            "03_mart.sql",
            "CREATE TABLE mart.customers AS \
             SELECT id, email FROM intermediate.customers;",
        ),
    ];

    files
        .iter()
        .map(|(name, sql)| {
            let path = dir.join(name);
            fs::write(&path, sql).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_four_layer_pipeline_closures() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_pipeline(dir.path());
    let path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();

    let resolution = analyze_files(&path_refs, true);
    let graph = &resolution.graph;

    // raw -> staging -> intermediate -> mart, the CTE never surfaces
    assert_eq!(graph.table_count(), 4);
    assert!(!graph.contains_table("active"));

    let upstream: Vec<String> = graph
        .get_upstream("mart.customers")
        .unwrap()
        .into_iter()
        .map(|id| id.into_inner())
        .collect();
    assert_eq!(
        upstream,
        vec!["intermediate.customers", "staging.customers", "raw.customers"]
    );

    assert!(graph.get_upstream("raw.customers").unwrap().is_empty());

    let downstream: Vec<String> = graph
        .get_downstream("raw.customers")
        .unwrap()
        .into_iter()
        .map(|id| id.into_inner())
        .collect();
    assert_eq!(
        downstream,
        vec!["staging.customers", "intermediate.customers", "mart.customers"]
    );

    let middle_up = graph.get_upstream("intermediate.customers").unwrap();
    assert_eq!(middle_up.len(), 2);
}

#[test]
fn test_four_layer_pipeline_execution_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_pipeline(dir.path());
    let path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();

    let first = analyze_files(&path_refs, false);
    let second = analyze_files(&path_refs, false);

    let order = first.execution_order.as_ref().unwrap();
    let pos = |name: &str| order.iter().position(|id| id == name).unwrap();
    assert!(pos("raw.customers") < pos("staging.customers"));
    assert!(pos("staging.customers") < pos("intermediate.customers"));
    assert!(pos("intermediate.customers") < pos("mart.customers"));

    // Byte-identical across runs on identical input
    assert_eq!(first.execution_order, second.execution_order);
}

#[test]
fn test_column_lineage_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_pipeline(dir.path());
    let path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();

    let resolution = analyze_files(&path_refs, true);
    let edges: Vec<_> = resolution.graph.column_edges().collect();

    // The staging transformation keeps its expression text
    let email_edge = edges
        .iter()
        .find(|edge| {
            edge.target_table == "staging.customers" && edge.target_column == "email"
        })
        .unwrap();
    assert_eq!(
        email_edge.source_table.as_ref().unwrap().as_str(),
        "raw.customers"
    );
    assert_eq!(email_edge.expression.as_deref(), Some("LOWER(TRIM(email))"));

    // Pass-through into the mart carries no expression
    let mart_edge = edges
        .iter()
        .find(|edge| edge.target_table == "mart.customers" && edge.target_column == "id")
        .unwrap();
    assert!(mart_edge.expression.is_none());
    assert_eq!(
        mart_edge.source_table.as_ref().unwrap().as_str(),
        "intermediate.customers"
    );
}

#[test]
fn test_wire_document_from_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_pipeline(dir.path());
    let path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();

    let resolution = analyze_files(&path_refs, true);
    let value = serde_json::to_value(resolution.to_wire()).unwrap();

    assert_eq!(value["stats"]["total_tables"], 4);
    assert_eq!(value["stats"]["table_edges"], 3);
    assert_eq!(
        value["files"],
        serde_json::json!(["01_staging.sql", "02_intermediate.sql", "03_mart.sql"])
    );
    assert_eq!(
        value["execution_order"][0].as_str().unwrap(),
        "raw.customers"
    );

    // raw.customers is external: present, but with no source file
    let nodes = value["nodes"].as_array().unwrap();
    let raw = nodes
        .iter()
        .find(|node| node["id"] == "raw.customers")
        .unwrap();
    assert!(raw["source_file"].is_null());

    let staging = nodes
        .iter()
        .find(|node| node["id"] == "staging.customers")
        .unwrap();
    assert_eq!(staging["source_file"], "01_staging.sql");
}

#[test]
fn test_unparseable_file_aborts_only_its_contribution() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.sql");
    fs::write(&good, "CREATE TABLE good AS SELECT id FROM source;").unwrap();
    let bad = dir.path().join("bad.sql");
    fs::write(&bad, "THIS IS NOT VALID SQL AT ALL !!!").unwrap();

    let parser = SqlParser::generic();
    let mut extractions = Vec::new();
    let mut failures = 0;
    for path in [&good, &bad] {
        let sql = fs::read_to_string(path).unwrap();
        match parser.parse(&sql) {
            Ok(statements) => extractions.push(FileExtraction {
                file: path.file_name().unwrap().to_str().unwrap().to_string(),
                statements: extract_statements(&statements),
            }),
            Err(_) => failures += 1,
        }
    }

    assert_eq!(failures, 1);
    let resolution = Resolver::resolve(&extractions, false);
    assert!(resolution.graph.contains_table("good"));
}

#[test]
fn test_cycle_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.sql");
    fs::write(&first, "CREATE TABLE a AS SELECT * FROM c;").unwrap();
    let second = dir.path().join("b.sql");
    fs::write(&second, "CREATE TABLE b AS SELECT * FROM a;").unwrap();
    let third = dir.path().join("c.sql");
    fs::write(&third, "CREATE TABLE c AS SELECT * FROM b;").unwrap();

    let resolution = analyze_files(&[first.as_path(), second.as_path(), third.as_path()], false);
    assert!(resolution.execution_order.is_none());
    let cycle = resolution.cycle.as_ref().unwrap();
    for name in ["a", "b", "c"] {
        assert!(cycle.contains(&name.to_string()));
    }
    // The graph survives the cycle for inspection
    assert_eq!(resolution.graph.table_count(), 3);
    assert_eq!(resolution.graph.table_edge_count(), 3);
}
