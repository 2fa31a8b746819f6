use super::*;
use crate::model::TableKind;
use crate::resolver::Resolver;
use crate::statement::{ColumnFlow, ColumnSource, FileExtraction, StatementLineage, TableRef, TargetDef};

fn sample_resolution(include_columns: bool) -> Resolution {
    let extractions = vec![FileExtraction {
        file: "staging.sql".to_string(),
        statements: vec![StatementLineage {
            target: Some(TargetDef {
                table: TableRef::qualified("staging", "customers"),
                kind: TableKind::Table,
                columns: vec![],
            }),
            sources: vec![TableRef::qualified("raw", "customers")],
            columns: vec![ColumnFlow {
                target_column: "email".to_string(),
                sources: vec![ColumnSource {
                    table: Some(TableRef::qualified("raw", "customers")),
                    column: "email".to_string(),
                }],
                expression: Some("LOWER(TRIM(email))".to_string()),
            }],
        }],
    }];
    Resolver::resolve(&extractions, include_columns)
}

#[test]
fn test_wire_document_shape() {
    let wire = sample_resolution(true).to_wire();
    let value = serde_json::to_value(&wire).unwrap();

    let nodes = value["nodes"].as_array().unwrap();
    let table_nodes: Vec<_> = nodes
        .iter()
        .filter(|node| node["level"] == "table")
        .collect();
    assert_eq!(table_nodes.len(), 2);

    let staging = nodes
        .iter()
        .find(|node| node["id"] == "staging.customers")
        .unwrap();
    assert_eq!(staging["name"], "customers");
    assert_eq!(staging["schema"], "staging");
    assert_eq!(staging["type"], "table");
    assert_eq!(staging["source_file"], "staging.sql");
    assert!(staging.get("table").is_none());

    let raw = nodes.iter().find(|node| node["id"] == "raw.customers").unwrap();
    assert!(raw["source_file"].is_null());

    let column_nodes: Vec<_> = nodes
        .iter()
        .filter(|node| node["level"] == "column")
        .collect();
    assert_eq!(column_nodes.len(), 2);
    let target_col = column_nodes
        .iter()
        .find(|node| node["id"] == "staging.customers.email")
        .unwrap();
    assert_eq!(target_col["table"], "staging.customers");
    assert_eq!(target_col["type"], "column");
}

#[test]
fn test_wire_links() {
    let wire = sample_resolution(true).to_wire();
    let value = serde_json::to_value(&wire).unwrap();
    let links = value["links"].as_array().unwrap();

    let table_link = links
        .iter()
        .find(|link| link["type"] == "table_to_table")
        .unwrap();
    assert_eq!(table_link["source"], "raw.customers");
    assert_eq!(table_link["target"], "staging.customers");
    assert!(table_link["expression"].is_null());
    assert!(table_link.get("source_table").is_none());

    let column_link = links
        .iter()
        .find(|link| link["type"] == "column_to_column")
        .unwrap();
    assert_eq!(column_link["source"], "raw.customers.email");
    assert_eq!(column_link["target"], "staging.customers.email");
    assert_eq!(column_link["source_table"], "raw.customers");
    assert_eq!(column_link["source_column"], "email");
    assert_eq!(column_link["target_table"], "staging.customers");
    assert_eq!(column_link["target_column"], "email");
    assert_eq!(column_link["expression"], "LOWER(TRIM(email))");
}

#[test]
fn test_wire_stats_and_files() {
    let wire = sample_resolution(true).to_wire();
    let value = serde_json::to_value(&wire).unwrap();

    assert_eq!(value["stats"]["total_tables"], 2);
    assert_eq!(value["stats"]["total_columns"], 2);
    assert_eq!(value["stats"]["table_edges"], 1);
    assert_eq!(value["stats"]["column_edges"], 1);
    assert_eq!(value["files"], serde_json::json!(["staging.sql"]));
}

#[test]
fn test_wire_execution_order_present_on_dag() {
    let wire = sample_resolution(false).to_wire();
    let value = serde_json::to_value(&wire).unwrap();
    assert_eq!(
        value["execution_order"],
        serde_json::json!(["raw.customers", "staging.customers"])
    );
}

#[test]
fn test_wire_execution_order_absent_on_cycle() {
    let extractions = vec![FileExtraction {
        file: "cycle.sql".to_string(),
        statements: vec![
            StatementLineage {
                target: Some(TargetDef {
                    table: TableRef::bare("a"),
                    kind: TableKind::Table,
                    columns: vec![],
                }),
                sources: vec![TableRef::bare("b")],
                columns: vec![],
            },
            StatementLineage {
                target: Some(TargetDef {
                    table: TableRef::bare("b"),
                    kind: TableKind::Table,
                    columns: vec![],
                }),
                sources: vec![TableRef::bare("a")],
                columns: vec![],
            },
        ],
    }];
    let wire = Resolver::resolve(&extractions, false).to_wire();
    let value = serde_json::to_value(&wire).unwrap();
    assert!(value.get("execution_order").is_none());
    // Nodes and links still serialized in full
    assert_eq!(value["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(value["links"].as_array().unwrap().len(), 2);
}

#[test]
fn test_wire_no_column_nodes_without_request() {
    let wire = sample_resolution(false).to_wire();
    let value = serde_json::to_value(&wire).unwrap();
    assert!(value["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .all(|node| node["level"] == "table"));
    assert_eq!(value["stats"]["column_edges"], 0);
}

#[test]
fn test_indeterminate_column_link_omits_source_table() {
    let extractions = vec![FileExtraction {
        file: "join.sql".to_string(),
        statements: vec![StatementLineage {
            target: Some(TargetDef {
                table: TableRef::bare("wide"),
                kind: TableKind::Table,
                columns: vec![],
            }),
            sources: vec![TableRef::bare("l"), TableRef::bare("r")],
            columns: vec![ColumnFlow {
                target_column: "amount".to_string(),
                sources: vec![ColumnSource {
                    table: None,
                    column: "amount".to_string(),
                }],
                expression: None,
            }],
        }],
    }];

    let wire = Resolver::resolve(&extractions, true).to_wire();
    let value = serde_json::to_value(&wire).unwrap();
    let column_link = value["links"]
        .as_array()
        .unwrap()
        .iter()
        .find(|link| link["type"] == "column_to_column")
        .unwrap();
    assert_eq!(column_link["source"], "amount");
    assert!(column_link.get("source_table").is_none());
    assert_eq!(column_link["source_column"], "amount");
    assert_eq!(column_link["target_table"], "wide");
}
