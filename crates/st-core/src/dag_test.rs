use super::*;

fn dag_from(edges: &[(&str, &str)]) -> TableDag {
    let mut dag = TableDag::new();
    for (source, target) in edges {
        dag.add_dependency(&TableId::new(source), &TableId::new(target));
    }
    dag
}

#[test]
fn test_execution_order_dependencies_first() {
    let dag = dag_from(&[
        ("stg_orders", "fct_orders"),
        ("stg_customers", "fct_orders"),
    ]);
    let order = dag.execution_order().unwrap();

    let pos = |name: &str| order.iter().position(|id| id == name).unwrap();
    assert!(pos("fct_orders") > pos("stg_orders"));
    assert!(pos("fct_orders") > pos("stg_customers"));
}

#[test]
fn test_execution_order_is_valid_linearization() {
    let edges = [
        ("raw", "stg"),
        ("stg", "int"),
        ("int", "fct"),
        ("raw", "fct"),
        ("stg", "dim"),
    ];
    let dag = dag_from(&edges);
    let order = dag.execution_order().unwrap();

    for (source, target) in &edges {
        let source_pos = order.iter().position(|id| id == source).unwrap();
        let target_pos = order.iter().position(|id| id == target).unwrap();
        assert!(
            source_pos < target_pos,
            "{} must come before {}",
            source,
            target
        );
    }
}

#[test]
fn test_execution_order_deterministic() {
    // Independent tables tie-break by first appearance, so two identically
    // built DAGs order identically.
    let edges = [("c", "z"), ("a", "z"), ("b", "z")];
    let first = dag_from(&edges).execution_order().unwrap();
    let second = dag_from(&edges).execution_order().unwrap();
    assert_eq!(first, second);
    // c was added first, then z, then a, then b
    assert_eq!(first[0], "c");
}

#[test]
fn test_isolated_table_included() {
    let mut dag = dag_from(&[("a", "b")]);
    dag.add_table(&TableId::new("lonely"));
    let order = dag.execution_order().unwrap();
    assert_eq!(order.len(), 3);
    assert!(order.iter().any(|id| id == "lonely"));
}

#[test]
fn test_cycle_detected() {
    let dag = dag_from(&[("a", "b"), ("b", "c"), ("c", "a")]);
    let err = dag.execution_order().unwrap_err();
    match err {
        CoreError::CircularDependency { tables } => {
            assert_eq!(tables.len(), 3);
            for name in ["a", "b", "c"] {
                assert!(tables.contains(&name.to_string()), "missing {}", name);
            }
        }
        other => panic!("expected CircularDependency, got: {:?}", other),
    }
}

#[test]
fn test_validate_matches_execution_order() {
    let acyclic = dag_from(&[("a", "b"), ("b", "c")]);
    assert!(acyclic.validate().is_ok());

    let cyclic = dag_from(&[("a", "b"), ("b", "a")]);
    assert!(matches!(
        cyclic.validate().unwrap_err(),
        CoreError::CircularDependency { .. }
    ));
}

#[test]
fn test_cycle_reported_only_with_members() {
    // A cycle off to the side must not drag unrelated tables into the report.
    let dag = dag_from(&[("x", "y"), ("a", "b"), ("b", "a")]);
    let err = dag.execution_order().unwrap_err();
    match err {
        CoreError::CircularDependency { tables } => {
            assert!(!tables.contains(&"x".to_string()));
            assert!(!tables.contains(&"y".to_string()));
        }
        other => panic!("expected CircularDependency, got: {:?}", other),
    }
}

#[test]
fn test_from_graph() {
    use crate::model::{LineageEdge, TableEdge};
    use crate::statement::TableRef;

    let mut graph = LineageGraph::new();
    graph.get_or_create_table(&TableRef::bare("raw"));
    graph.add_edge(LineageEdge::Table(TableEdge {
        source: TableId::new("raw"),
        target: TableId::new("stg"),
    }));

    let dag = TableDag::from_graph(&graph);
    assert!(dag.contains(&TableId::new("raw")));
    assert!(dag.contains(&TableId::new("stg")));
    let order = dag.execution_order().unwrap();
    assert_eq!(order, vec![TableId::new("raw"), TableId::new("stg")]);
}
