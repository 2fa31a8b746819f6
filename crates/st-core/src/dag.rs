//! Table-edge DAG: cycle detection and execution ordering.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::graph::LineageGraph;
use crate::table_id::TableId;

/// A directed graph over table ids, built from a [`LineageGraph`]'s
/// table-level edges. Node indices are assigned in first-appearance order,
/// which is what makes the execution order reproducible.
#[derive(Debug, Default)]
pub struct TableDag {
    graph: DiGraph<TableId, ()>,
    node_map: HashMap<TableId, NodeIndex>,
}

impl TableDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the DAG from a resolved lineage graph. Every table becomes a
    /// node (including isolated ones, so they still appear in the order);
    /// every table edge becomes a `source -> target` arc.
    pub fn from_graph(graph: &LineageGraph) -> Self {
        let mut dag = Self::new();
        for table in graph.tables() {
            dag.add_table(&table.id);
        }
        for edge in graph.table_edges() {
            dag.add_dependency(&edge.source, &edge.target);
        }
        dag
    }

    /// Add a table node, returning the existing index if already present.
    pub fn add_table(&mut self, id: &TableId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(id) {
            idx
        } else {
            let idx = self.graph.add_node(id.clone());
            self.node_map.insert(id.clone(), idx);
            idx
        }
    }

    /// Add a dependency arc: `target` reads from `source`.
    pub fn add_dependency(&mut self, source: &TableId, target: &TableId) {
        let source_idx = self.add_table(source);
        let target_idx = self.add_table(target);
        self.graph.add_edge(source_idx, target_idx, ());
    }

    /// Validate that the graph is acyclic.
    pub fn validate(&self) -> CoreResult<()> {
        match self.find_cycle() {
            None => Ok(()),
            Some(members) => Err(CoreError::CircularDependency {
                tables: members.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// Compute an execution order: every table appears after all tables it
    /// depends on. Kahn's algorithm with a min-heap over node indices, so
    /// ties between independent tables break by first appearance and the
    /// output is byte-identical across runs on identical input.
    pub fn execution_order(&self) -> CoreResult<Vec<TableId>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.graph[node].clone());
            for neighbor in self.graph.neighbors(node) {
                let degree = &mut in_degree[neighbor.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(neighbor));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let members = self.find_cycle().unwrap_or_default();
            return Err(CoreError::CircularDependency {
                tables: members.iter().map(ToString::to_string).collect(),
            });
        }

        Ok(order)
    }

    /// Find one cycle, if any, returning the participating tables in walk
    /// order. Iterative DFS with an explicit work stack; the recursion-stack
    /// (gray) marking is what distinguishes a cycle from a re-visit.
    fn find_cycle(&self) -> Option<Vec<TableId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color = vec![Color::White; self.graph.node_count()];

        for start in self.graph.node_indices() {
            if color[start.index()] != Color::White {
                continue;
            }

            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
            color[start.index()] = Color::Gray;
            stack.push((start, self.graph.neighbors(start).collect()));
            let mut reentry: Option<NodeIndex> = None;

            while let Some((node, neighbors)) = stack.last_mut() {
                match neighbors.pop() {
                    Some(next) => match color[next.index()] {
                        Color::White => {
                            color[next.index()] = Color::Gray;
                            let next_neighbors = self.graph.neighbors(next).collect();
                            stack.push((next, next_neighbors));
                        }
                        Color::Gray => {
                            reentry = Some(next);
                            break;
                        }
                        Color::Black => {}
                    },
                    None => {
                        color[node.index()] = Color::Black;
                        stack.pop();
                    }
                }
            }

            if let Some(entry) = reentry {
                let pos = stack
                    .iter()
                    .position(|(node, _)| *node == entry)
                    .unwrap_or(0);
                return Some(
                    stack[pos..]
                        .iter()
                        .map(|(node, _)| self.graph[*node].clone())
                        .collect(),
                );
            }
        }

        None
    }

    /// Whether a table exists in the DAG.
    pub fn contains(&self, id: &TableId) -> bool {
        self.node_map.contains_key(id)
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
