//! Dependency resolution via Kahn's algorithm.
//!
//! Nodes are peeled off in layers: every node whose in-degree (counted over
//! incoming links) is zero forms one stage, its outgoing links are removed,
//! and the process repeats. Whatever is left once no zero in-degree node
//! remains sits on, or downstream of, a cycle.

use serde::Serialize;

use crate::error::StructuralError;
use crate::graph::Graph;
use crate::node::NodeId;

/// An ordered partition of all nodes into independence stages.
///
/// Every node's predecessors lie in strictly earlier stages, and nodes
/// within a stage keep graph insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StagePartition {
  stages: Vec<Vec<NodeId>>,
}

impl StagePartition {
  pub fn stages(&self) -> &[Vec<NodeId>] {
    &self.stages
  }

  pub fn into_stages(self) -> Vec<Vec<NodeId>> {
    self.stages
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Index of the stage containing a node.
  pub fn stage_of(&self, node_id: NodeId) -> Option<usize> {
    self.stages.iter().position(|s| s.contains(&node_id))
  }
}

/// Validate the graph and order it into stages.
///
/// Returns every structural error when the graph cannot be staged; no
/// partial ordering is produced in that case.
pub fn resolve_stages(graph: &Graph) -> Result<StagePartition, Vec<StructuralError>> {
  let errors = graph.validate();
  if !errors.is_empty() {
    return Err(errors);
  }

  let layering = Layering::compute(graph);
  Ok(StagePartition {
    stages: layering
      .stages
      .into_iter()
      .map(|stage| stage.into_iter().map(|p| layering.ids[p]).collect())
      .collect(),
  })
}

/// Nodes that lie on a cycle, in insertion order. Empty for acyclic graphs.
pub(crate) fn cyclic_nodes(graph: &Graph) -> Vec<NodeId> {
  let layering = Layering::compute(graph);
  let mut remaining: Vec<bool> = layering.in_degree.iter().map(|&d| d > 0).collect();

  // Peel nodes that only hang off a cycle: anything without an outgoing
  // edge into the remaining set cannot be on a cycle.
  loop {
    let mut changed = false;
    for p in 0..remaining.len() {
      if remaining[p] && !layering.successors[p].iter().any(|&s| remaining[s]) {
        remaining[p] = false;
        changed = true;
      }
    }
    if !changed {
      break;
    }
  }

  remaining
    .iter()
    .enumerate()
    .filter(|(_, r)| **r)
    .map(|(p, _)| layering.ids[p])
    .collect()
}

struct Layering {
  /// Node ids by insertion position.
  ids: Vec<NodeId>,
  /// Successor positions, one entry per link.
  successors: Vec<Vec<usize>>,
  /// In-degree left after layering; non-zero only for unresolved nodes.
  in_degree: Vec<usize>,
  stages: Vec<Vec<usize>>,
}

impl Layering {
  /// Links whose endpoints are missing nodes are ignored; they are reported
  /// separately as dangling references.
  fn compute(graph: &Graph) -> Self {
    let ids = graph.node_ids();
    let mut successors = vec![Vec::new(); ids.len()];
    let mut in_degree = vec![0usize; ids.len()];

    for link in graph.links() {
      if let (Some(source), Some(target)) = (
        graph.position(link.source_node_id),
        graph.position(link.target_node_id),
      ) {
        successors[source].push(target);
        in_degree[target] += 1;
      }
    }

    let mut stages = Vec::new();
    let mut frontier: Vec<usize> = (0..ids.len()).filter(|&p| in_degree[p] == 0).collect();

    while !frontier.is_empty() {
      let mut next = Vec::new();
      for &p in &frontier {
        for &s in &successors[p] {
          in_degree[s] -= 1;
          if in_degree[s] == 0 {
            next.push(s);
          }
        }
      }
      next.sort_unstable();
      stages.push(std::mem::replace(&mut frontier, next));
    }

    Self {
      ids,
      successors,
      in_degree,
      stages,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::node::{FunctionRef, NodeKind, Port};

  fn add(graph: &mut Graph, name: &str) -> NodeId {
    graph.add_node(
      NodeKind::Function(FunctionRef::new("/tmp/funcs.py", name)),
      vec![Port::new("a"), Port::new("b")],
      vec![Port::new("out")],
      BTreeMap::new(),
    )
  }

  #[test]
  fn test_linear_chain() {
    let mut graph = Graph::new();
    let a = add(&mut graph, "a");
    let b = add(&mut graph, "b");
    let c = add(&mut graph, "c");
    graph.connect(a, 0, b, 0);
    graph.connect(b, 0, c, 0);

    let stages = resolve_stages(&graph).unwrap();
    assert_eq!(stages.stages(), &[vec![a], vec![b], vec![c]]);
  }

  #[test]
  fn test_independent_nodes_share_a_stage() {
    let mut graph = Graph::new();
    let x = add(&mut graph, "x");
    let y = add(&mut graph, "y");

    let stages = resolve_stages(&graph).unwrap();
    assert_eq!(stages.stages(), &[vec![x, y]]);
  }

  #[test]
  fn test_diamond_uses_insertion_order_within_stage() {
    let mut graph = Graph::new();
    let sink = add(&mut graph, "sink");
    let right = add(&mut graph, "right");
    let left = add(&mut graph, "left");
    let root = add(&mut graph, "root");
    graph.connect(root, 0, left, 0);
    graph.connect(root, 0, right, 0);
    graph.connect(left, 0, sink, 0);
    graph.connect(right, 0, sink, 1);

    let stages = resolve_stages(&graph).unwrap();
    assert_eq!(stages.stages(), &[vec![root], vec![right, left], vec![sink]]);
    assert_eq!(stages.stage_of(sink), Some(2));
  }

  #[test]
  fn test_parallel_links_between_same_nodes() {
    let mut graph = Graph::new();
    let a = add(&mut graph, "a");
    let b = add(&mut graph, "b");
    graph.connect(a, 0, b, 0);
    graph.connect(a, 0, b, 1);

    let stages = resolve_stages(&graph).unwrap();
    assert_eq!(stages.stages(), &[vec![a], vec![b]]);
  }

  #[test]
  fn test_cycle_is_reported_without_partial_order() {
    let mut graph = Graph::new();
    let entry = add(&mut graph, "entry");
    let a = add(&mut graph, "a");
    let b = add(&mut graph, "b");
    let c = add(&mut graph, "c");
    let tail = add(&mut graph, "tail");
    graph.connect(entry, 0, a, 0);
    graph.connect(a, 0, b, 0);
    graph.connect(b, 0, c, 0);
    graph.connect(c, 0, a, 1);
    graph.connect(c, 0, tail, 0);

    let errors = resolve_stages(&graph).unwrap_err();
    assert_eq!(
      errors,
      vec![StructuralError::CyclicDependency {
        node_ids: vec![a, b, c]
      }]
    );
  }

  #[test]
  fn test_self_loop() {
    let mut graph = Graph::new();
    let a = add(&mut graph, "a");
    graph.connect(a, 0, a, 0);

    assert_eq!(cyclic_nodes(&graph), vec![a]);
  }

  #[test]
  fn test_empty_graph() {
    let stages = resolve_stages(&Graph::new()).unwrap();
    assert!(stages.is_empty());
  }

  #[test]
  fn test_resolution_is_deterministic() {
    let mut graph = Graph::new();
    let ids: Vec<NodeId> = (0..6).map(|i| add(&mut graph, &format!("n{}", i))).collect();
    graph.connect(ids[0], 0, ids[3], 0);
    graph.connect(ids[1], 0, ids[3], 1);
    graph.connect(ids[3], 0, ids[5], 0);
    graph.connect(ids[2], 0, ids[4], 0);

    let first = resolve_stages(&graph).unwrap();
    let second = resolve_stages(&graph).unwrap();
    assert_eq!(first, second);
    assert_eq!(
      first.stages(),
      &[
        vec![ids[0], ids[1], ids[2]],
        vec![ids[3], ids[4]],
        vec![ids[5]]
      ]
    );
  }
}
