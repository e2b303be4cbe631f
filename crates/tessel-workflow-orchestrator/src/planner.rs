//! Execution planning.
//!
//! A plan is the resolver's stage partition with every input of every node
//! resolved to a concrete source: an upstream output or a parameter default.
//! Plans are derived per run and never persisted.

use serde::Serialize;
use tessel_workflow::{FunctionRef, Graph, Node, NodeId, resolve_stages};

use crate::error::{MissingRequiredInput, PlanError};

/// Where an input value comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputSource {
  FromLink {
    source_node_id: NodeId,
    source_output_index: usize,
    source_output_name: String,
  },
  FromParameterDefault {
    value: serde_json::Value,
  },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedInput {
  pub name: String,
  pub source: InputSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedNode {
  pub node_id: NodeId,
  pub function_ref: FunctionRef,
  pub inputs: Vec<PlannedInput>,
  pub output_names: Vec<String>,
}

impl PlannedNode {
  /// Upstream nodes this node reads from, in input order.
  pub fn upstream(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.inputs.iter().filter_map(|input| match input.source {
      InputSource::FromLink { source_node_id, .. } => Some(source_node_id),
      InputSource::FromParameterDefault { .. } => None,
    })
  }
}

/// A set of mutually independent nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
  pub index: usize,
  pub nodes: Vec<PlannedNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionPlan {
  pub stages: Vec<Stage>,
}

impl ExecutionPlan {
  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn node_count(&self) -> usize {
    self.stages.iter().map(|s| s.nodes.len()).sum()
  }

  /// All planned node ids in execution order.
  pub fn node_ids(&self) -> Vec<NodeId> {
    self
      .stages
      .iter()
      .flat_map(|s| s.nodes.iter().map(|n| n.node_id))
      .collect()
  }

  pub fn node(&self, node_id: NodeId) -> Option<&PlannedNode> {
    self
      .stages
      .iter()
      .flat_map(|s| s.nodes.iter())
      .find(|n| n.node_id == node_id)
  }
}

/// Build an execution plan for the current graph snapshot.
///
/// Fails with every structural error if the graph cannot be staged, or with
/// every node that has unresolvable inputs. No plan is produced in either
/// case.
pub fn plan(graph: &Graph) -> Result<ExecutionPlan, PlanError> {
  let partition = resolve_stages(graph).map_err(PlanError::Structural)?;

  let mut stages = Vec::with_capacity(partition.len());
  let mut missing = Vec::new();

  for (index, node_ids) in partition.into_stages().into_iter().enumerate() {
    let mut nodes = Vec::with_capacity(node_ids.len());

    for node_id in node_ids {
      let node = graph
        .node(node_id)
        .ok_or(PlanError::Inconsistent { node_id })?;

      match plan_node(graph, node)? {
        Ok(planned) => nodes.push(planned),
        Err(input_names) => missing.push(MissingRequiredInput {
          node_id,
          input_names,
        }),
      }
    }

    stages.push(Stage { index, nodes });
  }

  if !missing.is_empty() {
    return Err(PlanError::MissingInputs(missing));
  }

  Ok(ExecutionPlan { stages })
}

/// Resolve a node's inputs. The inner error lists unresolvable input names.
fn plan_node(graph: &Graph, node: &Node) -> Result<Result<PlannedNode, Vec<String>>, PlanError> {
  let mut inputs = Vec::with_capacity(node.inputs.len());
  let mut missing = Vec::new();

  for (index, port) in node.inputs.iter().enumerate() {
    let source = match graph.incoming_link(node.id, index) {
      Some(link) => {
        let source_output_name = graph
          .node(link.source_node_id)
          .and_then(|n| n.outputs.get(link.source_output_index))
          .map(|p| p.name.clone())
          .ok_or(PlanError::Inconsistent {
            node_id: link.source_node_id,
          })?;
        InputSource::FromLink {
          source_node_id: link.source_node_id,
          source_output_index: link.source_output_index,
          source_output_name,
        }
      }
      None => match node.parameters.get(&port.name) {
        Some(value) => InputSource::FromParameterDefault {
          value: value.clone(),
        },
        None => {
          missing.push(port.name.clone());
          continue;
        }
      },
    };

    inputs.push(PlannedInput {
      name: port.name.clone(),
      source,
    });
  }

  if !missing.is_empty() {
    return Ok(Err(missing));
  }

  Ok(Ok(PlannedNode {
    node_id: node.id,
    function_ref: node.function_ref().clone(),
    inputs,
    output_names: node.outputs.iter().map(|p| p.name.clone()).collect(),
  }))
}
