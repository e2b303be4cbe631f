use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::link::LinkId;
use crate::node::NodeId;

/// Errors from graph construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("node not found: {0}")]
  NodeNotFound(NodeId),

  #[error("duplicate node id: {0}")]
  DuplicateNodeId(NodeId),

  #[error("duplicate link id: {0}")]
  DuplicateLinkId(LinkId),
}

/// Which end of a link a structural error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkEndpoint {
  Source,
  Target,
}

impl fmt::Display for LinkEndpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LinkEndpoint::Source => f.write_str("source"),
      LinkEndpoint::Target => f.write_str("target"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DanglingReason {
  MissingNode {
    node_id: NodeId,
  },
  PortOutOfRange {
    node_id: NodeId,
    index: usize,
    port_count: usize,
  },
}

impl fmt::Display for DanglingReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DanglingReason::MissingNode { node_id } => write!(f, "missing node {}", node_id),
      DanglingReason::PortOutOfRange {
        node_id,
        index,
        port_count,
      } => write!(
        f,
        "port {} of node {} (node has {} ports)",
        index, node_id, port_count
      ),
    }
  }
}

/// A structural defect that blocks planning.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralError {
  #[error("link {link_id} has a dangling {endpoint}: {reason}")]
  DanglingLinkReference {
    link_id: LinkId,
    endpoint: LinkEndpoint,
    reason: DanglingReason,
  },

  #[error("input {input_index} of node {node_id} is written by {} links", link_ids.len())]
  MultipleWritersToInput {
    node_id: NodeId,
    input_index: usize,
    link_ids: Vec<LinkId>,
  },

  #[error("cyclic dependency between nodes [{}]", join_ids(node_ids))]
  CyclicDependency { node_ids: Vec<NodeId> },
}

fn join_ids(ids: &[NodeId]) -> String {
  ids
    .iter()
    .map(|id| id.to_string())
    .collect::<Vec<_>>()
    .join(", ")
}
