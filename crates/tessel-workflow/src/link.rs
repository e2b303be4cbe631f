use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A data dependency from one node's output to another node's input.
///
/// Endpoints are ids and port indices; nothing guarantees they exist until
/// the graph is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub id: LinkId,
  pub source_node_id: NodeId,
  pub source_output_index: usize,
  pub target_node_id: NodeId,
  pub target_input_index: usize,
  pub link_type: Option<String>,
}
