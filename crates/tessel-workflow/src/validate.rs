use std::collections::HashMap;

use crate::error::{DanglingReason, LinkEndpoint, StructuralError};
use crate::graph::Graph;
use crate::link::{Link, LinkId};
use crate::node::NodeId;
use crate::resolver;

impl Graph {
  /// Collect every structural defect in the graph.
  ///
  /// Checks run in a fixed order (dangling references, multiple writers,
  /// cycles) and all violations are returned, not just the first. An empty
  /// list means the graph can be staged.
  pub fn validate(&self) -> Vec<StructuralError> {
    let mut errors = Vec::new();

    for link in self.links() {
      self.check_endpoints(link, &mut errors);
    }

    errors.extend(self.multiple_writers());

    let cyclic = resolver::cyclic_nodes(self);
    if !cyclic.is_empty() {
      errors.push(StructuralError::CyclicDependency { node_ids: cyclic });
    }

    errors
  }

  fn check_endpoints(&self, link: &Link, errors: &mut Vec<StructuralError>) {
    let endpoints = [
      (
        LinkEndpoint::Source,
        link.source_node_id,
        link.source_output_index,
      ),
      (
        LinkEndpoint::Target,
        link.target_node_id,
        link.target_input_index,
      ),
    ];

    for (endpoint, node_id, index) in endpoints {
      let reason = match self.node(node_id) {
        None => Some(DanglingReason::MissingNode { node_id }),
        Some(node) => {
          let port_count = match endpoint {
            LinkEndpoint::Source => node.outputs.len(),
            LinkEndpoint::Target => node.inputs.len(),
          };
          (index >= port_count).then_some(DanglingReason::PortOutOfRange {
            node_id,
            index,
            port_count,
          })
        }
      };

      if let Some(reason) = reason {
        errors.push(StructuralError::DanglingLinkReference {
          link_id: link.id,
          endpoint,
          reason,
        });
      }
    }
  }

  /// Inputs targeted by more than one link, in order of first appearance.
  fn multiple_writers(&self) -> Vec<StructuralError> {
    let mut order: Vec<(NodeId, usize)> = Vec::new();
    let mut writers: HashMap<(NodeId, usize), Vec<LinkId>> = HashMap::new();

    for link in self.links() {
      let key = (link.target_node_id, link.target_input_index);
      let entry = writers.entry(key).or_default();
      if entry.is_empty() {
        order.push(key);
      }
      entry.push(link.id);
    }

    order
      .into_iter()
      .filter_map(|key| {
        let link_ids = writers.remove(&key)?;
        (link_ids.len() > 1).then_some(StructuralError::MultipleWritersToInput {
          node_id: key.0,
          input_index: key.1,
          link_ids,
        })
      })
      .collect()
  }
}
