//! Conversion between the persisted document and the typed graph.

use tessel_config::{FunctionProperties, GraphDoc, LinkDef, NodeDef, NodeTypeDef, PortDef};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::link::{Link, LinkId};
use crate::node::{FunctionRef, Node, NodeId, NodeKind, Port};

impl Graph {
  /// Build a graph from a persisted document.
  ///
  /// Only duplicate ids are rejected here. Links with bad endpoints are
  /// loaded as-is and reported by [`Graph::validate`].
  pub fn from_doc(doc: GraphDoc) -> Result<Self, GraphError> {
    let mut graph = Graph::new();

    for def in doc.nodes {
      graph.insert_node(node_from_def(def))?;
    }

    for def in doc.links {
      graph.insert_link(link_from_def(def))?;
    }

    graph.bump_counters(
      doc.last_node_id.unwrap_or_default(),
      doc.last_link_id.unwrap_or_default(),
    );

    Ok(graph)
  }

  /// Produce the canonical persisted form, with links as an array.
  pub fn to_doc(&self) -> GraphDoc {
    let nodes = self.nodes().map(|node| self.node_to_def(node)).collect();
    let links = self.links().iter().map(link_to_def).collect();

    GraphDoc {
      last_node_id: Some(self.last_node_id()),
      last_link_id: Some(self.last_link_id()),
      nodes,
      links,
    }
  }

  fn node_to_def(&self, node: &Node) -> NodeDef {
    let node_type = match node.kind {
      NodeKind::Function(_) => NodeTypeDef::Function,
      NodeKind::Load(_) => NodeTypeDef::Load,
    };
    let function_ref = node.function_ref();

    let inputs = node
      .inputs
      .iter()
      .enumerate()
      .map(|(i, port)| {
        let mut def = port_to_def(port);
        def.link = self.incoming_link(node.id, i).map(|l| l.id.0);
        def
      })
      .collect();

    let outputs = node
      .outputs
      .iter()
      .enumerate()
      .map(|(i, port)| {
        let mut def = port_to_def(port);
        let links: Vec<u64> = self
          .outgoing_links(node.id)
          .filter(|l| l.source_output_index == i)
          .map(|l| l.id.0)
          .collect();
        def.links = (!links.is_empty()).then_some(links);
        def
      })
      .collect();

    NodeDef {
      id: node.id.0,
      node_type,
      properties: FunctionProperties {
        file_path: function_ref.file_path.to_string_lossy().into_owned(),
        function_name: function_ref.function_name.clone(),
      },
      inputs,
      outputs,
      widget_parameter: node.parameters.clone(),
    }
  }
}

fn node_from_def(def: NodeDef) -> Node {
  let function_ref = FunctionRef::new(def.properties.file_path, def.properties.function_name);
  let kind = match def.node_type {
    NodeTypeDef::Function => NodeKind::Function(function_ref),
    NodeTypeDef::Load => NodeKind::Load(function_ref),
  };

  let mut node = Node::new(NodeId(def.id), kind)
    .with_inputs(def.inputs.into_iter().map(port_from_def).collect())
    .with_outputs(def.outputs.into_iter().map(port_from_def).collect());
  node.parameters = def.widget_parameter;
  node
}

fn port_from_def(def: PortDef) -> Port {
  Port {
    name: def.name,
    type_hint: def.port_type,
  }
}

fn port_to_def(port: &Port) -> PortDef {
  PortDef::new(port.name.clone(), port.type_hint.clone())
}

fn link_from_def(def: LinkDef) -> Link {
  Link {
    id: LinkId(def.id),
    source_node_id: NodeId(def.source_node_id),
    source_output_index: def.source_output_index,
    target_node_id: NodeId(def.target_node_id),
    target_input_index: def.target_input_index,
    link_type: def.link_type,
  }
}

fn link_to_def(link: &Link) -> LinkDef {
  LinkDef {
    id: link.id.0,
    source_node_id: link.source_node_id.0,
    source_output_index: link.source_output_index,
    target_node_id: link.target_node_id.0,
    target_input_index: link.target_input_index,
    link_type: link.link_type.clone(),
  }
}
