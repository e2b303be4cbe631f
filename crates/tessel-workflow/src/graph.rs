use std::collections::{BTreeMap, HashMap};

use crate::error::GraphError;
use crate::link::{Link, LinkId};
use crate::node::{FunctionRef, Node, NodeId, NodeKind, NodeStatus, Port};

/// The owning aggregate for nodes and links.
///
/// Nodes keep their insertion order, which is the deterministic tie-break
/// for scheduling. Ids are handed out from monotonically increasing counters
/// and never reused, even after deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
  nodes: Vec<Node>,
  /// node_id -> position in `nodes`.
  index: HashMap<NodeId, usize>,
  links: Vec<Link>,
  last_node_id: u64,
  last_link_id: u64,
}

impl Graph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a node with a freshly assigned id.
  pub fn add_node(
    &mut self,
    kind: NodeKind,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    parameters: BTreeMap<String, serde_json::Value>,
  ) -> NodeId {
    self.last_node_id += 1;
    let id = NodeId(self.last_node_id);
    let mut node = Node::new(id, kind).with_inputs(inputs).with_outputs(outputs);
    node.parameters = parameters;
    self.push_node(node);
    id
  }

  /// Insert a node that already carries an id (e.g. when loading a document).
  pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
    if self.index.contains_key(&node.id) {
      return Err(GraphError::DuplicateNodeId(node.id));
    }
    self.last_node_id = self.last_node_id.max(node.id.0);
    self.push_node(node);
    Ok(())
  }

  fn push_node(&mut self, node: Node) {
    self.index.insert(node.id, self.nodes.len());
    self.nodes.push(node);
  }

  /// Remove a node. Links touching it are left in place so that validation
  /// reports them as dangling; use [`Graph::detach_node`] to drop them.
  pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
    let position = self.index.remove(&node_id)?;
    let node = self.nodes.remove(position);
    for (i, n) in self.nodes.iter().enumerate().skip(position) {
      self.index.insert(n.id, i);
    }
    Some(node)
  }

  /// Remove every link that starts or ends at the given node.
  pub fn detach_node(&mut self, node_id: NodeId) -> Vec<Link> {
    let (removed, kept): (Vec<Link>, Vec<Link>) = self
      .links
      .drain(..)
      .partition(|l| l.source_node_id == node_id || l.target_node_id == node_id);
    self.links = kept;
    removed
  }

  /// Link an output port to an input port. Endpoints are not checked here;
  /// [`Graph::validate`] reports bad references.
  pub fn connect(
    &mut self,
    source: NodeId,
    source_output_index: usize,
    target: NodeId,
    target_input_index: usize,
  ) -> LinkId {
    self.last_link_id += 1;
    let id = LinkId(self.last_link_id);
    let link_type = self
      .node(source)
      .and_then(|n| n.outputs.get(source_output_index))
      .and_then(|p| p.type_hint.clone());
    self.links.push(Link {
      id,
      source_node_id: source,
      source_output_index,
      target_node_id: target,
      target_input_index,
      link_type,
    });
    id
  }

  /// Insert a link that already carries an id.
  pub fn insert_link(&mut self, link: Link) -> Result<(), GraphError> {
    if self.links.iter().any(|l| l.id == link.id) {
      return Err(GraphError::DuplicateLinkId(link.id));
    }
    self.last_link_id = self.last_link_id.max(link.id.0);
    self.links.push(link);
    Ok(())
  }

  pub fn disconnect(&mut self, link_id: LinkId) -> Option<Link> {
    let position = self.links.iter().position(|l| l.id == link_id)?;
    Some(self.links.remove(position))
  }

  pub fn set_parameter(
    &mut self,
    node_id: NodeId,
    name: impl Into<String>,
    value: serde_json::Value,
  ) -> Result<(), GraphError> {
    self.node_mut(node_id)?.parameters.insert(name.into(), value);
    Ok(())
  }

  /// Point a node at a different function and replace its ports.
  ///
  /// Links are kept by port index; any that no longer fit are reported by
  /// validation.
  pub fn rebind(
    &mut self,
    node_id: NodeId,
    function_ref: FunctionRef,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
  ) -> Result<(), GraphError> {
    let node = self.node_mut(node_id)?;
    node.kind = node.kind.with_function_ref(function_ref);
    node.inputs = inputs;
    node.outputs = outputs;
    Ok(())
  }

  pub fn set_status(&mut self, node_id: NodeId, status: NodeStatus) -> Result<(), GraphError> {
    self.node_mut(node_id)?.status = status;
    Ok(())
  }

  /// Put every node back to `Pending`.
  pub fn reset_statuses(&mut self) {
    for node in &mut self.nodes {
      node.status = NodeStatus::Pending;
    }
  }

  fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, GraphError> {
    let position = *self
      .index
      .get(&node_id)
      .ok_or(GraphError::NodeNotFound(node_id))?;
    Ok(&mut self.nodes[position])
  }

  pub fn node(&self, node_id: NodeId) -> Option<&Node> {
    self.index.get(&node_id).map(|&i| &self.nodes[i])
  }

  pub fn contains_node(&self, node_id: NodeId) -> bool {
    self.index.contains_key(&node_id)
  }

  /// Position of a node in insertion order.
  pub fn position(&self, node_id: NodeId) -> Option<usize> {
    self.index.get(&node_id).copied()
  }

  /// Nodes in insertion order.
  pub fn nodes(&self) -> impl Iterator<Item = &Node> {
    self.nodes.iter()
  }

  pub fn node_ids(&self) -> Vec<NodeId> {
    self.nodes.iter().map(|n| n.id).collect()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn links(&self) -> &[Link] {
    &self.links
  }

  pub fn link(&self, link_id: LinkId) -> Option<&Link> {
    self.links.iter().find(|l| l.id == link_id)
  }

  pub fn last_node_id(&self) -> u64 {
    self.last_node_id
  }

  pub fn last_link_id(&self) -> u64 {
    self.last_link_id
  }

  pub(crate) fn bump_counters(&mut self, last_node_id: u64, last_link_id: u64) {
    self.last_node_id = self.last_node_id.max(last_node_id);
    self.last_link_id = self.last_link_id.max(last_link_id);
  }

  /// The link writing to a given input, if any. On an invalid graph with
  /// several writers this is the first one.
  pub fn incoming_link(&self, node_id: NodeId, input_index: usize) -> Option<&Link> {
    self
      .links
      .iter()
      .find(|l| l.target_node_id == node_id && l.target_input_index == input_index)
  }

  pub fn incoming_links(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
    self.links.iter().filter(move |l| l.target_node_id == node_id)
  }

  pub fn outgoing_links(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
    self.links.iter().filter(move |l| l.source_node_id == node_id)
  }

  /// Distinct nodes feeding the given node, in link order.
  pub fn upstream(&self, node_id: NodeId) -> Vec<NodeId> {
    let mut ids = Vec::new();
    for link in self.incoming_links(node_id) {
      if !ids.contains(&link.source_node_id) {
        ids.push(link.source_node_id);
      }
    }
    ids
  }

  /// Distinct nodes fed by the given node, in link order.
  pub fn downstream(&self, node_id: NodeId) -> Vec<NodeId> {
    let mut ids = Vec::new();
    for link in self.outgoing_links(node_id) {
      if !ids.contains(&link.target_node_id) {
        ids.push(link.target_node_id);
      }
    }
    ids
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn function(name: &str) -> NodeKind {
    NodeKind::Function(FunctionRef::new("/tmp/funcs.py", name))
  }

  #[test]
  fn test_ids_are_not_reused_after_removal() {
    let mut graph = Graph::new();
    let a = graph.add_node(function("a"), vec![], vec![], BTreeMap::new());
    let b = graph.add_node(function("b"), vec![], vec![], BTreeMap::new());
    graph.remove_node(b);
    let c = graph.add_node(function("c"), vec![], vec![], BTreeMap::new());

    assert_eq!(a, NodeId(1));
    assert_eq!(c, NodeId(3));
    assert_eq!(graph.node_ids(), vec![a, c]);
    assert_eq!(graph.position(c), Some(1));
  }

  #[test]
  fn test_insert_duplicate_node() {
    let mut graph = Graph::new();
    graph.insert_node(Node::new(NodeId(5), function("a"))).unwrap();
    let err = graph
      .insert_node(Node::new(NodeId(5), function("b")))
      .unwrap_err();

    assert_eq!(err, GraphError::DuplicateNodeId(NodeId(5)));
    assert_eq!(graph.last_node_id(), 5);
  }

  #[test]
  fn test_connect_takes_type_from_source_port() {
    let mut graph = Graph::new();
    let a = graph.add_node(
      function("a"),
      vec![],
      vec![Port::typed("rows", "list")],
      BTreeMap::new(),
    );
    let b = graph.add_node(function("b"), vec![Port::new("rows")], vec![], BTreeMap::new());
    let link = graph.connect(a, 0, b, 0);

    assert_eq!(graph.link(link).unwrap().link_type.as_deref(), Some("list"));
    assert_eq!(graph.upstream(b), vec![a]);
    assert_eq!(graph.downstream(a), vec![b]);
    assert_eq!(graph.incoming_link(b, 0).map(|l| l.id), Some(link));
  }

  #[test]
  fn test_remove_keeps_links_and_detach_drops_them() {
    let mut graph = Graph::new();
    let a = graph.add_node(function("a"), vec![], vec![Port::new("x")], BTreeMap::new());
    let b = graph.add_node(function("b"), vec![Port::new("x")], vec![], BTreeMap::new());
    graph.connect(a, 0, b, 0);

    graph.remove_node(a);
    assert_eq!(graph.links().len(), 1);

    let removed = graph.detach_node(a);
    assert_eq!(removed.len(), 1);
    assert!(graph.links().is_empty());
  }

  #[test]
  fn test_rebind_keeps_variant() {
    let mut graph = Graph::new();
    let id = graph.add_node(
      NodeKind::Load(FunctionRef::new("/tmp/a.py", "load")),
      vec![],
      vec![Port::new("rows")],
      BTreeMap::new(),
    );

    graph
      .rebind(
        id,
        FunctionRef::new("/tmp/a.py", "load_all"),
        vec![Port::new("path")],
        vec![],
      )
      .unwrap();

    let node = graph.node(id).unwrap();
    assert!(matches!(node.kind, NodeKind::Load(_)));
    assert_eq!(node.function_ref().function_name, "load_all");
    assert_eq!(node.inputs, vec![Port::new("path")]);
    assert!(node.outputs.is_empty());
  }

  #[test]
  fn test_mutating_missing_node() {
    let mut graph = Graph::new();
    assert_eq!(
      graph.set_parameter(NodeId(9), "x", json!(1)),
      Err(GraphError::NodeNotFound(NodeId(9)))
    );
    assert_eq!(
      graph.set_status(NodeId(9), NodeStatus::Failed),
      Err(GraphError::NodeNotFound(NodeId(9)))
    );
  }

  #[test]
  fn test_reset_statuses() {
    let mut graph = Graph::new();
    let a = graph.add_node(function("a"), vec![], vec![], BTreeMap::new());
    graph.set_status(a, NodeStatus::Failed).unwrap();
    graph.reset_statuses();

    assert_eq!(graph.node(a).unwrap().status, NodeStatus::Pending);
  }
}
