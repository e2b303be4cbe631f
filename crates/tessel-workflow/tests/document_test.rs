//! Round-trip tests between persisted documents and the typed graph.

use std::collections::BTreeMap;

use serde_json::json;
use tessel_config::GraphDoc;
use tessel_workflow::{
  FunctionRef, Graph, GraphError, LinkId, NodeId, NodeKind, Port, StructuralError,
  resolve_stages,
};

fn sample_graph() -> Graph {
  let mut graph = Graph::new();
  let load = graph.add_node(
    NodeKind::Load(FunctionRef::new("/work/io.py", "read_rows")),
    vec![Port::typed("path", "str")],
    vec![Port::typed("rows", "list")],
    BTreeMap::from([("path".to_string(), json!("data.csv"))]),
  );
  let count = graph.add_node(
    NodeKind::Function(FunctionRef::new("/work/stats.py", "count")),
    vec![Port::new("rows")],
    vec![Port::new("n"), Port::new("empty")],
    BTreeMap::new(),
  );
  graph.connect(load, 0, count, 0);
  graph
}

#[test]
fn test_graph_round_trips_through_json() {
  let graph = sample_graph();

  let json = graph.to_doc().to_json_pretty().unwrap();
  let parsed = Graph::from_doc(GraphDoc::from_json(&json).unwrap()).unwrap();

  assert_eq!(parsed, graph);
}

#[test]
fn test_links_are_written_as_tuples() {
  let doc = sample_graph().to_doc();
  let value = serde_json::to_value(&doc).unwrap();

  assert_eq!(value["links"], json!([[1, 1, 0, 2, 0, "list"]]));
  assert_eq!(value["nodes"][0]["type"], "python/load");
  assert_eq!(value["nodes"][0]["outputs"][0]["links"], json!([1]));
  assert_eq!(value["nodes"][1]["inputs"][0]["link"], json!(1));
  assert_eq!(value["nodes"][0]["widgetParameter"]["path"], "data.csv");
}

#[test]
fn test_object_keyed_links_load_sorted_by_id() {
  let doc = GraphDoc::from_value(json!({
    "nodes": [
      { "id": 1, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "a" },
        "outputs": [{ "name": "x" }] },
      { "id": 2, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "b" },
        "inputs": [{ "name": "x" }, { "name": "y" }] }
    ],
    "links": {
      "4": [4, 1, 0, 2, 1, null],
      "3": [3, 1, 0, 2, 0, null]
    }
  }))
  .unwrap();

  let graph = Graph::from_doc(doc).unwrap();
  let ids: Vec<LinkId> = graph.links().iter().map(|l| l.id).collect();
  assert_eq!(ids, vec![LinkId(3), LinkId(4)]);
  assert_eq!(graph.last_link_id(), 4);
  assert_eq!(graph.last_node_id(), 2);
}

#[test]
fn test_persisted_counters_prevent_id_reuse() {
  let doc = GraphDoc::from_value(json!({
    "last_node_id": 10,
    "last_link_id": 20,
    "nodes": [
      { "id": 1, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "a" } }
    ],
    "links": []
  }))
  .unwrap();

  let mut graph = Graph::from_doc(doc).unwrap();
  let id = graph.add_node(
    NodeKind::Function(FunctionRef::new("/a.py", "b")),
    vec![],
    vec![],
    BTreeMap::new(),
  );
  assert_eq!(id, NodeId(11));
}

#[test]
fn test_duplicate_node_ids_are_rejected() {
  let doc = GraphDoc::from_value(json!({
    "nodes": [
      { "id": 1, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "a" } },
      { "id": 1, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "b" } }
    ],
    "links": []
  }))
  .unwrap();

  assert_eq!(
    Graph::from_doc(doc).unwrap_err(),
    GraphError::DuplicateNodeId(NodeId(1))
  );
}

#[test]
fn test_loaded_dangling_link_blocks_resolution() {
  let doc = GraphDoc::from_value(json!({
    "nodes": [
      { "id": 1, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "a" },
        "outputs": [{ "name": "x" }] },
      { "id": 2, "type": "python/function", "properties": { "filePath": "/a.py", "functionName": "b" },
        "inputs": [{ "name": "x" }] }
    ],
    "links": [[1, 1, 0, 2, 4, null]]
  }))
  .unwrap();

  let graph = Graph::from_doc(doc).unwrap();
  let errors = resolve_stages(&graph).unwrap_err();
  assert!(matches!(
    errors.as_slice(),
    [StructuralError::DanglingLinkReference { .. }]
  ));
}
