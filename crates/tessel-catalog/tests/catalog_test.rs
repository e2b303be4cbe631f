use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tessel_catalog::{CatalogError, FunctionCatalog, FunctionKind};
use tessel_task_runtime::{ExtractionError, ParamSpec, Signature, SignatureExtractor};
use tessel_workflow::{FunctionRef, Graph, GraphError, NodeId, NodeKind, Port};

/// Extractor backed by a fixed table of signatures.
#[derive(Default)]
struct TableExtractor {
  signatures: std::sync::Mutex<HashMap<FunctionRef, Signature>>,
  calls: AtomicUsize,
}

impl TableExtractor {
  fn with(self, function_ref: FunctionRef, params: &[&str], returns: &[&str]) -> Self {
    self.set(function_ref, params, returns);
    self
  }

  fn set(&self, function_ref: FunctionRef, params: &[&str], returns: &[&str]) {
    let signature = Signature {
      function_name: function_ref.function_name.clone(),
      parameters: params.iter().map(|p| ParamSpec::new(*p)).collect(),
      return_values: returns.iter().map(|r| ParamSpec::new(*r)).collect(),
      line: Some(1),
    };
    self.signatures.lock().unwrap().insert(function_ref, signature);
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl SignatureExtractor for TableExtractor {
  async fn extract(&self, function_ref: &FunctionRef) -> Result<Signature, ExtractionError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .signatures
      .lock()
      .unwrap()
      .get(function_ref)
      .cloned()
      .ok_or_else(|| ExtractionError::FunctionNotFound {
        path: function_ref.file_path().to_path_buf(),
        function_name: function_ref.function_name.clone(),
      })
  }
}

fn load_ref() -> FunctionRef {
  FunctionRef::new("/work/io.py", "read_rows")
}

fn count_ref() -> FunctionRef {
  FunctionRef::new("/work/stats.py", "count")
}

fn extractor() -> Arc<TableExtractor> {
  Arc::new(
    TableExtractor::default()
      .with(load_ref(), &["path"], &["rows"])
      .with(count_ref(), &["rows", "distinct"], &["n"]),
  )
}

#[tokio::test]
async fn test_add_node_uses_signature_ports() {
  let extractor = extractor();
  let catalog = FunctionCatalog::new(extractor.clone());
  let mut graph = Graph::new();

  let id = catalog
    .add_function_node(
      &mut graph,
      load_ref(),
      FunctionKind::Load,
      BTreeMap::from([("path".to_string(), json!("data.csv"))]),
    )
    .await
    .unwrap();

  let node = graph.node(id).unwrap();
  assert_eq!(node.kind, NodeKind::Load(load_ref()));
  assert_eq!(node.inputs, vec![Port::new("path")]);
  assert_eq!(node.outputs, vec![Port::new("rows")]);
  assert_eq!(node.parameters["path"], json!("data.csv"));
}

#[tokio::test]
async fn test_signatures_are_cached() {
  let extractor = extractor();
  let catalog = FunctionCatalog::new(extractor.clone());
  let mut graph = Graph::new();

  for _ in 0..3 {
    catalog
      .add_function_node(&mut graph, count_ref(), FunctionKind::Function, BTreeMap::new())
      .await
      .unwrap();
  }

  assert_eq!(graph.len(), 3);
  assert_eq!(extractor.calls(), 1);

  catalog.invalidate_file(Path::new("/work/stats.py"));
  catalog.signature(&count_ref()).await.unwrap();
  assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_failed_extraction_leaves_graph_unchanged() {
  let catalog = FunctionCatalog::new(extractor());
  let mut graph = Graph::new();
  let missing = FunctionRef::new("/work/stats.py", "median");

  let err = catalog
    .add_function_node(&mut graph, missing, FunctionKind::Function, BTreeMap::new())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    CatalogError::Extraction(ExtractionError::FunctionNotFound { .. })
  ));
  assert!(graph.is_empty());
  assert_eq!(graph.last_node_id(), 0);
}

#[tokio::test]
async fn test_unknown_parameter_is_rejected() {
  let catalog = FunctionCatalog::new(extractor());
  let mut graph = Graph::new();

  let err = catalog
    .add_function_node(
      &mut graph,
      load_ref(),
      FunctionKind::Load,
      BTreeMap::from([("encoding".to_string(), json!("utf-8"))]),
    )
    .await
    .unwrap_err();

  assert_eq!(
    err,
    CatalogError::UnknownParameter {
      function_name: "read_rows".to_string(),
      name: "encoding".to_string(),
    }
  );
  assert!(graph.is_empty());
}

#[tokio::test]
async fn test_rebind_reextracts_and_keeps_links() {
  let extractor = extractor();
  let catalog = FunctionCatalog::new(extractor.clone());
  let mut graph = Graph::new();

  let load = catalog
    .add_function_node(&mut graph, load_ref(), FunctionKind::Load, BTreeMap::new())
    .await
    .unwrap();
  let count = catalog
    .add_function_node(&mut graph, count_ref(), FunctionKind::Function, BTreeMap::new())
    .await
    .unwrap();
  graph.connect(load, 0, count, 0);

  // The source changed: `count` now takes a single `values` argument.
  extractor.set(count_ref(), &["values"], &["n", "unique"]);
  catalog.rebind_node(&mut graph, count, count_ref()).await.unwrap();

  let node = graph.node(count).unwrap();
  assert_eq!(node.inputs, vec![Port::new("values")]);
  assert_eq!(node.outputs, vec![Port::new("n"), Port::new("unique")]);
  assert_eq!(graph.links().len(), 1);
  assert!(graph.validate().is_empty());
  assert_eq!(extractor.calls(), 3);
}

#[tokio::test]
async fn test_rebind_unknown_node() {
  let catalog = FunctionCatalog::new(extractor());
  let mut graph = Graph::new();

  let err = catalog
    .rebind_node(&mut graph, NodeId(42), count_ref())
    .await
    .unwrap_err();

  assert_eq!(err, CatalogError::Graph(GraphError::NodeNotFound(NodeId(42))));
}
