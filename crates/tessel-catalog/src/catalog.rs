//! The function-addition workflow.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tessel_task_runtime::{Signature, SignatureExtractor};
use tessel_workflow::{FunctionRef, Graph, GraphError, NodeId, NodeKind};
use tracing::{debug, info};

use crate::cache::SignatureCache;
use crate::error::CatalogError;

/// Which kind of node to create for a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FunctionKind {
  #[default]
  Function,
  Load,
}

impl FunctionKind {
  fn node_kind(self, function_ref: FunctionRef) -> NodeKind {
    match self {
      FunctionKind::Function => NodeKind::Function(function_ref),
      FunctionKind::Load => NodeKind::Load(function_ref),
    }
  }
}

/// Looks up function signatures and creates nodes from them.
pub struct FunctionCatalog {
  extractor: Arc<dyn SignatureExtractor>,
  cache: SignatureCache,
}

impl FunctionCatalog {
  pub fn new(extractor: Arc<dyn SignatureExtractor>) -> Self {
    Self {
      extractor,
      cache: SignatureCache::new(),
    }
  }

  pub fn cache(&self) -> &SignatureCache {
    &self.cache
  }

  /// Signature of a function, from cache when possible.
  pub async fn signature(&self, function_ref: &FunctionRef) -> Result<Signature, CatalogError> {
    if let Some(signature) = self.cache.get(function_ref) {
      debug!(function = %function_ref, "signature cache hit");
      return Ok(signature);
    }
    self.refresh(function_ref).await
  }

  /// Extract a signature again, replacing any cached copy.
  async fn refresh(&self, function_ref: &FunctionRef) -> Result<Signature, CatalogError> {
    let signature = self.extractor.extract(function_ref).await?;
    self.cache.insert(function_ref.clone(), signature.clone());
    Ok(signature)
  }

  /// Add a node for `function_ref` with ports taken from its signature.
  ///
  /// `parameters` become the node's defaults and must name parameters the
  /// function takes. On any error the graph is left unchanged.
  pub async fn add_function_node(
    &self,
    graph: &mut Graph,
    function_ref: FunctionRef,
    kind: FunctionKind,
    parameters: BTreeMap<String, serde_json::Value>,
  ) -> Result<NodeId, CatalogError> {
    let signature = self.signature(&function_ref).await?;

    if let Some(name) = parameters
      .keys()
      .find(|name| !signature.parameters.iter().any(|p| &p.name == *name))
    {
      return Err(CatalogError::UnknownParameter {
        function_name: signature.function_name,
        name: name.clone(),
      });
    }

    let node_id = graph.add_node(
      kind.node_kind(function_ref),
      signature.input_ports(),
      signature.output_ports(),
      parameters,
    );

    info!(
      node_id = %node_id,
      function = %signature.function_name,
      inputs = signature.parameters.len(),
      outputs = signature.return_values.len(),
      "node added"
    );
    Ok(node_id)
  }

  /// Point an existing node at `function_ref` after its source changed.
  ///
  /// Always re-extracts. Links are kept by port index, so any that no
  /// longer fit show up in validation.
  pub async fn rebind_node(
    &self,
    graph: &mut Graph,
    node_id: NodeId,
    function_ref: FunctionRef,
  ) -> Result<(), CatalogError> {
    if !graph.contains_node(node_id) {
      return Err(GraphError::NodeNotFound(node_id).into());
    }

    let signature = self.refresh(&function_ref).await?;
    graph.rebind(
      node_id,
      function_ref,
      signature.input_ports(),
      signature.output_ports(),
    )?;

    info!(node_id = %node_id, function = %signature.function_name, "node rebound");
    Ok(())
  }

  pub fn invalidate(&self, function_ref: &FunctionRef) {
    self.cache.remove(function_ref);
  }

  /// Forget every signature read from `path`.
  pub fn invalidate_file(&self, path: &Path) {
    let dropped = self.cache.remove_file(path);
    debug!(path = %path.display(), dropped, "signatures invalidated");
  }

  pub fn clear(&self) {
    self.cache.clear();
  }
}
