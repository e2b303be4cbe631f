use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identifier of a node, unique within one graph and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Opaque reference to the function a node executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
  pub file_path: PathBuf,
  pub function_name: String,
}

impl FunctionRef {
  pub fn new(file_path: impl Into<PathBuf>, function_name: impl Into<String>) -> Self {
    Self {
      file_path: file_path.into(),
      function_name: function_name.into(),
    }
  }

  pub fn file_path(&self) -> &Path {
    &self.file_path
  }
}

impl fmt::Display for FunctionRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.file_path.display(), self.function_name)
  }
}

/// The closed set of node variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
  /// Calls a function with values gathered from its inputs.
  Function(FunctionRef),
  /// A function that loads data into the graph. Executed like `Function`.
  Load(FunctionRef),
}

impl NodeKind {
  pub fn function_ref(&self) -> &FunctionRef {
    match self {
      NodeKind::Function(f) | NodeKind::Load(f) => f,
    }
  }

  /// Same variant, different function.
  pub fn with_function_ref(&self, function_ref: FunctionRef) -> Self {
    match self {
      NodeKind::Function(_) => NodeKind::Function(function_ref),
      NodeKind::Load(_) => NodeKind::Load(function_ref),
    }
  }
}

/// A named input or output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub type_hint: Option<String>,
}

impl Port {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      type_hint: None,
    }
  }

  pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      type_hint: Some(type_hint.into()),
    }
  }
}

/// Execution status of a node, owned by the orchestrator during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  #[default]
  Pending,
  Running,
  Succeeded,
  Failed,
  Skipped,
}

impl NodeStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Skipped
    )
  }
}

impl fmt::Display for NodeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      NodeStatus::Pending => "pending",
      NodeStatus::Running => "running",
      NodeStatus::Succeeded => "succeeded",
      NodeStatus::Failed => "failed",
      NodeStatus::Skipped => "skipped",
    };
    f.write_str(s)
  }
}

/// A unit of computation in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub id: NodeId,
  pub kind: NodeKind,
  /// Each input accepts at most one incoming link.
  pub inputs: Vec<Port>,
  /// Outputs fan out to any number of links.
  pub outputs: Vec<Port>,
  /// Literal defaults for inputs that have no incoming link.
  pub parameters: BTreeMap<String, serde_json::Value>,
  pub status: NodeStatus,
}

impl Node {
  pub fn new(id: NodeId, kind: NodeKind) -> Self {
    Self {
      id,
      kind,
      inputs: Vec::new(),
      outputs: Vec::new(),
      parameters: BTreeMap::new(),
      status: NodeStatus::Pending,
    }
  }

  pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
    self.inputs = inputs;
    self
  }

  pub fn with_outputs(mut self, outputs: Vec<Port>) -> Self {
    self.outputs = outputs;
    self
  }

  pub fn with_parameter(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
    self.parameters.insert(name.into(), value);
    self
  }

  pub fn function_ref(&self) -> &FunctionRef {
    self.kind.function_ref()
  }

  pub fn input_index(&self, name: &str) -> Option<usize> {
    self.inputs.iter().position(|p| p.name == name)
  }

  pub fn output_index(&self, name: &str) -> Option<usize> {
    self.outputs.iter().position(|p| p.name == name)
  }
}
