//! Signature extraction contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessel_workflow::{FunctionRef, Port};

use crate::error::ExtractionError;

/// A named parameter or return value with an optional type annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
  pub name: String,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub type_hint: Option<String>,
}

impl ParamSpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      type_hint: None,
    }
  }

  pub fn to_port(&self) -> Port {
    Port {
      name: self.name.clone(),
      type_hint: self.type_hint.clone(),
    }
  }
}

/// What a function looks like from the outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
  pub function_name: String,
  pub parameters: Vec<ParamSpec>,
  pub return_values: Vec<ParamSpec>,
  /// 1-based line of the definition in its source file, when known.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line: Option<u32>,
}

impl Signature {
  pub fn input_ports(&self) -> Vec<Port> {
    self.parameters.iter().map(ParamSpec::to_port).collect()
  }

  pub fn output_ports(&self) -> Vec<Port> {
    self.return_values.iter().map(ParamSpec::to_port).collect()
  }
}

/// Derives a node's port definitions from its function reference.
///
/// Holds no state between calls that the caller relies on.
#[async_trait]
pub trait SignatureExtractor: Send + Sync {
  async fn extract(&self, function_ref: &FunctionRef) -> Result<Signature, ExtractionError>;
}
