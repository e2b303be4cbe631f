//! Node execution contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessel_workflow::{FunctionRef, NodeId};

use crate::error::ExecutionError;

/// Named values flowing into or out of a node.
pub type Values = BTreeMap<String, serde_json::Value>;

/// Everything an executor needs to run one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
  /// Run this invocation belongs to.
  pub run_id: String,
  pub node_id: NodeId,
  pub function_ref: FunctionRef,
  /// Input values keyed by input port name.
  pub inputs: Values,
  /// Declared output port names, in port order. Lets an executor spread a
  /// positional result across named outputs.
  pub output_names: Vec<String>,
}

/// Runs a node's underlying function.
///
/// Calls for distinct nodes of the same stage may be in flight at the same
/// time. Every call must settle, either with output values keyed by output
/// port name or with an error.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute(&self, request: ExecutionRequest) -> Result<Values, ExecutionError>;
}
