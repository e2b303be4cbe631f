//! Error types for planning and orchestration.

use serde::Serialize;
use tessel_workflow::{NodeId, StructuralError};
use thiserror::Error;

/// An input with neither an incoming link nor a configured default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRequiredInput {
  pub node_id: NodeId,
  /// Names of every unresolvable input on this node, in port order.
  pub input_names: Vec<String>,
}

/// Errors that prevent a plan from being produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  /// The graph is malformed. Carries every violation found.
  #[error("graph has {} structural error(s): {}", .0.len(), summarize(.0))]
  Structural(Vec<StructuralError>),

  /// Some nodes have inputs that cannot be resolved.
  #[error("{} node(s) have missing required inputs", .0.len())]
  MissingInputs(Vec<MissingRequiredInput>),

  /// The staged ordering referenced a node the graph does not hold.
  #[error("plan references unknown node {node_id}")]
  Inconsistent { node_id: NodeId },
}

fn summarize(errors: &[StructuralError]) -> String {
  errors
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}

/// Errors that can occur when starting a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
  #[error("invalid orchestrator configuration: {message}")]
  InvalidConfig { message: String },

  #[error(transparent)]
  Plan(#[from] PlanError),
}
