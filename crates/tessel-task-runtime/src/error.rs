//! Collaborator errors.

use std::path::PathBuf;

/// Errors reported by a [`NodeExecutor`](crate::NodeExecutor).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
  /// The function ran and reported a failure.
  #[error("{message}")]
  Failed { message: String },

  /// The executor could not be started or talked to.
  #[error("executor unavailable: {message}")]
  Unavailable { message: String },

  /// The executor answered with something that is not a set of outputs.
  #[error("invalid executor output: {message}")]
  InvalidOutput { message: String },
}

impl ExecutionError {
  pub fn failed(message: impl Into<String>) -> Self {
    ExecutionError::Failed {
      message: message.into(),
    }
  }
}

/// Errors reported by a [`SignatureExtractor`](crate::SignatureExtractor).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
  #[error("source file not found: {}", path.display())]
  FileNotFound { path: PathBuf },

  #[error("failed to parse {}: {message}", path.display())]
  Unparseable { path: PathBuf, message: String },

  #[error("function '{function_name}' not found in {}", path.display())]
  FunctionNotFound { path: PathBuf, function_name: String },

  #[error("signature extractor unavailable: {message}")]
  Unavailable { message: String },
}
