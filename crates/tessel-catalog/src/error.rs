use tessel_task_runtime::ExtractionError;
use tessel_workflow::GraphError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
  #[error(transparent)]
  Extraction(#[from] ExtractionError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  /// A default was supplied for a name the function does not take.
  #[error("function '{function_name}' has no parameter '{name}'")]
  UnknownParameter { function_name: String, name: String },
}
