//! Running a node's function in a fresh interpreter.

use std::ffi::OsStr;

use async_trait::async_trait;
use serde::Serialize;
use tessel_task_runtime::{ExecutionError, ExecutionRequest, NodeExecutor, Values};
use tracing::{debug, instrument};

use crate::config::ProcessConfig;
use crate::process::run_driver;

const DRIVER: &str = include_str!("driver/execute.py");

/// What the driver reads from stdin.
#[derive(Serialize)]
struct Payload<'a> {
  inputs: &'a Values,
  outputs: &'a [String],
}

/// Executes Python functions by importing their file in a subprocess.
///
/// Inputs are passed as keyword arguments. The return value is mapped onto
/// the declared output names: spread across them when the function returns
/// a tuple of matching length, or taken whole for a single output.
#[derive(Debug, Clone, Default)]
pub struct PythonExecutor {
  config: ProcessConfig,
}

impl PythonExecutor {
  pub fn new(config: ProcessConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ProcessConfig {
    &self.config
  }
}

#[async_trait]
impl NodeExecutor for PythonExecutor {
  #[instrument(
    name = "python_execute",
    skip(self, request),
    fields(node_id = %request.node_id, function = %request.function_ref)
  )]
  async fn execute(&self, request: ExecutionRequest) -> Result<Values, ExecutionError> {
    let payload = serde_json::to_vec(&Payload {
      inputs: &request.inputs,
      outputs: &request.output_names,
    })
    .map_err(|e| ExecutionError::InvalidOutput {
      message: format!("failed to encode inputs: {e}"),
    })?;

    let output = run_driver(
      &self.config,
      DRIVER,
      [
        request.function_ref.file_path().as_os_str(),
        OsStr::new(&request.function_ref.function_name),
      ],
      Some(&payload),
    )
    .await
    .map_err(|e| ExecutionError::Unavailable {
      message: format!("failed to run {}: {e}", self.config.interpreter.display()),
    })?;

    if !output.stderr.is_empty() {
      debug!(stderr = %output.stderr, "driver stderr");
    }

    if !output.success {
      return Err(ExecutionError::failed(output.error_summary()));
    }

    parse_outputs(&output.stdout)
  }
}

fn parse_outputs(stdout: &str) -> Result<Values, ExecutionError> {
  serde_json::from_str(stdout.trim()).map_err(|e| ExecutionError::InvalidOutput {
    message: format!("expected a JSON object of outputs: {e}"),
  })
}
