//! Reading function signatures with Python's own parser.

use std::collections::HashSet;
use std::ffi::OsStr;

use async_trait::async_trait;
use serde::Deserialize;
use tessel_task_runtime::{ExtractionError, ParamSpec, Signature, SignatureExtractor};
use tessel_workflow::FunctionRef;
use tracing::instrument;

use crate::config::ProcessConfig;
use crate::process::run_driver;

const DRIVER: &str = include_str!("driver/signature.py");

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reply {
  Error {
    error: String,
    #[serde(default)]
    message: Option<String>,
  },
  Found(Found),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Found {
  function_name: String,
  parameters: Vec<ParamSpec>,
  return_values: Vec<String>,
  line: Option<u32>,
}

/// Extracts signatures by parsing the source file with `ast` in a
/// subprocess. The file is never imported, so extraction has no side
/// effects.
#[derive(Debug, Clone, Default)]
pub struct PythonSignatureExtractor {
  config: ProcessConfig,
}

impl PythonSignatureExtractor {
  pub fn new(config: ProcessConfig) -> Self {
    Self { config }
  }
}

#[async_trait]
impl SignatureExtractor for PythonSignatureExtractor {
  #[instrument(name = "python_extract", skip(self, function_ref), fields(function = %function_ref))]
  async fn extract(&self, function_ref: &FunctionRef) -> Result<Signature, ExtractionError> {
    let output = run_driver(
      &self.config,
      DRIVER,
      [
        function_ref.file_path().as_os_str(),
        OsStr::new(&function_ref.function_name),
      ],
      None,
    )
    .await
    .map_err(|e| ExtractionError::Unavailable {
      message: format!("failed to run {}: {e}", self.config.interpreter.display()),
    })?;

    if !output.success {
      return Err(ExtractionError::Unavailable {
        message: output.error_summary(),
      });
    }

    parse_reply(function_ref, &output.stdout)
  }
}

fn parse_reply(function_ref: &FunctionRef, stdout: &str) -> Result<Signature, ExtractionError> {
  let path = function_ref.file_path().to_path_buf();
  let reply: Reply =
    serde_json::from_str(stdout.trim()).map_err(|e| ExtractionError::Unavailable {
      message: format!("unexpected extractor reply: {e}"),
    })?;

  match reply {
    Reply::Found(found) => Ok(Signature {
      function_name: found.function_name,
      parameters: found.parameters,
      return_values: output_ports(found.return_values),
      line: found.line,
    }),
    Reply::Error { error, message } => Err(match error.as_str() {
      "file_not_found" => ExtractionError::FileNotFound { path },
      "function_not_found" => ExtractionError::FunctionNotFound {
        path,
        function_name: function_ref.function_name.clone(),
      },
      "syntax" => ExtractionError::Unparseable {
        path,
        message: message.unwrap_or_default(),
      },
      other => ExtractionError::Unavailable {
        message: message.unwrap_or_else(|| other.to_string()),
      },
    }),
  }
}

/// One port per returned element. A repeated expression gets a numeric
/// suffix so the port count still matches the tuple the function returns.
fn output_ports(expressions: Vec<String>) -> Vec<ParamSpec> {
  let mut seen = HashSet::new();
  expressions
    .into_iter()
    .map(|expr| {
      let mut name = expr.clone();
      let mut n = 2;
      while !seen.insert(name.clone()) {
        name = format!("{expr}_{n}");
        n += 1;
      }
      ParamSpec::new(name)
    })
    .collect()
}
