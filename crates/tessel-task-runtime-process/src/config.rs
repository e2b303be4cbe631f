use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How to launch the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
  /// Interpreter executable, looked up on `PATH` when not absolute.
  #[serde(default = "default_interpreter")]
  pub interpreter: PathBuf,
  /// Working directory for spawned processes. Inherited when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<PathBuf>,
  /// Extra environment variables.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

fn default_interpreter() -> PathBuf {
  PathBuf::from("python3")
}

impl Default for ProcessConfig {
  fn default() -> Self {
    Self {
      interpreter: default_interpreter(),
      working_dir: None,
      env: BTreeMap::new(),
    }
  }
}

impl ProcessConfig {
  pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
    self.interpreter = interpreter.into();
    self
  }

  pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = Some(dir.into());
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }
}
