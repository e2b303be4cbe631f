use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
  /// Upper bound on executor calls in flight within one stage.
  /// `None` means unbounded (limited only by the stage size).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<usize>,
}

impl OrchestratorConfig {
  pub fn bounded(max_concurrency: usize) -> Self {
    Self {
      max_concurrency: Some(max_concurrency),
    }
  }

  pub fn validate(&self) -> Result<(), OrchestratorError> {
    if self.max_concurrency == Some(0) {
      return Err(OrchestratorError::InvalidConfig {
        message: "max_concurrency must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unbounded_by_default() {
    let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.max_concurrency, None);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_zero_is_invalid() {
    assert!(OrchestratorConfig::bounded(1).validate().is_ok());
    assert!(matches!(
      OrchestratorConfig::bounded(0).validate(),
      Err(OrchestratorError::InvalidConfig { .. })
    ));
  }
}
