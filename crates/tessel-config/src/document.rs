use serde::{Deserialize, Serialize};

use crate::link::{LinkDef, deserialize_links};
use crate::node::NodeDef;

/// A graph document as persisted by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDoc {
  /// Highest node id ever handed out, so ids are not reused after deletion.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_node_id: Option<u64>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_link_id: Option<u64>,

  #[serde(default)]
  pub nodes: Vec<NodeDef>,

  #[serde(default, deserialize_with = "deserialize_links")]
  pub links: Vec<LinkDef>,
}

impl GraphDoc {
  /// Parse a document, normalizing object-keyed links into the array form.
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
    serde_json::from_value(value)
  }

  /// Serialize in the canonical form (links as an array of 6-tuples).
  pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}
