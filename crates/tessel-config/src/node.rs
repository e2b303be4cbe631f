use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
  pub id: u64,
  #[serde(rename = "type")]
  pub node_type: NodeTypeDef,
  pub properties: FunctionProperties,
  #[serde(default)]
  pub inputs: Vec<PortDef>,
  #[serde(default)]
  pub outputs: Vec<PortDef>,
  /// Literal values edited through the node's widgets, keyed by parameter name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub widget_parameter: BTreeMap<String, serde_json::Value>,
}

/// Registered node types understood by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeTypeDef {
  #[serde(rename = "python/function")]
  Function,
  #[serde(rename = "python/load")]
  Load,
}

/// Where a node's function lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionProperties {
  /// Path of the source file defining the function.
  pub file_path: String,
  pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
  pub name: String,

  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub port_type: Option<String>,

  /// Incoming link id (input ports only). Informational; the document's
  /// `links` array is authoritative.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub link: Option<u64>,

  /// Outgoing link ids (output ports only). Informational.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub links: Option<Vec<u64>>,
}

impl PortDef {
  pub fn new(name: impl Into<String>, port_type: Option<String>) -> Self {
    Self {
      name: name.into(),
      port_type,
      link: None,
      links: None,
    }
  }
}
