use std::collections::BTreeMap;

use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A directed link between an output port and an input port.
///
/// Always written as the 6-tuple
/// `[id, sourceNodeId, sourceOutputIndex, targetNodeId, targetInputIndex, type]`.
/// Read from either that tuple or a keyed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
  pub id: u64,
  pub source_node_id: u64,
  pub source_output_index: usize,
  pub target_node_id: u64,
  pub target_input_index: usize,
  pub link_type: Option<String>,
}

impl Serialize for LinkDef {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut tuple = serializer.serialize_tuple(6)?;
    tuple.serialize_element(&self.id)?;
    tuple.serialize_element(&self.source_node_id)?;
    tuple.serialize_element(&self.source_output_index)?;
    tuple.serialize_element(&self.target_node_id)?;
    tuple.serialize_element(&self.target_input_index)?;
    tuple.serialize_element(&self.link_type)?;
    tuple.end()
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLink {
  Tuple(u64, u64, usize, u64, usize, serde_json::Value),
  Record(LinkRecord),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRecord {
  id: u64,
  #[serde(alias = "origin_id")]
  source_node_id: u64,
  #[serde(alias = "origin_slot")]
  source_output_index: usize,
  #[serde(alias = "target_id")]
  target_node_id: u64,
  #[serde(alias = "target_slot")]
  target_input_index: usize,
  #[serde(rename = "type", default)]
  link_type: serde_json::Value,
}

/// Graph libraries write link types as strings, numbers or null.
fn link_type_from_value(value: serde_json::Value) -> Option<String> {
  match value {
    serde_json::Value::Null => None,
    serde_json::Value::String(s) => Some(s),
    other => Some(other.to_string()),
  }
}

impl From<RawLink> for LinkDef {
  fn from(raw: RawLink) -> Self {
    match raw {
      RawLink::Tuple(id, source, source_index, target, target_index, link_type) => Self {
        id,
        source_node_id: source,
        source_output_index: source_index,
        target_node_id: target,
        target_input_index: target_index,
        link_type: link_type_from_value(link_type),
      },
      RawLink::Record(r) => Self {
        id: r.id,
        source_node_id: r.source_node_id,
        source_output_index: r.source_output_index,
        target_node_id: r.target_node_id,
        target_input_index: r.target_input_index,
        link_type: link_type_from_value(r.link_type),
      },
    }
  }
}

impl<'de> Deserialize<'de> for LinkDef {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    RawLink::deserialize(deserializer).map(LinkDef::from)
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLinks {
  List(Vec<LinkDef>),
  Keyed(BTreeMap<String, LinkDef>),
}

/// Deserialize `links` from an array or an object keyed by link id.
///
/// Keyed input is normalized into an array ordered by link id.
pub(crate) fn deserialize_links<'de, D>(deserializer: D) -> Result<Vec<LinkDef>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<RawLinks>::deserialize(deserializer)?;
  Ok(match raw {
    None => Vec::new(),
    Some(RawLinks::List(links)) => links,
    Some(RawLinks::Keyed(map)) => {
      let mut links: Vec<LinkDef> = map.into_values().collect();
      links.sort_by_key(|l| l.id);
      links
    }
  })
}
