//! Tessel Config
//!
//! This crate contains the serializable graph document types for tessel.
//! These types mirror what the graph editor writes to disk: a JSON object
//! with `nodes` and `links`, before it is loaded into the typed graph model.
//!
//! Documents can be loaded from:
//! - graph files saved by the editor
//! - JSON handed over by a host application
//!
//! The only shape that is normalized on read is the `links` collection, which
//! graph UI libraries emit either as an array of 6-tuples or as an object keyed
//! by link id. Documents are always written back in the array form.

mod document;
mod link;
mod node;

pub use document::GraphDoc;
pub use link::LinkDef;
pub use node::{FunctionProperties, NodeDef, NodeTypeDef, PortDef};
