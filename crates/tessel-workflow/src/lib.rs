//! Tessel Workflow
//!
//! This crate provides the typed in-memory graph for tessel: function nodes,
//! their ports, and the links that carry values between them.
//!
//! Key differences from `tessel-config`:
//! - Nodes are addressed by id only; links never hold references to nodes
//! - Structural problems are reported as values by [`Graph::validate`]
//! - [`resolve_stages`] orders nodes into independence stages (Kahn's algorithm)
//!   and is the seed for an execution plan

mod document;
mod error;
mod graph;
mod link;
mod node;
mod resolver;
mod validate;

pub use error::{DanglingReason, GraphError, LinkEndpoint, StructuralError};
pub use graph::Graph;
pub use link::{Link, LinkId};
pub use node::{FunctionRef, Node, NodeId, NodeKind, NodeStatus, Port};
pub use resolver::{StagePartition, resolve_stages};
