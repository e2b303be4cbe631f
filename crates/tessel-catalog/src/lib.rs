//! Turning function references into graph nodes.
//!
//! The [`FunctionCatalog`] asks a
//! [`SignatureExtractor`](tessel_task_runtime::SignatureExtractor) what a
//! function looks like, caches the answer per function, and adds or rebinds
//! nodes with matching ports. A failed lookup never leaves a partial node
//! behind.

mod cache;
mod catalog;
mod error;

pub use cache::SignatureCache;
pub use catalog::{FunctionCatalog, FunctionKind};
pub use error::CatalogError;
