//! Runtime abstraction for tessel.
//!
//! The orchestrator never runs a function itself. It talks to two external
//! collaborators through the traits in this crate:
//!
//! - [`NodeExecutor`] runs one node's function with resolved input values and
//!   returns its output values, or an [`ExecutionError`].
//! - [`SignatureExtractor`] reads a function reference and reports its name,
//!   parameters and return values, or an [`ExtractionError`].
//!
//! Implementations are free to call in-process code, spawn a subprocess or
//! make an RPC. The only requirement is that every call eventually settles.

mod error;
mod executor;
mod signature;

pub use error::{ExecutionError, ExtractionError};
pub use executor::{ExecutionRequest, NodeExecutor, Values};
pub use signature::{ParamSpec, Signature, SignatureExtractor};
