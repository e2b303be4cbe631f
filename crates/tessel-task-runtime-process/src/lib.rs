//! Subprocess collaborators for tessel.
//!
//! [`PythonExecutor`] and [`PythonSignatureExtractor`] each spawn one
//! interpreter per call with a small embedded driver script. Requests go in
//! as JSON on stdin or argv; replies come back as JSON on stdout. Nothing is
//! kept alive between calls.

mod config;
mod executor;
mod extractor;
mod process;

pub use config::ProcessConfig;
pub use executor::PythonExecutor;
pub use extractor::PythonSignatureExtractor;
