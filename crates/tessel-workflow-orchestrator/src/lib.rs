//! Workflow orchestration for tessel.
//!
//! This crate turns a [`Graph`](tessel_workflow::Graph) into a run:
//!
//! ```text
//! Graph ──plan()──▶ ExecutionPlan ──Orchestrator::execute()──▶ RunExecution
//!                                                                   │
//!                                          report() ◀── LiveReport ─┤ (pollable)
//!                                                                   ▼
//!                                                       wait() ──▶ RunReport
//! ```
//!
//! - Planning validates the graph, stages it, and resolves where every input
//!   comes from. Structural and missing-input errors stop the run before any
//!   executor call.
//! - Stages run strictly in order; nodes inside a stage are spawned
//!   concurrently, optionally bounded by a semaphore.
//! - A failed node never aborts the run. Everything depending on it is
//!   skipped and independent work carries on.
//! - Cancellation stops new nodes from starting; in-flight executor calls are
//!   allowed to finish.
//!
//! # Usage
//!
//! ```ignore
//! use tessel_workflow_orchestrator::{Orchestrator, OrchestratorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default(), executor)?;
//! let report = orchestrator.run(&mut graph, CancellationToken::new()).await?;
//! println!("{:?}", report.overall_status);
//! ```

mod config;
mod error;
mod events;
mod orchestrator;
mod planner;
mod report;
mod task;

pub use config::OrchestratorConfig;
pub use error::{MissingRequiredInput, OrchestratorError, PlanError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use orchestrator::{Orchestrator, RunExecution, apply_statuses};
pub use planner::{ExecutionPlan, InputSource, PlannedInput, PlannedNode, Stage, plan};
pub use report::{LiveReport, NodeFailure, NodeRecord, OverallStatus, RunReport};
