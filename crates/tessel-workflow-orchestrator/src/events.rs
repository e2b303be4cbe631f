//! Execution events and notifiers for observability.
//!
//! Events are emitted while a run progresses so that consumers can stream
//! status to an editor, persist it, or just log it.

use serde::Serialize;
use tessel_task_runtime::Values;
use tessel_workflow::NodeId;
use tokio::sync::mpsc;

use crate::report::{NodeFailure, OverallStatus};

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// The plan was accepted and the run has started.
  RunStarted {
    run_id: String,
    node_count: usize,
    stage_count: usize,
  },

  /// A stage is about to be dispatched.
  StageStarted { run_id: String, stage: usize },

  /// A node's executor call has started.
  NodeStarted { run_id: String, node_id: NodeId },

  NodeSucceeded {
    run_id: String,
    node_id: NodeId,
    outputs: Values,
  },

  NodeFailed {
    run_id: String,
    node_id: NodeId,
    error: NodeFailure,
  },

  /// A node was never started, either because an upstream node did not
  /// succeed or because the run was cancelled.
  NodeSkipped {
    run_id: String,
    node_id: NodeId,
    reason: NodeFailure,
  },

  RunFinished {
    run_id: String,
    status: OverallStatus,
  },
}

/// Trait for receiving execution events.
///
/// The orchestrator calls `notify` for each event. Implementations must not
/// block; hand the event off and return.
pub trait ExecutionNotifier: Send + Sync + 'static {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a stage. Volume is a handful of
  // events per node.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
