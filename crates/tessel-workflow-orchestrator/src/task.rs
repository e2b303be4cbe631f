//! Execution of a single planned node.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tessel_task_runtime::{ExecutionRequest, NodeExecutor, Values};
use tessel_workflow::NodeId;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::planner::PlannedNode;
use crate::report::{LiveReport, NodeFailure};

/// Everything a node task shares with the rest of its run.
pub(crate) struct RunContext<N> {
  pub run_id: String,
  pub executor: Arc<dyn NodeExecutor>,
  pub notifier: Arc<N>,
  pub report: LiveReport,
  pub cancel: CancellationToken,
  pub semaphore: Option<Arc<Semaphore>>,
}

impl<N> Clone for RunContext<N> {
  fn clone(&self) -> Self {
    Self {
      run_id: self.run_id.clone(),
      executor: self.executor.clone(),
      notifier: self.notifier.clone(),
      report: self.report.clone(),
      cancel: self.cancel.clone(),
      semaphore: self.semaphore.clone(),
    }
  }
}

impl<N: ExecutionNotifier> RunContext<N> {
  pub fn skip(&self, node_id: NodeId, reason: NodeFailure) {
    info!(
      run_id = %self.run_id,
      node_id = %node_id,
      reason = %reason,
      "node_skipped"
    );
    self.report.skip(node_id, reason.clone());
    self.notifier.notify(ExecutionEvent::NodeSkipped {
      run_id: self.run_id.clone(),
      node_id,
      reason,
    });
  }

  pub fn fail(&self, node_id: NodeId, error: NodeFailure) {
    warn!(
      run_id = %self.run_id,
      node_id = %node_id,
      error = %error,
      "node_failed"
    );
    self.report.fail(node_id, error.clone());
    self.notifier.notify(ExecutionEvent::NodeFailed {
      run_id: self.run_id.clone(),
      node_id,
      error,
    });
  }

  fn succeed(&self, node_id: NodeId, outputs: Values) {
    info!(
      run_id = %self.run_id,
      node_id = %node_id,
      outputs = outputs.len(),
      "node_succeeded"
    );
    self.report.succeed(node_id, outputs.clone());
    self.notifier.notify(ExecutionEvent::NodeSucceeded {
      run_id: self.run_id.clone(),
      node_id,
      outputs,
    });
  }
}

/// A node whose inputs are resolved and which is ready to dispatch.
pub(crate) struct NodeTask<N> {
  ctx: RunContext<N>,
  node: PlannedNode,
  inputs: Values,
}

impl<N: ExecutionNotifier> NodeTask<N> {
  pub fn new(ctx: RunContext<N>, node: PlannedNode, inputs: Values) -> Self {
    Self { ctx, node, inputs }
  }

  /// Run the node to a terminal status, recording it in the report.
  #[instrument(name = "node", skip_all, fields(node_id = %self.node.node_id))]
  pub async fn run(self) {
    let NodeTask { ctx, node, inputs } = self;
    let node_id = node.node_id;

    let _permit = match &ctx.semaphore {
      Some(semaphore) => match semaphore.clone().acquire_owned().await {
        Ok(permit) => Some(permit),
        Err(_) => {
          ctx.skip(node_id, NodeFailure::CancelledBeforeStart);
          return;
        }
      },
      None => None,
    };

    // Cancellation may land while this node waits for a permit.
    if ctx.cancel.is_cancelled() {
      ctx.skip(node_id, NodeFailure::CancelledBeforeStart);
      return;
    }

    info!(
      run_id = %ctx.run_id,
      node_id = %node_id,
      function = %node.function_ref,
      "node_started"
    );
    ctx.report.start(node_id, inputs.clone());
    ctx.notifier.notify(ExecutionEvent::NodeStarted {
      run_id: ctx.run_id.clone(),
      node_id,
    });

    let request = ExecutionRequest {
      run_id: ctx.run_id.clone(),
      node_id,
      function_ref: node.function_ref.clone(),
      inputs,
      output_names: node.output_names.clone(),
    };

    let result = AssertUnwindSafe(ctx.executor.execute(request))
      .catch_unwind()
      .await;

    match result {
      Ok(Ok(outputs)) => match first_missing(&node.output_names, &outputs) {
        Some(name) => ctx.fail(node_id, NodeFailure::MissingOutput { name }),
        None => ctx.succeed(node_id, outputs),
      },
      Ok(Err(e)) => ctx.fail(
        node_id,
        NodeFailure::Execution {
          message: e.to_string(),
        },
      ),
      Err(panic) => ctx.fail(
        node_id,
        NodeFailure::Panicked {
          message: panic_message(panic.as_ref()),
        },
      ),
    }
  }
}

/// First declared output the executor did not return.
fn first_missing(output_names: &[String], outputs: &Values) -> Option<String> {
  output_names
    .iter()
    .find(|name| !outputs.contains_key(name.as_str()))
    .cloned()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
