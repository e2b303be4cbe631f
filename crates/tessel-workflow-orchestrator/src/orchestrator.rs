//! The orchestrator: runs an execution plan stage by stage.

use std::sync::Arc;

use tessel_task_runtime::{NodeExecutor, Values};
use tessel_workflow::{Graph, NodeId, NodeStatus};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::planner::{ExecutionPlan, InputSource, PlannedNode, plan};
use crate::report::{LiveReport, NodeFailure, OverallStatus, RunReport};
use crate::task::{NodeTask, RunContext};

/// Drives runs of a graph against a [`NodeExecutor`].
pub struct Orchestrator<N: ExecutionNotifier = NoopNotifier> {
  executor: Arc<dyn NodeExecutor>,
  config: OrchestratorConfig,
  notifier: Arc<N>,
}

impl Orchestrator<NoopNotifier> {
  pub fn new(
    config: OrchestratorConfig,
    executor: Arc<dyn NodeExecutor>,
  ) -> Result<Self, OrchestratorError> {
    Self::with_notifier(config, executor, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> Orchestrator<N> {
  pub fn with_notifier(
    config: OrchestratorConfig,
    executor: Arc<dyn NodeExecutor>,
    notifier: N,
  ) -> Result<Self, OrchestratorError> {
    config.validate()?;
    Ok(Self {
      executor,
      config,
      notifier: Arc::new(notifier),
    })
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  pub fn notifier(&self) -> &N {
    &self.notifier
  }

  /// Plan the graph and start a run in the background.
  ///
  /// Node statuses on the graph are reset to `Pending`. Planning errors are
  /// returned before any executor call. Must be called from within a tokio
  /// runtime.
  pub fn execute(
    &self,
    graph: &mut Graph,
    cancel: CancellationToken,
  ) -> Result<RunExecution, OrchestratorError> {
    let plan = Arc::new(plan(graph)?);
    graph.reset_statuses();

    let run_id = uuid::Uuid::new_v4().to_string();
    let report = LiveReport::new(run_id.clone(), plan.node_ids());

    let ctx = RunContext {
      run_id: run_id.clone(),
      executor: self.executor.clone(),
      notifier: self.notifier.clone(),
      report: report.clone(),
      cancel,
      semaphore: self
        .config
        .max_concurrency
        .map(|limit| Arc::new(Semaphore::new(limit))),
    };

    let handle = tokio::spawn(drive(ctx, plan.clone()));

    Ok(RunExecution {
      run_id,
      plan,
      report,
      handle,
    })
  }

  /// Run the graph to completion and write terminal statuses back to it.
  pub async fn run(
    &self,
    graph: &mut Graph,
    cancel: CancellationToken,
  ) -> Result<RunReport, OrchestratorError> {
    let execution = self.execute(graph, cancel)?;
    let report = execution.wait().await;
    apply_statuses(graph, &report);
    Ok(report)
  }
}

/// Copy each node's status from a report onto the graph.
///
/// Nodes removed from the graph since the run started are ignored.
pub fn apply_statuses(graph: &mut Graph, report: &RunReport) {
  for (node_id, record) in &report.per_node {
    if !graph.contains_node(*node_id) {
      debug!(node_id = %node_id, "node removed during run, status not applied");
      continue;
    }
    if let Err(e) = graph.set_status(*node_id, record.status) {
      warn!(node_id = %node_id, error = %e, "failed to apply node status");
    }
  }
}

/// A handle to a run in progress.
///
/// Poll [`report`](Self::report) for partial state, or call
/// [`wait`](Self::wait) for the final report.
pub struct RunExecution {
  run_id: String,
  plan: Arc<ExecutionPlan>,
  report: LiveReport,
  handle: JoinHandle<RunReport>,
}

impl RunExecution {
  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  pub fn plan(&self) -> &ExecutionPlan {
    &self.plan
  }

  /// The live report, shared with the running stages.
  pub fn report(&self) -> &LiveReport {
    &self.report
  }

  /// Wait for the run to finish.
  pub async fn wait(self) -> RunReport {
    match self.handle.await {
      Ok(report) => report,
      Err(e) => {
        error!(run_id = %self.run_id, error = %e, "run task failed");
        fail_unsettled(&self.report, &self.plan, &e.to_string());
        self.report.finish()
      }
    }
  }
}

#[instrument(
  name = "run",
  skip(ctx, plan),
  fields(run_id = %ctx.run_id, stages = plan.stages.len())
)]
async fn drive<N: ExecutionNotifier>(ctx: RunContext<N>, plan: Arc<ExecutionPlan>) -> RunReport {
  info!(
    run_id = %ctx.run_id,
    nodes = plan.node_count(),
    stages = plan.stages.len(),
    "run_started"
  );
  ctx.notifier.notify(ExecutionEvent::RunStarted {
    run_id: ctx.run_id.clone(),
    node_count: plan.node_count(),
    stage_count: plan.stages.len(),
  });

  for stage in &plan.stages {
    info!(
      run_id = %ctx.run_id,
      stage = stage.index,
      nodes = stage.nodes.len(),
      "stage_started"
    );
    ctx.notifier.notify(ExecutionEvent::StageStarted {
      run_id: ctx.run_id.clone(),
      stage: stage.index,
    });

    let mut tasks = JoinSet::new();

    for node in &stage.nodes {
      if ctx.cancel.is_cancelled() {
        ctx.skip(node.node_id, NodeFailure::CancelledBeforeStart);
        continue;
      }

      match gather_inputs(&ctx.report, node) {
        Ok(inputs) => {
          let task = NodeTask::new(ctx.clone(), node.clone(), inputs);
          tasks.spawn(task.run());
        }
        Err(upstream) => ctx.skip(node.node_id, NodeFailure::UpstreamFailed { upstream }),
      }
    }

    // Stage k+1 never starts before every node of stage k has settled.
    while let Some(joined) = tasks.join_next().await {
      if let Err(e) = joined {
        warn!(run_id = %ctx.run_id, error = %e, "node task did not complete");
      }
    }

    // A task that died without settling still needs a terminal record.
    for node in &stage.nodes {
      if !ctx
        .report
        .status(node.node_id)
        .is_some_and(NodeStatus::is_terminal)
      {
        ctx.fail(
          node.node_id,
          NodeFailure::Panicked {
            message: "node task did not complete".to_string(),
          },
        );
      }
    }
  }

  let report = ctx.report.finish();
  let status = report.overall_status.unwrap_or(OverallStatus::Aborted);

  info!(
    run_id = %ctx.run_id,
    status = %status,
    succeeded = report.count(NodeStatus::Succeeded),
    failed = report.count(NodeStatus::Failed),
    skipped = report.count(NodeStatus::Skipped),
    "run_finished"
  );
  ctx.notifier.notify(ExecutionEvent::RunFinished {
    run_id: ctx.run_id.clone(),
    status,
  });

  report
}

/// Resolve a node's input values from upstream outputs and defaults.
///
/// Returns the first upstream node that has not succeeded, if any.
fn gather_inputs(report: &LiveReport, node: &PlannedNode) -> Result<Values, NodeId> {
  let mut values = Values::new();

  for input in &node.inputs {
    let value = match &input.source {
      InputSource::FromLink {
        source_node_id,
        source_output_name,
        ..
      } => report
        .outputs_of(*source_node_id)
        .and_then(|mut outputs| outputs.remove(source_output_name))
        .ok_or(*source_node_id)?,
      InputSource::FromParameterDefault { value } => value.clone(),
    };
    values.insert(input.name.clone(), value);
  }

  Ok(values)
}

fn fail_unsettled(report: &LiveReport, plan: &ExecutionPlan, message: &str) {
  for node_id in plan.node_ids() {
    if !report.status(node_id).is_some_and(NodeStatus::is_terminal) {
      report.fail(
        node_id,
        NodeFailure::Panicked {
          message: message.to_string(),
        },
      );
    }
  }
}
