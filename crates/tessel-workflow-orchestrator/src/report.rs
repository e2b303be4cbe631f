//! Run reports.
//!
//! A [`LiveReport`] is created with one `Pending` record per planned node and
//! updated as nodes settle, so a caller can poll partial state mid-run. The
//! final [`RunReport`] is a snapshot taken after the last stage.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tessel_task_runtime::Values;
use tessel_workflow::{NodeId, NodeStatus};

/// Why a node did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeFailure {
  /// The executor reported an error.
  Execution { message: String },
  /// The executor returned without a declared output.
  MissingOutput { name: String },
  /// The executor call panicked.
  Panicked { message: String },
  /// An upstream node failed or was skipped.
  UpstreamFailed { upstream: NodeId },
  /// The run was cancelled before this node was dispatched.
  CancelledBeforeStart,
}

impl fmt::Display for NodeFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeFailure::Execution { message } => write!(f, "{message}"),
      NodeFailure::MissingOutput { name } => write!(f, "missing output '{name}'"),
      NodeFailure::Panicked { message } => write!(f, "executor panicked: {message}"),
      NodeFailure::UpstreamFailed { upstream } => write!(f, "upstream node {upstream} did not succeed"),
      NodeFailure::CancelledBeforeStart => f.write_str("cancelled before start"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
  /// Every node succeeded.
  Completed,
  /// The plan ran to exhaustion but some node failed or was skipped.
  CompletedWithErrors,
  /// The run was cancelled before every node was dispatched.
  Aborted,
}

impl fmt::Display for OverallStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      OverallStatus::Completed => "completed",
      OverallStatus::CompletedWithErrors => "completed_with_errors",
      OverallStatus::Aborted => "aborted",
    };
    f.write_str(s)
  }
}

/// What happened to one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeRecord {
  pub status: NodeStatus,
  /// Resolved input values, set at dispatch.
  #[serde(skip_serializing_if = "Values::is_empty")]
  pub inputs: Values,
  #[serde(skip_serializing_if = "Values::is_empty")]
  pub outputs: Values,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<NodeFailure>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub finished_at: Option<DateTime<Utc>>,
}

/// The outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
  pub run_id: String,
  pub per_node: BTreeMap<NodeId, NodeRecord>,
  /// `None` while the run is still in progress.
  pub overall_status: Option<OverallStatus>,
  pub started_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
  pub fn node(&self, node_id: NodeId) -> Option<&NodeRecord> {
    self.per_node.get(&node_id)
  }

  pub fn status_of(&self, node_id: NodeId) -> Option<NodeStatus> {
    self.node(node_id).map(|r| r.status)
  }

  pub fn count(&self, status: NodeStatus) -> usize {
    self.per_node.values().filter(|r| r.status == status).count()
  }
}

/// A run report shared between the orchestrator and its observers.
///
/// Each node writes only its own entry, so a single lock over the map is
/// enough.
#[derive(Debug, Clone)]
pub struct LiveReport {
  inner: Arc<RwLock<RunReport>>,
}

impl LiveReport {
  pub(crate) fn new(run_id: String, node_ids: impl IntoIterator<Item = NodeId>) -> Self {
    let per_node = node_ids
      .into_iter()
      .map(|id| (id, NodeRecord::default()))
      .collect();

    Self {
      inner: Arc::new(RwLock::new(RunReport {
        run_id,
        per_node,
        overall_status: None,
        started_at: Utc::now(),
        finished_at: None,
      })),
    }
  }

  /// A copy of the report as it stands now.
  pub fn snapshot(&self) -> RunReport {
    self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn status(&self, node_id: NodeId) -> Option<NodeStatus> {
    let report = self.inner.read().unwrap_or_else(|e| e.into_inner());
    report.status_of(node_id)
  }

  pub fn is_finished(&self) -> bool {
    let report = self.inner.read().unwrap_or_else(|e| e.into_inner());
    report.overall_status.is_some()
  }

  /// Recorded outputs of a node, only once it has succeeded.
  pub(crate) fn outputs_of(&self, node_id: NodeId) -> Option<Values> {
    let report = self.inner.read().unwrap_or_else(|e| e.into_inner());
    report
      .per_node
      .get(&node_id)
      .filter(|r| r.status == NodeStatus::Succeeded)
      .map(|r| r.outputs.clone())
  }

  fn update(&self, node_id: NodeId, f: impl FnOnce(&mut NodeRecord)) {
    let mut report = self.inner.write().unwrap_or_else(|e| e.into_inner());
    f(report.per_node.entry(node_id).or_default());
  }

  pub(crate) fn start(&self, node_id: NodeId, inputs: Values) {
    self.update(node_id, |record| {
      record.status = NodeStatus::Running;
      record.inputs = inputs;
      record.started_at = Some(Utc::now());
    });
  }

  pub(crate) fn succeed(&self, node_id: NodeId, outputs: Values) {
    self.update(node_id, |record| {
      record.status = NodeStatus::Succeeded;
      record.outputs = outputs;
      record.finished_at = Some(Utc::now());
    });
  }

  pub(crate) fn fail(&self, node_id: NodeId, error: NodeFailure) {
    self.update(node_id, |record| {
      record.status = NodeStatus::Failed;
      record.error = Some(error);
      record.finished_at = Some(Utc::now());
    });
  }

  pub(crate) fn skip(&self, node_id: NodeId, reason: NodeFailure) {
    self.update(node_id, |record| {
      record.status = NodeStatus::Skipped;
      record.error = Some(reason);
      record.finished_at = Some(Utc::now());
    });
  }

  /// Seal the report and return the final snapshot.
  pub(crate) fn finish(&self) -> RunReport {
    let mut report = self.inner.write().unwrap_or_else(|e| e.into_inner());

    let aborted = report
      .per_node
      .values()
      .any(|r| r.error == Some(NodeFailure::CancelledBeforeStart));
    let all_succeeded = report
      .per_node
      .values()
      .all(|r| r.status == NodeStatus::Succeeded);

    report.overall_status = Some(if aborted {
      OverallStatus::Aborted
    } else if all_succeeded {
      OverallStatus::Completed
    } else {
      OverallStatus::CompletedWithErrors
    });
    report.finished_at = Some(Utc::now());
    report.clone()
  }
}
