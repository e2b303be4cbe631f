use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tessel_catalog::{FunctionCatalog, FunctionKind};
use tessel_config::GraphDoc;
use tessel_task_runtime_process::{ProcessConfig, PythonExecutor, PythonSignatureExtractor};
use tessel_workflow::{FunctionRef, Graph};
use tessel_workflow_orchestrator::{
  Orchestrator, OrchestratorConfig, OrchestratorError, OverallStatus, PlanError, plan,
};

/// Tessel - run graphs of Python functions in dependency order
#[derive(Parser)]
#[command(name = "tessel")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Python interpreter used to run and inspect functions
  #[arg(long, global = true, default_value = "python3")]
  python: PathBuf,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a graph for structural errors
  Validate {
    /// Path to the graph file
    graph_file: PathBuf,
  },

  /// Print the execution plan for a graph
  Plan {
    /// Path to the graph file
    graph_file: PathBuf,
  },

  /// Run every node of a graph and print the run report
  Run {
    /// Path to the graph file
    graph_file: PathBuf,

    /// Maximum number of nodes running at once within a stage
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Cancel the run after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Working directory for function processes
    #[arg(long)]
    cwd: Option<PathBuf>,
  },

  /// Add a node for a Python function to a graph
  Add {
    /// Path to the graph file (created if missing)
    graph_file: PathBuf,

    /// Python source file defining the function
    #[arg(long)]
    file: PathBuf,

    /// Function name
    #[arg(long)]
    function: String,

    /// Add the node as a data-loading node
    #[arg(long)]
    load: bool,

    /// Default value for a parameter, as name=value (value parsed as JSON,
    /// otherwise taken as a string)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let process = ProcessConfig::default().with_interpreter(cli.python);

  let ok = match cli.command {
    Some(Commands::Validate { graph_file }) => validate(&graph_file)?,
    Some(Commands::Plan { graph_file }) => print_plan(&graph_file)?,
    Some(Commands::Run {
      graph_file,
      max_concurrency,
      timeout_ms,
      cwd,
    }) => {
      let process = match cwd {
        Some(dir) => process.with_working_dir(dir),
        None => process,
      };
      let config = OrchestratorConfig { max_concurrency };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_graph(&graph_file, config, process, timeout_ms))?
    }
    Some(Commands::Add {
      graph_file,
      file,
      function,
      load,
      params,
    }) => {
      let kind = if load {
        FunctionKind::Load
      } else {
        FunctionKind::Function
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(add_node(
        &graph_file,
        FunctionRef::new(file, function),
        kind,
        params.into_iter().collect(),
        process,
      ))?;
      true
    }
    None => {
      println!("tessel - use --help to see available commands");
      true
    }
  };

  if !ok {
    std::process::exit(1);
  }
  Ok(())
}

fn load_graph(graph_file: &Path) -> Result<Graph> {
  let content = std::fs::read_to_string(graph_file)
    .with_context(|| format!("failed to read graph file: {}", graph_file.display()))?;
  let doc = GraphDoc::from_json(&content)
    .with_context(|| format!("failed to parse graph file: {}", graph_file.display()))?;
  Graph::from_doc(doc).with_context(|| format!("invalid graph file: {}", graph_file.display()))
}

fn save_graph(graph_file: &Path, graph: &Graph) -> Result<()> {
  let json = graph.to_doc().to_json_pretty()?;
  std::fs::write(graph_file, json)
    .with_context(|| format!("failed to write graph file: {}", graph_file.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn validate(graph_file: &Path) -> Result<bool> {
  let graph = load_graph(graph_file)?;
  let errors = graph.validate();
  print_json(&errors)?;
  Ok(errors.is_empty())
}

fn print_plan(graph_file: &Path) -> Result<bool> {
  let graph = load_graph(graph_file)?;
  match plan(&graph) {
    Ok(plan) => {
      print_json(&plan)?;
      Ok(true)
    }
    Err(e) => {
      print_json(&plan_error_json(&e))?;
      Ok(false)
    }
  }
}

fn plan_error_json(error: &PlanError) -> serde_json::Value {
  match error {
    PlanError::Structural(errors) => json!({ "structural_errors": errors }),
    PlanError::MissingInputs(missing) => json!({ "missing_inputs": missing }),
    PlanError::Inconsistent { .. } => json!({ "error": error.to_string() }),
  }
}

async fn run_graph(
  graph_file: &Path,
  config: OrchestratorConfig,
  process: ProcessConfig,
  timeout_ms: Option<u64>,
) -> Result<bool> {
  let mut graph = load_graph(graph_file)?;

  let executor = Arc::new(PythonExecutor::new(process));
  let orchestrator = Orchestrator::new(config, executor)?;

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    let timeout = async {
      match timeout_ms {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => std::future::pending().await,
      }
    };
    tokio::select! {
      _ = tokio::signal::ctrl_c() => warn!("interrupted, cancelling run"),
      _ = timeout => warn!("timeout reached, cancelling run"),
      _ = trigger.cancelled() => return,
    }
    trigger.cancel();
  });

  let execution = match orchestrator.execute(&mut graph, cancel.clone()) {
    Ok(execution) => execution,
    Err(OrchestratorError::Plan(e)) => {
      print_json(&plan_error_json(&e))?;
      return Ok(false);
    }
    Err(e) => return Err(e.into()),
  };

  info!(
    run_id = execution.run_id(),
    stages = execution.plan().stages.len(),
    "running {}",
    graph_file.display()
  );

  let report = execution.wait().await;
  // Stop the cancel watcher.
  cancel.cancel();

  print_json(&report)?;
  Ok(report.overall_status == Some(OverallStatus::Completed))
}

async fn add_node(
  graph_file: &Path,
  function_ref: FunctionRef,
  kind: FunctionKind,
  parameters: BTreeMap<String, serde_json::Value>,
  process: ProcessConfig,
) -> Result<()> {
  let mut graph = if graph_file.exists() {
    load_graph(graph_file)?
  } else {
    Graph::new()
  };

  let catalog = FunctionCatalog::new(Arc::new(PythonSignatureExtractor::new(process)));
  let node_id = catalog
    .add_function_node(&mut graph, function_ref.clone(), kind, parameters)
    .await
    .with_context(|| format!("failed to add {function_ref}"))?;

  save_graph(graph_file, &graph)?;
  println!("{node_id}");
  Ok(())
}

fn parse_param(s: &str) -> Result<(String, serde_json::Value), String> {
  let (name, raw) = s
    .split_once('=')
    .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
  if name.is_empty() {
    return Err(format!("missing parameter name in '{s}'"));
  }
  let value = serde_json::from_str(raw).unwrap_or_else(|_| json!(raw));
  Ok((name.to_string(), value))
}
