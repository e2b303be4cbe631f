//! Spawning the interpreter with an embedded driver.

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::ProcessConfig;

/// Captured result of one driver invocation.
#[derive(Debug)]
pub(crate) struct DriverOutput {
  pub success: bool,
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl DriverOutput {
  /// Last non-empty stderr line, which for a traceback is the exception.
  pub fn error_summary(&self) -> String {
    summarize_stderr(&self.stderr).unwrap_or_else(|| match self.code {
      Some(code) => format!("interpreter exited with status {code}"),
      None => "interpreter terminated by signal".to_string(),
    })
  }
}

/// Run `interpreter -c <script> <args...>`, feeding `stdin` if given.
pub(crate) async fn run_driver<I, S>(
  config: &ProcessConfig,
  script: &str,
  args: I,
  stdin: Option<&[u8]>,
) -> io::Result<DriverOutput>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  let mut cmd = Command::new(&config.interpreter);
  cmd
    .arg("-c")
    .arg(script)
    .args(args)
    .envs(&config.env)
    .stdin(if stdin.is_some() {
      Stdio::piped()
    } else {
      Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  if let Some(dir) = &config.working_dir {
    cmd.current_dir(dir);
  }

  let mut child = cmd.spawn()?;
  debug!(interpreter = %config.interpreter.display(), pid = ?child.id(), "driver spawned");

  if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
    match pipe.write_all(bytes).await {
      Ok(()) => {}
      // The driver died before reading its input; stderr will say why.
      Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
      Err(e) => return Err(e),
    }
    // Closing the pipe lets the driver see EOF.
    drop(pipe);
  }

  let output = child.wait_with_output().await?;

  Ok(DriverOutput {
    success: output.status.success(),
    code: output.status.code(),
    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
  })
}

pub(crate) fn summarize_stderr(stderr: &str) -> Option<String> {
  stderr
    .lines()
    .map(str::trim)
    .rev()
    .find(|l| !l.is_empty())
    .map(str::to_string)
}
