//! Minification of fingerprinted scripts and stylesheets through external tools.

use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::config::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER, ProjectConfig};
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long a killed tool's stderr may stay open before its reader is abandoned.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// Produces the optimized bytes of a fingerprinted asset at `output` from `input`.
pub trait Minifier {
  /// Minify a script.
  fn minify_script(&self, input: &Path, output: &Path) -> Result<()>;

  /// Minify a stylesheet.
  fn minify_stylesheet(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Runs configured command lines such as `uglifyjs --compress --mangle --output {output} {input}`.
#[derive(Debug, Clone)]
pub struct ExternalMinifier {
  script: Vec<String>,
  stylesheet: Vec<String>,
  timeout: Duration,
}

impl ExternalMinifier {
  /// Build from explicit argv templates.
  pub fn new(script: Vec<String>, stylesheet: Vec<String>, timeout: Duration) -> Self {
    Self {
      script,
      stylesheet,
      timeout,
    }
  }

  /// Build from the project configuration.
  pub fn from_config(config: &ProjectConfig) -> Self {
    Self::new(
      config.script_minifier.clone(),
      config.stylesheet_minifier.clone(),
      config.minifier_timeout(),
    )
  }
}

impl Minifier for ExternalMinifier {
  fn minify_script(&self, input: &Path, output: &Path) -> Result<()> {
    run_tool(&self.script, "script", input, output, self.timeout)
  }

  fn minify_stylesheet(&self, input: &Path, output: &Path) -> Result<()> {
    run_tool(&self.stylesheet, "stylesheet", input, output, self.timeout)
  }
}

fn expand_args(args: &[String], input: &Path, output: &Path) -> Vec<OsString> {
  args
    .iter()
    .map(|arg| match arg.as_str() {
      INPUT_PLACEHOLDER => input.as_os_str().to_os_string(),
      OUTPUT_PLACEHOLDER => output.as_os_str().to_os_string(),
      other => OsString::from(
        other
          .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
          .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy()),
      ),
    })
    .collect()
}

fn run_tool(
  template: &[String],
  kind: &'static str,
  input: &Path,
  output: &Path,
  timeout: Duration,
) -> Result<()> {
  let (program, args) = template
    .split_first()
    .ok_or(Error::EmptyCommand { kind })?;

  // Tools that open the output in place would otherwise write through a stale link.
  match fs::remove_file(output) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => return Err(Error::io(output, err)),
  }
  if let Some(parent) = output.parent() {
    fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
  }

  let args = expand_args(args, input, output);
  trace!(tool = %program, ?args, "running minifier");

  let mut child = Command::new(program)
    .args(&args)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|source| Error::ToolSpawn {
      tool: program.clone(),
      source,
    })?;

  let stderr = child.stderr.take();
  let reader = thread::spawn(move || {
    let mut buffer = String::new();
    if let Some(mut stderr) = stderr {
      let _ = stderr.read_to_string(&mut buffer);
    }
    buffer
  });

  let started = Instant::now();
  let status = loop {
    match child.try_wait().map_err(|err| Error::io(input, err))? {
      Some(status) => break status,
      None if started.elapsed() >= timeout => {
        let _ = child.kill();
        let _ = child.wait();
        reap_stderr_reader(reader, program);
        return Err(Error::ToolTimedOut {
          tool: program.clone(),
          timeout,
        });
      }
      None => thread::sleep(POLL_INTERVAL),
    }
  };

  let stderr = reader.join().unwrap_or_default();
  if !status.success() {
    return Err(Error::ToolFailed {
      tool: program.clone(),
      status,
      stderr: stderr.trim_end().to_string(),
    });
  }

  Ok(())
}

/// Join the stderr reader of a killed tool. A grandchild that inherited the pipe can keep
/// it open past the kill; such a reader is given [`STDERR_GRACE`] and then left behind.
fn reap_stderr_reader(reader: JoinHandle<String>, program: &str) {
  let started = Instant::now();
  while !reader.is_finished() {
    if started.elapsed() >= STDERR_GRACE {
      warn!(tool = program, "stderr still held open after kill, not waiting for it");
      return;
    }
    thread::sleep(POLL_INTERVAL);
  }
  let _ = reader.join();
}
