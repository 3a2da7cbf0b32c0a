//! Error taxonomy shared by the digest, render and post-write stages.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort a build. Cosmetic problems (unknown asset kinds) are
/// logged instead and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// A file that had to be digested or copied does not exist.
  #[error("asset not found: {}", path.display())]
  MissingSource {
    /// Absolute path that was expected to exist.
    path: PathBuf,
  },

  /// An asset URL has no extension to anchor the digest on.
  #[error("cannot fingerprint `{url}`: no file extension")]
  NoExtension {
    /// URL as declared in the template.
    url: String,
  },

  /// The same URL was rendered twice with different content in one build.
  #[error("`{url}` already fingerprinted as `{existing}`, refusing `{incoming}`")]
  DigestConflict {
    /// Original asset URL.
    url: String,
    /// Fingerprinted URL registered first.
    existing: String,
    /// Fingerprinted URL from the later render.
    incoming: String,
  },

  /// A minifier could not be started.
  #[error("failed to spawn `{tool}`: {source}")]
  ToolSpawn {
    /// Program name.
    tool: String,
    /// Underlying spawn error.
    source: std::io::Error,
  },

  /// A minifier exited unsuccessfully.
  #[error("`{tool}` failed with {status}\n{stderr}")]
  ToolFailed {
    /// Program name.
    tool: String,
    /// Exit status reported by the OS.
    status: ExitStatus,
    /// Captured standard error.
    stderr: String,
  },

  /// A minifier ran past the configured timeout and was killed.
  #[error("`{tool}` timed out after {}s", timeout.as_secs_f64())]
  ToolTimedOut {
    /// Program name.
    tool: String,
    /// Timeout that expired.
    timeout: Duration,
  },

  /// The minifier command template is empty.
  #[error("empty command configured for {kind} minifier")]
  EmptyCommand {
    /// Asset kind the command was meant for.
    kind: &'static str,
  },

  /// Configuration file exists but could not be parsed.
  #[error("failed to parse {}: {source}", path.display())]
  Config {
    /// Configuration file path.
    path: PathBuf,
    /// Parse error.
    source: serde_json::Error,
  },

  /// The asset manifest could not be serialized.
  #[error("failed to serialize manifest {}: {source}", path.display())]
  Manifest {
    /// Manifest destination.
    path: PathBuf,
    /// Serialization error.
    source: serde_json::Error,
  },

  /// Any other filesystem failure.
  #[error("i/o error at {}: {source}", path.display())]
  Io {
    /// Path involved in the failed operation.
    path: PathBuf,
    /// Underlying error.
    source: std::io::Error,
  },
}

impl Error {
  /// Wrap an I/O error, promoting `NotFound` to [`Error::MissingSource`].
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    let path = path.into();
    if source.kind() == std::io::ErrorKind::NotFound {
      Self::MissingSource { path }
    } else {
      Self::Io { path, source }
    }
  }
}
