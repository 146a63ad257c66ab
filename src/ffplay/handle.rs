//! Player process handle types.
//!
//! The coordinator talks to these traits rather than to `tokio::process`
//! directly so sessions can be driven without a real player binary.

use futures_util::future::BoxFuture;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
  #[error("ffplay executable not found")]
  NotFound,
  #[error("Failed to spawn {}: {source}", .program.display())]
  Spawn {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// How a player process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerExit {
  /// Exit code, `None` when killed by a signal or when waiting failed.
  pub code: Option<i32>,
  /// Signal number on unix when the process was killed.
  pub signal: Option<i32>,
  /// Tail of whatever the player wrote to stderr.
  pub diagnostics: String,
}

impl PlayerExit {
  pub fn from_status(status: std::process::ExitStatus, diagnostics: String) -> Self {
    #[cfg(unix)]
    let signal = {
      use std::os::unix::process::ExitStatusExt;
      status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    Self {
      code: status.code(),
      signal,
      diagnostics,
    }
  }

  /// Exit produced when waiting on the process itself failed.
  pub fn wait_failed(error: &std::io::Error) -> Self {
    Self {
      code: None,
      signal: None,
      diagnostics: format!("wait failed: {}", error),
    }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

impl fmt::Display for PlayerExit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.code, self.signal) {
      (Some(code), _) => write!(f, "exit code {}", code)?,
      (None, Some(signal)) => write!(f, "signal {}", signal)?,
      (None, None) => f.write_str("unknown status")?,
    }
    if let Some(line) = self.diagnostics.lines().rev().find(|l| !l.trim().is_empty()) {
      write!(f, ": {}", line.trim())?;
    }
    Ok(())
  }
}

/// One running player invocation.
pub trait PlayerProcess: Send {
  /// OS process id, if still known.
  fn id(&self) -> Option<u32>;

  /// Non-blocking poll; false once the process has exited.
  fn is_alive(&mut self) -> bool;

  /// Wait for the process to exit. Cancel safe: dropping the future leaves
  /// the process untouched and `wait` can be called again.
  fn wait(&mut self) -> BoxFuture<'_, PlayerExit>;

  /// Ask the process to exit gracefully.
  fn terminate(&mut self) -> std::io::Result<()>;

  /// Kill the process and reap it.
  fn kill(&mut self) -> BoxFuture<'_, std::io::Result<()>>;
}

/// Starts player processes.
pub trait Launcher: Send + Sync {
  /// Start playing `source_url` at `volume` (1-100).
  fn launch(&self, source_url: &str, volume: u8) -> Result<Box<dyn PlayerProcess>, LaunchError>;
}
