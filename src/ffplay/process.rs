//! ffplay detection and process spawning.

use futures_util::future::BoxFuture;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;

use super::handle::{LaunchError, Launcher, PlayerExit, PlayerProcess};

/// How many trailing stderr lines are kept for diagnostics.
const DIAGNOSTIC_LINES: usize = 20;

/// Transport schemes ffplay may open for YouTube streams.
pub const DEFAULT_PROTOCOL_WHITELIST: &str = "file,http,https,tcp,tls,crypto,hls,applehttp";

/// Find ffplay executable, checking a configured path first, then PATH,
/// then common install locations.
pub fn find_ffplay(configured: Option<&Path>) -> Option<PathBuf> {
  if let Some(path) = configured {
    return which::which(path).ok().or_else(|| path.exists().then(|| path.to_path_buf()));
  }

  if let Ok(path) = which::which("ffplay") {
    return Some(path);
  }

  #[cfg(windows)]
  {
    let common_paths = [
      r"C:\ffmpeg\bin\ffplay.exe",
      r"C:\Program Files\ffmpeg\bin\ffplay.exe",
    ];
    for path in common_paths {
      let p = PathBuf::from(path);
      if p.exists() {
        return Some(p);
      }
    }
  }

  #[cfg(target_os = "macos")]
  {
    let common_paths = ["/usr/local/bin/ffplay", "/opt/homebrew/bin/ffplay"];
    for path in common_paths {
      let p = PathBuf::from(path);
      if p.exists() {
        return Some(p);
      }
    }
  }

  #[cfg(target_os = "linux")]
  {
    let common_paths = ["/usr/bin/ffplay", "/usr/local/bin/ffplay", "/snap/bin/ffmpeg.ffplay"];
    for path in common_paths {
      let p = PathBuf::from(path);
      if p.exists() {
        return Some(p);
      }
    }
  }

  None
}

/// Fixed part of the ffplay command line.
#[derive(Debug, Clone)]
pub struct FfplayOptions {
  /// Hide the video window.
  pub audio_only: bool,
  pub protocol_whitelist: String,
  /// User-specified arguments, placed before the input.
  pub extra_args: Vec<String>,
}

impl Default for FfplayOptions {
  fn default() -> Self {
    Self {
      audio_only: true,
      protocol_whitelist: DEFAULT_PROTOCOL_WHITELIST.to_string(),
      extra_args: Vec::new(),
    }
  }
}

/// Spawns ffplay for each session.
pub struct FfplayLauncher {
  program: PathBuf,
  options: FfplayOptions,
}

impl FfplayLauncher {
  pub fn new(program: PathBuf, options: FfplayOptions) -> Self {
    Self { program, options }
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  /// Full argument list for one invocation.
  pub fn build_args(&self, source_url: &str, volume: u8) -> Vec<String> {
    let mut args = Vec::with_capacity(16 + self.options.extra_args.len());
    if self.options.audio_only {
      args.push("-nodisp".to_string());
    }
    args.extend(
      ["-autoexit", "-hide_banner", "-loglevel", "error", "-nostats"]
        .iter()
        .map(|s| s.to_string()),
    );
    if self.options.audio_only {
      args.push("-sync".to_string());
      args.push("ext".to_string());
    }
    args.push("-volume".to_string());
    args.push(volume.to_string());
    args.push("-protocol_whitelist".to_string());
    args.push(self.options.protocol_whitelist.clone());
    args.extend(self.options.extra_args.iter().cloned());
    args.push("-i".to_string());
    args.push(source_url.to_string());
    args
  }
}

impl Launcher for FfplayLauncher {
  fn launch(&self, source_url: &str, volume: u8) -> Result<Box<dyn PlayerProcess>, LaunchError> {
    log::info!("Spawning ffplay: {:?} at volume {}", self.program, volume);
    if !self.options.extra_args.is_empty() {
      log::info!("Extra ffplay args: {:?}", self.options.extra_args);
    }

    let mut child = Command::new(&self.program)
      .args(self.build_args(source_url, volume))
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| match e.kind() {
        ErrorKind::NotFound => LaunchError::NotFound,
        _ => LaunchError::Spawn {
          program: self.program.clone(),
          source: e,
        },
      })?;

    log::info!("ffplay started (pid: {:?})", child.id());
    let stderr = child.stderr.take().map(|s| tokio::spawn(read_diagnostics(s)));

    Ok(Box::new(FfplayProcess { child, stderr }))
  }
}

/// Keep the last few stderr lines of a player process.
async fn read_diagnostics(stderr: ChildStderr) -> std::io::Result<String> {
  let mut lines = BufReader::new(stderr).lines();
  let mut tail = VecDeque::with_capacity(DIAGNOSTIC_LINES);
  while let Some(line) = lines.next_line().await? {
    log::debug!("ffplay: {}", line);
    if tail.len() == DIAGNOSTIC_LINES {
      tail.pop_front();
    }
    tail.push_back(line);
  }
  Ok(Vec::from(tail).join("\n"))
}

/// A running ffplay process. Killed if dropped while still running.
pub struct FfplayProcess {
  child: Child,
  stderr: Option<JoinHandle<std::io::Result<String>>>,
}

impl FfplayProcess {
  /// Join the stderr reader. Failures here only cost the diagnostics.
  async fn collect_diagnostics(&mut self) -> String {
    let Some(reader) = self.stderr.take() else {
      return String::new();
    };
    match reader.await {
      Ok(Ok(text)) => text,
      Ok(Err(e)) => {
        log::warn!("Failed to read ffplay diagnostics: {}", e);
        String::new()
      }
      Err(e) => {
        log::warn!("ffplay diagnostics reader panicked: {}", e);
        String::new()
      }
    }
  }
}

impl PlayerProcess for FfplayProcess {
  fn id(&self) -> Option<u32> {
    self.child.id()
  }

  fn is_alive(&mut self) -> bool {
    matches!(self.child.try_wait(), Ok(None))
  }

  fn wait(&mut self) -> BoxFuture<'_, PlayerExit> {
    Box::pin(async move {
      let status = match self.child.wait().await {
        Ok(status) => status,
        Err(e) => {
          log::error!("wait() failed: {}", e);
          return PlayerExit::wait_failed(&e);
        }
      };
      let diagnostics = self.collect_diagnostics().await;
      PlayerExit::from_status(status, diagnostics)
    })
  }

  #[cfg(unix)]
  fn terminate(&mut self) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // Already reaped
    let Some(pid) = self.child.id() else {
      return Ok(());
    };
    log::info!("Sending SIGTERM to ffplay (pid: {})", pid);
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
  }

  #[cfg(not(unix))]
  fn terminate(&mut self) -> std::io::Result<()> {
    self.child.start_kill()
  }

  fn kill(&mut self) -> BoxFuture<'_, std::io::Result<()>> {
    Box::pin(async move {
      log::info!("Killing ffplay (pid: {:?})", self.child.id());
      self.child.kill().await
    })
  }
}
