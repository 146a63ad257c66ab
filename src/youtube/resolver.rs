//! Track lookup through the yt-dlp command line tool.

use futures_util::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use super::error::ResolveError;
use super::types::{TrackDescriptor, YtDlpEntry};

/// Format preference when only audio is wanted.
const AUDIO_FORMATS: &str = "bestaudio[ext=m4a]/bestaudio[ext=mp3]/bestaudio[ext=webm]/bestaudio/best";
/// Format preference when video is shown.
const VIDEO_FORMATS: &str = "best[height<=720]/best[height<=480]/best";

/// Turns user input into tracks and tracks into stream URLs.
pub trait Resolver: Send + Sync {
  /// Search for tracks, best match first. An empty result is not an error.
  fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<TrackDescriptor>, ResolveError>>;

  /// Look up a single track from a direct link or id.
  fn resolve_single<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TrackDescriptor, ResolveError>>;

  /// Resolve a track's source reference to a URL the player can open.
  fn stream_url<'a>(&'a self, track: &'a TrackDescriptor) -> BoxFuture<'a, Result<String, ResolveError>>;
}

/// Settings for [`YtDlpResolver`].
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
  pub max_results: usize,
  pub audio_only: bool,
  pub timeout: Duration,
}

impl Default for YtDlpOptions {
  fn default() -> Self {
    Self {
      max_results: 10,
      audio_only: true,
      timeout: Duration::from_secs(30),
    }
  }
}

/// Find the yt-dlp executable, preferring an explicitly configured path.
pub fn find_yt_dlp(configured: Option<&Path>) -> Option<PathBuf> {
  if let Some(path) = configured {
    return which::which(path).ok().or_else(|| path.exists().then(|| path.to_path_buf()));
  }

  if let Ok(path) = which::which("yt-dlp") {
    return Some(path);
  }

  // pip --user installs land here and are often missing from PATH
  dirs::home_dir()
    .map(|home| home.join(".local/bin/yt-dlp"))
    .filter(|p| p.exists())
}

/// Resolver backed by a yt-dlp executable.
pub struct YtDlpResolver {
  program: PathBuf,
  options: YtDlpOptions,
}

impl YtDlpResolver {
  pub fn new(program: PathBuf, options: YtDlpOptions) -> Self {
    Self { program, options }
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  /// Arguments for a search run.
  fn search_args(&self, query: &str) -> Vec<String> {
    vec![
      "--flat-playlist".to_string(),
      "--dump-json".to_string(),
      "--no-warnings".to_string(),
      "--ignore-config".to_string(),
      format!("ytsearch{}:{}", self.options.max_results, query),
    ]
  }

  /// Arguments for a single-video metadata run.
  fn single_args(url: &str) -> Vec<String> {
    vec![
      "--dump-single-json".to_string(),
      "--no-playlist".to_string(),
      "--no-warnings".to_string(),
      "--ignore-config".to_string(),
      url.to_string(),
    ]
  }

  /// Arguments for a stream URL run.
  fn stream_args(&self, page_url: &str) -> Vec<String> {
    let formats = if self.options.audio_only {
      AUDIO_FORMATS
    } else {
      VIDEO_FORMATS
    };
    vec![
      "-f".to_string(),
      formats.to_string(),
      "--get-url".to_string(),
      "--no-playlist".to_string(),
      "--no-warnings".to_string(),
      "--ignore-config".to_string(),
      page_url.to_string(),
    ]
  }

  /// Run yt-dlp to completion, bounded by the configured timeout.
  async fn run(&self, subject: &str, args: Vec<String>) -> Result<String, ResolveError> {
    log::debug!("Running {:?} {:?}", self.program, args);

    let child = Command::new(&self.program)
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()?;

    let output: Output = tokio::time::timeout(self.options.timeout, child.wait_with_output())
      .await
      .map_err(|_| ResolveError::Timeout(self.options.timeout))??;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      log::warn!("yt-dlp exited with {} for {}", output.status, subject);
      return Err(ResolveError::from_stderr(subject, &stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

/// Parse one JSON object per line, skipping lines that are not entries.
pub(crate) fn parse_search_output(stdout: &str) -> Result<Vec<TrackDescriptor>, ResolveError> {
  let mut tracks = Vec::new();
  for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
    match serde_json::from_str::<YtDlpEntry>(line) {
      Ok(entry) => tracks.push(entry.into()),
      Err(e) if tracks.is_empty() && !line.starts_with('{') => {
        return Err(ResolveError::Parse(e));
      }
      Err(e) => log::warn!("Skipping unparsable search entry: {}", e),
    }
  }
  Ok(tracks)
}

/// The first non-empty line of `--get-url` output.
pub(crate) fn parse_stream_output(subject: &str, stdout: &str) -> Result<String, ResolveError> {
  stdout
    .lines()
    .map(str::trim)
    .find(|l| l.starts_with("http"))
    .map(str::to_string)
    .ok_or_else(|| ResolveError::NotFound(format!("stream for {}", subject)))
}

impl Resolver for YtDlpResolver {
  fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<TrackDescriptor>, ResolveError>> {
    Box::pin(async move {
      log::info!("Searching for: {}", query);
      let stdout = self.run(query, self.search_args(query)).await?;
      let tracks = parse_search_output(&stdout)?;
      log::info!("Search returned {} results", tracks.len());
      Ok(tracks)
    })
  }

  fn resolve_single<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TrackDescriptor, ResolveError>> {
    Box::pin(async move {
      log::info!("Resolving link: {}", url);
      let stdout = self.run(url, Self::single_args(url)).await?;
      let entry: YtDlpEntry = serde_json::from_str(stdout.trim())?;
      Ok(entry.into())
    })
  }

  fn stream_url<'a>(&'a self, track: &'a TrackDescriptor) -> BoxFuture<'a, Result<String, ResolveError>> {
    Box::pin(async move {
      let page_url = track.source.as_str();
      log::info!("Resolving stream for: {}", track.title);
      let stdout = self.run(&track.title, self.stream_args(page_url)).await?;
      parse_stream_output(&track.title, &stdout)
    })
  }
}
