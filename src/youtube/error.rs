//! Resolver error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while looking up tracks or stream URLs.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("Nothing found for: {0}")]
  NotFound(String),

  #[error("Network error: {0}")]
  Network(String),

  #[error("Lookup timed out after {} seconds", .0.as_secs())]
  Timeout(Duration),

  #[error("yt-dlp could not be run: {0}")]
  Tool(#[from] std::io::Error),

  #[error("yt-dlp failed: {0}")]
  Failed(String),

  #[error("Unexpected yt-dlp output: {0}")]
  Parse(#[from] serde_json::Error),
}

impl ResolveError {
  /// Classify a failed yt-dlp run by its stderr.
  pub fn from_stderr(subject: &str, stderr: &str) -> Self {
    let message = stderr
      .lines()
      .rev()
      .find(|l| l.contains("ERROR"))
      .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
      .unwrap_or("no output")
      .trim()
      .to_string();
    let lower = message.to_lowercase();

    const NETWORK_MARKERS: &[&str] = &[
      "unable to download",
      "urlopen error",
      "timed out",
      "connection",
      "name or service not known",
      "temporary failure in name resolution",
      "http error 5",
    ];
    const NOT_FOUND_MARKERS: &[&str] = &[
      "video unavailable",
      "not available",
      "unsupported url",
      "does not exist",
      "private video",
      "has been removed",
      "http error 404",
    ];

    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
      ResolveError::NotFound(subject.to_string())
    } else if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
      ResolveError::Network(message)
    } else {
      ResolveError::Failed(message)
    }
  }
}
