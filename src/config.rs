//! Application configuration loaded from a JSON file.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ffplay::DEFAULT_PROTOCOL_WHITELIST;
use crate::playback::{MAX_VOLUME, MIN_VOLUME};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "U2B_CONFIG";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  /// Custom ffplay executable path (None = auto-detect).
  #[serde(default)]
  pub ffplay_path: Option<String>,

  /// Additional ffplay command-line arguments, placed before the input.
  #[serde(default)]
  pub ffplay_args: Vec<String>,

  /// Custom yt-dlp executable path (None = auto-detect).
  #[serde(default)]
  pub yt_dlp_path: Option<String>,

  /// Volume used until changed at the prompt.
  #[serde(default = "default_volume")]
  pub default_volume: u8,

  /// Play audio without opening a video window.
  #[serde(default = "default_audio_only")]
  pub audio_only: bool,

  /// Number of results requested per search.
  #[serde(default = "default_max_search_results")]
  pub max_search_results: u32,

  /// How long a stopped player gets to exit before it is killed.
  #[serde(default = "default_terminate_grace_ms")]
  pub terminate_grace_ms: u64,

  /// Pause between stopping a skipped track and starting the next one.
  #[serde(default = "default_skip_settle_ms")]
  pub skip_settle_ms: u64,

  /// Upper bound for a single yt-dlp invocation.
  #[serde(default = "default_resolve_timeout_secs")]
  pub resolve_timeout_secs: u64,

  /// Protocols ffplay may open.
  #[serde(default = "default_protocol_whitelist")]
  pub protocol_whitelist: String,
}

fn default_volume() -> u8 {
  50
}

fn default_audio_only() -> bool {
  true
}

fn default_max_search_results() -> u32 {
  10
}

fn default_terminate_grace_ms() -> u64 {
  2000
}

fn default_skip_settle_ms() -> u64 {
  500
}

fn default_resolve_timeout_secs() -> u64 {
  30
}

fn default_protocol_whitelist() -> String {
  DEFAULT_PROTOCOL_WHITELIST.to_string()
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      ffplay_path: None,
      ffplay_args: Vec::new(),
      yt_dlp_path: None,
      default_volume: default_volume(),
      audio_only: default_audio_only(),
      max_search_results: default_max_search_results(),
      terminate_grace_ms: default_terminate_grace_ms(),
      skip_settle_ms: default_skip_settle_ms(),
      resolve_timeout_secs: default_resolve_timeout_secs(),
      protocol_whitelist: default_protocol_whitelist(),
    }
  }
}

impl AppConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if self.default_volume < MIN_VOLUME || self.default_volume > MAX_VOLUME {
      return Err(format!(
        "Default volume must be between {} and {}",
        MIN_VOLUME, MAX_VOLUME
      ));
    }
    if self.max_search_results < 1 || self.max_search_results > 50 {
      return Err("Max search results must be between 1 and 50".to_string());
    }
    if self.terminate_grace_ms < 100 || self.terminate_grace_ms > 30_000 {
      return Err("Terminate grace must be between 100 and 30000 ms".to_string());
    }
    if self.skip_settle_ms < 500 || self.skip_settle_ms > 10_000 {
      return Err("Skip settle delay must be between 500 and 10000 ms".to_string());
    }
    if self.resolve_timeout_secs < 1 || self.resolve_timeout_secs > 300 {
      return Err("Resolve timeout must be between 1 and 300 seconds".to_string());
    }
    if self.protocol_whitelist.trim().is_empty() {
      return Err("Protocol whitelist cannot be empty".to_string());
    }
    Ok(())
  }

  pub fn terminate_grace(&self) -> Duration {
    Duration::from_millis(self.terminate_grace_ms)
  }

  pub fn skip_settle(&self) -> Duration {
    Duration::from_millis(self.skip_settle_ms)
  }

  pub fn resolve_timeout(&self) -> Duration {
    Duration::from_secs(self.resolve_timeout_secs)
  }

  /// Configured ffplay path, ignoring empty strings.
  pub fn ffplay_path(&self) -> Option<PathBuf> {
    non_empty_path(self.ffplay_path.as_deref())
  }

  /// Configured yt-dlp path, ignoring empty strings.
  pub fn yt_dlp_path(&self) -> Option<PathBuf> {
    non_empty_path(self.yt_dlp_path.as_deref())
  }

  /// Load from `path`. A missing file yields defaults; an unreadable or
  /// malformed file is logged and also yields defaults.
  pub fn load(path: &Path) -> Self {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        log::debug!("No config at {}, using defaults", path.display());
        return Self::default();
      }
      Err(e) => {
        log::warn!("Failed to read config {}: {}, using defaults", path.display(), e);
        return Self::default();
      }
    };

    match serde_json::from_str::<Self>(&content) {
      Ok(config) => {
        log::info!("Loaded config from {}", path.display());
        config
      }
      Err(e) => {
        log::warn!("Failed to parse config {}: {}, using defaults", path.display(), e);
        Self::default()
      }
    }
  }
}

fn non_empty_path(value: Option<&str>) -> Option<PathBuf> {
  value
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(PathBuf::from)
}

/// `<config_dir>/u2b/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|dir| dir.join("u2b").join("config.json"))
}

/// Pick the config file: explicit flag, then `U2B_CONFIG`, then the default.
pub fn resolve_config_path(explicit: Option<&Path>, env: Option<OsString>) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }
  if let Some(path) = env.filter(|v| !v.is_empty()) {
    return Some(PathBuf::from(path));
  }
  default_config_path()
}
