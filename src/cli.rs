//! Command-line flags.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, CONFIG_ENV};
use crate::playback::{MAX_VOLUME, MIN_VOLUME};

#[derive(Parser, Debug)]
#[command(name = "u2b")]
#[command(about = "Search and play YouTube audio from the command line")]
#[command(version)]
pub struct Args {
  /// Config file (default: <config dir>/u2b/config.json)
  #[arg(long, env = CONFIG_ENV)]
  pub config: Option<PathBuf>,

  /// Starting volume, overrides the config file
  #[arg(long, value_parser = clap::value_parser!(u8).range(MIN_VOLUME as i64..=MAX_VOLUME as i64))]
  pub volume: Option<u8>,

  /// ffplay executable
  #[arg(long)]
  pub ffplay: Option<PathBuf>,

  /// yt-dlp executable
  #[arg(long = "yt-dlp")]
  pub yt_dlp: Option<PathBuf>,

  /// Open a video window instead of playing audio only
  #[arg(long)]
  pub video: bool,

  /// More log output (-v info, -vv debug)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Search or URL to play right away
  #[arg(trailing_var_arg = true)]
  pub query: Vec<String>,
}

impl Args {
  /// Level used when `RUST_LOG` is not set.
  pub fn log_filter(&self) -> &'static str {
    match self.verbose {
      0 => "warn",
      1 => "info",
      _ => "debug",
    }
  }

  /// The startup query, if one was given.
  pub fn initial_query(&self) -> Option<String> {
    let query = self.query.join(" ");
    let query = query.trim();
    (!query.is_empty()).then(|| query.to_string())
  }

  /// Apply flag overrides on top of the loaded config.
  pub fn apply(&self, config: &mut AppConfig) {
    if let Some(volume) = self.volume {
      config.default_volume = volume;
    }
    if let Some(path) = &self.ffplay {
      config.ffplay_path = Some(path.to_string_lossy().into_owned());
    }
    if let Some(path) = &self.yt_dlp {
      config.yt_dlp_path = Some(path.to_string_lossy().into_owned());
    }
    if self.video {
      config.audio_only = false;
    }
  }
}
