use crossterm::style::Stylize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

pub mod cli;
pub mod command;
pub mod config;
pub mod ffplay;
pub mod playback;
pub mod youtube;

pub use cli::Args;
pub use config::AppConfig;
use command::{Command, Dispatcher};
use ffplay::{FfplayLauncher, FfplayOptions};
use playback::{Coordinator, PlayerEvent, Timing};
use youtube::{YtDlpOptions, YtDlpResolver};

/// Failures that end the program before the prompt opens.
#[derive(Debug, Error)]
pub enum StartupError {
  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("ffplay not found. Install FFmpeg (e.g. `apt install ffmpeg` or `brew install ffmpeg`) or set ffplayPath")]
  FfplayMissing,

  #[error("yt-dlp not found. Install it (e.g. `pip install yt-dlp`) or set ytDlpPath")]
  YtDlpMissing,
}

/// Initialise `env_logger`; `RUST_LOG` takes precedence over `-v`.
pub fn init_logging(args: &Args) {
  let env = env_logger::Env::default().default_filter_or(args.log_filter());
  if let Err(e) = env_logger::Builder::from_env(env).try_init() {
    eprintln!("Logger already initialised: {}", e);
  }
}

/// Load the config file and apply flag overrides.
pub fn load_config(args: &Args) -> Result<AppConfig, StartupError> {
  let path = config::resolve_config_path(
    args.config.as_deref(),
    std::env::var_os(config::CONFIG_ENV),
  );
  let mut config = match path {
    Some(path) => AppConfig::load(&path),
    None => {
      log::warn!("No config directory available, using defaults");
      AppConfig::default()
    }
  };

  args.apply(&mut config);
  config.validate().map_err(StartupError::Config)?;
  Ok(config)
}

/// Run the interactive player until the user quits.
pub async fn run(args: Args) -> Result<(), StartupError> {
  let config = load_config(&args)?;

  let ffplay =
    ffplay::find_ffplay(config.ffplay_path().as_deref()).ok_or(StartupError::FfplayMissing)?;
  let yt_dlp =
    youtube::find_yt_dlp(config.yt_dlp_path().as_deref()).ok_or(StartupError::YtDlpMissing)?;
  log::info!("Using ffplay at {} and yt-dlp at {}", ffplay.display(), yt_dlp.display());

  let resolver = Arc::new(YtDlpResolver::new(
    yt_dlp,
    YtDlpOptions {
      max_results: config.max_search_results as usize,
      audio_only: config.audio_only,
      timeout: config.resolve_timeout(),
    },
  ));
  let launcher = Arc::new(FfplayLauncher::new(
    ffplay,
    FfplayOptions {
      audio_only: config.audio_only,
      protocol_whitelist: config.protocol_whitelist.clone(),
      extra_args: config.ffplay_args.clone(),
    },
  ));

  let player = Coordinator::new(
    resolver.clone(),
    launcher,
    config.default_volume,
    Timing {
      terminate_grace: config.terminate_grace(),
      skip_settle: config.skip_settle(),
    },
  );
  player.start();
  spawn_event_printer(player.subscribe());

  let dispatcher = Dispatcher::new(player.clone(), resolver);

  println!("{}", "Welcome to u2b - YouTube Command Line Player".cyan());
  println!("{}", "Type 'help' for commands or 'quit' to exit".yellow());
  println!();

  if let Some(query) = args.initial_query() {
    if let Some(command) = Command::parse(&query) {
      dispatcher.dispatch(command).await;
    }
  }

  repl(&dispatcher).await;
  player.shutdown().await;
  Ok(())
}

async fn repl(dispatcher: &Dispatcher) {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    print!("{}", "u2b> ".green());
    if let Err(e) = std::io::stdout().flush() {
      log::warn!("Failed to flush stdout: {}", e);
    }

    let line = tokio::select! {
      line = lines.next_line() => line,
      _ = tokio::signal::ctrl_c() => {
        println!();
        println!("{}", "Interrupted by user".yellow());
        return;
      }
    };

    let line = match line {
      Ok(Some(line)) => line,
      // EOF
      Ok(None) => {
        println!();
        return;
      }
      Err(e) => {
        log::error!("Failed to read input: {}", e);
        return;
      }
    };

    let Some(command) = Command::parse(&line) else {
      continue;
    };

    // Ctrl-C while a command runs also ends the session
    let flow = tokio::select! {
      flow = dispatcher.dispatch(command) => flow,
      _ = tokio::signal::ctrl_c() => {
        println!();
        println!("{}", "Interrupted by user".yellow());
        return;
      }
    };
    if flow.is_break() {
      return;
    }
  }
}

fn spawn_event_printer(mut events: broadcast::Receiver<PlayerEvent>) {
  tokio::spawn(async move {
    loop {
      match events.recv().await {
        Ok(event) => command::print_event(&event),
        Err(broadcast::error::RecvError::Lagged(n)) => {
          log::warn!("Event printer lagged by {} events", n);
        }
        Err(broadcast::error::RecvError::Closed) => break,
      }
    }
  });
}

/// Exit code for a finished run.
pub fn exit_code(result: &Result<(), StartupError>) -> ExitCode {
  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(_) => ExitCode::FAILURE,
  }
}

