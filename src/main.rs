use clap::Parser;
use crossterm::style::Stylize;
use std::process::ExitCode;
use std::time::Duration;

/// How long runtime shutdown waits for blocking work such as a pending stdin read.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
  let args = u2b::Args::parse();
  u2b::init_logging(&args);

  let runtime = match tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
  {
    Ok(runtime) => runtime,
    Err(e) => {
      eprintln!("{}", format!("Failed to start async runtime: {}", e).red());
      return ExitCode::FAILURE;
    }
  };

  let result = runtime.block_on(u2b::run(args));
  // Drops any task still holding a player; kill_on_drop takes the process down
  runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

  if let Err(e) = &result {
    log::error!("Startup failed: {}", e);
    eprintln!("{}", e.to_string().red());
  }
  u2b::exit_code(&result)
}
