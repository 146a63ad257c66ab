//! Prompt commands and their dispatch onto the coordinator.

use crossterm::style::Stylize;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::playback::{
  Advance, Coordinator, PlayOutcome, PlaybackStatus, PlayerError, PlayerEvent, QueueSnapshot,
};
use crate::youtube::{extract_video_id, format_duration, looks_like_url, Resolver, TrackDescriptor};

/// One parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Search(String),
  Url(String),
  SetVolume(i64),
  ShowVolume,
  Stop,
  Skip,
  Queue,
  Clear,
  Help,
  Quit,
  /// Recognised keyword with bad arguments.
  Usage(&'static str),
}

const VOLUME_USAGE: &str = "Usage: volume <1-100>";

impl Command {
  /// Parse a prompt line. Blank lines yield `None`.
  pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
      return None;
    }

    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or_default().to_lowercase();
    let rest: Vec<&str> = words.collect();

    let command = match (keyword.as_str(), rest.as_slice()) {
      ("quit" | "exit", []) => Command::Quit,
      ("help", []) => Command::Help,
      ("stop", []) => Command::Stop,
      ("skip" | "next", []) => Command::Skip,
      ("queue", []) => Command::Queue,
      ("clear", []) => Command::Clear,
      ("volume", []) => Command::ShowVolume,
      ("volume", [value]) => match value.parse::<i64>() {
        Ok(volume) => Command::SetVolume(volume),
        Err(_) => Command::Usage(VOLUME_USAGE),
      },
      ("volume", _) => Command::Usage(VOLUME_USAGE),
      _ if looks_like_url(line) => Command::Url(line.to_string()),
      _ => Command::Search(line.to_string()),
    };
    Some(command)
  }
}

/// Runs prompt commands against the coordinator and prints the outcome.
pub struct Dispatcher {
  player: Coordinator,
  resolver: Arc<dyn Resolver>,
}

impl Dispatcher {
  pub fn new(player: Coordinator, resolver: Arc<dyn Resolver>) -> Self {
    Self { player, resolver }
  }

  /// Execute one command. `Break` means the user asked to quit.
  pub async fn dispatch(&self, command: Command) -> ControlFlow<()> {
    log::debug!("Dispatching {:?}", command);

    match command {
      Command::Quit => {
        self.player.shutdown().await;
        println!("{}", "Goodbye!".cyan());
        return ControlFlow::Break(());
      }
      Command::Help => print_help(),
      Command::Stop => match self.player.stop().await {
        Some(track) => println!("{}", format!("Stopped: {}", track.title).yellow()),
        None => println!("{}", "Nothing is playing".yellow()),
      },
      Command::Skip => match self.player.skip().await {
        Ok(Advance::Started(_)) => {}
        Ok(Advance::Cancelled(track)) => {
          println!("{}", format!("Start of {} was cancelled", track.title).yellow())
        }
        Ok(Advance::QueueFinished) => println!("{}", "Queue is empty".yellow()),
        Err(e) => report(&e),
      },
      Command::Queue => print_queue(&self.player.snapshot()),
      Command::Clear => {
        let removed = self.player.clear_queue();
        println!("{}", format!("Removed {} queued track(s)", removed).yellow());
      }
      Command::ShowVolume => {
        println!("{}", format!("Volume: {}%", self.player.volume()).cyan())
      }
      Command::SetVolume(volume) => match self.player.set_volume(volume) {
        Ok(volume) => println!("{}", format!("Volume set to: {}%", volume).yellow()),
        Err(e) => report(&e),
      },
      Command::Usage(usage) => println!("{}", usage.red()),
      Command::Url(url) => self.play_url(&url).await,
      Command::Search(query) => self.search(&query).await,
    }

    ControlFlow::Continue(())
  }

  async fn play_url(&self, url: &str) {
    if extract_video_id(url).is_none() {
      println!("{}", "Invalid YouTube URL".red());
      return;
    }

    match self.resolver.resolve_single(url).await {
      Ok(track) => self.play(track).await,
      Err(e) => report(&PlayerError::from(e)),
    }
  }

  async fn search(&self, query: &str) {
    println!("{}", format!("Searching for: {}", query).yellow());

    let results = match self.resolver.search(query).await {
      Ok(results) => results,
      Err(e) => {
        report(&PlayerError::from(e));
        return;
      }
    };

    let Some(first) = results.first().cloned() else {
      println!("{}", format!("No videos found for: {}", query).red());
      return;
    };

    print_results(&results);
    self.play(first).await;
  }

  async fn play(&self, track: TrackDescriptor) {
    match self.player.request_play(track).await {
      // Announced by the event printer
      Ok(PlayOutcome::Started(_)) => {}
      Ok(PlayOutcome::Queued { track, position }) => println!(
        "{}",
        format!("Queued #{}: {}", position, track.title).cyan()
      ),
      Ok(PlayOutcome::Cancelled(track)) => {
        println!("{}", format!("Start of {} was cancelled", track.title).yellow())
      }
      Err(e) => report(&e),
    }
  }
}

/// Print a categorized error.
fn report(error: &PlayerError) {
  println!("{}", error.to_string().red());
}

fn print_results(results: &[TrackDescriptor]) {
  println!();
  println!("{}", "Search Results:".cyan());
  println!("{}", "-".repeat(80));
  for (i, track) in results.iter().enumerate() {
    println!("{} {}", format!("{:2}.", i + 1).green(), track.listed_title());
    println!(
      "    Duration: {} | Uploader: {}",
      track.duration_label(),
      track.uploader.as_deref().unwrap_or("Unknown")
    );
  }
  println!();
}

fn print_queue(snapshot: &QueueSnapshot) {
  match &snapshot.current {
    Some(track) => {
      let label = match snapshot.status {
        PlaybackStatus::Starting => "Starting",
        PlaybackStatus::Stopping => "Stopping",
        _ => "Now playing",
      };
      let elapsed = snapshot
        .elapsed
        .map(|e| format!(" ({} / {})", format_duration(e.as_secs()), track.duration_label()))
        .unwrap_or_default();
      println!("{}", format!("{}: {}{}", label, track.title, elapsed).green());
    }
    None => println!("{}", "Nothing is playing".yellow()),
  }

  if snapshot.is_empty() {
    println!("{}", "Queue is empty".yellow());
    return;
  }
  println!("{}", format!("Up next ({}):", snapshot.len()).cyan());
  for (i, track) in snapshot.queue.iter().enumerate() {
    println!("  {:2}. {} [{}]", i + 1, track.listed_title(), track.duration_label());
  }
}

/// Print a coordinator notification.
pub fn print_event(event: &PlayerEvent) {
  match event {
    PlayerEvent::TrackStarted { track, volume } => {
      println!("{}", format!("Now playing: {}", track.title).green());
      println!(
        "{}",
        format!("Duration: {} | Volume: {}%", track.duration_label(), volume).cyan()
      );
    }
    PlayerEvent::TrackFinished { track } => {
      println!("{}", format!("Finished: {}", track.title).cyan())
    }
    PlayerEvent::TrackEndedUnexpectedly { track, exit } => println!(
      "{}",
      format!("Playback of {} ended unexpectedly ({})", track.title, exit).yellow()
    ),
    PlayerEvent::QueueFinished => println!("{}", "Queue finished".cyan()),
    PlayerEvent::PlaybackFailed { track, error } => println!(
      "{}",
      format!("Could not play {}: {}", track.title, error).red()
    ),
  }
}

pub fn print_help() {
  println!(
    "
{}

{}
  <search term>     - Search and play the first result (queued if busy)
  <youtube url>     - Play video from YouTube URL (queued if busy)
  volume [1-100]    - Show or set the volume for the next track
  stop              - Stop current playback
  skip              - Play the next queued track
  queue             - Show current track and queue
  clear             - Remove all queued tracks
  help              - Show this help
  quit/exit         - Exit the application

{}
  never gonna give you up
  https://www.youtube.com/watch?v=dQw4w9WgXcQ
  volume 75
  skip
",
    "u2b - YouTube Command Line Player".cyan(),
    "Commands:".green(),
    "Examples:".yellow(),
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::playback::testing::{FakeLauncher, FakeResolver};
  use crate::playback::Timing;
  use std::time::Duration;

  #[test]
  fn test_parse_keywords() {
    assert_eq!(Command::parse("  "), None);
    assert_eq!(Command::parse("QUIT"), Some(Command::Quit));
    assert_eq!(Command::parse("exit"), Some(Command::Quit));
    assert_eq!(Command::parse("stop"), Some(Command::Stop));
    assert_eq!(Command::parse("skip"), Some(Command::Skip));
    assert_eq!(Command::parse("queue"), Some(Command::Queue));
    assert_eq!(Command::parse("clear"), Some(Command::Clear));
    assert_eq!(Command::parse("help"), Some(Command::Help));
  }

  #[test]
  fn test_parse_volume() {
    assert_eq!(Command::parse("volume 75"), Some(Command::SetVolume(75)));
    assert_eq!(Command::parse("volume 0"), Some(Command::SetVolume(0)));
    assert_eq!(Command::parse("volume"), Some(Command::ShowVolume));
    assert_eq!(Command::parse("volume loud"), Some(Command::Usage(VOLUME_USAGE)));
    assert_eq!(Command::parse("volume 1 2"), Some(Command::Usage(VOLUME_USAGE)));
  }

  #[test]
  fn test_parse_url_and_search() {
    assert_eq!(
      Command::parse("https://youtu.be/dQw4w9WgXcQ"),
      Some(Command::Url("https://youtu.be/dQw4w9WgXcQ".to_string()))
    );
    assert_eq!(
      Command::parse("stop making sense"),
      Some(Command::Search("stop making sense".to_string()))
    );
    assert_eq!(
      Command::parse(" never gonna give you up "),
      Some(Command::Search("never gonna give you up".to_string()))
    );
  }

  fn dispatcher() -> (Dispatcher, Arc<FakeLauncher>) {
    let launcher = Arc::new(FakeLauncher::new());
    let resolver: Arc<dyn Resolver> = Arc::new(FakeResolver::new());
    let timing = Timing {
      terminate_grace: Duration::from_millis(200),
      skip_settle: Duration::from_millis(20),
    };
    let player = Coordinator::new(resolver.clone(), launcher.clone(), 50, timing);
    player.start();
    (Dispatcher::new(player, resolver), launcher)
  }

  #[tokio::test]
  async fn test_search_plays_then_queues() {
    let (dispatcher, launcher) = dispatcher();

    assert!(dispatcher.dispatch(Command::Search("a".into())).await.is_continue());
    assert!(dispatcher.dispatch(Command::Search("b".into())).await.is_continue());

    let snap = dispatcher.player.snapshot();
    assert_eq!(snap.current.as_ref().unwrap().id, "a");
    assert_eq!(snap.queue.len(), 1);
    assert_eq!(launcher.launch_count(), 1);
  }

  #[tokio::test]
  async fn test_invalid_url_is_rejected() {
    let (dispatcher, launcher) = dispatcher();

    dispatcher
      .dispatch(Command::Url("https://example.com/video".into()))
      .await;
    assert!(dispatcher.player.snapshot().current.is_none());
    assert_eq!(launcher.launch_count(), 0);
  }

  #[tokio::test]
  async fn test_bad_volume_keeps_state() {
    let (dispatcher, _) = dispatcher();

    dispatcher.dispatch(Command::SetVolume(101)).await;
    assert_eq!(dispatcher.player.volume(), 50);
    dispatcher.dispatch(Command::SetVolume(100)).await;
    assert_eq!(dispatcher.player.volume(), 100);
  }

  #[tokio::test]
  async fn test_quit_stops_playback() {
    let (dispatcher, launcher) = dispatcher();
    dispatcher.dispatch(Command::Search("a".into())).await;

    assert!(dispatcher.dispatch(Command::Quit).await.is_break());
    assert!(!launcher.control(0).is_running());
  }
}
