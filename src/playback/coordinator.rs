//! Queue coordinator - owns the current track, the pending queue and the
//! active player session.
//!
//! Every read and write of `PlayerState` happens under one mutex that is never
//! held across an `.await`. Long operations (stream lookup, spawn, teardown)
//! are split into a locked "claim" step and a locked "commit" step, with
//! session ids making sure a commit only applies to the claim it belongs to.

use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;

use super::error::PlayerError;
use super::events::{PlayerEvent, SessionExit, SessionOutcome};
use super::monitor;
use super::state::{PlayerState, QueueSnapshot, Teardown, Transport, MAX_VOLUME, MIN_VOLUME};
use crate::ffplay::Launcher;
use crate::youtube::{Resolver, TrackDescriptor};

const EVENT_CAPACITY: usize = 64;

/// Extra time allowed for a monitor to report back after the kill.
const MONITOR_JOIN_MARGIN: Duration = Duration::from_secs(1);

/// Teardown timing.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
  /// How long a terminated player gets before it is killed.
  pub terminate_grace: Duration,
  /// Pause between tearing down a skipped session and starting the next.
  pub skip_settle: Duration,
}

impl Default for Timing {
  fn default() -> Self {
    Self {
      terminate_grace: Duration::from_secs(2),
      skip_settle: Duration::from_millis(500),
    }
  }
}

/// Result of `request_play` / `enqueue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
  /// Nothing was playing; the track started right away.
  Started(TrackDescriptor),
  /// Appended behind the current track at this 1-based position.
  Queued { track: TrackDescriptor, position: usize },
  /// The start was abandoned because playback was stopped meanwhile.
  Cancelled(TrackDescriptor),
}

/// Result of `advance` / `skip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
  Started(TrackDescriptor),
  Cancelled(TrackDescriptor),
  QueueFinished,
}

/// Whether a session start ended up running.
enum StartResult {
  Running,
  Cancelled,
}

/// Coordinates the queue with the player processes.
#[derive(Clone)]
pub struct Coordinator {
  state: Arc<Mutex<PlayerState>>,
  resolver: Arc<dyn Resolver>,
  launcher: Arc<dyn Launcher>,
  timing: Timing,
  events: broadcast::Sender<PlayerEvent>,
  exit_tx: Sender<SessionExit>,
  exit_rx: Arc<Mutex<Option<Receiver<SessionExit>>>>,
  /// Monitors and session starts that may still own a player process.
  tasks: TaskTracker,
}

impl Coordinator {
  /// Create a coordinator in the idle state.
  pub fn new(
    resolver: Arc<dyn Resolver>,
    launcher: Arc<dyn Launcher>,
    volume: u8,
    timing: Timing,
  ) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let (exit_tx, exit_rx) = async_channel::unbounded();

    Self {
      state: Arc::new(Mutex::new(PlayerState::new(volume))),
      resolver,
      launcher,
      timing,
      events,
      exit_tx,
      exit_rx: Arc::new(Mutex::new(Some(exit_rx))),
      tasks: TaskTracker::new(),
    }
  }

  /// Start the task that handles session exits. Call once, inside the runtime.
  pub fn start(&self) {
    let Some(exit_rx) = self.exit_rx.lock().take() else {
      log::warn!("Exit listener already started");
      return;
    };

    let coordinator = self.clone();
    tokio::spawn(async move {
      log::info!("Session exit listener started");
      while let Ok(exit) = exit_rx.recv().await {
        coordinator.handle_session_exit(exit).await;
      }
      log::info!("Session exit listener stopped");
    });
  }

  /// Receive notifications about sessions starting and ending.
  pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
    self.events.subscribe()
  }

  fn publish(&self, event: PlayerEvent) {
    // No subscribers is fine
    let _ = self.events.send(event);
  }

  /// Play `track` now if idle, otherwise append it to the queue.
  pub async fn request_play(&self, track: TrackDescriptor) -> Result<PlayOutcome, PlayerError> {
    let session_id = {
      let mut state = self.state.lock();
      if !state.transport.is_idle() {
        state.queue.push_back(track.clone());
        let position = state.queue.len();
        log::info!("Queued {} at position {}", track.title, position);
        return Ok(PlayOutcome::Queued { track, position });
      }
      state.begin_start(track.clone())
    };

    match self.start_session(session_id, track.clone()).await? {
      StartResult::Running => Ok(PlayOutcome::Started(track)),
      StartResult::Cancelled => Ok(PlayOutcome::Cancelled(track)),
    }
  }

  /// Append `track` to the queue. When idle, the queue head starts right away
  /// so the queue keeps holding only pending tracks.
  pub async fn enqueue(&self, track: TrackDescriptor) -> Result<PlayOutcome, PlayerError> {
    let (session_id, next) = {
      let mut state = self.state.lock();
      if !state.transport.is_idle() {
        state.queue.push_back(track.clone());
        let position = state.queue.len();
        log::info!("Queue length: {}", position);
        return Ok(PlayOutcome::Queued { track, position });
      }

      // Tracks left behind by a failed start go first
      let next = match state.queue.pop_front() {
        Some(head) => {
          state.queue.push_back(track);
          head
        }
        None => track,
      };
      log::info!("Queue length: {}", state.queue.len());
      (state.begin_start(next.clone()), next)
    };

    match self.start_session(session_id, next.clone()).await? {
      StartResult::Running => Ok(PlayOutcome::Started(next)),
      StartResult::Cancelled => Ok(PlayOutcome::Cancelled(next)),
    }
  }

  /// Stop playback. The queue is kept.
  ///
  /// Returns the track that was current, if any.
  pub async fn stop(&self) -> Option<TrackDescriptor> {
    let stopped = self.teardown().await;
    if let Some(track) = self.state.lock().finish_stop() {
      log::info!("Stopped {}", track.title);
    }
    stopped
  }

  /// Stop the current track and start the next one exactly once.
  pub async fn skip(&self) -> Result<Advance, PlayerError> {
    if let Some(track) = self.teardown().await {
      log::info!("Skipping {}", track.title);
      tokio::time::sleep(self.timing.skip_settle).await;
    }
    self.advance().await
  }

  /// Promote the queue head to the current track, or go idle if the queue is
  /// empty. A session that is still playing is torn down first.
  pub async fn advance(&self) -> Result<Advance, PlayerError> {
    self.teardown().await;

    let next = {
      let mut state = self.state.lock();
      let next = state.start_next();
      if next.is_none() {
        state.transport = Transport::Idle;
      }
      next
    };

    let Some((session_id, track)) = next else {
      log::info!("Queue finished");
      self.publish(PlayerEvent::QueueFinished);
      return Ok(Advance::QueueFinished);
    };

    match self.start_session(session_id, track.clone()).await? {
      StartResult::Running => Ok(Advance::Started(track)),
      StartResult::Cancelled => Ok(Advance::Cancelled(track)),
    }
  }

  /// Set the volume used for the next session start. A running player keeps
  /// its volume.
  pub fn set_volume(&self, volume: i64) -> Result<u8, PlayerError> {
    if volume < MIN_VOLUME as i64 || volume > MAX_VOLUME as i64 {
      return Err(PlayerError::Validation(format!(
        "Volume must be between {} and {}",
        MIN_VOLUME, MAX_VOLUME
      )));
    }
    let volume = volume as u8;
    self.state.lock().volume = volume;
    log::info!("Volume set to {}", volume);
    Ok(volume)
  }

  pub fn volume(&self) -> u8 {
    self.state.lock().volume
  }

  /// Drop all pending tracks. Returns how many were removed.
  pub fn clear_queue(&self) -> usize {
    let mut state = self.state.lock();
    let removed = state.queue.len();
    state.queue.clear();
    log::info!("Cleared {} queued tracks", removed);
    removed
  }

  /// Consistent copy of the current track, queue and volume.
  pub fn snapshot(&self) -> QueueSnapshot {
    self.state.lock().snapshot()
  }

  /// Stop playback for application exit.
  ///
  /// Also waits for teardowns and starts that an interrupted command left
  /// running, so no player outlives the coordinator.
  pub async fn shutdown(&self) {
    log::info!("Shutting down player");
    self.stop().await;

    self.tasks.close();
    let limit = self.timing.terminate_grace + MONITOR_JOIN_MARGIN;
    if tokio::time::timeout(limit, self.tasks.wait()).await.is_err() {
      log::error!(
        "{} player task(s) still running after {:?}",
        self.tasks.len(),
        limit
      );
    }
  }

  /// Take the current session (or pending start) out of play and wait for its
  /// process to be gone. Leaves the transport in `Stopping` or `Idle`.
  async fn teardown(&self) -> Option<TrackDescriptor> {
    let teardown = self.state.lock().begin_stop();

    match teardown {
      Teardown::Nothing => None,
      Teardown::Pending(track) => {
        log::info!("Abandoning start of {}", track.title);
        Some(track)
      }
      Teardown::Session(session) => {
        log::info!(
          "Terminating session {} ({}) after {:?}",
          session.id,
          session.track.title,
          session.started_at.elapsed()
        );
        session.cancel.cancel();

        let limit = self.timing.terminate_grace + MONITOR_JOIN_MARGIN;
        match tokio::time::timeout(limit, session.monitor).await {
          Ok(Ok(())) => {}
          Ok(Err(e)) => log::error!("Monitor for session {} failed: {}", session.id, e),
          Err(_) => log::error!(
            "Monitor for session {} did not finish within {:?}",
            session.id,
            limit
          ),
        }
        Some(session.track)
      }
    }
  }

  /// Start a claimed session, tracked so `shutdown` can wait for it.
  async fn start_session(
    &self,
    session_id: u64,
    track: TrackDescriptor,
  ) -> Result<StartResult, PlayerError> {
    self
      .tasks
      .track_future(self.launch_session(session_id, track))
      .await
  }

  /// Resolve, spawn and attach a monitor for a claimed session.
  async fn launch_session(
    &self,
    session_id: u64,
    track: TrackDescriptor,
  ) -> Result<StartResult, PlayerError> {
    let url = match self.resolver.stream_url(&track).await {
      Ok(url) => url,
      Err(e) => {
        self.state.lock().abort_start(session_id);
        return Err(e.into());
      }
    };

    let volume = self.state.lock().volume;
    let process = match self.launcher.launch(&url, volume) {
      Ok(process) => process,
      Err(e) => {
        self.state.lock().abort_start(session_id);
        return Err(e.into());
      }
    };

    let rejected = {
      let mut state = self.state.lock();
      if state.is_starting(session_id) {
        let session = monitor::spawn(
          session_id,
          track.clone(),
          process,
          self.exit_tx.clone(),
          self.timing.terminate_grace,
          &self.tasks,
        );
        state.transport = Transport::Playing(session);
        // Published under the lock so it always precedes this session's exit events
        self.publish(PlayerEvent::TrackStarted {
          track: track.clone(),
          volume,
        });
        None
      } else {
        Some(process)
      }
    };

    match rejected {
      None => {
        log::info!("Now playing: {} (session {})", track.title, session_id);
        Ok(StartResult::Running)
      }
      Some(mut process) => {
        log::info!("Start of {} was cancelled, discarding player", track.title);
        monitor::terminate_with_escalation(process.as_mut(), self.timing.terminate_grace).await;
        Ok(StartResult::Cancelled)
      }
    }
  }

  /// React to a monitor reporting that its session ended.
  pub(crate) async fn handle_session_exit(&self, exit: SessionExit) {
    let SessionExit { session_id, outcome } = exit;
    let exit = match outcome {
      SessionOutcome::Terminated(exit) => {
        log::debug!("Session {} terminated on request ({})", session_id, exit);
        return;
      }
      SessionOutcome::Exited(exit) => exit,
    };

    let (ended, next) = {
      let mut state = self.state.lock();
      let Some(session) = state.finish_session(session_id) else {
        log::info!("Ignoring exit of stale session {} ({})", session_id, exit);
        return;
      };
      (session.track, state.start_next())
    };

    if exit.success() {
      log::info!("Finished: {}", ended.title);
      self.publish(PlayerEvent::TrackFinished { track: ended });
    } else {
      log::warn!("Track ended unexpectedly: {} ({})", ended.title, exit);
      self.publish(PlayerEvent::TrackEndedUnexpectedly { track: ended, exit });
    }

    match next {
      Some((next_id, track)) => {
        if let Err(e) = self.start_session(next_id, track.clone()).await {
          log::error!("Failed to start {}: {}", track.title, e);
          self.publish(PlayerEvent::PlaybackFailed {
            track,
            error: e.to_string(),
          });
        }
      }
      None => {
        log::info!("Queue finished");
        self.publish(PlayerEvent::QueueFinished);
      }
    }
  }
}
