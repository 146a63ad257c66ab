//! Player state guarded by the coordinator's lock.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::youtube::TrackDescriptor;

pub const MIN_VOLUME: u8 = 1;
pub const MAX_VOLUME: u8 = 100;

/// One live player invocation, owned by the coordinator.
///
/// The process itself lives in the monitor task; the coordinator keeps the
/// token that asks the monitor to tear it down and the task handle to wait
/// for that to finish.
pub(crate) struct ActiveSession {
  pub id: u64,
  pub track: TrackDescriptor,
  pub started_at: Instant,
  pub cancel: CancellationToken,
  pub monitor: JoinHandle<()>,
}

/// Where the player is in its lifecycle.
pub(crate) enum Transport {
  Idle,
  /// Stream URL lookup and spawn in progress for `session_id`.
  Starting { session_id: u64, track: TrackDescriptor },
  Playing(ActiveSession),
  /// An intentional stop is tearing the session down. Exits reported while
  /// here never advance the queue.
  Stopping { track: TrackDescriptor },
}

impl Transport {
  pub fn current(&self) -> Option<&TrackDescriptor> {
    match self {
      Transport::Idle => None,
      Transport::Starting { track, .. } | Transport::Stopping { track } => Some(track),
      Transport::Playing(session) => Some(&session.track),
    }
  }

  pub fn status(&self) -> PlaybackStatus {
    match self {
      Transport::Idle => PlaybackStatus::Idle,
      Transport::Starting { .. } => PlaybackStatus::Starting,
      Transport::Playing(_) => PlaybackStatus::Playing,
      Transport::Stopping { .. } => PlaybackStatus::Stopping,
    }
  }

  pub fn is_idle(&self) -> bool {
    matches!(self, Transport::Idle)
  }
}

/// What `begin_stop` took out of the transport.
pub(crate) enum Teardown {
  Nothing,
  /// A start was still in flight; it will discard its own process.
  Pending(TrackDescriptor),
  Session(ActiveSession),
}

pub(crate) struct PlayerState {
  pub volume: u8,
  pub transport: Transport,
  pub queue: VecDeque<TrackDescriptor>,
  next_session_id: u64,
}

impl PlayerState {
  pub fn new(volume: u8) -> Self {
    Self {
      volume: volume.clamp(MIN_VOLUME, MAX_VOLUME),
      transport: Transport::Idle,
      queue: VecDeque::new(),
      next_session_id: 1,
    }
  }

  /// Mark `track` as being started and return its session id.
  pub fn begin_start(&mut self, track: TrackDescriptor) -> u64 {
    let session_id = self.next_session_id;
    self.next_session_id += 1;
    self.transport = Transport::Starting { session_id, track };
    session_id
  }

  /// Pop the queue head and begin starting it. Leaves the transport alone
  /// when the queue is empty.
  pub fn start_next(&mut self) -> Option<(u64, TrackDescriptor)> {
    let track = self.queue.pop_front()?;
    let session_id = self.begin_start(track.clone());
    Some((session_id, track))
  }

  pub fn is_starting(&self, session_id: u64) -> bool {
    matches!(&self.transport, Transport::Starting { session_id: id, .. } if *id == session_id)
  }

  /// Drop a start that failed, if it is still the current one.
  pub fn abort_start(&mut self, session_id: u64) -> bool {
    if self.is_starting(session_id) {
      self.transport = Transport::Idle;
      true
    } else {
      false
    }
  }

  /// Take the session out if it is the one currently playing.
  pub fn finish_session(&mut self, session_id: u64) -> Option<ActiveSession> {
    match &self.transport {
      Transport::Playing(session) if session.id == session_id => {}
      _ => return None,
    }
    match std::mem::replace(&mut self.transport, Transport::Idle) {
      Transport::Playing(session) => Some(session),
      _ => None,
    }
  }

  /// First half of an intentional stop: Playing becomes Stopping, a pending
  /// start is abandoned.
  pub fn begin_stop(&mut self) -> Teardown {
    match std::mem::replace(&mut self.transport, Transport::Idle) {
      Transport::Idle => Teardown::Nothing,
      Transport::Starting { track, .. } => Teardown::Pending(track),
      Transport::Playing(session) => {
        self.transport = Transport::Stopping {
          track: session.track.clone(),
        };
        Teardown::Session(session)
      }
      stopping @ Transport::Stopping { .. } => {
        self.transport = stopping;
        Teardown::Nothing
      }
    }
  }

  /// Second half of an intentional stop.
  pub fn finish_stop(&mut self) -> Option<TrackDescriptor> {
    match std::mem::replace(&mut self.transport, Transport::Idle) {
      Transport::Stopping { track } => Some(track),
      other => {
        self.transport = other;
        None
      }
    }
  }

  pub fn snapshot(&self) -> QueueSnapshot {
    QueueSnapshot {
      status: self.transport.status(),
      current: self.transport.current().cloned(),
      queue: self.queue.iter().cloned().collect(),
      volume: self.volume,
      elapsed: match &self.transport {
        Transport::Playing(session) => Some(session.started_at.elapsed()),
        _ => None,
      },
    }
  }
}

/// Coarse playback status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
  Idle,
  Starting,
  Playing,
  Stopping,
}

/// Consistent copy of the player state.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
  pub status: PlaybackStatus,
  pub current: Option<TrackDescriptor>,
  /// Pending tracks, next first. Never includes `current`.
  pub queue: Vec<TrackDescriptor>,
  pub volume: u8,
  /// Time since the current session started playing.
  pub elapsed: Option<Duration>,
}

impl QueueSnapshot {
  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }
}
