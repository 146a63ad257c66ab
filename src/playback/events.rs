//! Messages flowing out of the playback sessions.

use crate::ffplay::PlayerExit;
use crate::youtube::TrackDescriptor;

/// Notifications for the user, published on a broadcast channel.
///
/// Most of these originate on the monitor path, so they are the only way the
/// command prompt learns about them.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
  /// A session is running for this track.
  TrackStarted { track: TrackDescriptor, volume: u8 },
  /// The player exited cleanly at end of stream.
  TrackFinished { track: TrackDescriptor },
  /// The player exited with an error or was killed externally.
  TrackEndedUnexpectedly { track: TrackDescriptor, exit: PlayerExit },
  /// The last track ended and nothing is queued.
  QueueFinished,
  /// A queued track could not be started.
  PlaybackFailed { track: TrackDescriptor, error: String },
}

/// How a monitored session ended.
#[derive(Debug)]
pub(crate) enum SessionOutcome {
  /// The process exited on its own.
  Exited(PlayerExit),
  /// The coordinator cancelled the session and the process was torn down.
  Terminated(PlayerExit),
}

/// Sent by a monitor task to the coordinator when its session ends.
#[derive(Debug)]
pub(crate) struct SessionExit {
  pub session_id: u64,
  pub outcome: SessionOutcome,
}
