//! Playback error types.

use thiserror::Error;

use crate::ffplay::LaunchError;
use crate::youtube::ResolveError;

/// Errors returned by coordinator operations.
///
/// Abnormal player exits are not errors; they are reported through
/// `PlayerEvent::TrackEndedUnexpectedly` and the queue moves on.
#[derive(Debug, Error)]
pub enum PlayerError {
  #[error("Resolution error: {0}")]
  Resolution(#[from] ResolveError),

  #[error("Launch error: {0}")]
  Launch(#[from] LaunchError),

  #[error("Validation error: {0}")]
  Validation(String),
}
