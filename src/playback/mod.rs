//! Playback coordination: the queue, the current session and its monitor.

mod coordinator;
mod error;
mod events;
mod monitor;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Advance, Coordinator, PlayOutcome, Timing};
pub use error::PlayerError;
pub use events::PlayerEvent;
pub use state::{PlaybackStatus, QueueSnapshot, MAX_VOLUME, MIN_VOLUME};
