//! Per-session monitor task.
//!
//! Each started session gets one task that owns the player process. It waits
//! for the process to exit, or for the coordinator to cancel the session, and
//! reports what happened back over the exit channel. It never decides on its
//! own to terminate the process.

use async_channel::Sender;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::events::{SessionExit, SessionOutcome};
use super::state::ActiveSession;
use crate::ffplay::{PlayerExit, PlayerProcess};
use crate::youtube::TrackDescriptor;

/// Spawn the monitor for a freshly launched process.
pub(crate) fn spawn(
  session_id: u64,
  track: TrackDescriptor,
  mut process: Box<dyn PlayerProcess>,
  exits: Sender<SessionExit>,
  terminate_grace: Duration,
  tasks: &TaskTracker,
) -> ActiveSession {
  let cancel = CancellationToken::new();
  let token = cancel.clone();

  let monitor = tasks.spawn(async move {
    log::debug!("Monitor for session {} started (pid: {:?})", session_id, process.id());
    let outcome = watch(process.as_mut(), &token, terminate_grace).await;
    log::debug!("Monitor for session {} done: {:?}", session_id, outcome);

    if exits.send(SessionExit { session_id, outcome }).await.is_err() {
      log::warn!("Exit listener is gone, dropping exit of session {}", session_id);
    }
  });

  ActiveSession {
    id: session_id,
    track,
    started_at: Instant::now(),
    cancel,
    monitor,
  }
}

async fn watch(
  process: &mut dyn PlayerProcess,
  cancel: &CancellationToken,
  terminate_grace: Duration,
) -> SessionOutcome {
  let exited = tokio::select! {
    exit = process.wait() => Some(exit),
    _ = cancel.cancelled() => None,
  };

  match exited {
    Some(exit) => SessionOutcome::Exited(exit),
    None => SessionOutcome::Terminated(terminate_with_escalation(process, terminate_grace).await),
  }
}

/// Graceful terminate, bounded wait, then kill.
pub(crate) async fn terminate_with_escalation(
  process: &mut dyn PlayerProcess,
  grace: Duration,
) -> PlayerExit {
  if !process.is_alive() {
    // Exited on its own in the meantime; just reap it
    return process.wait().await;
  }

  if let Err(e) = process.terminate() {
    log::warn!("Graceful terminate failed (pid: {:?}): {}", process.id(), e);
  }

  match tokio::time::timeout(grace, process.wait()).await {
    Ok(exit) => {
      log::info!("Player exited after terminate: {}", exit);
      exit
    }
    Err(_) => {
      log::warn!(
        "Player did not exit within {:?}, killing (pid: {:?})",
        grace,
        process.id()
      );
      if let Err(e) = process.kill().await {
        log::error!("kill() failed: {}", e);
      }
      process.wait().await
    }
  }
}
