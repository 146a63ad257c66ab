//! In-memory resolver and launcher for driving the coordinator in tests.

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::ffplay::{LaunchError, Launcher, PlayerExit, PlayerProcess};
use crate::youtube::{watch_url, ResolveError, Resolver, SourceRef, TrackDescriptor};

pub(crate) fn track(id: &str) -> TrackDescriptor {
  TrackDescriptor {
    id: id.to_string(),
    title: format!("Track {}", id),
    duration: Some(180),
    uploader: None,
    source: SourceRef::new(watch_url(id)),
  }
}

/// Resolver that hands out `https://stream.test/<id>` URLs.
#[derive(Default)]
pub(crate) struct FakeResolver {
  unresolvable: Mutex<HashSet<String>>,
  delay: Mutex<Duration>,
}

impl FakeResolver {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make stream lookups for this track id fail.
  pub fn fail_stream(&self, id: &str) {
    self.unresolvable.lock().insert(id.to_string());
  }

  /// Delay every stream lookup.
  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock() = delay;
  }
}

impl Resolver for FakeResolver {
  fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<TrackDescriptor>, ResolveError>> {
    Box::pin(async move { Ok(vec![track(query)]) })
  }

  fn resolve_single<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TrackDescriptor, ResolveError>> {
    Box::pin(async move { Ok(track(url)) })
  }

  fn stream_url<'a>(&'a self, track: &'a TrackDescriptor) -> BoxFuture<'a, Result<String, ResolveError>> {
    Box::pin(async move {
      let delay = *self.delay.lock();
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      if self.unresolvable.lock().contains(&track.id) {
        return Err(ResolveError::NotFound(track.id.clone()));
      }
      Ok(format!("https://stream.test/{}", track.id))
    })
  }
}

/// Test-side view of one fake player process.
#[derive(Clone)]
pub(crate) struct FakeControl {
  exit: Arc<watch::Sender<Option<PlayerExit>>>,
  terminates: Arc<AtomicUsize>,
  kills: Arc<AtomicUsize>,
}

impl FakeControl {
  fn new() -> Self {
    let (exit, _) = watch::channel(None);
    Self {
      exit: Arc::new(exit),
      terminates: Arc::new(AtomicUsize::new(0)),
      kills: Arc::new(AtomicUsize::new(0)),
    }
  }

  fn exit_with(&self, exit: PlayerExit) {
    self.exit.send_if_modified(|current| {
      if current.is_none() {
        *current = Some(exit);
        true
      } else {
        false
      }
    });
  }

  /// Let the process exit on its own with `code`.
  pub fn finish(&self, code: i32) {
    self.exit_with(PlayerExit {
      code: Some(code),
      signal: None,
      diagnostics: if code == 0 {
        String::new()
      } else {
        "stream ended early".to_string()
      },
    });
  }

  pub fn is_running(&self) -> bool {
    self.exit.borrow().is_none()
  }

  pub fn terminates(&self) -> usize {
    self.terminates.load(Ordering::SeqCst)
  }

  pub fn kills(&self) -> usize {
    self.kills.load(Ordering::SeqCst)
  }
}

struct FakeProcess {
  control: FakeControl,
  exit_rx: watch::Receiver<Option<PlayerExit>>,
  ignore_terminate: bool,
  terminate_code: Option<i32>,
}

impl PlayerProcess for FakeProcess {
  fn id(&self) -> Option<u32> {
    self.is_running_now().then_some(4242)
  }

  fn is_alive(&mut self) -> bool {
    self.is_running_now()
  }

  fn wait(&mut self) -> BoxFuture<'_, PlayerExit> {
    Box::pin(async move {
      match self.exit_rx.wait_for(|exit| exit.is_some()).await {
        Ok(exit) => exit.as_ref().cloned().unwrap_or_default(),
        Err(_) => PlayerExit::default(),
      }
    })
  }

  fn terminate(&mut self) -> std::io::Result<()> {
    self.control.terminates.fetch_add(1, Ordering::SeqCst);
    if !self.ignore_terminate {
      self.control.exit_with(PlayerExit {
        code: self.terminate_code,
        signal: if self.terminate_code.is_some() { None } else { Some(15) },
        diagnostics: String::new(),
      });
    }
    Ok(())
  }

  fn kill(&mut self) -> BoxFuture<'_, std::io::Result<()>> {
    Box::pin(async move {
      self.control.kills.fetch_add(1, Ordering::SeqCst);
      self.control.exit_with(PlayerExit {
        code: None,
        signal: Some(9),
        diagnostics: String::new(),
      });
      Ok(())
    })
  }
}

impl FakeProcess {
  fn is_running_now(&self) -> bool {
    self.exit_rx.borrow().is_none()
  }
}

/// One recorded `launch` call.
#[derive(Clone)]
pub(crate) struct FakeLaunch {
  pub url: String,
  pub volume: u8,
  pub control: FakeControl,
}

/// Launcher that records every launch and hands out controllable processes.
#[derive(Default)]
pub(crate) struct FakeLauncher {
  launches: Mutex<Vec<FakeLaunch>>,
  fail: AtomicBool,
  ignore_terminate: AtomicBool,
  terminate_code: Mutex<Option<i32>>,
}

impl FakeLauncher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_fail(&self, fail: bool) {
    self.fail.store(fail, Ordering::SeqCst);
  }

  /// Processes launched from now on ignore the graceful terminate request.
  pub fn set_ignore_terminate(&self, ignore: bool) {
    self.ignore_terminate.store(ignore, Ordering::SeqCst);
  }

  /// Processes launched from now on report this exit code when terminated,
  /// looking like a natural exit.
  pub fn set_terminate_code(&self, code: Option<i32>) {
    *self.terminate_code.lock() = code;
  }

  pub fn launch_count(&self) -> usize {
    self.launches.lock().len()
  }

  pub fn launch_at(&self, index: usize) -> FakeLaunch {
    self.launches.lock()[index].clone()
  }

  pub fn control(&self, index: usize) -> FakeControl {
    self.launch_at(index).control
  }
}

impl Launcher for FakeLauncher {
  fn launch(&self, source_url: &str, volume: u8) -> Result<Box<dyn PlayerProcess>, LaunchError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(LaunchError::NotFound);
    }

    let control = FakeControl::new();
    let process = FakeProcess {
      exit_rx: control.exit.subscribe(),
      control: control.clone(),
      ignore_terminate: self.ignore_terminate.load(Ordering::SeqCst),
      terminate_code: *self.terminate_code.lock(),
    };
    self.launches.lock().push(FakeLaunch {
      url: source_url.to_string(),
      volume,
      control,
    });
    Ok(Box::new(process))
  }
}
