//! Generation-based cancellation of background work.
//!
//! A [`TaskController`] hands out a [`TaskHandle`] each time a task is
//! (re)started. Restarting or cancelling the controller bumps its generation,
//! which cancels every handle of an older generation. Cancelled handles are
//! woken through a shared [`Notify`].

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use tokio::sync::Notify;

/// Low bit of the shared state: a task of the current generation is running.
const RUNNING: u64 = 1;

#[derive(Debug, Default)]
struct Shared {
  /// `generation << 1 | running`
  state:  AtomicU64,
  notify: Notify,
}

impl Shared {
  fn generation(&self) -> u64 {
    self.state.load(Ordering::Acquire) >> 1
  }

  /// Bump the generation, setting the running bit to `running`. Returns the
  /// new generation.
  fn advance(&self, running: bool) -> u64 {
    let mut current = self.state.load(Ordering::Acquire);
    loop {
      let generation = (current >> 1).wrapping_add(1);
      let next = (generation << 1) | u64::from(running);
      match self
        .state
        .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => {
          self.notify.notify_waiters();
          return generation;
        },
        Err(actual) => current = actual,
      }
    }
  }
}

/// Owner side of a cancelable task slot.
///
/// Dropping the controller cancels the running task.
#[derive(Debug)]
pub struct TaskController {
  shared: Arc<Shared>,
}

impl Default for TaskController {
  fn default() -> Self {
    Self::new()
  }
}

impl TaskController {
  pub fn new() -> Self {
    Self {
      shared: Arc::new(Shared::default()),
    }
  }

  /// Cancels the task of the current generation, if any.
  pub fn cancel(&mut self) {
    if self.is_running() {
      self.shared.advance(false);
    }
  }

  /// Whether a task started by the last `restart` is still alive.
  pub fn is_running(&self) -> bool {
    self.shared.state.load(Ordering::Acquire) & RUNNING == RUNNING
  }

  /// Cancels any running task and returns a handle for a new one.
  pub fn restart(&mut self) -> TaskHandle {
    let generation = self.shared.advance(true);
    TaskHandle {
      shared: self.shared.clone(),
      generation,
    }
  }
}

impl Drop for TaskController {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// Task side of a [`TaskController`].
///
/// Dropping the handle of the current generation marks the controller as no
/// longer running.
#[derive(Debug)]
pub struct TaskHandle {
  shared:     Arc<Shared>,
  generation: u64,
}

impl TaskHandle {
  pub fn is_canceled(&self) -> bool {
    self.shared.generation() != self.generation
  }

  /// Resolves once this handle has been canceled.
  pub async fn canceled(&self) {
    loop {
      let notified = self.shared.notify.notified();
      let mut notified = std::pin::pin!(notified);
      // register before checking so a concurrent cancel is not missed
      notified.as_mut().enable();
      if self.is_canceled() {
        return;
      }
      notified.await;
    }
  }
}

impl Drop for TaskHandle {
  fn drop(&mut self) {
    let running = (self.generation << 1) | RUNNING;
    let _ = self.shared.state.compare_exchange(
      running,
      self.generation << 1,
      Ordering::AcqRel,
      Ordering::Acquire,
    );
  }
}

/// Runs `future` until it completes or `handle` is canceled, whichever comes
/// first. Returns `None` on cancellation; the future is dropped at that point.
pub async fn cancelable_future<T>(future: impl Future<Output = T>, handle: TaskHandle) -> Option<T> {
  tokio::select! {
    biased;
    _ = handle.canceled() => None,
    res = future => Some(res),
  }
}
