//! Utilities for declaring an async (usually debounced) hook.
//!
//! Keystrokes in the query input arrive much faster than suggestion requests
//! should be issued. An [`AsyncHook`] receives events from the synchronous
//! editor side over a bounded channel and decides, per event, whether to act
//! right away or to (re)arm a debounce deadline.

use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Capacity of the channel between the editor and a hook task.
///
/// Events are drained as soon as the hook task gets to run, so this only
/// needs headroom for a burst of edits applied without yielding to the
/// runtime. Past that, senders drop events instead of waiting.
const HOOK_CHANNEL_CAPACITY: usize = 128;

/// Async hooks run as a background tokio task that waits for events (usually
/// an enum) sent through a channel. Most synchronous editor hooks need to
/// debounce what they see and keep some state between events, and this is
/// the place for both.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  /// Called immediately whenever an event is received, together with the
  /// currently armed deadline. Returns the deadline to wait for next:
  /// a new one, the current one to keep it running, or `None` to disarm.
  fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

  /// Called whenever the debounce deadline is reached.
  fn finish_debounce(&mut self);

  /// Starts the hook and returns the sending half of its channel.
  fn spawn(self) -> mpsc::Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(HOOK_CHANNEL_CAPACITY);
    // Only spawn the worker inside a runtime, so synchronous callers (and
    // their unit tests) do not need one. The sender is then connected to
    // nothing and every send reports a closed channel.
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline = None;
  loop {
    let event = match deadline {
      Some(deadline_) => {
        match tokio::time::timeout_at(deadline_, rx.recv()).await {
          Ok(event) => event,
          Err(_) => {
            hook.finish_debounce();
            deadline = None;
            continue;
          },
        }
      },
      None => rx.recv().await,
    };
    let Some(event) = event else {
      break;
    };
    deadline = hook.handle_event(event, deadline);
  }
}

/// Send an event from synchronous code without ever waiting.
///
/// Editor callbacks often run on the very runtime thread that drives the
/// hook, so blocking on a full channel could never make progress. Returns
/// `false` when the event was dropped because the channel is full or closed.
pub fn try_send<T>(tx: &Sender<T>, data: T) -> bool {
  match tx.try_send(data) {
    Ok(()) => true,
    Err(TrySendError::Full(_)) => false,
    Err(TrySendError::Closed(_)) => {
      log::warn!("attempted to send to a closed hook channel");
      false
    },
  }
}
