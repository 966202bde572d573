//! Async plumbing shared by the query input: debounced hooks that run as
//! background tokio tasks and generation-based cancellation of in-flight
//! work.

mod cancel;
mod debounce;

pub use cancel::{
  TaskController,
  TaskHandle,
  cancelable_future,
};
pub use debounce::{
  AsyncHook,
  try_send,
};
