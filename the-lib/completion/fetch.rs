use std::{
  fmt,
  future::Future,
  sync::Arc,
};

use futures_util::{
  StreamExt,
  stream::BoxStream,
};
use parking_lot::Mutex;
use serde::{
  Deserialize,
  Serialize,
};
use the_query_event::{
  TaskController,
  cancelable_future,
};

/// One streamed search result, as sent by the search API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchMatch {
  Repo {
    repository: String,
  },
  Path {
    repository: String,
    path:       String,
  },
  Symbol {
    repository: String,
    path:       String,
    symbols:    Vec<SymbolMatch>,
  },
  Content {
    repository: String,
    path:       String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
  pub name:           String,
  pub kind:           String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container_name: Option<String>,
}

/// Batches of matches for one query, in arrival order.
pub type SuggestionStream = BoxStream<'static, anyhow::Result<Vec<SearchMatch>>>;

/// Runs a search query and streams its matches.
pub type FetchSuggestions = Arc<dyn Fn(String) -> SuggestionStream + Send + Sync>;

/// `None` when the request was superseded before it finished.
pub type FetchResult = Option<anyhow::Result<Vec<SearchMatch>>>;

/// Wraps a [`FetchSuggestions`] so that starting a request cancels the one
/// still in flight.
pub struct CancelableFetch {
  fetch:      FetchSuggestions,
  controller: Mutex<TaskController>,
}

pub fn create_cancelable_fetch_suggestions(fetch: FetchSuggestions) -> Arc<CancelableFetch> {
  Arc::new(CancelableFetch {
    fetch,
    controller: Mutex::new(TaskController::new()),
  })
}

impl CancelableFetch {
  /// Starts fetching `query` and cancels the previous request right away,
  /// even before the returned future is first polled. The future resolves
  /// to every batch concatenated, to the first stream error, or to `None`
  /// once a later call supersedes it (the stream is dropped then).
  pub fn fetch(&self, query: String) -> impl Future<Output = FetchResult> + Send + use<> {
    let handle = self.controller.lock().restart();
    tracing::debug!(%query, "fetching suggestions");
    let stream = (self.fetch)(query);
    cancelable_future(collect_batches(stream), handle)
  }
}

async fn collect_batches(mut stream: SuggestionStream) -> anyhow::Result<Vec<SearchMatch>> {
  let mut matches = Vec::new();
  while let Some(batch) = stream.next().await {
    matches.extend(batch?);
  }
  Ok(matches)
}

impl fmt::Debug for CancelableFetch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CancelableFetch")
      .field("running", &self.controller.lock().is_running())
      .finish_non_exhaustive()
  }
}
