//! The background half of completion.
//!
//! [`CompletionHandle`] lives in the update listener. Whenever a transaction
//! starts a new completion request (or ends one) it leaves a
//! [`CompletionEvent`] in a shared slot and wakes a [`CompletionHook`] task.
//! Only the newest event matters, so a burst of edits collapses into one
//! slot and the listener never waits on the hook. The hook debounces typing,
//! queries the sources concurrently and sends the merged options back as a
//! `set_result` effect tagged with the request's generation.

use std::{
  cmp::Reverse,
  collections::HashSet,
  sync::Arc,
  time::Duration,
};

use futures_util::future::join_all;
use parking_lot::Mutex;
use the_query_event::{
  AsyncHook,
  TaskController,
  cancelable_future,
  try_send,
};
use tokio::{
  sync::mpsc::Sender,
  time::Instant,
};

use super::{
  CompletionContext,
  CompletionResult,
  CompletionSource,
  state::{
    ActiveCompletion,
    CompletionState,
    CompletionStatus,
    completion_field,
    set_result,
  },
};
use crate::{
  config::CompletionConfig,
  view::{
    Dispatcher,
    ViewUpdate,
  },
};

type Sources = Arc<[Arc<dyn CompletionSource>]>;

/// Newest event not yet picked up by the hook.
type Mailbox = Arc<Mutex<Option<CompletionEvent>>>;

pub(crate) struct CompletionTrigger {
  generation: u64,
  context:    CompletionContext,
  dispatcher: Dispatcher,
}

pub(crate) enum CompletionEvent {
  Trigger(CompletionTrigger),
  Cancel,
}

pub(crate) struct CompletionHandle {
  sources:     Sources,
  debounce:    Duration,
  max_options: usize,
  latest:      Mailbox,
  /// Wakes the hook. Started on first use, and again if the runtime it ran on
  /// went away.
  tx:          Mutex<Option<Sender<()>>>,
}

impl CompletionHandle {
  pub(crate) fn new(sources: Vec<Arc<dyn CompletionSource>>, config: &CompletionConfig) -> Self {
    Self {
      sources:     sources.into(),
      debounce:    config.debounce(),
      max_options: config.max_options,
      latest:      Mailbox::default(),
      tx:          Mutex::new(None),
    }
  }

  pub(crate) fn on_update(&self, update: &ViewUpdate<'_>) {
    let field = completion_field();
    let Some(completion) = update.state.field(field) else {
      return;
    };
    let previous = update
      .start_state
      .field(field)
      .map_or(0, CompletionState::generation);
    if completion.generation() == previous {
      return;
    }

    let context = (completion.status() == CompletionStatus::Pending)
      .then(|| CompletionContext::from_state(update.state, completion.explicit()))
      .flatten();
    let event = match context {
      Some(context) => {
        CompletionEvent::Trigger(CompletionTrigger {
          generation: completion.generation(),
          context,
          dispatcher: update.dispatcher().clone(),
        })
      },
      None => CompletionEvent::Cancel,
    };
    self.send(event);
  }

  fn send(&self, event: CompletionEvent) {
    let mut tx = self.tx.lock();
    if tx.as_ref().is_none_or(Sender::is_closed) {
      if tokio::runtime::Handle::try_current().is_err() {
        tracing::debug!("no async runtime, completion request dropped");
        return;
      }
      *tx = Some(
        CompletionHook {
          sources:     self.sources.clone(),
          debounce:    self.debounce,
          max_options: self.max_options,
          latest:      self.latest.clone(),
          pending:     None,
          task:        TaskController::new(),
        }
        .spawn(),
      );
    }
    *self.latest.lock() = Some(event);
    // a full channel already holds a wakeup that will read the slot
    if tx.as_ref().is_some_and(|tx| !try_send(tx, ())) {
      tracing::trace!("completion hook already woken");
    }
  }
}

struct CompletionHook {
  sources:     Sources,
  debounce:    Duration,
  max_options: usize,
  latest:      Mailbox,
  pending:     Option<CompletionTrigger>,
  task:        TaskController,
}

impl AsyncHook for CompletionHook {
  type Event = ();

  fn handle_event(&mut self, _: (), timeout: Option<Instant>) -> Option<Instant> {
    let Some(event) = self.latest.lock().take() else {
      return timeout;
    };
    match event {
      CompletionEvent::Trigger(trigger) => {
        // whatever is in flight answers an older generation
        self.task.cancel();
        let immediate = trigger.context.explicit() || self.debounce.is_zero();
        self.pending = Some(trigger);
        if immediate {
          self.finish_debounce();
          None
        } else {
          Some(Instant::now() + self.debounce)
        }
      },
      CompletionEvent::Cancel => {
        self.pending = None;
        self.task.cancel();
        None
      },
    }
  }

  fn finish_debounce(&mut self) {
    let Some(CompletionTrigger {
      generation,
      context,
      dispatcher,
    }) = self.pending.take()
    else {
      return;
    };
    let handle = self.task.restart();
    let sources = self.sources.clone();
    let max_options = self.max_options;

    tokio::spawn(async move {
      let request = query_sources(sources, context, max_options);
      let Some(result) = cancelable_future(request, handle).await else {
        tracing::trace!(generation, "completion request superseded");
        return;
      };
      let options = result.as_ref().map_or(0, |active| active.options.len());
      let delivered = dispatcher.send(vec![set_result(generation, result)]);
      tracing::debug!(generation, options, delivered, "completion results ready");
    });
  }
}

async fn query_sources(
  sources: Sources,
  context: CompletionContext,
  max_options: usize,
) -> Option<ActiveCompletion> {
  let results = join_all(sources.iter().map(|source| source.complete(&context))).await;
  merge_results(&context, results, max_options)
}

/// Combines what the sources returned. The first source with options decides
/// the replaced range; other sources only contribute when they complete the
/// same range. Options are ordered by score, keeping source order on ties,
/// and options inserting the same text are shown once.
fn merge_results(
  context: &CompletionContext,
  results: Vec<Option<CompletionResult>>,
  max_options: usize,
) -> Option<ActiveCompletion> {
  let mut results = results
    .into_iter()
    .flatten()
    .filter(|result| !result.options.is_empty());
  let CompletionResult { span, mut options } = results.next()?;
  for result in results {
    if result.span == span {
      options.extend(result.options);
    }
  }

  options.sort_by_key(|option| Reverse(option.score));
  let mut seen = HashSet::new();
  options.retain(|option| seen.insert(option.insert.clone()));
  options.truncate(max_options);

  Some(ActiveCompletion {
    from: context.char_offset(span.start),
    to: context.char_offset(span.end),
    options,
  })
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{
    AtomicUsize,
    Ordering,
  };

  use futures_util::{
    FutureExt,
    future::{
      self,
      BoxFuture,
    },
  };

  use super::*;
  use crate::{
    completion::{
      Completion,
      CompletionKind,
      completion_status,
      current_completions,
      search_query_autocompletion_with,
    },
    query::Span,
    state::EditorState,
    transaction::Transaction,
    view::EditorView,
  };

  fn result(span: Span, labels: &[(&str, u32)]) -> Option<CompletionResult> {
    Some(CompletionResult {
      span,
      options: labels
        .iter()
        .map(|(label, score)| Completion::new(*label, CompletionKind::FilterValue).with_score(*score))
        .collect(),
    })
  }

  fn labels(active: &ActiveCompletion) -> Vec<&str> {
    active.options.iter().map(|o| o.label.as_str()).collect()
  }

  #[test]
  fn first_non_empty_result_picks_the_range() {
    let context = CompletionContext::new("lang:go", 7, false);
    let merged = merge_results(
      &context,
      vec![
        None,
        result(0..2, &[]),
        result(5..7, &[("go", 1)]),
        result(0..7, &[("other", 9)]),
        result(5..7, &[("gomod", 3)]),
      ],
      10,
    )
    .unwrap();
    assert_eq!((merged.from, merged.to), (5, 7));
    assert_eq!(labels(&merged), vec!["gomod", "go"]);
  }

  #[test]
  fn duplicates_and_overflow_are_dropped() {
    let context = CompletionContext::new("x", 1, false);
    let merged = merge_results(
      &context,
      vec![
        result(0..1, &[("a", 0), ("b", 0), ("a", 0)]),
        result(0..1, &[("c", 0), ("d", 0)]),
      ],
      3,
    )
    .unwrap();
    assert_eq!(labels(&merged), vec!["a", "b", "c"]);
  }

  #[test]
  fn ranges_are_reported_in_chars() {
    let context = CompletionContext::new("repo:日本 x", 12, false);
    let merged = merge_results(&context, vec![result(12..12, &[("y", 0)])], 5).unwrap();
    assert_eq!((merged.from, merged.to), (8, 8));
    assert!(merge_results(&context, vec![None, result(0..1, &[])], 5).is_none());
  }

  struct Counting {
    calls: Arc<AtomicUsize>,
  }

  impl CompletionSource for Counting {
    fn complete(&self, context: &CompletionContext) -> BoxFuture<'static, Option<CompletionResult>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let word = context.token().map(|token| token.span.clone());
      future::ready(word.map(|span| CompletionResult {
        span,
        options: vec![Completion::new("found", CompletionKind::Symbol)],
      }))
      .boxed()
    }
  }

  fn type_text(view: &mut EditorView, text: &str) {
    let end = view.state().doc().len_chars();
    let tx = Transaction::change(view.state().doc(), [(end, end, Some(text.into()))]).unwrap();
    view.dispatch(tx).unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn typing_bursts_query_sources_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source: Arc<dyn CompletionSource> = Arc::new(Counting {
      calls: calls.clone(),
    });
    let config = CompletionConfig {
      debounce_ms: 50,
      ..CompletionConfig::default()
    };
    let mut view = EditorView::new(EditorState::with_text(
      "",
      search_query_autocompletion_with(vec![source], config),
    ));

    for ch in ["a", "b", "c"] {
      type_text(&mut view, ch);
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(completion_status(view.state()), CompletionStatus::Pending);
    assert!(view.process_next().await.unwrap());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(completion_status(view.state()), CompletionStatus::Active);
    assert_eq!(current_completions(view.state())[0].label, "found");
  }

  #[test]
  fn updates_without_a_runtime_are_ignored() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source: Arc<dyn CompletionSource> = Arc::new(Counting {
      calls: calls.clone(),
    });
    let mut view = EditorView::new(EditorState::with_text(
      "",
      search_query_autocompletion_with(vec![source], CompletionConfig::default()),
    ));
    type_text(&mut view, "repo:");
    assert_eq!(completion_status(view.state()), CompletionStatus::Pending);
    assert_eq!(view.flush_pending().unwrap(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }
}
