//! Autocompletion for the search query input.
//!
//! Completion is split between a synchronous and an asynchronous half:
//!
//! - a state field tracks whether completion is idle, waiting for results or
//!   showing options, and is only ever changed by transactions;
//! - an update listener notices edits and hands a [`CompletionContext`] to a
//!   debounced background hook, which queries every [`CompletionSource`] and
//!   sends the merged result back through the view's dispatcher.
//!
//! Each request carries the generation of the state it was made for; results
//! for an older generation are dropped when they arrive.

use std::{
  fmt,
  sync::Arc,
};

use futures_util::future::BoxFuture;

use crate::{
  config::CompletionConfig,
  extension::Extension,
  query::{
    Span,
    Token,
    scan,
    token_at,
  },
  state::EditorState,
  view::{
    ViewUpdate,
    update_listener,
  },
};

mod fetch;
mod hook;
mod sources;
mod state;

pub use fetch::{
  CancelableFetch,
  FetchResult,
  FetchSuggestions,
  SearchMatch,
  SuggestionStream,
  SymbolMatch,
  create_cancelable_fetch_suggestions,
};
pub use sources::{
  SuggestionSourceOptions,
  create_default_suggestion_sources,
  filter_value,
};
pub use state::{
  ActiveCompletion,
  CompletionState,
  CompletionStatus,
  accept_completion,
  close_completion,
  completion_status,
  current_completions,
  move_completion_selection,
  selected_completion,
  start_completion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
  Filter,
  FilterValue,
  Repository,
  Path,
  Symbol,
}

/// A single option offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
  pub label:     String,
  /// Text that replaces the completed range.
  pub insert:    String,
  pub detail:    Option<String>,
  pub kind:      CompletionKind,
  /// Higher sorts first. Options with equal scores keep source order.
  pub score:     u32,
  /// Request completion again right after this option is accepted, as after
  /// inserting a filter name.
  pub retrigger: bool,
}

impl Completion {
  pub fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
    let label = label.into();
    Self {
      insert: label.clone(),
      label,
      detail: None,
      kind,
      score: 0,
      retrigger: false,
    }
  }

  pub fn with_insert(mut self, insert: impl Into<String>) -> Self {
    self.insert = insert.into();
    self
  }

  pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
    self.detail = Some(detail.into());
    self
  }

  pub fn with_score(mut self, score: u32) -> Self {
    self.score = score;
    self
  }

  pub fn retriggering(mut self) -> Self {
    self.retrigger = true;
    self
  }
}

/// Options a source offers for the query range `span` (bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
  pub span:    Span,
  pub options: Vec<Completion>,
}

/// The query and cursor a completion request is made for.
#[derive(Clone)]
pub struct CompletionContext {
  query:    Arc<str>,
  tokens:   Arc<[Token]>,
  cursor:   usize,
  explicit: bool,
}

impl CompletionContext {
  /// `cursor` is a byte offset, clamped to the query and moved back to a
  /// char boundary.
  pub fn new(query: impl Into<Arc<str>>, cursor: usize, explicit: bool) -> Self {
    let query = query.into();
    let mut cursor = cursor.min(query.len());
    while !query.is_char_boundary(cursor) {
      cursor -= 1;
    }
    Self {
      tokens: scan(&query).into(),
      query,
      cursor,
      explicit,
    }
  }

  /// Context for the state's cursor. `None` unless the selection is a single
  /// cursor.
  pub fn from_state(state: &EditorState, explicit: bool) -> Option<Self> {
    let pos = state.selection().single_cursor()?;
    let cursor = state.doc().char_to_byte(pos);
    Some(Self::new(state.text(), cursor, explicit))
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  /// Cursor position in bytes.
  pub fn cursor(&self) -> usize {
    self.cursor
  }

  /// Whether the user asked for completion, rather than just typing.
  pub fn explicit(&self) -> bool {
    self.explicit
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  /// The word token under the cursor.
  pub fn token(&self) -> Option<&Token> {
    token_at(&self.tokens, self.cursor)
  }

  /// Converts a byte offset in the query to a char offset.
  pub fn char_offset(&self, byte: usize) -> usize {
    self.query[..byte.min(self.query.len())].chars().count()
  }
}

impl fmt::Debug for CompletionContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompletionContext")
      .field("query", &self.query)
      .field("cursor", &self.cursor)
      .field("explicit", &self.explicit)
      .finish()
  }
}

/// Something that can suggest options for a query.
///
/// Sources run concurrently. Returning `None` (or no options) means the
/// source has nothing to offer here.
pub trait CompletionSource: Send + Sync + 'static {
  fn complete(&self, context: &CompletionContext) -> BoxFuture<'static, Option<CompletionResult>>;
}

/// Completion over `sources` with default settings.
pub fn search_query_autocompletion(sources: Vec<Arc<dyn CompletionSource>>) -> Extension {
  search_query_autocompletion_with(sources, CompletionConfig::default())
}

pub fn search_query_autocompletion_with(
  sources: Vec<Arc<dyn CompletionSource>>,
  config: CompletionConfig,
) -> Extension {
  let hook = hook::CompletionHandle::new(sources, &config);
  Extension::group([
    state::completion_field().extension(),
    state::completion_config().of(config),
    update_listener().of(Arc::new(move |update: &ViewUpdate<'_>| hook.on_update(update))),
  ])
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn context_clamps_cursor_to_char_boundary() {
    let context = CompletionContext::new("repo:世", 7, false);
    assert_eq!(context.cursor(), 5);
    assert_eq!(context.char_offset(context.query().len()), 6);

    let context = CompletionContext::new("lang:go", 100, true);
    assert_eq!(context.cursor(), 7);
    assert!(context.explicit());
  }

  #[test]
  fn context_from_state_needs_single_cursor() {
    let state = EditorState::with_text("repo:世界 x", Extension::none());
    let context = CompletionContext::from_state(&state, false).unwrap();
    assert_eq!(context.cursor(), state.text().len());
    assert_eq!(
      context.token().map(|t| &context.query()[t.span.clone()]),
      Some("x")
    );

    let state = EditorState::create(crate::state::StateConfig {
      doc: ropey::Rope::from("abc"),
      selection: Some(crate::selection::Selection::single(0, 2)),
      ..Default::default()
    })
    .unwrap();
    assert!(CompletionContext::from_state(&state, true).is_none());
  }

  #[test]
  fn completion_builder() {
    let option = Completion::new("repo:", CompletionKind::Filter)
      .with_detail("repositories")
      .with_score(3)
      .retriggering();
    assert_eq!(option.insert, "repo:");
    assert_eq!(option.detail.as_deref(), Some("repositories"));
    assert!(option.retrigger);
  }
}
