//! Suggestions for a search query input, ready to drop into an editor.

use std::{
  fmt,
  sync::Arc,
};

use crate::{
  completion::{
    FetchSuggestions,
    SuggestionSourceOptions,
    SuggestionStream,
    create_cancelable_fetch_suggestions,
    create_default_suggestion_sources,
    search_query_autocompletion_with,
  },
  config::CompletionConfig,
  extension::Extension,
};

/// What [`create_default_suggestions`] is built from.
#[derive(Clone)]
pub struct DefaultSuggestionsConfig {
  pub is_sourcegraph_dot_com: bool,
  pub globbing:               bool,
  /// Runs a search and streams its matches. Used for repository, file and
  /// symbol suggestions.
  pub fetch_suggestions:      FetchSuggestions,
  pub completion:             CompletionConfig,
}

impl DefaultSuggestionsConfig {
  pub fn new(fetch_suggestions: impl Fn(String) -> SuggestionStream + Send + Sync + 'static) -> Self {
    Self {
      is_sourcegraph_dot_com: false,
      globbing:               false,
      fetch_suggestions:      Arc::new(fetch_suggestions),
      completion:             CompletionConfig::default(),
    }
  }

  pub fn sourcegraph_dot_com(mut self, is_sourcegraph_dot_com: bool) -> Self {
    self.is_sourcegraph_dot_com = is_sourcegraph_dot_com;
    self
  }

  pub fn globbing(mut self, globbing: bool) -> Self {
    self.globbing = globbing;
    self
  }

  pub fn completion(mut self, completion: CompletionConfig) -> Self {
    self.completion = completion;
    self
  }
}

impl fmt::Debug for DefaultSuggestionsConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DefaultSuggestionsConfig")
      .field("is_sourcegraph_dot_com", &self.is_sourcegraph_dot_com)
      .field("globbing", &self.globbing)
      .field("completion", &self.completion)
      .finish_non_exhaustive()
  }
}

/// Filter name, filter value, repository, file and symbol completion.
///
/// Searches go through one cancelable fetch per returned extension, so a new
/// search drops the one still streaming.
pub fn create_default_suggestions(config: DefaultSuggestionsConfig) -> Extension {
  let DefaultSuggestionsConfig {
    is_sourcegraph_dot_com,
    globbing,
    fetch_suggestions,
    completion,
  } = config;
  tracing::debug!(is_sourcegraph_dot_com, globbing, "creating default suggestions");

  let sources = create_default_suggestion_sources(SuggestionSourceOptions {
    fetch_suggestions: create_cancelable_fetch_suggestions(fetch_suggestions),
    globbing,
    is_sourcegraph_dot_com,
    fetch_count: completion.fetch_count,
  });
  search_query_autocompletion_with(sources, completion)
}

#[cfg(test)]
mod test {
  use futures_util::{
    StreamExt,
    stream,
  };

  use super::*;
  use crate::{
    completion::{
      CompletionStatus,
      completion_status,
    },
    state::EditorState,
    transaction::Transaction,
    view::EditorView,
  };

  #[test]
  fn builder_sets_flags() {
    let config = DefaultSuggestionsConfig::new(|_| stream::empty().boxed())
      .sourcegraph_dot_com(true)
      .globbing(true);
    assert!(config.is_sourcegraph_dot_com);
    assert!(config.globbing);
    assert_eq!(config.completion, CompletionConfig::default());
    assert!(format!("{config:?}").contains("globbing: true"));
  }

  #[test]
  fn extension_installs_completion() {
    let extension = create_default_suggestions(DefaultSuggestionsConfig::new(|_| {
      stream::empty().boxed()
    }));
    let mut view = EditorView::new(EditorState::with_text("lang:", extension));
    assert_eq!(completion_status(view.state()), CompletionStatus::Idle);

    let tx = Transaction::insert(view.state().doc(), view.state().selection(), "g".into()).unwrap();
    view.dispatch(tx).unwrap();
    assert_eq!(completion_status(view.state()), CompletionStatus::Pending);
  }
}
