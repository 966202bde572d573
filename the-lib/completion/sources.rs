//! The suggestion sources every query input gets: filter names, fixed filter
//! values, and values found by searching (repositories, files, symbols).

use std::sync::Arc;

use futures_util::{
  FutureExt,
  future::{
    self,
    BoxFuture,
  },
};

use super::{
  Completion,
  CompletionContext,
  CompletionKind,
  CompletionResult,
  CompletionSource,
  fetch::{
    CancelableFetch,
    SearchMatch,
  },
};
use crate::{
  chars::char_is_separator,
  fuzzy::fuzzy_match,
  query::{
    FilterType,
    Span,
    TokenKind,
  },
};

#[derive(Debug, Clone)]
pub struct SuggestionSourceOptions {
  pub fetch_suggestions:      Arc<CancelableFetch>,
  /// Repository and file values are globs rather than regular expressions.
  pub globbing:               bool,
  /// Empty `repo:`/`file:` values are never searched on Sourcegraph.com,
  /// where listing everything is too expensive to be useful.
  pub is_sourcegraph_dot_com: bool,
  /// `count:` sent with every search.
  pub fetch_count:            usize,
}

pub fn create_default_suggestion_sources(
  options: SuggestionSourceOptions,
) -> Vec<Arc<dyn CompletionSource>> {
  vec![
    Arc::new(FilterNames),
    Arc::new(FilterValues),
    Arc::new(SearchedValues { options }),
  ]
}

/// Formats a repository or file name as a filter value. Without globbing the
/// name becomes an anchored, escaped regular expression. Values containing
/// whitespace are quoted.
pub fn filter_value(value: &str, globbing: bool) -> String {
  let value = if globbing {
    value.to_string()
  } else {
    format!("^{}$", regex::escape(value))
  };
  if value.chars().any(char_is_separator) {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
  } else {
    value
  }
}

struct FilterNames;

impl CompletionSource for FilterNames {
  fn complete(&self, context: &CompletionContext) -> BoxFuture<'static, Option<CompletionResult>> {
    future::ready(filter_names(context)).boxed()
  }
}

fn filter_names(context: &CompletionContext) -> Option<CompletionResult> {
  let query = context.query();
  let (word, span) = match context.token() {
    None => ("", context.cursor()..context.cursor()),
    Some(token) => {
      match &token.kind {
        TokenKind::Pattern(pattern) if pattern.quote.is_none() => {
          (&query[token.span.clone()], token.span.clone())
        },
        _ => return None,
      }
    },
  };
  if word.is_empty() && !context.explicit() {
    return None;
  }

  let (negated, needle) = match word.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, word),
  };
  let names = FilterType::ALL
    .iter()
    .filter(|filter| !negated || filter.negatable())
    .map(|filter| filter.name());
  let options = fuzzy_match(needle, names)
    .into_iter()
    .filter_map(|(name, score)| {
      let filter = FilterType::resolve(name)?;
      let label = if negated {
        format!("-{name}:")
      } else {
        format!("{name}:")
      };
      Some(
        Completion::new(label, CompletionKind::Filter)
          .with_detail(filter.description())
          .with_score(u32::from(score))
          .retriggering(),
      )
    })
    .collect();
  Some(CompletionResult { span, options })
}

struct FilterValues;

impl CompletionSource for FilterValues {
  fn complete(&self, context: &CompletionContext) -> BoxFuture<'static, Option<CompletionResult>> {
    future::ready(filter_values(context)).boxed()
  }
}

fn filter_values(context: &CompletionContext) -> Option<CompletionResult> {
  let query = context.query();
  let TokenKind::Filter(filter) = &context.token()?.kind else {
    return None;
  };
  if context.cursor() < filter.value.span.start {
    return None;
  }
  let values = filter.filter_type(query)?.discrete_values();
  if values.is_empty() {
    return None;
  }

  let options = fuzzy_match(filter.value.text(query), values.iter().copied())
    .into_iter()
    .map(|(value, score)| {
      Completion::new(value, CompletionKind::FilterValue).with_score(u32::from(score))
    })
    .collect();
  Some(CompletionResult {
    span: filter.value.span.clone(),
    options,
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
  Repo,
  File,
  Symbol,
}

#[derive(Debug)]
struct SearchRequest {
  query:  String,
  span:   Span,
  target: Target,
}

struct SearchedValues {
  options: SuggestionSourceOptions,
}

impl SearchedValues {
  fn request(&self, context: &CompletionContext) -> Option<SearchRequest> {
    let query = context.query();
    let token = context.token()?;
    let count = self.options.fetch_count;

    match &token.kind {
      TokenKind::Filter(filter) => {
        let filter_type = filter.filter_type(query)?;
        if !filter_type.has_dynamic_values() || context.cursor() < filter.value.span.start {
          return None;
        }
        let value = filter.value.text(query);
        if value.is_empty() && self.options.is_sourcegraph_dot_com {
          return None;
        }

        let mut terms = Vec::new();
        let target = match filter_type {
          FilterType::Repo => {
            terms.push(format!("repo:{}", quote_term(value)));
            terms.push("type:repo".to_string());
            Target::Repo
          },
          _ => {
            // narrow file suggestions to the repositories already chosen
            terms.extend(
              context
                .tokens()
                .iter()
                .filter(|other| other.span != token.span)
                .filter(|other| {
                  matches!(&other.kind, TokenKind::Filter(f)
                    if f.filter_type(query) == Some(FilterType::Repo))
                })
                .map(|other| query[other.span.clone()].to_string()),
            );
            terms.push(format!("file:{}", quote_term(value)));
            terms.push("type:path".to_string());
            Target::File
          },
        };
        terms.push(format!("count:{count}"));
        Some(SearchRequest {
          query: terms.join(" "),
          span: filter.value.span.clone(),
          target,
        })
      },
      TokenKind::Pattern(pattern) if pattern.quote.is_none() => {
        let value = pattern.text(query);
        if value.chars().count() < 2 {
          return None;
        }
        Some(SearchRequest {
          query:  format!("{value} type:symbol count:{count}"),
          span:   token.span.clone(),
          target: Target::Symbol,
        })
      },
      _ => None,
    }
  }
}

fn quote_term(value: &str) -> String {
  if value.chars().any(char_is_separator) {
    format!("\"{}\"", value.replace('"', "\\\""))
  } else {
    value.to_string()
  }
}

impl CompletionSource for SearchedValues {
  fn complete(&self, context: &CompletionContext) -> BoxFuture<'static, Option<CompletionResult>> {
    let Some(request) = self.request(context) else {
      return future::ready(None).boxed();
    };
    let pending = self
      .options
      .fetch_suggestions
      .fetch(request.query.clone());
    let globbing = self.options.globbing;

    async move {
      let matches = match pending.await? {
        Ok(matches) => matches,
        Err(err) => {
          tracing::warn!(query = %request.query, "fetching suggestions failed: {err:#}");
          return None;
        },
      };
      let options = matches
        .into_iter()
        .flat_map(|found| completions_for(request.target, found, globbing))
        .collect();
      Some(CompletionResult {
        span: request.span,
        options,
      })
    }
    .boxed()
  }
}

fn completions_for(target: Target, found: SearchMatch, globbing: bool) -> Vec<Completion> {
  match (target, found) {
    (Target::Repo, SearchMatch::Repo { repository }) => {
      vec![
        Completion::new(repository.as_str(), CompletionKind::Repository)
          .with_insert(filter_value(&repository, globbing)),
      ]
    },
    (Target::File, SearchMatch::Path { repository, path }) => {
      vec![
        Completion::new(path.as_str(), CompletionKind::Path)
          .with_insert(filter_value(&path, globbing))
          .with_detail(repository),
      ]
    },
    (Target::Symbol, SearchMatch::Symbol { symbols, .. }) => {
      symbols
        .into_iter()
        .map(|symbol| {
          let kind = symbol.kind.to_lowercase();
          let detail = match symbol.container_name {
            Some(container) => format!("{kind} in {container}"),
            None => kind,
          };
          Completion::new(symbol.name, CompletionKind::Symbol).with_detail(detail)
        })
        .collect()
    },
    _ => Vec::new(),
  }
}

#[cfg(test)]
mod test {
  use futures_util::{
    StreamExt,
    stream,
  };
  use parking_lot::Mutex;

  use super::*;
  use crate::completion::{
    FetchSuggestions,
    SuggestionStream,
    SymbolMatch,
    create_cancelable_fetch_suggestions,
  };

  fn labels(result: &CompletionResult) -> Vec<&str> {
    result.options.iter().map(|o| o.label.as_str()).collect()
  }

  fn at_end(query: &str, explicit: bool) -> CompletionContext {
    CompletionContext::new(query, query.len(), explicit)
  }

  /// A fetch that records its queries and answers with `matches`.
  fn recording(matches: Vec<SearchMatch>) -> (FetchSuggestions, Arc<Mutex<Vec<String>>>) {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let fetch: FetchSuggestions = {
      let queries = queries.clone();
      Arc::new(move |query: String| -> SuggestionStream {
        queries.lock().push(query);
        stream::iter(vec![Ok(matches.clone())]).boxed()
      })
    };
    (fetch, queries)
  }

  fn searched(fetch: FetchSuggestions, globbing: bool, dot_com: bool) -> SearchedValues {
    SearchedValues {
      options: SuggestionSourceOptions {
        fetch_suggestions: create_cancelable_fetch_suggestions(fetch),
        globbing,
        is_sourcegraph_dot_com: dot_com,
        fetch_count: 10,
      },
    }
  }

  #[test]
  fn filter_names_for_partial_word() {
    let result = filter_names(&at_end("foo la", false)).unwrap();
    assert_eq!(result.span, 4..6);
    assert_eq!(labels(&result)[0], "lang:");
    assert!(result.options.iter().all(|o| o.retrigger));
  }

  #[test]
  fn negated_filter_names() {
    let result = filter_names(&at_end("-re", false)).unwrap();
    let labels = labels(&result);
    assert_eq!(labels[0], "-repo:");
    assert!(labels.iter().all(|label| label.starts_with('-')));
    assert!(!labels.contains(&"-rev:"));
  }

  #[test]
  fn empty_word_needs_explicit_request() {
    assert!(filter_names(&at_end("repo:a ", false)).is_none());
    let result = filter_names(&at_end("repo:a ", true)).unwrap();
    assert_eq!(result.span, 7..7);
    assert_eq!(result.options.len(), FilterType::ALL.len());
    assert_eq!(labels(&result)[0], "repo:");
  }

  #[test]
  fn filter_values_are_ranked() {
    let result = filter_values(&at_end("fork:o", false)).unwrap();
    assert_eq!(result.span, 5..6);
    assert_eq!(labels(&result)[0], "only");

    let result = filter_values(&at_end("case:", false)).unwrap();
    assert_eq!(labels(&result), vec!["yes", "no"]);

    assert!(filter_values(&at_end("repo:foo", false)).is_none());
  }

  #[test]
  fn filter_value_formatting() {
    assert_eq!(
      filter_value("github.com/sourcegraph/sourcegraph", false),
      r"^github\.com/sourcegraph/sourcegraph$"
    );
    assert_eq!(filter_value("github.com/a/*", true), "github.com/a/*");
    assert_eq!(filter_value("docs/my file.md", true), "\"docs/my file.md\"");
  }

  #[tokio::test]
  async fn repository_suggestions() {
    let (fetch, queries) = recording(vec![SearchMatch::Repo {
      repository: "github.com/sourcegraph/sourcegraph".into(),
    }]);
    let source = searched(fetch, false, false);

    let result = source.complete(&at_end("repo:sourceg", false)).await.unwrap();
    assert_eq!(*queries.lock(), vec!["repo:sourceg type:repo count:10".to_string()]);
    assert_eq!(result.span, 5..12);
    assert_eq!(
      result.options[0].insert,
      r"^github\.com/sourcegraph/sourcegraph$"
    );
  }

  #[tokio::test]
  async fn file_suggestions_keep_repo_filters() {
    let (fetch, queries) = recording(vec![SearchMatch::Path {
      repository: "r".into(),
      path:       "cmd/main.go".into(),
    }]);
    let source = searched(fetch, true, false);

    let result = source
      .complete(&at_end("repo:^r$ file:main", false))
      .await
      .unwrap();
    assert_eq!(
      *queries.lock(),
      vec!["repo:^r$ file:main type:path count:10".to_string()]
    );
    assert_eq!(result.options[0].insert, "cmd/main.go");
    assert_eq!(result.options[0].detail.as_deref(), Some("r"));
  }

  #[tokio::test]
  async fn symbol_suggestions_for_patterns() {
    let (fetch, queries) = recording(vec![SearchMatch::Symbol {
      repository: "r".into(),
      path:       "p.go".into(),
      symbols:    vec![SymbolMatch {
        name:           "NewClient".into(),
        kind:           "FUNCTION".into(),
        container_name: Some("http".into()),
      }],
    }]);
    let source = searched(fetch, false, false);

    assert!(source.complete(&at_end("N", false)).await.is_none());
    let result = source.complete(&at_end("NewCl", false)).await.unwrap();
    assert_eq!(*queries.lock(), vec!["NewCl type:symbol count:10".to_string()]);
    assert_eq!(result.options[0].insert, "NewClient");
    assert_eq!(result.options[0].detail.as_deref(), Some("function in http"));
  }

  #[tokio::test]
  async fn empty_values_are_not_searched_on_dot_com() {
    let (fetch, queries) = recording(Vec::new());
    let source = searched(fetch.clone(), false, true);
    assert!(source.complete(&at_end("repo:", true)).await.is_none());
    assert!(queries.lock().is_empty());

    let source = searched(fetch, false, false);
    let result = source.complete(&at_end("repo:", true)).await.unwrap();
    assert!(result.options.is_empty());
    assert_eq!(*queries.lock(), vec!["repo: type:repo count:10".to_string()]);
  }

  #[tokio::test]
  async fn failed_fetch_offers_nothing() {
    let fetch: FetchSuggestions = Arc::new(|_query: String| -> SuggestionStream {
      stream::iter(vec![Err(anyhow::anyhow!("unavailable"))]).boxed()
    });
    let source = searched(fetch, false, false);
    assert!(source.complete(&at_end("repo:x", false)).await.is_none());
  }
}
