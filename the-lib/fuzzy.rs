//! Fuzzy ranking of suggestion candidates, powered by [`nucleo`].
//!
//! Filter names and values are short, fixed lists, so matching runs
//! synchronously on a thread-local [`Matcher`]. Query fields are
//! case-insensitive (`Repo:` and `repo:` are the same filter), so unlike an
//! editor picker no smart-case is applied.
//!
//! ```
//! use the_query_lib::fuzzy::fuzzy_match;
//!
//! let ranked = fuzzy_match("rep", ["file", "repo", "repohasfile"]);
//! assert_eq!(ranked[0].0, "repo");
//! assert!(ranked.iter().all(|(name, _)| *name != "file"));
//! ```

use std::cell::RefCell;

use nucleo::{
  Config,
  Matcher,
  pattern::{
    Atom,
    AtomKind,
    CaseMatching,
    Normalization,
  },
};

thread_local! {
  static MATCHER: RefCell<Matcher> = RefCell::new(Matcher::new(Config::DEFAULT));
}

/// Items matching `pattern`, best first. Items with equal scores keep their
/// input order, and an empty pattern keeps every item with a score of 0.
pub fn fuzzy_match<T: AsRef<str>>(pattern: &str, items: impl IntoIterator<Item = T>) -> Vec<(T, u16)> {
  MATCHER.with(|matcher| {
    let atom = Atom::new(
      pattern,
      CaseMatching::Ignore,
      Normalization::Smart,
      AtomKind::Fuzzy,
      false,
    );
    atom.match_list(items, &mut matcher.borrow_mut())
  })
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn prefix_ranks_first() {
    let results = fuzzy_match("lan", ["select", "lang", "archived"]);
    let matched: Vec<_> = results.iter().map(|(s, _)| *s).collect();
    assert_eq!(matched, vec!["lang"]);
  }

  #[test]
  fn empty_pattern_keeps_order() {
    let results = fuzzy_match("", ["yes", "no", "only"]);
    let matched: Vec<_> = results.iter().map(|(s, _)| *s).collect();
    assert_eq!(matched, vec!["yes", "no", "only"]);
  }

  #[test]
  fn matching_ignores_case() {
    let results = fuzzy_match("REPO", ["repo", "file"]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "repo");
  }

  #[test]
  fn no_matches() {
    assert!(fuzzy_match("xyz", ["case", "fork"]).is_empty());
  }

  #[test]
  fn scores_descend() {
    let results = fuzzy_match("type", ["patterntype", "type", "timeout"]);
    assert_eq!(results[0].0, "type");
    assert!(results.windows(2).all(|pair| pair[0].1 >= pair[1].1));
  }
}
