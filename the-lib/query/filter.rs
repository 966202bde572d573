/// The filters a query understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterType {
  After,
  Archived,
  Author,
  Before,
  Case,
  Committer,
  Content,
  Context,
  Count,
  File,
  Fork,
  Lang,
  Message,
  PatternType,
  Repo,
  RepoHasCommitAfter,
  RepoHasFile,
  Rev,
  Select,
  Timeout,
  Type,
  Visibility,
}

const YES_NO: &[&str] = &["yes", "no"];
const YES_NO_ONLY: &[&str] = &["yes", "no", "only"];

const LANGUAGES: &[&str] = &[
  "c",
  "c#",
  "c++",
  "clojure",
  "css",
  "dart",
  "elixir",
  "erlang",
  "go",
  "graphql",
  "haskell",
  "html",
  "java",
  "javascript",
  "json",
  "kotlin",
  "lua",
  "markdown",
  "objective-c",
  "ocaml",
  "perl",
  "php",
  "python",
  "r",
  "ruby",
  "rust",
  "scala",
  "shell",
  "sql",
  "swift",
  "typescript",
  "yaml",
  "zig",
];

impl FilterType {
  /// Every filter, in the order names are suggested.
  pub const ALL: &'static [FilterType] = &[
    Self::Repo,
    Self::File,
    Self::Lang,
    Self::Content,
    Self::Type,
    Self::Case,
    Self::Fork,
    Self::Archived,
    Self::Visibility,
    Self::PatternType,
    Self::Select,
    Self::Rev,
    Self::RepoHasFile,
    Self::RepoHasCommitAfter,
    Self::Context,
    Self::Count,
    Self::Timeout,
    Self::Author,
    Self::Committer,
    Self::Message,
    Self::Before,
    Self::After,
  ];

  pub const fn name(self) -> &'static str {
    match self {
      Self::After => "after",
      Self::Archived => "archived",
      Self::Author => "author",
      Self::Before => "before",
      Self::Case => "case",
      Self::Committer => "committer",
      Self::Content => "content",
      Self::Context => "context",
      Self::Count => "count",
      Self::File => "file",
      Self::Fork => "fork",
      Self::Lang => "lang",
      Self::Message => "message",
      Self::PatternType => "patterntype",
      Self::Repo => "repo",
      Self::RepoHasCommitAfter => "repohascommitafter",
      Self::RepoHasFile => "repohasfile",
      Self::Rev => "rev",
      Self::Select => "select",
      Self::Timeout => "timeout",
      Self::Type => "type",
      Self::Visibility => "visibility",
    }
  }

  pub const fn aliases(self) -> &'static [&'static str] {
    match self {
      Self::After => &["since"],
      Self::Before => &["until"],
      Self::File => &["f"],
      Self::Lang => &["l", "language"],
      Self::Message => &["m", "msg"],
      Self::Repo => &["r"],
      Self::Rev => &["revision"],
      _ => &[],
    }
  }

  pub const fn description(self) -> &'static str {
    match self {
      Self::After => "Commits made after a certain date",
      Self::Archived => "Include results from archived repositories",
      Self::Author => "The author of a commit",
      Self::Before => "Commits made before a certain date",
      Self::Case => "Treat the search pattern as case-sensitive",
      Self::Committer => "The committer of a commit",
      Self::Content => "Explicitly overrides the search pattern",
      Self::Context => "Search only repositories within a context",
      Self::Count => "Number of results to fetch (integer) or \"all\"",
      Self::File => "Include only results from files matching the given search pattern",
      Self::Fork => "Include results from forked repositories",
      Self::Lang => "Include only results from the given language",
      Self::Message => "Commits with messages matching a certain string",
      Self::PatternType => "The pattern type (regexp, literal, structural) in use",
      Self::Repo => "Include only results from repositories matching the given search pattern",
      Self::RepoHasCommitAfter => "Filter out stale repositories without recent commits",
      Self::RepoHasFile => "Search only inside repositories that contain a matching file path",
      Self::Rev => "Search a revision instead of the default branch",
      Self::Select => "Select results of a particular type",
      Self::Timeout => "Duration before timeout",
      Self::Type => "Limit results to the specified type",
      Self::Visibility => "Include results from repositories with the matching visibility",
    }
  }

  /// Whether `-name:` is meaningful.
  pub const fn negatable(self) -> bool {
    matches!(
      self,
      Self::Author
        | Self::Committer
        | Self::Content
        | Self::File
        | Self::Lang
        | Self::Message
        | Self::Repo
        | Self::RepoHasFile
    )
  }

  /// The complete set of accepted values, or an empty slice when the value
  /// is free-form.
  pub const fn discrete_values(self) -> &'static [&'static str] {
    match self {
      Self::Archived | Self::Fork => YES_NO_ONLY,
      Self::Case => YES_NO,
      Self::Lang => LANGUAGES,
      Self::PatternType => &["literal", "regexp", "structural", "standard"],
      Self::Select => &[
        "repo",
        "file",
        "content",
        "symbol",
        "commit.diff.added",
        "commit.diff.removed",
      ],
      Self::Type => &["diff", "commit", "symbol", "repo", "path", "file"],
      Self::Visibility => &["any", "public", "private"],
      _ => &[],
    }
  }

  /// Values are suggested by searching, rather than from a fixed list.
  pub const fn has_dynamic_values(self) -> bool {
    matches!(self, Self::Repo | Self::File)
  }

  /// Looks up a field by name or alias, ignoring case.
  pub fn resolve(field: &str) -> Option<Self> {
    Self::ALL.iter().copied().find(|filter| {
      field.eq_ignore_ascii_case(filter.name())
        || filter
          .aliases()
          .iter()
          .any(|alias| field.eq_ignore_ascii_case(alias))
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn resolves_names_and_aliases() {
    assert_eq!(FilterType::resolve("repo"), Some(FilterType::Repo));
    assert_eq!(FilterType::resolve("R"), Some(FilterType::Repo));
    assert_eq!(FilterType::resolve("language"), Some(FilterType::Lang));
    assert_eq!(FilterType::resolve("msg"), Some(FilterType::Message));
    assert_eq!(FilterType::resolve("since"), Some(FilterType::After));
    assert_eq!(FilterType::resolve("PatternType"), Some(FilterType::PatternType));
    assert_eq!(FilterType::resolve("nope"), None);
  }

  #[test]
  fn every_filter_is_listed_once() {
    let mut names: Vec<_> = FilterType::ALL.iter().map(|f| f.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), FilterType::ALL.len());
    assert_eq!(names.len(), 22);
  }

  #[test]
  fn value_kinds() {
    assert_eq!(FilterType::Case.discrete_values(), &["yes", "no"]);
    assert!(FilterType::Lang.discrete_values().contains(&"rust"));
    assert!(FilterType::Repo.discrete_values().is_empty());
    assert!(FilterType::Repo.has_dynamic_values());
    assert!(!FilterType::Case.has_dynamic_values());
    assert!(FilterType::Repo.negatable());
    assert!(!FilterType::Case.negatable());
  }
}
