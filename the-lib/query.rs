//! A forgiving scanner for search queries.
//!
//! Queries are sequences of whitespace separated tokens:
//!
//! ```text
//! -repo:^github\.com/foo$ file:'a b.go' (lang:go or lang:rust) not TODO "exact text"
//! ^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^ ^^^^^^^^ ^^ ^^^^^^^^^^ ^^^ ^^^^ ^^^^^^^^^^^^
//! filter (negated)        filter        paren+filter kw filter kw  pat  quoted pattern
//! ```
//!
//! The scanner never fails. It is run on every keystroke over half-typed
//! input, so unterminated quotes are reported through
//! [`Literal::is_terminated`] instead of an error, and every byte of the
//! input belongs to exactly one token. All offsets are byte offsets.

use std::ops::Range;

use crate::chars::{
  char_is_field,
  char_is_separator,
};

mod filter;

pub use filter::FilterType;

pub type Span = Range<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
  Double,
  Single,
}

impl Quote {
  pub const fn char(self) -> char {
    match self {
      Self::Double => '"',
      Self::Single => '\'',
    }
  }

  fn from_char(c: char) -> Option<Self> {
    match c {
      '"' => Some(Self::Double),
      '\'' => Some(Self::Single),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
  And,
  Or,
  Not,
}

impl Keyword {
  /// Keywords are matched case-insensitively.
  pub fn parse(word: &str) -> Option<Self> {
    [Self::And, Self::Or, Self::Not]
      .into_iter()
      .find(|keyword| word.eq_ignore_ascii_case(keyword.as_str()))
  }

  pub const fn as_str(self) -> &'static str {
    match self {
      Self::And => "and",
      Self::Or => "or",
      Self::Not => "not",
    }
  }
}

/// A bare or quoted piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
  /// Everything the literal covers, quotes included.
  pub span:          Span,
  /// The text between the quotes (equal to `span` for bare text).
  pub content:       Span,
  pub quote:         Option<Quote>,
  /// Whether the opening quote is closed. Bare text is always terminated.
  pub is_terminated: bool,
}

impl Literal {
  fn bare(span: Span) -> Self {
    Self {
      content: span.clone(),
      span,
      quote: None,
      is_terminated: true,
    }
  }

  pub fn text<'a>(&self, query: &'a str) -> &'a str {
    &query[self.content.clone()]
  }
}

/// A `field:value` pair, optionally negated with a leading `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
  pub negated: bool,
  pub field:   Span,
  /// Possibly empty, as in `repo:` while still typing.
  pub value:   Literal,
}

impl Filter {
  pub fn field<'a>(&self, query: &'a str) -> &'a str {
    &query[self.field.clone()]
  }

  /// The known filter this field names, resolving aliases.
  pub fn filter_type(&self, query: &str) -> Option<FilterType> {
    FilterType::resolve(self.field(query))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  Whitespace,
  OpenParen,
  CloseParen,
  Keyword(Keyword),
  Filter(Filter),
  Pattern(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
}

impl Token {
  /// Whether the cursor can complete this token, as opposed to whitespace
  /// and parentheses.
  pub fn is_word(&self) -> bool {
    matches!(
      self.kind,
      TokenKind::Keyword(_) | TokenKind::Filter(_) | TokenKind::Pattern(_)
    )
  }
}

#[derive(Debug)]
pub struct Scanner<'a> {
  input: &'a str,
  /// Byte index of the next unread char.
  pos:   usize,
}

impl<'a> Scanner<'a> {
  pub fn new(input: &'a str) -> Self {
    Self { input, pos: 0 }
  }

  pub fn pos(&self) -> usize {
    self.pos
  }

  fn peek(&self) -> Option<char> {
    self.input[self.pos..].chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += c.len_utf8();
    Some(c)
  }

  fn skip_whitespace(&mut self) {
    while self.peek().is_some_and(char_is_separator) {
      self.bump();
    }
  }

  /// Reads up to the next separator. Parentheses inside the text must balance,
  /// so the `)` in `(repo:foo)` closes the group rather than joining the value.
  fn scan_unquoted(&mut self) -> Span {
    let start = self.pos;
    let mut depth = 0usize;
    while let Some(c) = self.peek() {
      match c {
        c if char_is_separator(c) => break,
        '(' => depth += 1,
        ')' if depth == 0 => break,
        ')' => depth -= 1,
        _ => {},
      }
      self.bump();
    }
    start..self.pos
  }

  /// Parses quoted text. The scanner must sit on the opening quote. A
  /// backslash escapes the following char.
  fn scan_quoted(&mut self, quote: Quote) -> Literal {
    let start = self.pos;
    self.bump();
    let content_start = self.pos;

    while let Some(c) = self.bump() {
      if c == '\\' {
        self.bump();
      } else if c == quote.char() {
        return Literal {
          span:          start..self.pos,
          content:       content_start..self.pos - 1,
          quote:         Some(quote),
          is_terminated: true,
        };
      }
    }

    Literal {
      span:          start..self.pos,
      content:       content_start..self.pos,
      quote:         Some(quote),
      is_terminated: false,
    }
  }

  fn scan_literal(&mut self) -> Literal {
    match self.peek().and_then(Quote::from_char) {
      Some(quote) => self.scan_quoted(quote),
      None => Literal::bare(self.scan_unquoted()),
    }
  }

  /// Parses `-?field:value` at the current position, leaving the scanner
  /// untouched when the input is not a filter.
  fn scan_filter(&mut self) -> Option<Filter> {
    let bytes = self.input.as_bytes();
    let negated = bytes.get(self.pos) == Some(&b'-');
    let field_start = self.pos + usize::from(negated);
    let field_len = bytes[field_start.min(bytes.len())..]
      .iter()
      .take_while(|b| b.is_ascii() && char_is_field(**b as char))
      .count();
    let field_end = field_start + field_len;
    if field_len == 0 || bytes.get(field_end) != Some(&b':') {
      return None;
    }

    self.pos = field_end + 1;
    Some(Filter {
      negated,
      field: field_start..field_end,
      value: self.scan_literal(),
    })
  }
}

impl Iterator for Scanner<'_> {
  type Item = Token;

  fn next(&mut self) -> Option<Self::Item> {
    let start = self.pos;
    let c = self.peek()?;

    let kind = match c {
      c if char_is_separator(c) => {
        self.skip_whitespace();
        TokenKind::Whitespace
      },
      '(' => {
        self.bump();
        TokenKind::OpenParen
      },
      ')' => {
        self.bump();
        TokenKind::CloseParen
      },
      '"' | '\'' => TokenKind::Pattern(self.scan_literal()),
      _ => {
        match self.scan_filter() {
          Some(filter) => TokenKind::Filter(filter),
          None => {
            let span = self.scan_unquoted();
            match Keyword::parse(&self.input[span.clone()]) {
              Some(keyword) => TokenKind::Keyword(keyword),
              None => TokenKind::Pattern(Literal::bare(span)),
            }
          },
        }
      },
    };

    Some(Token {
      kind,
      span: start..self.pos,
    })
  }
}

pub fn scan(query: &str) -> Vec<Token> {
  Scanner::new(query).collect()
}

/// The word token under a cursor at byte `offset`. A cursor at either edge
/// of a token belongs to it; when two tokens touch, the later one wins.
/// Whitespace and parentheses are never returned.
pub fn token_at(tokens: &[Token], offset: usize) -> Option<&Token> {
  tokens
    .iter()
    .rev()
    .filter(|token| token.is_word())
    .find(|token| token.span.start <= offset && offset <= token.span.end)
}
