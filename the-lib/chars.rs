//! Character classes used by the query scanner.

/// Whitespace that separates query tokens.
///
/// Line breaks count as separators too: a pasted multi-line query is scanned
/// the same way as a single line.
#[inline]
pub fn char_is_separator(ch: char) -> bool {
  matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{00A0}' | '\u{3000}')
}

/// Characters allowed in a filter field name such as `repo` or
/// `repohasfile`. A leading `-` negates a filter and is not part of the name.
#[inline]
pub fn char_is_field(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_')
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn categories() {
    assert!(char_is_separator(' '));
    assert!(char_is_separator('\n'));
    assert!(!char_is_separator('x'));

    assert!(char_is_field('r'));
    assert!(char_is_field('.'));
    assert!(!char_is_field(':'));
    assert!(!char_is_field('-'));
  }
}
