//! Cursor ranges and selections over the query document.
//!
//! A [`Range`] has an `anchor` and a `head` (char offsets). The head is where
//! the caret is drawn; when `anchor == head` the range is a plain cursor.
//!
//! ```text
//! anchor=2, head=7: "re[po:fo]o"  (forward selection)
//! anchor=7, head=2: "re]po:fo[o"  (backward selection)
//! anchor=5, head=5: "repo:|foo"   (cursor)
//! ```
//!
//! A [`Selection`] holds one or more ranges and the index of the primary one.
//! Ranges are kept sorted by start with overlaps merged. Suggestions are only
//! offered for a selection made of a single cursor.

use smallvec::{
  SmallVec,
  smallvec,
};
use thiserror::Error;

use crate::transaction::{
  Assoc,
  ChangeSet,
  TransactionError,
};

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
  #[error("selection must contain at least one range")]
  EmptySelection,
  #[error("primary index {index} out of bounds for selection of length {len}")]
  PrimaryIndexOutOfBounds { index: usize, len: usize },
  #[error("selection position {pos} is out of bounds for document length {len}")]
  OutOfBounds { pos: usize, len: usize },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  #[inline]
  pub fn point(head: usize) -> Self {
    Self::new(head, head)
  }

  /// Start of the range
  #[inline]
  #[must_use]
  pub fn from(&self) -> usize {
    std::cmp::min(self.anchor, self.head)
  }

  /// End of the range
  #[inline]
  #[must_use]
  pub fn to(&self) -> usize {
    std::cmp::max(self.anchor, self.head)
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.to() - self.from()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  /// Whether `pos` lies within the range, counting both ends. A cursor at the
  /// end of a word still touches that word.
  #[inline]
  pub fn touches(&self, pos: usize) -> bool {
    self.from() <= pos && pos <= self.to()
  }

  #[inline]
  pub fn overlaps(&self, other: &Self) -> bool {
    // empty ranges only overlap when they sit on the same position
    self.from() == other.from() || (self.to() > other.from() && other.to() > self.from())
  }

  /// Returns a `Range` that encompasses both input ranges, keeping the
  /// direction when both point backwards.
  pub fn merge(&self, other: Self) -> Self {
    if self.anchor > self.head && other.anchor > other.head {
      Self::new(self.anchor.max(other.anchor), self.head.min(other.head))
    } else {
      Self::new(self.from().min(other.from()), self.to().max(other.to()))
    }
  }

  /// Map the range through a set of changes.
  ///
  /// Cursors stick after text inserted at their position, which is what typing
  /// at the caret needs.
  pub fn map(mut self, changes: &ChangeSet) -> Result<Self> {
    if changes.is_empty() {
      return Ok(self);
    }
    changes.update_positions(self.positions_mut().into_iter())?;
    Ok(self)
  }

  fn positions_mut(&mut self) -> [(&mut usize, Assoc); 2] {
    use std::cmp::Ordering;
    match self.anchor.cmp(&self.head) {
      Ordering::Equal => {
        [
          (&mut self.anchor, Assoc::After),
          (&mut self.head, Assoc::After),
        ]
      },
      Ordering::Less => {
        [
          (&mut self.anchor, Assoc::After),
          (&mut self.head, Assoc::Before),
        ]
      },
      Ordering::Greater => {
        [
          (&mut self.head, Assoc::After),
          (&mut self.anchor, Assoc::Before),
        ]
      },
    }
  }
}

impl From<(usize, usize)> for Range {
  fn from((anchor, head): (usize, usize)) -> Self {
    Self::new(anchor, head)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  ranges:        SmallVec<[Range; 1]>,
  primary_index: usize,
}

impl Selection {
  pub fn new(ranges: SmallVec<[Range; 1]>, primary_index: usize) -> Result<Self> {
    if ranges.is_empty() {
      return Err(SelectionError::EmptySelection);
    }
    if primary_index >= ranges.len() {
      return Err(SelectionError::PrimaryIndexOutOfBounds {
        index: primary_index,
        len:   ranges.len(),
      });
    }
    Ok(
      Self {
        ranges,
        primary_index,
      }
      .normalize(),
    )
  }

  pub fn point(pos: usize) -> Self {
    Self::single(pos, pos)
  }

  #[must_use]
  /// Constructs a selection holding a single range.
  pub fn single(anchor: usize, head: usize) -> Self {
    Self {
      ranges:        smallvec![Range::new(anchor, head)],
      primary_index: 0,
    }
  }

  pub fn primary(&self) -> Range {
    self.ranges[self.primary_index]
  }

  pub fn primary_index(&self) -> usize {
    self.primary_index
  }

  pub fn ranges(&self) -> &[Range] {
    &self.ranges
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Range> {
    self.ranges.iter()
  }

  pub fn len(&self) -> usize {
    self.ranges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  /// The caret position when the selection is exactly one empty range.
  pub fn single_cursor(&self) -> Option<usize> {
    match self.ranges.as_slice() {
      [range] if range.is_empty() => Some(range.head),
      _ => None,
    }
  }

  /// Map selections over a set of changes. Useful for adjusting the selection
  /// position after applying changes to a document.
  pub fn map(mut self, changes: &ChangeSet) -> Result<Self> {
    if changes.is_empty() {
      return Ok(self);
    }
    let positions = self
      .ranges
      .iter_mut()
      .flat_map(|range| range.positions_mut());
    changes.update_positions(positions)?;
    Ok(self.normalize())
  }

  /// Fails if any range reaches past a document of `len` chars.
  pub fn ensure_within(&self, len: usize) -> Result<()> {
    match self.ranges.iter().find(|range| range.to() > len) {
      Some(range) => {
        Err(SelectionError::OutOfBounds {
          pos: range.to(),
          len,
        })
      },
      None => Ok(()),
    }
  }

  /// Ranges are sorted by [Range::from] with overlapping ranges merged. The
  /// primary index follows its range.
  fn normalize(mut self) -> Self {
    if self.ranges.len() < 2 {
      return self;
    }
    let primary = self.ranges[self.primary_index];
    self.ranges.sort_by_key(Range::from);

    let mut ranges: SmallVec<[Range; 1]> = SmallVec::with_capacity(self.ranges.len());
    let mut primary_index = 0;
    for range in self.ranges {
      let absorbs_primary = range == primary;
      match ranges.last_mut() {
        Some(prev) if prev.overlaps(&range) => {
          *prev = prev.merge(range);
          if absorbs_primary {
            primary_index = ranges.len() - 1;
          }
        },
        _ => {
          ranges.push(range);
          if absorbs_primary {
            primary_index = ranges.len() - 1;
          }
        },
      }
    }

    self.ranges = ranges;
    self.primary_index = primary_index;
    self
  }
}

impl From<Range> for Selection {
  fn from(range: Range) -> Self {
    Self {
      ranges:        smallvec![range],
      primary_index: 0,
    }
  }
}

impl<'a> IntoIterator for &'a Selection {
  type IntoIter = std::slice::Iter<'a, Range>;
  type Item = &'a Range;

  fn into_iter(self) -> Self::IntoIter {
    self.ranges.iter()
  }
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;
  use crate::transaction::Transaction;

  #[test]
  fn new_rejects_empty_and_bad_primary() {
    assert_eq!(
      Selection::new(SmallVec::new(), 0),
      Err(SelectionError::EmptySelection)
    );
    assert_eq!(
      Selection::new(smallvec![Range::point(1)], 1),
      Err(SelectionError::PrimaryIndexOutOfBounds { index: 1, len: 1 })
    );
  }

  #[test]
  fn normalize_merges_and_tracks_primary() {
    let selection = Selection::new(
      smallvec![Range::new(8, 10), Range::new(0, 3), Range::new(2, 5)],
      2,
    )
    .unwrap();
    assert_eq!(selection.ranges(), &[Range::new(0, 5), Range::new(8, 10)]);
    assert_eq!(selection.primary(), Range::new(0, 5));
  }

  #[test]
  fn cursor_follows_typed_text() {
    let doc = Rope::from("repo:");
    let tx = Transaction::change(&doc, vec![(5, 5, Some("foo".into()))]).unwrap();
    let selection = Selection::point(5).map(tx.changes()).unwrap();
    assert_eq!(selection.single_cursor(), Some(8));
  }

  #[test]
  fn backward_range_maps_through_deletion() {
    let doc = Rope::from("repo:foo file:bar");
    let tx = Transaction::change(&doc, vec![(0, 9, None)]).unwrap();
    let range = Range::new(17, 14).map(tx.changes()).unwrap();
    assert_eq!(range, Range::new(8, 5));
  }

  #[test]
  fn single_cursor_requires_one_empty_range() {
    assert_eq!(Selection::point(3).single_cursor(), Some(3));
    assert_eq!(Selection::single(1, 3).single_cursor(), None);
    let multi = Selection::new(smallvec![Range::point(1), Range::point(4)], 0).unwrap();
    assert_eq!(multi.single_cursor(), None);
  }

  #[test]
  fn ensure_within_checks_document_length() {
    assert!(Selection::single(0, 4).ensure_within(4).is_ok());
    assert_eq!(
      Selection::point(5).ensure_within(4),
      Err(SelectionError::OutOfBounds { pos: 5, len: 4 })
    );
  }
}
