//! Document changes and the transactions that carry them.
//!
//! A [`ChangeSet`] is a sequence of [`Operation`]s applied from the start of
//! the document:
//!
//! - **Retain(n)** - keep `n` characters unchanged
//! - **Delete(n)** - remove `n` characters
//! - **Insert(s)** - insert string `s`
//!
//! A [`Transaction`] bundles a change set with an optional explicit selection
//! and a list of [`StateEffect`]s. Transactions are the only way editor state
//! moves forward: the document is rewritten by the changes, the selection is
//! mapped (or replaced), and every state field reduces its value against the
//! transaction.
//!
//! ```
//! use ropey::Rope;
//! use the_query_lib::transaction::Transaction;
//!
//! let doc = Rope::from("repo:foo lang:go");
//! let tx = Transaction::change(&doc, vec![(5, 8, Some("bar".into()))]).unwrap();
//! assert!(tx.doc_changed());
//! assert_eq!(tx.apply_to(&doc).unwrap(), "repo:bar lang:go");
//!
//! // effects alone never touch the text
//! let tx = Transaction::effects_only(&doc, Vec::new());
//! assert!(!tx.doc_changed());
//! ```
//!
//! All positions are char offsets. Fallible operations return
//! [`Result<T, TransactionError>`].

use std::iter::once;

use ropey::{
  Rope,
  RopeBuilder,
};
use thiserror::Error;

use crate::{
  Tendril,
  effect::{
    StateEffect,
    StateEffectType,
  },
  selection::{
    Range,
    Selection,
  },
};

pub type Result<T> = std::result::Result<T, TransactionError>;

/// (from, to) replacement.
pub type Change = (usize, usize, Option<Tendril>);
pub type Deletion = (usize, usize);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("change set expects a document of {expected} chars, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("change starts at {from}, after its end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change {from}..{to} does not fit a document of {len} chars")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change {from}..{to} starts before the previous change ends at {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("positions {positions:?} fall outside a change set of {len} chars")]
  PositionsOutOfBounds {
    positions: Vec<usize>,
    len:       usize,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  Retain(usize),
  Delete(usize),
  Insert(Tendril),
}

impl Operation {
  pub fn len_chars(&self) -> usize {
    match self {
      Operation::Retain(n) | Operation::Delete(n) => *n,
      Operation::Insert(s) => s.chars().count(),
    }
  }
}

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  /// Stay before text inserted at the position.
  Before,
  /// Move past text inserted at the position.
  After,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  pub(crate) changes: Vec<Operation>,
  /// Document length the changes apply to.
  len:                usize,
  len_after:          usize,
}

impl ChangeSet {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      changes:   Vec::with_capacity(capacity),
      len:       0,
      len_after: 0,
    }
  }

  /// The identity change set for `doc`.
  #[must_use]
  pub fn new(doc: &Rope) -> Self {
    let len = doc.len_chars();
    Self {
      changes: Vec::new(),
      len,
      len_after: len,
    }
  }

  pub fn changes(&self) -> &[Operation] {
    &self.changes
  }

  /// Document length this change set applies to.
  pub fn len(&self) -> usize {
    self.len
  }

  /// Document length after applying.
  pub fn len_after(&self) -> usize {
    self.len_after
  }

  pub fn delete(&mut self, n: usize) {
    if n == 0 {
      return;
    }
    self.len += n;
    match self.changes.last_mut() {
      Some(Operation::Delete(count)) => *count += n,
      _ => self.changes.push(Operation::Delete(n)),
    }
  }

  /// Inserts are kept ahead of an adjacent delete so that a replacement
  /// always reads as `Insert, Delete`.
  pub fn insert(&mut self, text: Tendril) {
    use Operation::*;

    if text.is_empty() {
      return;
    }
    self.len_after += text.chars().count();
    let push = match self.changes.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
        prev.push_str(&text);
        None
      },
      [.., last @ Delete(_)] => Some(std::mem::replace(last, Insert(text))),
      _ => Some(Insert(text)),
    };
    if let Some(op) = push {
      self.changes.push(op);
    }
  }

  pub fn retain(&mut self, n: usize) {
    if n == 0 {
      return;
    }
    self.len += n;
    self.len_after += n;
    match self.changes.last_mut() {
      Some(Operation::Retain(count)) => *count += n,
      _ => self.changes.push(Operation::Retain(n)),
    }
  }

  fn ensure_len(&self, actual: usize) -> Result<()> {
    if actual == self.len {
      Ok(())
    } else {
      Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual,
      })
    }
  }

  /// Apply in place. The rope is left untouched on error.
  pub fn apply(&self, text: &mut Rope) -> Result<()> {
    self.ensure_len(text.len_chars())?;
    let mut pos = 0;
    for op in &self.changes {
      match op {
        Operation::Retain(n) => pos += n,
        Operation::Delete(n) => text.remove(pos..pos + n),
        Operation::Insert(s) => {
          text.insert(pos, s);
          pos += s.chars().count();
        },
      }
    }
    Ok(())
  }

  /// Apply to a copy of `text`.
  pub fn apply_to(&self, text: &Rope) -> Result<Rope> {
    self.ensure_len(text.len_chars())?;
    if self.is_empty() {
      return Ok(text.clone());
    }

    let mut builder = RopeBuilder::new();
    let mut pos = 0;
    for op in &self.changes {
      match op {
        Operation::Retain(n) => {
          for chunk in text.slice(pos..pos + n).chunks() {
            builder.append(chunk);
          }
          pos += n;
        },
        Operation::Delete(n) => pos += n,
        Operation::Insert(s) => builder.append(s),
      }
    }
    Ok(builder.finish())
  }

  /// Whether applying leaves every document unchanged.
  pub fn is_empty(&self) -> bool {
    self
      .changes
      .iter()
      .all(|op| matches!(op, Operation::Retain(_)))
  }

  /// Map positions through the changes, updating them in place.
  ///
  /// Positions are visited in sorted order, so one pass over the changes
  /// serves all of them. Positions past the end of the document are left
  /// alone and reported in the error.
  pub fn update_positions<'a>(
    &self,
    positions: impl IntoIterator<Item = (&'a mut usize, Assoc)>,
  ) -> Result<()> {
    let mut positions: Vec<_> = positions.into_iter().collect();
    positions.sort_by_key(|(pos, _)| **pos);

    let mut cursor = MapCursor::default();
    let mut out_of_bounds = Vec::new();
    for (pos, assoc) in positions {
      cursor.skip_before(&self.changes, *pos);
      match cursor.map(&self.changes, self.len, *pos, assoc) {
        Some(mapped) => *pos = mapped,
        None => out_of_bounds.push(*pos),
      }
    }

    if out_of_bounds.is_empty() {
      Ok(())
    } else {
      Err(TransactionError::PositionsOutOfBounds {
        positions: out_of_bounds,
        len:       self.len,
      })
    }
  }

  /// Map a single position through the changes.
  pub fn map_pos(&self, mut pos: usize, assoc: Assoc) -> Result<usize> {
    self.update_positions(once((&mut pos, assoc)))?;
    Ok(pos)
  }

}

/// Progress through a change set: the next operation and where it starts in
/// the old and the new document.
#[derive(Debug, Default, Clone, Copy)]
struct MapCursor {
  index: usize,
  old:   usize,
  new:   usize,
}

impl MapCursor {
  /// Chars deleted right after the insert at `self.index`, i.e. the text it
  /// replaces.
  fn replaced(&self, ops: &[Operation]) -> usize {
    match ops.get(self.index + 1) {
      Some(Operation::Delete(n)) => *n,
      _ => 0,
    }
  }

  /// Step over operations that lie entirely before `pos`.
  fn skip_before(&mut self, ops: &[Operation], pos: usize) {
    while let Some(op) = ops.get(self.index) {
      match op {
        Operation::Retain(n) if self.old + n <= pos => {
          self.old += n;
          self.new += n;
        },
        Operation::Delete(n) if self.old + n <= pos => self.old += n,
        Operation::Insert(s) if self.old + self.replaced(ops) <= pos && self.old < pos => {
          self.new += s.chars().count();
        },
        _ => return,
      }
      self.index += 1;
    }
  }

  /// Inside replaced text, `Before` maps to the start of the replacement and
  /// `After` to its end.
  fn map(mut self, ops: &[Operation], len: usize, pos: usize, assoc: Assoc) -> Option<usize> {
    while let Some(op) = ops.get(self.index) {
      match op {
        Operation::Retain(n) if pos < self.old + n => return Some(self.new + (pos - self.old)),
        Operation::Retain(n) => {
          self.old += n;
          self.new += n;
        },
        Operation::Delete(n) if pos < self.old + n => return Some(self.new),
        Operation::Delete(n) => self.old += n,
        Operation::Insert(s) => {
          let replaced = self.replaced(ops);
          if assoc == Assoc::Before && (pos == self.old || pos < self.old + replaced) {
            return Some(self.new);
          }
          self.new += s.chars().count();
        },
      }
      self.index += 1;
    }
    // an identity change set has no operations at all
    (pos <= len).then(|| self.new + (pos - self.old))
  }
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self {
      changes,
      selection: None,
      effects: Vec::new(),
    }
  }
}

#[derive(Debug, Default, Clone)]
pub struct Transaction {
  changes:   ChangeSet,
  selection: Option<Selection>,
  effects:   Vec<StateEffect>,
}

impl Transaction {
  pub fn new(doc: &Rope) -> Self {
    Self::from(ChangeSet::new(doc))
  }

  /// A transaction that leaves the document alone and only carries effects.
  pub fn effects_only(doc: &Rope, effects: Vec<StateEffect>) -> Self {
    Self::new(doc).with_effects(effects)
  }

  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  /// Whether applying this transaction rewrites any text.
  pub fn doc_changed(&self) -> bool {
    !self.changes.is_empty()
  }

  /// When set, explicitly updates the selection.
  pub fn selection(&self) -> Option<&Selection> {
    self.selection.as_ref()
  }

  /// Effects in dispatch order.
  pub fn effects(&self) -> &[StateEffect] {
    &self.effects
  }

  /// Payload of the first effect of type `ty`, scanning in dispatch order.
  pub fn find_effect<V: 'static>(&self, ty: &StateEffectType<V>) -> Option<&V> {
    self.effects.iter().find_map(|effect| effect.value(ty))
  }

  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.changes.apply(doc)
  }

  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    self.changes.apply_to(doc)
  }

  pub fn with_selection(mut self, selection: Selection) -> Self {
    self.selection = Some(selection);
    self
  }

  pub fn with_effects(mut self, effects: impl IntoIterator<Item = StateEffect>) -> Self {
    self.effects.extend(effects);
    self
  }

  pub fn with_effect(mut self, effect: StateEffect) -> Self {
    self.effects.push(effect);
    self
  }

  /// Build a transaction from sorted, non-overlapping replacements.
  pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let changes = changes.into_iter();
    let mut changeset = ChangeSet::with_capacity(2 * changes.size_hint().0 + 1);

    let mut last = 0;
    for (from, to, text) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }
      changeset.retain(from - last);
      if let Some(text) = text {
        changeset.insert(text);
      }
      changeset.delete(to - from);
      last = to;
    }
    changeset.retain(len - last);

    Ok(Self::from(changeset))
  }

  /// Build a transaction from deletions in any order. Overlapping deletions
  /// are merged.
  pub fn delete<I>(doc: &Rope, deletions: I) -> Result<Self>
  where
    I: IntoIterator<Item = Deletion>,
  {
    let len = doc.len_chars();
    let mut deletions: Vec<_> = deletions.into_iter().collect();
    deletions.sort_unstable();

    let mut merged: Vec<Deletion> = Vec::with_capacity(deletions.len());
    for (from, to) in deletions {
      validate_change_bounds(from, to, len)?;
      match merged.last_mut() {
        Some((_, end)) if from <= *end => *end = (*end).max(to),
        _ => merged.push((from, to)),
      }
    }

    Self::change(doc, merged.into_iter().map(|(from, to)| (from, to, None)))
  }

  /// One replacement per selection range.
  pub fn change_by_selection<F>(doc: &Rope, selection: &Selection, f: F) -> Result<Self>
  where
    F: FnMut(&Range) -> Change,
  {
    Self::change(doc, selection.iter().map(f))
  }

  /// Insert text at each selection head.
  pub fn insert(doc: &Rope, selection: &Selection, text: Tendril) -> Result<Self> {
    Self::change_by_selection(doc, selection, |range| {
      (range.head, range.head, Some(text.clone()))
    })
  }

}
