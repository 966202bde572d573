//! State fields: values that live in [`EditorState`] and evolve by reducing
//! each transaction.
//!
//! A field is defined by a `create` function producing its initial value and
//! an `update` reducer `(value, transaction, next_state) -> value`. The
//! `next_state` already holds the new document and selection, plus the values
//! of fields configured before this one.
//!
//! ```
//! use the_query_lib::{
//!   field::StateField,
//!   state::EditorState,
//! };
//!
//! // counts transactions that changed the query text
//! let edits = StateField::define(
//!   |_| 0usize,
//!   |count, tr, _| if tr.doc_changed() { count + 1 } else { *count },
//! );
//! let state = EditorState::with_text("repo:foo", edits.extension());
//! assert_eq!(state.field(&edits), Some(&0));
//! ```
//!
//! [`EditorState`]: crate::state::EditorState

use std::{
  fmt,
  marker::PhantomData,
  num::NonZeroU64,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use once_cell::sync::OnceCell;

use crate::{
  extension::{
    Extension,
    FieldSlot,
    FieldValue,
  },
  state::EditorState,
  transaction::Transaction,
};

static NEXT_FIELD: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(NonZeroU64);

impl FieldId {
  fn fresh() -> Self {
    let id = NEXT_FIELD.fetch_add(1, Ordering::Relaxed);
    Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

type Create<T> = Box<dyn Fn(&EditorState) -> T + Send + Sync>;
type Update<T> = Box<dyn Fn(&T, &Transaction, &EditorState) -> T + Send + Sync>;

struct FieldInner<T> {
  id:       FieldId,
  create:   Create<T>,
  update:   Update<T>,
  provided: OnceCell<Extension>,
}

impl<T: Send + Sync + 'static> FieldSlot for FieldInner<T> {
  fn id(&self) -> FieldId {
    self.id
  }

  fn create(&self, state: &EditorState) -> FieldValue {
    Arc::new((self.create)(state))
  }

  fn update(&self, value: &FieldValue, tr: &Transaction, state: &EditorState) -> FieldValue {
    match value.downcast_ref::<T>() {
      Some(value) => Arc::new((self.update)(value, tr, state)),
      // values are keyed by this field's id, so this only happens on misuse
      None => self.create(state),
    }
  }

  fn provided(&self) -> Option<Extension> {
    self.provided.get().cloned()
  }
}

/// A typed handle to a field's slot that does not keep the field alive.
///
/// Closures stored inside a field's provided extension should capture a key
/// rather than the [`StateField`] itself, which would form a reference cycle.
pub struct FieldKey<T> {
  id:      FieldId,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for FieldKey<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for FieldKey<T> {}

impl<T> fmt::Debug for FieldKey<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("FieldKey").field(&self.id.get()).finish()
  }
}

impl<T> FieldKey<T> {
  pub fn id(&self) -> FieldId {
    self.id
  }
}

/// Anything that names a field slot holding a `T`.
pub trait AsFieldKey<T> {
  fn field_key(&self) -> FieldKey<T>;
}

impl<T> AsFieldKey<T> for FieldKey<T> {
  fn field_key(&self) -> FieldKey<T> {
    *self
  }
}

impl<T> AsFieldKey<T> for StateField<T> {
  fn field_key(&self) -> FieldKey<T> {
    self.key()
  }
}

pub struct StateField<T> {
  inner: Arc<FieldInner<T>>,
}

impl<T> Clone for StateField<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<T> fmt::Debug for StateField<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("StateField").field(&self.inner.id.get()).finish()
  }
}

impl<T> StateField<T> {
  pub fn id(&self) -> FieldId {
    self.inner.id
  }

  pub fn key(&self) -> FieldKey<T> {
    FieldKey {
      id:      self.inner.id,
      _marker: PhantomData,
    }
  }
}

impl<T: Send + Sync + 'static> StateField<T> {
  pub fn define(
    create: impl Fn(&EditorState) -> T + Send + Sync + 'static,
    update: impl Fn(&T, &Transaction, &EditorState) -> T + Send + Sync + 'static,
  ) -> Self {
    Self {
      inner: Arc::new(FieldInner {
        id:       FieldId::fresh(),
        create:   Box::new(create),
        update:   Box::new(update),
        provided: OnceCell::new(),
      }),
    }
  }

  /// Like [`StateField::define`], additionally running `provide` once with the
  /// new field. The returned extension is configured whenever the field is,
  /// which is how a field exposes its value to the rest of the editor (for
  /// example as a computed facet input).
  pub fn define_with(
    create: impl Fn(&EditorState) -> T + Send + Sync + 'static,
    update: impl Fn(&T, &Transaction, &EditorState) -> T + Send + Sync + 'static,
    provide: impl FnOnce(&StateField<T>) -> Extension,
  ) -> Self {
    let field = Self::define(create, update);
    let provided = provide(&field);
    let _ = field.inner.provided.set(provided);
    field
  }

  /// The extension that installs this field (and whatever it provides).
  pub fn extension(&self) -> Extension {
    Extension::field(self.inner.clone())
  }
}

impl<T: Send + Sync + 'static> From<&StateField<T>> for Extension {
  fn from(field: &StateField<T>) -> Self {
    field.extension()
  }
}

impl<T: Send + Sync + 'static> From<StateField<T>> for Extension {
  fn from(field: StateField<T>) -> Self {
    field.extension()
  }
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;
  use crate::facet::Facet;

  #[test]
  fn field_reduces_transactions() {
    let edits = StateField::define(
      |_| 0usize,
      |count, tr, _| if tr.doc_changed() { count + 1 } else { *count },
    );
    let state = EditorState::with_text("repo:", edits.extension());

    let tx = Transaction::change(state.doc(), vec![(5, 5, Some("foo".into()))]).unwrap();
    let state = state.apply(&tx).unwrap();
    assert_eq!(state.field(&edits), Some(&1));

    let tx = Transaction::effects_only(state.doc(), Vec::new());
    let state = state.apply(&tx).unwrap();
    assert_eq!(state.field(&edits), Some(&1));
  }

  #[test]
  fn reducer_sees_next_document() {
    let length = StateField::define(
      |state| state.doc().len_chars(),
      |_, _, next| next.doc().len_chars(),
    );
    let state = EditorState::with_text("a", length.extension());
    let tx = Transaction::change(state.doc(), vec![(1, 1, Some("bc".into()))]).unwrap();
    assert_eq!(state.apply(&tx).unwrap().field(&length), Some(&3));
  }

  #[test]
  fn provided_extension_is_installed() {
    let label: Facet<String> = Facet::define();
    let field = StateField::define_with(
      |_| "lang:go".to_string(),
      |value, _, _| value.clone(),
      |field| label.compute_from(field, |value: &String| Some(value.to_uppercase())),
    );
    let state = EditorState::with_text("", field.extension());
    assert_eq!(state.facet(&label), vec!["LANG:GO".to_string()]);
  }

  #[test]
  fn unconfigured_field_reads_none() {
    let field = StateField::define(|_| 1u8, |value, _, _| *value);
    let state = EditorState::with_text("", Extension::none());
    assert_eq!(state.field(&field), None);
    assert_eq!(state.field(&field.key()), None);
  }

  #[test]
  fn duplicate_fields_are_configured_once() {
    let field = StateField::define(|_| 0u32, |value, tr, _| value + tr.effects().len() as u32);
    let state = EditorState::with_text(
      "",
      Extension::group([field.extension(), field.extension()]),
    );
    let effect = crate::effect::StateEffectType::<()>::define();
    let tx = Transaction::effects_only(&Rope::new(), vec![effect.of(())]);
    assert_eq!(state.apply(&tx).unwrap().field(&field), Some(&1));
  }
}
