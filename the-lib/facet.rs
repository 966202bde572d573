//! Facets collect values contributed by many extensions.
//!
//! Reading a facet from an [`EditorState`] yields every provided value in
//! extension order. Providers are either static values ([`Facet::of`]) or
//! computed from the state each time the facet is read ([`Facet::compute`],
//! [`Facet::compute_from`]); a computed provider returning `None` contributes
//! nothing.
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

use crate::{
  extension::{
    Extension,
    FacetProvider,
    FacetValue,
  },
  field::{
    AsFieldKey,
    FieldKey,
  },
  state::EditorState,
};

static NEXT_FACET: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetId(NonZeroU64);

impl FacetId {
  fn fresh() -> Self {
    let id = NEXT_FACET.fetch_add(1, Ordering::Relaxed);
    Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

pub struct Facet<V> {
  id:      FacetId,
  _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for Facet<V> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<V> Copy for Facet<V> {}

impl<V> fmt::Debug for Facet<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Facet").field(&self.id.get()).finish()
  }
}

impl<V> Facet<V> {
  pub fn id(&self) -> FacetId {
    self.id
  }
}

impl<V: Clone + Send + Sync + 'static> Facet<V> {
  pub fn define() -> Self {
    Self {
      id:      FacetId::fresh(),
      _marker: PhantomData,
    }
  }

  /// Provides a fixed value.
  pub fn of(&self, value: V) -> Extension {
    Extension::facet(self.id, FacetProvider::Static(Arc::new(value)))
  }

  /// Provides a value computed from the state whenever the facet is read.
  pub fn compute(
    &self,
    compute: impl Fn(&EditorState) -> Option<V> + Send + Sync + 'static,
  ) -> Extension {
    let provider =
      move |state: &EditorState| compute(state).map(|value| Arc::new(value) as FacetValue);
    Extension::facet(self.id, FacetProvider::Computed(Arc::new(provider)))
  }

  /// Provides a value derived from a state field. Only a [`FieldKey`] is
  /// captured, so this is safe to use from the field's own `provide` hook.
  pub fn compute_from<T: Send + Sync + 'static>(
    &self,
    field: &impl AsFieldKey<T>,
    derive: impl Fn(&T) -> Option<V> + Send + Sync + 'static,
  ) -> Extension {
    let key: FieldKey<T> = field.field_key();
    self.compute(move |state| state.field(&key).and_then(&derive))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn values_come_back_in_extension_order() {
    let names: Facet<&'static str> = Facet::define();
    let extensions = Extension::group([
      names.of("repo"),
      Extension::group([names.of("file"), names.compute(|_| None)]),
      names.compute(|state| (state.doc().len_chars() > 3).then_some("lang")),
    ]);
    let state = crate::state::EditorState::with_text("case:yes", extensions);
    assert_eq!(state.facet(&names), vec!["repo", "file", "lang"]);
  }

  #[test]
  fn facets_are_independent() {
    let a: Facet<u8> = Facet::define();
    let b: Facet<u8> = Facet::define();
    let state = crate::state::EditorState::with_text("", a.of(1));
    assert_eq!(state.facet(&a), vec![1]);
    assert!(state.facet(&b).is_empty());
  }
}
