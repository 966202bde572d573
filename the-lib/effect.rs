//! Typed effects carried by transactions.
//!
//! An effect is a transient payload attached to a [`Transaction`] that state
//! fields may react to. Effects are keyed by an [`EffectTypeId`] generated
//! when the [`StateEffectType`] is defined, so two effect types holding the
//! same Rust type never match each other.
//!
//! ```
//! use ropey::Rope;
//! use the_query_lib::{
//!   effect::StateEffectType,
//!   transaction::Transaction,
//! };
//!
//! let set_limit = StateEffectType::<u32>::define();
//! let other = StateEffectType::<u32>::define();
//!
//! let doc = Rope::from("repo:foo");
//! let tx = Transaction::effects_only(&doc, vec![set_limit.of(10)]);
//! assert_eq!(tx.find_effect(&set_limit), Some(&10));
//! assert_eq!(tx.find_effect(&other), None);
//! ```
//!
//! [`Transaction`]: crate::transaction::Transaction

use std::{
  any::Any,
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

static NEXT_EFFECT_TYPE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectTypeId(NonZeroU64);

impl EffectTypeId {
  fn fresh() -> Self {
    let id = NEXT_EFFECT_TYPE.fetch_add(1, Ordering::Relaxed);
    Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

/// Descriptor of an effect carrying values of type `V`.
pub struct StateEffectType<V> {
  id:      EffectTypeId,
  _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for StateEffectType<V> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<V> Copy for StateEffectType<V> {}

impl<V> fmt::Debug for StateEffectType<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("StateEffectType").field(&self.id.get()).finish()
  }
}

impl<V> PartialEq for StateEffectType<V> {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl<V> Eq for StateEffectType<V> {}

impl<V: Send + Sync + 'static> StateEffectType<V> {
  /// Defines a new effect type, distinct from every other one.
  pub fn define() -> Self {
    Self {
      id:      EffectTypeId::fresh(),
      _marker: PhantomData,
    }
  }

  pub fn id(&self) -> EffectTypeId {
    self.id
  }

  /// Creates an effect of this type.
  pub fn of(&self, value: V) -> StateEffect {
    StateEffect {
      ty:    self.id,
      value: Arc::new(value),
    }
  }
}

/// A type-erased effect instance.
#[derive(Clone)]
pub struct StateEffect {
  ty:    EffectTypeId,
  value: Arc<dyn Any + Send + Sync>,
}

impl StateEffect {
  pub fn type_id(&self) -> EffectTypeId {
    self.ty
  }

  pub fn is<V>(&self, ty: &StateEffectType<V>) -> bool {
    self.ty == ty.id
  }

  /// The payload, if this effect is of type `ty`.
  pub fn value<V: 'static>(&self, ty: &StateEffectType<V>) -> Option<&V> {
    if self.is(ty) {
      self.value.downcast_ref()
    } else {
      None
    }
  }
}

impl fmt::Debug for StateEffect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StateEffect")
      .field("type", &self.ty.get())
      .finish_non_exhaustive()
  }
}
