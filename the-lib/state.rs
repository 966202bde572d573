//! Immutable editor state.
//!
//! An [`EditorState`] bundles the query document, the selection and the value
//! of every configured [`StateField`]. States are never mutated: applying a
//! [`Transaction`] produces the next state, reducing every field in
//! configuration order.
//!
//! [`StateField`]: crate::field::StateField

use std::{
  collections::HashMap,
  fmt,
  sync::Arc,
};

use ropey::Rope;
use thiserror::Error;

use crate::{
  extension::{
    Configuration,
    Extension,
    FieldValue,
  },
  facet::Facet,
  field::{
    AsFieldKey,
    FieldId,
  },
  selection::{
    Selection,
    SelectionError,
  },
  transaction::{
    Transaction,
    TransactionError,
  },
};

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
  #[error(transparent)]
  Transaction(#[from] TransactionError),
  #[error(transparent)]
  Selection(#[from] SelectionError),
}

#[derive(Debug, Default)]
pub struct StateConfig {
  pub doc:        Rope,
  /// Defaults to a cursor at the end of the document.
  pub selection:  Option<Selection>,
  pub extensions: Extension,
}

#[derive(Clone)]
pub struct EditorState {
  doc:       Rope,
  selection: Selection,
  config:    Arc<Configuration>,
  values:    HashMap<FieldId, FieldValue>,
}

impl EditorState {
  pub fn create(config: StateConfig) -> Result<Self> {
    let StateConfig {
      doc,
      selection,
      extensions,
    } = config;
    let selection = selection.unwrap_or_else(|| Selection::point(doc.len_chars()));
    selection.ensure_within(doc.len_chars())?;

    let mut state = Self {
      doc,
      selection,
      config: Arc::new(Configuration::resolve(&extensions)),
      values: HashMap::new(),
    };
    state.init_missing_fields();
    Ok(state)
  }

  /// A state holding `text` with the cursor at its end.
  pub fn with_text(text: &str, extensions: impl Into<Extension>) -> Self {
    let doc = Rope::from(text);
    let mut state = Self {
      selection: Selection::point(doc.len_chars()),
      doc,
      config: Arc::new(Configuration::resolve(&extensions.into())),
      values: HashMap::new(),
    };
    state.init_missing_fields();
    state
  }

  pub fn doc(&self) -> &Rope {
    &self.doc
  }

  /// The whole query as a string.
  pub fn text(&self) -> String {
    self.doc.to_string()
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  /// The current value of `field`, or `None` if it is not configured.
  pub fn field<T: 'static>(&self, field: &impl AsFieldKey<T>) -> Option<&T> {
    self
      .values
      .get(&field.field_key().id())
      .and_then(|value| value.downcast_ref())
  }

  /// Every value provided for `facet`, in extension order.
  pub fn facet<V: Clone + 'static>(&self, facet: &Facet<V>) -> Vec<V> {
    let Some(providers) = self.config.facets.get(&facet.id()) else {
      return Vec::new();
    };
    providers
      .iter()
      .filter_map(|provider| provider.resolve(self))
      .filter_map(|value| value.downcast_ref::<V>().cloned())
      .collect()
  }

  /// Produce the state that results from applying `tr`.
  ///
  /// The selection is taken from the transaction when it sets one and is
  /// otherwise mapped through the changes. Fields are then reduced in
  /// configuration order.
  pub fn apply(&self, tr: &Transaction) -> Result<Self> {
    let doc = tr.apply_to(&self.doc)?;
    let selection = match tr.selection() {
      Some(selection) => selection.clone(),
      None => self.selection.clone().map(tr.changes())?,
    };
    selection.ensure_within(doc.len_chars())?;

    let mut next = Self {
      doc,
      selection,
      config: self.config.clone(),
      values: HashMap::with_capacity(self.values.len()),
    };
    for slot in &self.config.fields {
      let value = match self.values.get(&slot.id()) {
        Some(prev) => slot.update(prev, tr, &next),
        None => slot.create(&next),
      };
      next.values.insert(slot.id(), value);
    }

    tracing::trace!(
      doc_changed = tr.doc_changed(),
      effects = tr.effects().len(),
      "applied transaction"
    );
    Ok(next)
  }

  /// Replace the configuration. Fields kept by the new configuration keep
  /// their values; newly added fields are created.
  pub fn reconfigure(&self, extensions: impl Into<Extension>) -> Self {
    let config = Configuration::resolve(&extensions.into());
    let values = self
      .values
      .iter()
      .filter(|(id, _)| config.contains_field(**id))
      .map(|(id, value)| (*id, value.clone()))
      .collect();
    let mut state = Self {
      doc: self.doc.clone(),
      selection: self.selection.clone(),
      config: Arc::new(config),
      values,
    };
    state.init_missing_fields();
    state
  }

  fn init_missing_fields(&mut self) {
    let config = self.config.clone();
    for slot in &config.fields {
      if !self.values.contains_key(&slot.id()) {
        let value = slot.create(self);
        self.values.insert(slot.id(), value);
      }
    }
  }
}

impl fmt::Debug for EditorState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EditorState")
      .field("doc", &self.doc)
      .field("selection", &self.selection)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
