//! Composable editor configuration.
//!
//! An [`Extension`] is a tree of state fields and facet providers. When an
//! [`EditorState`] is created the tree is flattened depth first into a
//! `Configuration`: fields in first-seen order (a field included twice is
//! only kept once) and, per facet, its providers in extension order.
//!
//! [`EditorState`]: crate::state::EditorState

use std::{
  any::Any,
  collections::{
    HashMap,
    HashSet,
  },
  fmt,
  sync::Arc,
};

use crate::{
  facet::FacetId,
  field::FieldId,
  state::EditorState,
  transaction::Transaction,
};

pub(crate) type FieldValue = Arc<dyn Any + Send + Sync>;
pub(crate) type FacetValue = Arc<dyn Any + Send + Sync>;
pub(crate) type FacetCompute = Arc<dyn Fn(&EditorState) -> Option<FacetValue> + Send + Sync>;

/// Type-erased view of a state field.
pub(crate) trait FieldSlot: Send + Sync {
  fn id(&self) -> FieldId;
  fn create(&self, state: &EditorState) -> FieldValue;
  fn update(&self, value: &FieldValue, tr: &Transaction, state: &EditorState) -> FieldValue;
  fn provided(&self) -> Option<Extension>;
}

#[derive(Clone)]
pub(crate) enum FacetProvider {
  Static(FacetValue),
  Computed(FacetCompute),
}

impl FacetProvider {
  pub(crate) fn resolve(&self, state: &EditorState) -> Option<FacetValue> {
    match self {
      Self::Static(value) => Some(value.clone()),
      Self::Computed(compute) => compute(state),
    }
  }
}

#[derive(Clone, Default)]
enum Node {
  #[default]
  Empty,
  Field(Arc<dyn FieldSlot>),
  Facet(FacetId, FacetProvider),
  Group(Arc<[Extension]>),
}

/// A composable unit of editor configuration.
#[derive(Clone, Default)]
pub struct Extension {
  node: Node,
}

impl Extension {
  /// An extension that configures nothing.
  pub fn none() -> Self {
    Self::default()
  }

  /// Combines several extensions, keeping their order.
  pub fn group(extensions: impl IntoIterator<Item = Extension>) -> Self {
    Self {
      node: Node::Group(extensions.into_iter().collect()),
    }
  }

  pub(crate) fn field(slot: Arc<dyn FieldSlot>) -> Self {
    Self {
      node: Node::Field(slot),
    }
  }

  pub(crate) fn facet(id: FacetId, provider: FacetProvider) -> Self {
    Self {
      node: Node::Facet(id, provider),
    }
  }
}

impl From<Vec<Extension>> for Extension {
  fn from(extensions: Vec<Extension>) -> Self {
    Self::group(extensions)
  }
}

impl FromIterator<Extension> for Extension {
  fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
    Self::group(iter)
  }
}

impl fmt::Debug for Extension {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.node {
      Node::Empty => f.write_str("Extension::None"),
      Node::Field(slot) => write!(f, "Extension::Field({})", slot.id().get()),
      Node::Facet(id, _) => write!(f, "Extension::Facet({})", id.get()),
      Node::Group(items) => f.debug_list().entries(items.iter()).finish(),
    }
  }
}

/// The flattened form of an extension tree.
#[derive(Default)]
pub(crate) struct Configuration {
  pub(crate) fields: Vec<Arc<dyn FieldSlot>>,
  pub(crate) facets: HashMap<FacetId, Vec<FacetProvider>>,
}

impl Configuration {
  pub(crate) fn resolve(root: &Extension) -> Self {
    let mut config = Self::default();
    let mut seen = HashSet::new();
    config.collect(root, &mut seen);
    config
  }

  fn collect(&mut self, extension: &Extension, seen: &mut HashSet<FieldId>) {
    match &extension.node {
      Node::Empty => {},
      Node::Field(slot) => {
        if !seen.insert(slot.id()) {
          return;
        }
        self.fields.push(slot.clone());
        if let Some(provided) = slot.provided() {
          self.collect(&provided, seen);
        }
      },
      Node::Facet(id, provider) => {
        self.facets.entry(*id).or_default().push(provider.clone());
      },
      Node::Group(items) => {
        for item in items.iter() {
          self.collect(item, seen);
        }
      },
    }
  }

  pub(crate) fn contains_field(&self, id: FieldId) -> bool {
    self.fields.iter().any(|slot| slot.id() == id)
  }
}

impl fmt::Debug for Configuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Configuration")
      .field("fields", &self.fields.len())
      .field("facets", &self.facets.len())
      .finish()
  }
}
