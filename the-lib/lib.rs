use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod chars;
pub mod completion;
pub mod config;
pub mod effect;
pub mod extension;
pub mod facet;
pub mod field;
pub mod fuzzy;
pub mod listener;
pub mod query;
pub mod selection;
pub mod state;
pub mod suggestions;
pub mod transaction;
pub mod updateable;
pub mod view;

pub use listener::change_listener;
pub use suggestions::{
  DefaultSuggestionsConfig,
  create_default_suggestions,
};
pub use updateable::{
  FieldSetter,
  create_updateable_field,
};

pub type Tendril = SmartString<LazyCompact>;
