//! Fields whose value is replaced from outside the editor.
//!
//! [`create_updateable_field`] returns a state field holding an optional
//! value, together with a [`FieldSetter`] that replaces it. Every call makes
//! a fresh effect type, so two updateable fields never see each other's
//! updates even when they hold the same type.

use std::fmt;

use crate::{
  effect::StateEffectType,
  extension::Extension,
  field::StateField,
  view::{
    Dispatcher,
    EditorView,
  },
};

/// Replaces the value of one updateable field.
pub struct FieldSetter<T> {
  effect: StateEffectType<Option<T>>,
}

impl<T> Clone for FieldSetter<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for FieldSetter<T> {}

impl<T> fmt::Debug for FieldSetter<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FieldSetter")
      .field("effect", &self.effect)
      .finish()
  }
}

impl<T: Send + Sync + 'static> FieldSetter<T> {
  /// Dispatch a single transaction setting the field to `value` (`None`
  /// clears it).
  pub fn set(&self, view: &mut EditorView, value: Option<T>) {
    if let Err(err) = view.dispatch_effects(vec![self.effect.of(value)]) {
      tracing::warn!(%err, view = view.id().get(), "failed to update field");
    }
  }

  /// Queue the update on a view's dispatcher. Useful from async tasks that
  /// cannot borrow the view. Returns `false` when the view is gone.
  pub fn send(&self, dispatcher: &Dispatcher, value: Option<T>) -> bool {
    dispatcher.send(vec![self.effect.of(value)])
  }

  pub fn effect_type(&self) -> StateEffectType<Option<T>> {
    self.effect
  }
}

/// Create a field starting at `default` and updated through the returned
/// setter. `provide` exposes the field to the rest of the editor, typically as
/// a facet computed from its value.
///
/// When one transaction carries several updates for the same field, the
/// first one wins.
pub fn create_updateable_field<T>(
  provide: impl FnOnce(&StateField<Option<T>>) -> Extension,
  default: Option<T>,
) -> (StateField<Option<T>>, FieldSetter<T>, StateEffectType<Option<T>>)
where
  T: Clone + Send + Sync + 'static,
{
  let effect = StateEffectType::<Option<T>>::define();
  let field = StateField::define_with(
    move |_| default.clone(),
    move |value, tr, _| {
      match tr.find_effect(&effect) {
        Some(next) => next.clone(),
        None => value.clone(),
      }
    },
    provide,
  );
  (field, FieldSetter { effect }, effect)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    facet::Facet,
    state::EditorState,
    transaction::Transaction,
  };

  fn hidden<T>(_: &StateField<Option<T>>) -> Extension {
    Extension::none()
  }

  #[test]
  fn setter_replaces_and_clears() {
    let (field, setter, _) = create_updateable_field(hidden, Some(1u32));
    let mut view = EditorView::new(EditorState::with_text("", field.extension()));
    assert_eq!(view.state().field(&field), Some(&Some(1)));

    setter.set(&mut view, Some(7));
    assert_eq!(view.state().field(&field), Some(&Some(7)));

    setter.set(&mut view, None);
    assert_eq!(view.state().field(&field), Some(&None));
  }

  #[test]
  fn fields_of_the_same_type_are_isolated() {
    let (a, set_a, _) = create_updateable_field(hidden, Some("a".to_string()));
    let (b, ..) = create_updateable_field(hidden, Some("b".to_string()));
    let mut view = EditorView::new(EditorState::with_text(
      "",
      Extension::group([a.extension(), b.extension()]),
    ));

    set_a.set(&mut view, Some("changed".to_string()));
    assert_eq!(view.state().field(&a), Some(&Some("changed".to_string())));
    assert_eq!(view.state().field(&b), Some(&Some("b".to_string())));
  }

  #[test]
  fn first_update_in_a_transaction_wins() {
    let (field, setter, effect) = create_updateable_field(hidden, None::<u8>);
    let state = EditorState::with_text("", field.extension());
    assert_eq!(setter.effect_type(), effect);
    let tx = Transaction::effects_only(state.doc(), vec![effect.of(Some(1)), effect.of(Some(2))]);
    assert_eq!(state.apply(&tx).unwrap().field(&field), Some(&Some(1)));
  }

  #[test]
  fn provided_facet_follows_the_field() {
    let context: Facet<String> = Facet::define();
    let (field, setter, _) = create_updateable_field(
      |field| {
        context.compute_from(field, |value: &Option<String>| {
          value.as_ref().map(|name| format!("context:{name}"))
        })
      },
      None::<String>,
    );
    let mut view = EditorView::new(EditorState::with_text("", field.extension()));
    assert!(view.state().facet(&context).is_empty());

    setter.set(&mut view, Some("global".to_string()));
    assert_eq!(view.state().facet(&context), vec!["context:global".to_string()]);
  }

  #[test]
  fn send_is_applied_on_flush() {
    let (field, setter, _) = create_updateable_field(hidden, None::<i64>);
    let mut view = EditorView::new(EditorState::with_text("", field.extension()));
    assert!(setter.send(&view.dispatcher(), Some(-1)));
    assert_eq!(view.state().field(&field), Some(&None));
    view.flush_pending().unwrap();
    assert_eq!(view.state().field(&field), Some(&Some(-1)));
  }
}
