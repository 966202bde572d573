use std::sync::Arc;

use crate::{
  extension::Extension,
  view::{
    ViewUpdate,
    update_listener,
  },
};

/// Calls `callback` with the full query text after every transaction that
/// changed the document. Selection moves and effect-only transactions are
/// ignored.
pub fn change_listener(callback: impl Fn(&str) + Send + Sync + 'static) -> Extension {
  update_listener().of(Arc::new(move |update: &ViewUpdate<'_>| {
    if update.doc_changed() {
      callback(&update.state.text());
    }
  }))
}

#[cfg(test)]
mod test {
  use parking_lot::Mutex;

  use super::*;
  use crate::{
    selection::Selection,
    state::EditorState,
    transaction::Transaction,
    view::EditorView,
  };

  #[test]
  fn reports_only_document_changes() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener = {
      let seen = seen.clone();
      change_listener(move |query| seen.lock().push(query.to_string()))
    };
    let mut view = EditorView::new(EditorState::with_text("repo:", listener));

    let tx = Transaction::change(view.state().doc(), vec![(5, 5, Some("x".into()))]).unwrap();
    view.dispatch(tx).unwrap();

    let tx = Transaction::new(view.state().doc()).with_selection(Selection::point(0));
    view.dispatch(tx).unwrap();
    view.dispatch_effects(Vec::new()).unwrap();

    assert_eq!(*seen.lock(), vec!["repo:x".to_string()]);
  }
}
