//! The dispatch loop around an [`EditorState`].
//!
//! An [`EditorView`] owns the current state. Dispatching a transaction
//! replaces the state and then calls every [`update_listener`] with a
//! [`ViewUpdate`]. Listeners observe; they never change the state in place.
//! Work that must feed back into the state (async results, for instance) goes
//! through the view's [`Dispatcher`], which queues effects for the view to
//! dispatch later via [`EditorView::flush_pending`] or
//! [`EditorView::process_next`].

use std::{
  fmt,
  num::NonZeroU64,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use once_cell::sync::Lazy;
use tokio::sync::mpsc::{
  UnboundedReceiver,
  UnboundedSender,
  unbounded_channel,
};

use crate::{
  effect::StateEffect,
  facet::Facet,
  state::{
    EditorState,
    Result,
  },
  transaction::Transaction,
};

static NEXT_VIEW: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(NonZeroU64);

impl ViewId {
  fn fresh() -> Self {
    let id = NEXT_VIEW.fetch_add(1, Ordering::Relaxed);
    Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

pub type UpdateListener = Arc<dyn Fn(&ViewUpdate<'_>) + Send + Sync>;

static UPDATE_LISTENER: Lazy<Facet<UpdateListener>> = Lazy::new(Facet::define);

/// Callbacks run after every dispatched transaction.
pub fn update_listener() -> &'static Facet<UpdateListener> {
  &UPDATE_LISTENER
}

/// What a listener sees after a dispatch.
pub struct ViewUpdate<'a> {
  pub start_state: &'a EditorState,
  pub state:       &'a EditorState,
  pub transaction: &'a Transaction,
  dispatcher:      &'a Dispatcher,
}

impl ViewUpdate<'_> {
  pub fn doc_changed(&self) -> bool {
    self.transaction.doc_changed()
  }

  pub fn selection_set(&self) -> bool {
    self.transaction.selection().is_some()
      || self.start_state.selection() != self.state.selection()
  }

  pub fn dispatcher(&self) -> &Dispatcher {
    self.dispatcher
  }
}

impl fmt::Debug for ViewUpdate<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ViewUpdate")
      .field("view", &self.dispatcher.view)
      .field("transaction", &self.transaction)
      .finish_non_exhaustive()
  }
}

/// A cloneable handle that queues effects for a view.
#[derive(Debug, Clone)]
pub struct Dispatcher {
  view: ViewId,
  tx:   UnboundedSender<Vec<StateEffect>>,
}

impl Dispatcher {
  pub fn view_id(&self) -> ViewId {
    self.view
  }

  /// Queue `effects` to be dispatched as one transaction. Returns `false`
  /// when the view is gone.
  pub fn send(&self, effects: Vec<StateEffect>) -> bool {
    match self.tx.send(effects) {
      Ok(()) => true,
      Err(_) => {
        tracing::debug!(view = self.view.get(), "dropping effects for a destroyed view");
        false
      },
    }
  }

  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }
}

pub struct EditorView {
  id:         ViewId,
  state:      EditorState,
  dispatcher: Dispatcher,
  pending:    UnboundedReceiver<Vec<StateEffect>>,
  destroyed:  bool,
}

impl EditorView {
  pub fn new(state: EditorState) -> Self {
    let id = ViewId::fresh();
    let (tx, pending) = unbounded_channel();
    Self {
      id,
      state,
      dispatcher: Dispatcher { view: id, tx },
      pending,
      destroyed: false,
    }
  }

  pub fn id(&self) -> ViewId {
    self.id
  }

  pub fn state(&self) -> &EditorState {
    &self.state
  }

  pub fn dispatcher(&self) -> Dispatcher {
    self.dispatcher.clone()
  }

  pub fn is_destroyed(&self) -> bool {
    self.destroyed
  }

  /// Apply `tr` and notify update listeners. A failed transaction leaves the
  /// state untouched and notifies nobody.
  pub fn dispatch(&mut self, tr: Transaction) -> Result<()> {
    if self.destroyed {
      tracing::debug!(view = self.id.get(), "ignoring dispatch on a destroyed view");
      return Ok(());
    }
    let next = self.state.apply(&tr)?;
    let start_state = std::mem::replace(&mut self.state, next);
    tracing::trace!(
      view = self.id.get(),
      doc_changed = tr.doc_changed(),
      effects = tr.effects().len(),
      "dispatched transaction"
    );

    let update = ViewUpdate {
      start_state: &start_state,
      state:       &self.state,
      transaction: &tr,
      dispatcher:  &self.dispatcher,
    };
    for listener in self.state.facet(update_listener()) {
      listener(&update);
    }
    Ok(())
  }

  /// Dispatch a transaction that only carries `effects`.
  pub fn dispatch_effects(&mut self, effects: Vec<StateEffect>) -> Result<()> {
    let tr = Transaction::effects_only(self.state.doc(), effects);
    self.dispatch(tr)
  }

  /// Dispatch everything queued through the dispatcher so far, returning how
  /// many transactions were applied.
  pub fn flush_pending(&mut self) -> Result<usize> {
    let mut applied = 0;
    while let Ok(effects) = self.pending.try_recv() {
      self.dispatch_effects(effects)?;
      applied += 1;
    }
    Ok(applied)
  }

  /// Wait for the next queued batch of effects and dispatch it. Returns
  /// `false` once the view is destroyed and the queue is drained.
  pub async fn process_next(&mut self) -> Result<bool> {
    match self.pending.recv().await {
      Some(effects) => {
        self.dispatch_effects(effects)?;
        Ok(true)
      },
      None => Ok(false),
    }
  }

  /// Replace the state without notifying listeners.
  pub fn set_state(&mut self, state: EditorState) {
    self.state = state;
  }

  /// Stop accepting transactions. Pending and future dispatcher sends are
  /// dropped.
  pub fn destroy(&mut self) {
    self.destroyed = true;
    self.pending.close();
    while self.pending.try_recv().is_ok() {}
  }
}

impl fmt::Debug for EditorView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EditorView")
      .field("id", &self.id)
      .field("state", &self.state)
      .field("destroyed", &self.destroyed)
      .finish()
  }
}
