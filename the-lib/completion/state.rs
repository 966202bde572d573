use std::sync::Arc;

use once_cell::sync::Lazy;

use super::Completion;
use crate::{
  Tendril,
  config::CompletionConfig,
  effect::{
    StateEffect,
    StateEffectType,
  },
  facet::Facet,
  field::StateField,
  selection::Selection,
  state::{
    EditorState,
    Result,
  },
  transaction::Transaction,
  view::EditorView,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionStatus {
  #[default]
  Idle,
  /// Waiting for sources to answer.
  Pending,
  /// Options are available.
  Active,
}

/// Options shown for the document range `from..to` (chars).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCompletion {
  pub from:    usize,
  pub to:      usize,
  pub options: Vec<Completion>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionState {
  status:     CompletionStatus,
  generation: u64,
  explicit:   bool,
  /// Cursor the pending request was made for.
  origin:     usize,
  active:     Option<Arc<ActiveCompletion>>,
  selected:   usize,
}

impl CompletionState {
  pub fn status(&self) -> CompletionStatus {
    self.status
  }

  /// Bumped every time a new request starts or the completion closes.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn explicit(&self) -> bool {
    self.explicit
  }

  pub fn active(&self) -> Option<&ActiveCompletion> {
    self.active.as_deref()
  }

  pub fn selected(&self) -> Option<&Completion> {
    self.active()?.options.get(self.selected)
  }

  fn begin(&mut self, explicit: bool, cursor: usize) {
    self.generation += 1;
    self.status = CompletionStatus::Pending;
    self.explicit = explicit;
    self.origin = cursor;
    self.active = None;
    self.selected = 0;
  }

  fn close(&mut self) {
    if self.status != CompletionStatus::Idle {
      self.generation += 1;
    }
    self.status = CompletionStatus::Idle;
    self.explicit = false;
    self.active = None;
    self.selected = 0;
  }

  fn resolve(&mut self, update: &CompletionUpdate) {
    if self.status != CompletionStatus::Pending || update.generation != self.generation {
      return;
    }
    match &update.result {
      Some(result) if !result.options.is_empty() => {
        self.status = CompletionStatus::Active;
        self.active = Some(Arc::new(result.clone()));
        self.selected = 0;
      },
      _ => self.status = CompletionStatus::Idle,
    }
  }

  fn move_selection(&mut self, delta: isize) {
    let Some(active) = &self.active else {
      return;
    };
    let len = active.options.len() as isize;
    if len > 0 {
      self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
    }
  }
}

#[derive(Debug, Clone)]
pub(crate) struct CompletionUpdate {
  generation: u64,
  result:     Option<ActiveCompletion>,
}

struct CompletionEffects {
  /// Payload: whether the request was explicit.
  start:          StateEffectType<bool>,
  close:          StateEffectType<()>,
  set_result:     StateEffectType<CompletionUpdate>,
  move_selection: StateEffectType<isize>,
}

static EFFECTS: Lazy<CompletionEffects> = Lazy::new(|| {
  CompletionEffects {
    start:          StateEffectType::define(),
    close:          StateEffectType::define(),
    set_result:     StateEffectType::define(),
    move_selection: StateEffectType::define(),
  }
});

static FIELD: Lazy<StateField<CompletionState>> =
  Lazy::new(|| StateField::define(|_| CompletionState::default(), reduce));

static CONFIG: Lazy<Facet<CompletionConfig>> = Lazy::new(Facet::define);

pub(crate) fn completion_field() -> &'static StateField<CompletionState> {
  &FIELD
}

pub(crate) fn completion_config() -> &'static Facet<CompletionConfig> {
  &CONFIG
}

pub(crate) fn set_result(generation: u64, result: Option<ActiveCompletion>) -> StateEffect {
  EFFECTS.set_result.of(CompletionUpdate { generation, result })
}

fn reduce(value: &CompletionState, tr: &Transaction, state: &EditorState) -> CompletionState {
  let mut next = value.clone();
  let cursor = state.selection().single_cursor();

  if tr.doc_changed() {
    let activate = next.status != CompletionStatus::Idle
      || state
        .facet(completion_config())
        .first()
        .is_none_or(|config| config.activate_on_typing);
    match cursor {
      Some(pos) if activate && state.doc().len_chars() > 0 => next.begin(false, pos),
      _ => next.close(),
    }
  } else if next.status == CompletionStatus::Pending {
    // the answer would be for a position the cursor already left
    if cursor != Some(next.origin) {
      next.close();
    }
  } else if let Some(active) = &next.active {
    let inside = cursor.is_some_and(|pos| active.from <= pos && pos <= active.to);
    if !inside {
      next.close();
    }
  }

  for effect in tr.effects() {
    if let Some(explicit) = effect.value(&EFFECTS.start) {
      if let Some(pos) = cursor {
        next.begin(*explicit, pos);
      }
    } else if effect.is(&EFFECTS.close) {
      next.close();
    } else if let Some(update) = effect.value(&EFFECTS.set_result) {
      next.resolve(update);
    } else if let Some(delta) = effect.value(&EFFECTS.move_selection) {
      next.move_selection(*delta);
    }
  }
  next
}

fn completion(state: &EditorState) -> Option<&CompletionState> {
  state.field(completion_field())
}

/// Idle when completion is not configured.
pub fn completion_status(state: &EditorState) -> CompletionStatus {
  completion(state).map_or(CompletionStatus::Idle, CompletionState::status)
}

/// Options currently offered, best first.
pub fn current_completions(state: &EditorState) -> &[Completion] {
  completion(state)
    .and_then(CompletionState::active)
    .map(|active| active.options.as_slice())
    .unwrap_or_default()
}

pub fn selected_completion(state: &EditorState) -> Option<&Completion> {
  completion(state)?.selected()
}

/// Explicitly ask for completion at the cursor. Sources answer even for an
/// empty word and without debounce. Returns `false` when completion is not
/// configured.
pub fn start_completion(view: &mut EditorView) -> Result<bool> {
  if completion(view.state()).is_none() {
    return Ok(false);
  }
  view.dispatch_effects(vec![EFFECTS.start.of(true)])?;
  Ok(true)
}

/// Returns `false` when nothing was open.
pub fn close_completion(view: &mut EditorView) -> Result<bool> {
  if completion_status(view.state()) == CompletionStatus::Idle {
    return Ok(false);
  }
  view.dispatch_effects(vec![EFFECTS.close.of(())])?;
  Ok(true)
}

/// Moves the selected option by `delta`, wrapping around.
pub fn move_completion_selection(view: &mut EditorView, delta: isize) -> Result<bool> {
  if completion_status(view.state()) != CompletionStatus::Active {
    return Ok(false);
  }
  view.dispatch_effects(vec![EFFECTS.move_selection.of(delta)])?;
  Ok(true)
}

/// Replaces the completed range with the selected option and places the
/// cursor after it. Returns `false` when no option is selected.
pub fn accept_completion(view: &mut EditorView) -> Result<bool> {
  let tr = {
    let state = view.state();
    let Some(completion) = completion(state) else {
      return Ok(false);
    };
    let (Some(active), Some(option)) = (completion.active(), completion.selected()) else {
      return Ok(false);
    };
    let followup = if option.retrigger {
      EFFECTS.start.of(false)
    } else {
      EFFECTS.close.of(())
    };
    let cursor = active.from + option.insert.chars().count();
    let insert = Tendril::from(option.insert.as_str());
    Transaction::change(state.doc(), [(active.from, active.to, Some(insert))])?
      .with_selection(Selection::point(cursor))
      .with_effect(followup)
  };
  view.dispatch(tr)?;
  Ok(true)
}
