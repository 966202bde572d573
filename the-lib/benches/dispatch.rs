//! Benchmarks for the per-keystroke work of a query input.
//!
//! Run with: `cargo bench -p the-query-lib --bench dispatch`

use divan::{
  Bencher,
  black_box,
};
use the_query_lib::{
  change_listener,
  completion::{
    CompletionContext,
    search_query_autocompletion,
  },
  create_updateable_field,
  extension::Extension,
  query::scan,
  state::EditorState,
  transaction::Transaction,
  view::EditorView,
};

fn main() {
  divan::main();
}

const QUERY: &str = r#"-repo:^github\.com/foo$ file:'a b.go' (lang:go or lang:rust) not TODO "exact text" "#;

fn make_query(repeat: usize) -> String {
  QUERY.repeat(repeat)
}

mod scanner {
  use super::*;

  #[divan::bench(args = [1, 16, 256])]
  fn scan_query(bencher: Bencher, repeat: usize) {
    let query = make_query(repeat);
    bencher.bench(|| black_box(scan(black_box(&query))));
  }

  #[divan::bench(args = [1, 16, 256])]
  fn context_at_end(bencher: Bencher, repeat: usize) {
    let query = make_query(repeat);
    bencher.bench(|| {
      let context = CompletionContext::new(black_box(query.as_str()), query.len(), false);
      black_box(context.token().is_some());
    });
  }
}

mod dispatch {
  use super::*;

  fn typing_view(extensions: Extension) -> EditorView {
    EditorView::new(EditorState::with_text(&make_query(4), extensions))
  }

  fn type_char(view: &mut EditorView) {
    let state = view.state();
    let tx = Transaction::insert(state.doc(), state.selection(), "x".into()).unwrap();
    view.dispatch(tx).unwrap();
  }

  #[divan::bench]
  fn bare(bencher: Bencher) {
    let mut view = typing_view(Extension::none());
    bencher.bench_local(|| type_char(&mut view));
  }

  #[divan::bench]
  fn with_fields_and_listener(bencher: Bencher) {
    let fields: Vec<_> = (0..8)
      .map(|i| create_updateable_field(|_| Extension::none(), Some(i)).0.extension())
      .collect();
    let extensions = Extension::group([
      Extension::group(fields),
      change_listener(|query| {
        black_box(query.len());
      }),
    ]);
    let mut view = typing_view(extensions);
    bencher.bench_local(|| type_char(&mut view));
  }

  #[divan::bench]
  fn with_completion(bencher: Bencher) {
    // no runtime: the completion state is tracked but sources never run
    let mut view = typing_view(search_query_autocompletion(Vec::new()));
    bencher.bench_local(|| type_char(&mut view));
  }
}
