use std::ffi::OsString;
use std::fs;
use std::path::Path;

use gtdo_core::contexts::get_context_info;
use gtdo_core::countdown::{CountdownEnd, ManualClock, run_countdown};
use gtdo_core::datastore::{DataStore, Persister};
use gtdo_core::extract::heuristics::CandidateHeuristic;
use gtdo_core::selectors::{todo_stats, visible_todos};
use gtdo_core::store::filter::{ContextFilter, StatusFilter};
use gtdo_core::store::plan::UserPlan;
use gtdo_core::store::pomodoro::{LONG_BREAK_SECONDS, SHORT_BREAK_SECONDS};
use gtdo_core::store::{Action, AppState, Store};
use gtdo_core::task::ContextId;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

fn gtdo(data: &Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv: Vec<OsString> = vec![
        "gtdo".into(),
        "--config".into(),
        "/dev/null".into(),
        "--data".into(),
        data.as_os_str().to_owned(),
        "rc.ocr.command=/nonexistent/gtdo-test-ocr".into(),
        "rc.extract.seed=7".into(),
    ];
    argv.extend(args.iter().map(OsString::from));
    gtdo_core::run(argv)
}

fn hydrate(data: &Path) -> AppState {
    DataStore::open(data).expect("open datastore").hydrate()
}

fn add(text: &str) -> Action {
    Action::AddTodo {
        text: text.to_string(),
        context: None,
    }
}

#[test]
fn ids_grow_and_blank_text_is_ignored() {
    let mut store = Store::new(AppState::default());
    let mut last = 0;
    for text in ["one", "two", "three"] {
        let state = store.dispatch(add(text));
        let id = state.todos.todos.last().map(|t| t.id).expect("added");
        assert!(id > last);
        last = id;
    }

    store.dispatch(Action::RemoveTodo(last));
    let state = store.dispatch(add("four"));
    assert!(state.todos.todos.iter().all(|t| t.id != last));

    let before = store.state().todos.len();
    store.dispatch(add(""));
    store.dispatch(add("   "));
    assert_eq!(store.state().todos.len(), before);
}

#[test]
fn toggle_twice_and_remove_twice() {
    let state = AppState::default().reduce(&add("water plants"));
    let toggled = state.clone().reduce(&Action::ToggleTodo(1)).reduce(&Action::ToggleTodo(1));
    assert_eq!(toggled.todos, state.todos);

    let removed = state.reduce(&Action::RemoveTodo(1));
    let again = removed.clone().reduce(&Action::RemoveTodo(1));
    assert_eq!(again, removed);
}

#[test]
fn pomodoro_cycle_through_countdown() {
    let mut store = Store::new(AppState::default());
    store.dispatch(add("write spec"));

    let mut clock = ManualClock::default();
    for round in 1..=4 {
        store.dispatch(Action::StartPomodoro {
            task_id: 1,
            task_text: "write spec".to_string(),
        });
        let start = &store.state().pomodoro;
        assert_eq!(start.time_remaining, 1500);
        assert!(start.is_active && !start.is_break);

        let end = run_countdown(&mut store, &mut clock, None, |_| {});
        assert!(matches!(end, CountdownEnd::Crossed(_)));

        let expected = if round == 4 {
            LONG_BREAK_SECONDS
        } else {
            SHORT_BREAK_SECONDS
        };
        assert_eq!(store.state().pomodoro.total_time, expected);
        store.dispatch(Action::StopPomodoro);
    }
    assert_eq!(store.state().pomodoro.completed_count, 4);
}

#[test]
fn paused_session_ignores_ticks() {
    let state = AppState::default()
        .reduce(&Action::StartPomodoro {
            task_id: 42,
            task_text: "write spec".to_string(),
        })
        .reduce(&Action::PausePomodoro);
    let after = (0..10).fold(state, |s, _| s.reduce(&Action::Tick));
    assert_eq!(after.pomodoro.time_remaining, 1500);
}

#[test]
fn short_text_draws_from_fallback_set() {
    let heuristic = CandidateHeuristic::new().expect("heuristic");
    let mut rng = StdRng::seed_from_u64(1);
    let candidates = heuristic.extract("milk?", &mut rng);
    assert!(!candidates.is_empty());
    for c in &candidates {
        assert!(["buy coffee", "call emergency", "schedule meeting"].contains(&c.text.as_str()));
    }
}

#[test]
fn unknown_context_resolves_to_inbox() {
    assert_eq!(get_context_info("no-such-thing", &[]).id, "inbox");
    assert_eq!(get_context_info("", &[]).id, "inbox");
}

#[test]
fn persisted_state_reloads_identically() {
    let temp = tempdir().expect("tempdir");
    let datastore = DataStore::open(temp.path()).expect("open datastore");

    let mut store = Store::new(AppState::default());
    store.subscribe(Box::new(Persister::new(datastore.clone())));
    for (text, ctx) in [("pay rent", "home"), ("call bank", "calls"), ("mow lawn", "home")] {
        store.dispatch(Action::AddTodo {
            text: text.to_string(),
            context: Some(ContextId::from(ctx)),
        });
    }
    store.dispatch(Action::ToggleTodo(1));
    store.dispatch(Action::SetContextFilter(ContextFilter::Only(ContextId::from("home"))));
    store.dispatch(Action::SetPlan(UserPlan::Pro));

    let before = store.into_state();
    let after = datastore.hydrate();

    assert_eq!(
        visible_todos(&after.todos.todos, &after.filter),
        visible_todos(&before.todos.todos, &before.filter)
    );
    assert_eq!(todo_stats(&after.todos.todos), todo_stats(&before.todos.todos));
    assert_eq!(after.plan, UserPlan::Pro);
}

#[test]
fn command_line_round_trip() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path();

    gtdo(data, &["add", "call", "the", "bank", "--context", "calls"]).expect("add");
    gtdo(data, &["add", "buy", "milk"]).expect("add");
    gtdo(data, &["toggle", "1"]).expect("toggle");
    gtdo(data, &["filter", "status", "active"]).expect("filter");
    gtdo(data, &["move", "2", "errands"]).expect("move");
    gtdo(data, &["list"]).expect("list");
    gtdo(data, &[]).expect("default command");

    let state = hydrate(data);
    assert_eq!(state.todos.len(), 2);
    assert!(state.todos.todos[0].completed);
    assert_eq!(state.todos.todos[0].text, "call the bank");
    assert_eq!(state.todos.todos[1].context.as_str(), "errands");
    assert_eq!(state.filter.status, StatusFilter::Active);

    assert!(gtdo(data, &["toggle", "99"]).is_err());
    assert!(gtdo(data, &["move", "1", "nowhere"]).is_err());
    assert_eq!(hydrate(data).todos, state.todos);
}

#[test]
fn undo_reverts_the_last_change_without_reusing_ids() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path();

    gtdo(data, &["add", "first"]).expect("add");
    gtdo(data, &["add", "second"]).expect("add");
    gtdo(data, &["undo"]).expect("undo");

    let state = hydrate(data);
    assert_eq!(state.todos.len(), 1);
    assert_eq!(state.todos.next_id, 3);

    gtdo(data, &["add", "third"]).expect("add");
    assert_eq!(hydrate(data).todos.todos[1].id, 3);
}

#[test]
fn custom_contexts_need_pro() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path();

    assert!(gtdo(data, &["contexts", "add", "Deep", "Work"]).is_err());
    gtdo(data, &["plan", "upgrade"]).expect("upgrade");
    gtdo(data, &["contexts", "add", "Deep", "Work", "--color", "#123"]).expect("add context");
    assert!(gtdo(data, &["contexts", "add", "Home"]).is_err());
    gtdo(data, &["add", "outline", "essay", "-c", "deep-work"]).expect("add task");
    gtdo(data, &["contexts", "edit", "deep-work", "--icon", "🧠"]).expect("edit");

    let state = hydrate(data);
    let custom = state.custom_contexts.get("deep-work").expect("custom context");
    assert_eq!(custom.icon, "🧠");
    assert_eq!(custom.color, "#123");
    assert_eq!(state.todos.todos[0].context.as_str(), "deep-work");
}

#[test]
fn timer_commands_drive_the_session() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path();

    gtdo(data, &["add", "write", "spec"]).expect("add");
    assert!(gtdo(data, &["timer", "start", "7"]).is_err());
    gtdo(data, &["timer", "start", "1"]).expect("start");
    gtdo(data, &["timer", "pause"]).expect("pause");

    let state = hydrate(data);
    assert!(state.pomodoro.is_active && state.pomodoro.is_paused);
    assert_eq!(state.pomodoro.active_task.map(|t| t.text).as_deref(), Some("write spec"));

    gtdo(data, &["timer", "stop"]).expect("stop");
    assert!(!hydrate(data).pomodoro.is_active);
}

#[test]
fn keyboard_shortcut_sets_filter() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path();

    gtdo(data, &["key", "ctrl+3"]).expect("key");
    assert_eq!(hydrate(data).filter.status, StatusFilter::Completed);

    gtdo(data, &["key", "ctrl+1", "--typing"]).expect("key");
    assert_eq!(hydrate(data).filter.status, StatusFilter::Completed);
}

#[test]
fn failed_engine_still_yields_reviewable_candidates() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path().join("data");
    let image = temp.path().join("whiteboard.png");
    fs::write(&image, [0x89, b'P', b'N', b'G', 0, 1, 2, 3]).expect("write image");
    let image = image.to_string_lossy().into_owned();

    gtdo(&data, &["scan", "run", &image]).expect("scan");
    let review = hydrate(&data).image;
    assert!(!review.candidates.is_empty());
    assert!(review.error.is_some());
    assert!(review.last_result.is_some());

    gtdo(&data, &["scan", "all"]).expect("select all");
    gtdo(&data, &["scan", "import"]).expect("import");

    let state = hydrate(&data);
    assert_eq!(state.todos.len(), review.candidates.len());
    assert!(state.image.candidates.is_empty());
    assert!(!DataStore::open(&data).expect("open").extraction_path.exists());
}

#[test]
fn missing_image_is_reported() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("nope.png");
    let err = gtdo(temp.path(), &["scan", "run", &missing.to_string_lossy()])
        .expect_err("missing image");
    assert!(format!("{err:#}").contains("nope.png"));
}
