mod contexts;
mod scan;
mod timer;
mod todos;

use anyhow::anyhow;
use tracing::{debug, info, instrument};

use crate::cli::{Command, FilterCommand};
use crate::config::Config;
use crate::contexts::{ALL_CONTEXTS, get_context_info, is_builtin};
use crate::datastore::{DataStore, PersistedState, Persister};
use crate::render::Renderer;
use crate::shortcuts::{KeyChord, resolve};
use crate::store::filter::ContextFilter;
use crate::store::{Action, AppState, Store};
use crate::task::{ContextId, Task};

/// Everything a command needs: the hydrated store (persisting on every
/// dispatch), the raw datastore, config and output.
pub struct Session<'a> {
    pub store: Store,
    pub datastore: DataStore,
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
}

impl<'a> Session<'a> {
    pub fn open(datastore: DataStore, cfg: &'a Config, renderer: &'a Renderer) -> Self {
        let mut store = Store::new(datastore.hydrate());
        store.subscribe(Box::new(Persister::new(datastore.clone())));
        Self {
            store,
            datastore,
            cfg,
            renderer,
        }
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn dispatch(&mut self, action: Action) -> &AppState {
        self.store.dispatch(action)
    }

    fn task(&self, id: u64) -> anyhow::Result<Task> {
        self.state()
            .todos
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no task with id {id}"))
    }

    /// A context id a task may be filed under: built-in, or a custom
    /// context that exists.
    fn context(&self, raw: &str) -> anyhow::Result<ContextId> {
        let id = raw.trim();
        if is_builtin(id) || self.state().custom_contexts.get(id).is_some() {
            Ok(ContextId::new(id))
        } else {
            Err(anyhow!(
                "unknown context `{id}`; see `gtdo contexts` for the available ones"
            ))
        }
    }

    fn context_label(&self, id: &ContextId) -> String {
        let info = get_context_info(id.as_str(), &self.state().custom_contexts.contexts);
        format!("{} {}", info.icon, info.label)
    }
}

#[instrument(skip(datastore, cfg, renderer, command))]
pub fn dispatch(
    datastore: DataStore,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let mut session = Session::open(datastore, cfg, renderer);
    debug!(?command, "dispatching command");

    match command {
        Command::Add { text, context } => todos::cmd_add(&mut session, &text, context.as_deref()),
        Command::List { status, context } => {
            todos::cmd_list(&session, status, context.as_deref())
        }
        Command::Toggle { id } => todos::cmd_toggle(&mut session, id),
        Command::Rm { id } => todos::cmd_remove(&mut session, id),
        Command::Move { id, context } => todos::cmd_move(&mut session, id, &context),
        Command::Stats => todos::cmd_stats(&session),
        Command::Filter { action } => cmd_filter(&mut session, action),
        Command::Contexts { action } => contexts::cmd_contexts(&mut session, action),
        Command::Plan { action } => contexts::cmd_plan(&mut session, action),
        Command::Timer { action } => timer::cmd_timer(&mut session, action),
        Command::Scan { action } => scan::cmd_scan(&mut session, action),
        Command::Key { chord, typing } => cmd_key(&mut session, &chord, typing),
        Command::Undo => cmd_undo(&mut session),
    }
}

#[instrument(skip(session))]
fn cmd_filter(session: &mut Session<'_>, action: FilterCommand) -> anyhow::Result<()> {
    info!("command filter");

    match action {
        FilterCommand::Status { status } => {
            session.dispatch(Action::SetStatusFilter(status));
            println!("Showing {status} tasks.");
        }
        FilterCommand::Context { context } => {
            let context = context.trim();
            let filter = if context == ALL_CONTEXTS {
                ContextFilter::All
            } else {
                ContextFilter::Only(session.context(context)?)
            };
            session.dispatch(Action::SetContextFilter(filter.clone()));
            match filter {
                ContextFilter::All => println!("Showing every context."),
                ContextFilter::Only(id) => {
                    println!("Showing {} only.", session.context_label(&id))
                }
            }
        }
    }
    Ok(())
}

#[instrument(skip(session))]
fn cmd_key(session: &mut Session<'_>, chord: &str, typing: bool) -> anyhow::Result<()> {
    info!("command key");

    let chord: KeyChord = chord.parse()?;
    let Some(shortcut) = resolve(&chord, typing) else {
        println!("{chord}: no shortcut.");
        return Ok(());
    };

    println!("{chord}: {shortcut}.");
    if let Some(action) = shortcut.action() {
        session.dispatch(action);
    }
    Ok(())
}

#[instrument(skip(session))]
fn cmd_undo(session: &mut Session<'_>) -> anyhow::Result<()> {
    info!("command undo");

    let Some(entry) = session.datastore.pop_undo_snapshot()? else {
        println!("No undo transactions available.");
        return Ok(());
    };

    let current = session.state();
    // Ids handed out since the snapshot stay retired.
    let mut todos = entry.state.todos;
    todos.next_id = todos.next_id.max(current.todos.next_id);

    session.datastore.save_state(&PersistedState {
        todos: todos.normalized(),
        filter: entry.state.filter,
        pomodoro: current.pomodoro.clone(),
    })?;
    session
        .datastore
        .save_custom_contexts(&entry.custom_contexts)?;

    println!("Undo completed.");
    Ok(())
}
