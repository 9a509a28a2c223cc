use anyhow::anyhow;
use tracing::{debug, info, instrument};

use super::Session;
use crate::selectors::{todo_stats, visible_todos};
use crate::store::Action;
use crate::store::filter::{ContextFilter, FilterState, StatusFilter};

#[instrument(skip(session, words))]
pub(super) fn cmd_add(
    session: &mut Session<'_>,
    words: &[String],
    context: Option<&str>,
) -> anyhow::Result<()> {
    info!("command add");

    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(anyhow!("task text cannot be empty"));
    }
    let context = context.map(|raw| session.context(raw)).transpose()?;

    let id = session.state().todos.next_id;
    let state = session.dispatch(Action::AddTodo {
        text,
        context: context.clone(),
    });
    debug!(count = state.todos.len(), "task added");

    let context = context.unwrap_or_default();
    println!("Created task {id} in {}.", session.context_label(&context));
    Ok(())
}

/// Lists through the saved filter; `--status` / `--context` narrow this
/// one listing without saving.
#[instrument(skip(session))]
pub(super) fn cmd_list(
    session: &Session<'_>,
    status: Option<StatusFilter>,
    context: Option<&str>,
) -> anyhow::Result<()> {
    info!("command list");

    let state = session.state();
    let mut filter: FilterState = state.filter.clone();
    if let Some(status) = status {
        filter.status = status;
    }
    if let Some(context) = context {
        filter.context = ContextFilter::from(context.trim().to_string());
    }

    let visible = visible_todos(&state.todos.todos, &filter);
    session
        .renderer
        .print_todo_table(&visible, &state.custom_contexts.contexts, &filter)?;

    let stats = todo_stats(&state.todos.todos);
    println!(
        "{} shown, {} active, {} completed.",
        visible.len(),
        stats.active,
        stats.completed
    );
    Ok(())
}

#[instrument(skip(session))]
pub(super) fn cmd_toggle(session: &mut Session<'_>, id: u64) -> anyhow::Result<()> {
    info!("command toggle");

    session.task(id)?;
    let state = session.dispatch(Action::ToggleTodo(id));
    let completed = state.todos.get(id).is_some_and(|t| t.completed);
    if completed {
        println!("Completed task {id}.");
    } else {
        println!("Reopened task {id}.");
    }
    Ok(())
}

#[instrument(skip(session))]
pub(super) fn cmd_remove(session: &mut Session<'_>, id: u64) -> anyhow::Result<()> {
    info!("command rm");

    let task = session.task(id)?;
    session.dispatch(Action::RemoveTodo(id));
    println!("Deleted task {id} '{}'.", task.text);
    Ok(())
}

#[instrument(skip(session))]
pub(super) fn cmd_move(session: &mut Session<'_>, id: u64, context: &str) -> anyhow::Result<()> {
    info!("command move");

    session.task(id)?;
    let context = session.context(context)?;
    session.dispatch(Action::UpdateTodoContext {
        id,
        context: context.clone(),
    });
    println!("Moved task {id} to {}.", session.context_label(&context));
    Ok(())
}

#[instrument(skip(session))]
pub(super) fn cmd_stats(session: &Session<'_>) -> anyhow::Result<()> {
    info!("command stats");
    session
        .renderer
        .print_stats(todo_stats(&session.state().todos.todos))
}
