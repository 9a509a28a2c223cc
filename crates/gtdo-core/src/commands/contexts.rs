use anyhow::anyhow;
use tracing::{info, instrument};

use super::Session;
use crate::cli::{ContextFields, ContextsCommand, PlanCommand};
use crate::contexts::{ContextDraft, is_builtin, is_hex_color, visible_contexts};
use crate::store::Action;
use crate::store::plan::UserPlan;

#[instrument(skip(session))]
pub(super) fn cmd_contexts(
    session: &mut Session<'_>,
    action: Option<ContextsCommand>,
) -> anyhow::Result<()> {
    info!("command contexts");

    match action.unwrap_or(ContextsCommand::List) {
        ContextsCommand::List => list(session),
        ContextsCommand::Add { label, fields } => add(session, &label.join(" "), fields),
        ContextsCommand::Rm { id } => remove(session, &id),
        ContextsCommand::Edit { id, label, fields } => edit(session, &id, label, fields),
    }
}

fn list(session: &Session<'_>) -> anyhow::Result<()> {
    let state = session.state();
    let custom = &state.custom_contexts.contexts;
    let shown = visible_contexts(custom, state.plan);
    session.renderer.print_contexts(&shown, &state.filter)?;

    if !state.plan.allows_custom_contexts() && !custom.is_empty() {
        println!(
            "{} custom context(s) hidden on the {}.",
            custom.len(),
            state.plan
        );
    }
    Ok(())
}

fn require_pro(session: &Session<'_>) -> anyhow::Result<()> {
    if session.state().plan.allows_custom_contexts() {
        Ok(())
    } else {
        Err(anyhow!(
            "custom contexts need the {}; run `gtdo plan upgrade`",
            UserPlan::Pro
        ))
    }
}

fn add(session: &mut Session<'_>, label: &str, fields: ContextFields) -> anyhow::Result<()> {
    require_pro(session)?;

    let draft = ContextDraft {
        label: label.to_string(),
        icon: fields.icon,
        color: fields.color,
        description: fields.description,
    };
    let context = draft.build(&session.state().custom_contexts.contexts)?;
    session.dispatch(Action::AddCustomContext(context.clone()));
    println!(
        "Created context {} {} ({}).",
        context.icon, context.label, context.id
    );
    Ok(())
}

fn remove(session: &mut Session<'_>, id: &str) -> anyhow::Result<()> {
    if is_builtin(id) {
        return Err(anyhow!("`{id}` is a built-in context and cannot be removed"));
    }
    let Some(existing) = session.state().custom_contexts.get(id).cloned() else {
        return Err(anyhow!("no custom context with id `{id}`"));
    };

    session.dispatch(Action::RemoveCustomContext(existing.id.clone()));
    let orphaned = session
        .state()
        .todos
        .todos
        .iter()
        .filter(|t| t.context == existing.id)
        .count();
    println!("Removed context {}.", existing.label);
    if orphaned > 0 {
        println!("{orphaned} task(s) filed there now show under Inbox.");
    }
    Ok(())
}

fn edit(
    session: &mut Session<'_>,
    id: &str,
    label: Option<String>,
    fields: ContextFields,
) -> anyhow::Result<()> {
    require_pro(session)?;
    let Some(mut context) = session.state().custom_contexts.get(id).cloned() else {
        return Err(anyhow!("no custom context with id `{id}`"));
    };

    if let Some(label) = label {
        let label = label.trim();
        if label.is_empty() {
            return Err(anyhow!("context label cannot be empty"));
        }
        context.label = label.to_string();
    }
    if let Some(icon) = fields.icon.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()) {
        context.icon = icon;
    }
    if let Some(color) = fields.color {
        let color = color.trim();
        if !is_hex_color(color) {
            return Err(anyhow!("invalid color {color:?}; expected #RGB or #RRGGBB"));
        }
        context.color = color.to_string();
    }
    if let Some(description) = fields.description {
        context.description = description.trim().to_string();
    }

    session.dispatch(Action::UpdateCustomContext(context.clone()));
    println!("Updated context {} ({}).", context.label, context.id);
    Ok(())
}

#[instrument(skip(session))]
pub(super) fn cmd_plan(session: &mut Session<'_>, action: Option<PlanCommand>) -> anyhow::Result<()> {
    info!("command plan");

    let target = match action.unwrap_or(PlanCommand::Show) {
        PlanCommand::Show => return session.renderer.print_plan(session.state().plan),
        PlanCommand::Upgrade => UserPlan::Pro,
        PlanCommand::Downgrade => UserPlan::Free,
    };

    if session.state().plan == target {
        println!("Already on the {target}.");
        return Ok(());
    }
    session.dispatch(Action::SetPlan(target));
    println!("Switched to the {target}.");
    session.renderer.print_plan(target)
}
