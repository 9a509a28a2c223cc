use tracing::{debug, info, instrument};

use super::Session;
use crate::cli::TimerCommand;
use crate::countdown::{CountdownEnd, WallClock, run_countdown};
use crate::store::Action;
use crate::store::pomodoro::{Boundary, Phase};

#[instrument(skip(session))]
pub(super) fn cmd_timer(session: &mut Session<'_>, action: Option<TimerCommand>) -> anyhow::Result<()> {
    info!("command timer");

    let action = action.unwrap_or(TimerCommand::Status);
    let before = session.state().pomodoro.phase();

    match action {
        TimerCommand::Status => {}
        TimerCommand::Start { id } => {
            let task = session.task(id)?;
            if let Some(previous) = &session.state().pomodoro.active_task
                && previous.id != id
            {
                println!("Replacing session for task {} '{}'.", previous.id, previous.text);
            }
            session.dispatch(Action::StartPomodoro {
                task_id: task.id,
                task_text: task.text.clone(),
            });
            println!("Focusing on task {} '{}'.", task.id, task.text);
        }
        TimerCommand::Pause => {
            transition(session, Action::PausePomodoro, "Paused.", "Nothing is running.");
        }
        TimerCommand::Resume => {
            transition(session, Action::ResumePomodoro, "Resumed.", "Nothing to resume.");
        }
        TimerCommand::Stop => {
            transition(session, Action::StopPomodoro, "Stopped.", "Already stopped.");
        }
        TimerCommand::Reset => {
            session.dispatch(Action::ResetPomodoro);
            println!("Timer reset.");
        }
        TimerCommand::Break => {
            if before == Phase::BreakReady {
                session.dispatch(Action::StartBreak);
                println!("Break started.");
            } else {
                println!("No break is waiting; finish a focus session first.");
            }
        }
        TimerCommand::Run { ticks } => return run(session, ticks),
    }

    session.renderer.print_pomodoro(&session.state().pomodoro)
}

fn transition(session: &mut Session<'_>, action: Action, changed: &str, unchanged: &str) {
    let before = session.state().pomodoro.clone();
    let after = &session.dispatch(action).pomodoro;
    if *after == before {
        println!("{unchanged}");
    } else {
        println!("{changed}");
    }
}

/// Counts down in the foreground. Every tick is persisted, so an
/// interrupted run resumes from where it stopped.
fn run(session: &mut Session<'_>, ticks: Option<u32>) -> anyhow::Result<()> {
    if !session.state().pomodoro.is_counting() {
        println!("The timer is not running; use `gtdo timer start <id>` or `gtdo timer break`.");
        return session.renderer.print_pomodoro(&session.state().pomodoro);
    }

    let renderer = session.renderer;
    let mut clock = WallClock;
    let end = run_countdown(&mut session.store, &mut clock, ticks, |pomodoro| {
        if let Err(err) = renderer.print_tick(pomodoro) {
            debug!(error = %err, "failed to draw countdown");
        }
    });
    eprintln!();

    match end {
        CountdownEnd::Crossed(Boundary::FocusComplete) => {
            let pomodoro = &session.state().pomodoro;
            println!(
                "Pomodoro {} complete. Take a {} break with `gtdo timer break`.",
                pomodoro.completed_count,
                pomodoro.clock()
            );
        }
        CountdownEnd::Crossed(Boundary::BreakComplete) => println!("Break over."),
        CountdownEnd::Interrupted => {
            println!(
                "Countdown left at {}; `gtdo timer run` picks it up again.",
                session.state().pomodoro.clock()
            );
        }
        CountdownEnd::NotRunning => {}
    }
    session.renderer.print_pomodoro(&session.state().pomodoro)
}
