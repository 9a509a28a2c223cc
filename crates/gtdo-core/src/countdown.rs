use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::store::pomodoro::{Boundary, PomodoroState};
use crate::store::{Action, Store};

pub const TICK: Duration = Duration::from_secs(1);

/// Source of time for the countdown.
pub trait Scheduler {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Scheduler for WallClock {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Advances instantly, recording how much time was requested.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualClock {
    pub elapsed: Duration,
}

impl Scheduler for ManualClock {
    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalChange {
    Installed,
    Cancelled,
    Unchanged,
}

/// Tracks the repeating one-second interval. It is installed exactly
/// while the session is active and unpaused, never twice.
#[derive(Debug, Default)]
pub struct Countdown {
    installed: bool,
}

impl Countdown {
    pub fn reconcile(&mut self, pomodoro: &PomodoroState) -> IntervalChange {
        match (self.installed, pomodoro.is_counting()) {
            (false, true) => {
                self.installed = true;
                debug!("countdown interval installed");
                IntervalChange::Installed
            }
            (true, false) => {
                self.installed = false;
                debug!("countdown interval cancelled");
                IntervalChange::Cancelled
            }
            _ => IntervalChange::Unchanged,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    /// A focus or break period ran out and was completed.
    Crossed(Boundary),
    /// The session was not counting (idle or paused).
    NotRunning,
    /// `max_ticks` elapsed first.
    Interrupted,
}

/// Drives the pomodoro clock: sleeps one tick, dispatches `Tick`, then
/// completes the period if it ran out. Stops when the interval is
/// cancelled or after `max_ticks`.
pub fn run_countdown<S, F>(
    store: &mut Store,
    scheduler: &mut S,
    max_ticks: Option<u32>,
    mut on_tick: F,
) -> CountdownEnd
where
    S: Scheduler + ?Sized,
    F: FnMut(&PomodoroState),
{
    let mut countdown = Countdown::default();
    if countdown.reconcile(&store.state().pomodoro) != IntervalChange::Installed {
        return CountdownEnd::NotRunning;
    }

    let mut ticks = 0u32;
    while countdown.is_installed() {
        if max_ticks.is_some_and(|max| ticks >= max) {
            info!(ticks, "countdown interrupted");
            return CountdownEnd::Interrupted;
        }

        scheduler.sleep(TICK);
        store.dispatch(Action::Tick);
        ticks += 1;

        let crossed = store.state().pomodoro.boundary();
        if let Some(boundary) = crossed {
            info!(?boundary, "period finished");
            store.dispatch(Action::from(boundary));
        }
        on_tick(&store.state().pomodoro);
        countdown.reconcile(&store.state().pomodoro);

        if let Some(boundary) = crossed {
            return CountdownEnd::Crossed(boundary);
        }
    }

    CountdownEnd::NotRunning
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AppState;
    use crate::store::pomodoro::{FOCUS_SECONDS, Phase, SHORT_BREAK_SECONDS};

    fn running_store() -> Store {
        let mut store = Store::new(AppState::default());
        store.dispatch(Action::StartPomodoro {
            task_id: 42,
            task_text: "write spec".to_string(),
        });
        store
    }

    #[test]
    fn reconcile_installs_once_and_cancels_on_pause() {
        let mut countdown = Countdown::default();
        let mut state = PomodoroState::default();
        assert_eq!(countdown.reconcile(&state), IntervalChange::Unchanged);

        state.start(1, "a");
        assert_eq!(countdown.reconcile(&state), IntervalChange::Installed);
        assert_eq!(countdown.reconcile(&state), IntervalChange::Unchanged);

        state.pause();
        assert_eq!(countdown.reconcile(&state), IntervalChange::Cancelled);
        assert!(!countdown.is_installed());
    }

    #[test]
    fn full_focus_period_completes_into_break() {
        let mut store = running_store();
        let mut clock = ManualClock::default();
        let mut observed = 0;

        let end = run_countdown(&mut store, &mut clock, None, |_| observed += 1);

        assert_eq!(end, CountdownEnd::Crossed(Boundary::FocusComplete));
        assert_eq!(observed, FOCUS_SECONDS);
        assert_eq!(clock.elapsed, Duration::from_secs(u64::from(FOCUS_SECONDS)));
        let pomodoro = &store.state().pomodoro;
        assert_eq!(pomodoro.phase(), Phase::BreakReady);
        assert_eq!(pomodoro.completed_count, 1);
        assert_eq!(pomodoro.total_time, SHORT_BREAK_SECONDS);
    }

    #[test]
    fn break_period_completes_and_unbinds() {
        let mut store = running_store();
        let mut clock = ManualClock::default();
        run_countdown(&mut store, &mut clock, None, |_| {});
        store.dispatch(Action::StartBreak);

        let end = run_countdown(&mut store, &mut clock, None, |_| {});
        assert_eq!(end, CountdownEnd::Crossed(Boundary::BreakComplete));
        assert_eq!(store.state().pomodoro.phase(), Phase::Idle);
        assert!(store.state().pomodoro.active_task.is_none());
    }

    #[test]
    fn paused_session_does_not_run() {
        let mut store = running_store();
        store.dispatch(Action::PausePomodoro);
        let mut clock = ManualClock::default();
        assert_eq!(
            run_countdown(&mut store, &mut clock, None, |_| {}),
            CountdownEnd::NotRunning
        );
        assert_eq!(clock.elapsed, Duration::ZERO);
        assert_eq!(store.state().pomodoro.time_remaining, FOCUS_SECONDS);
    }

    #[test]
    fn tick_limit_interrupts() {
        let mut store = running_store();
        let mut clock = ManualClock::default();
        let end = run_countdown(&mut store, &mut clock, Some(90), |_| {});
        assert_eq!(end, CountdownEnd::Interrupted);
        assert_eq!(store.state().pomodoro.time_remaining, FOCUS_SECONDS - 90);
        assert!(store.state().pomodoro.is_counting());
    }
}
