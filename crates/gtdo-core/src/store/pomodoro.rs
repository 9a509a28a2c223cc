use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const FOCUS_SECONDS: u32 = 25 * 60;
pub const SHORT_BREAK_SECONDS: u32 = 5 * 60;
pub const LONG_BREAK_SECONDS: u32 = 15 * 60;
pub const LONG_BREAK_EVERY: u32 = 4;

/// Snapshot of the task a focus session is bound to. The task may be
/// deleted meanwhile; the snapshot keeps the session readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FocusRunning,
    FocusPaused,
    /// Focus finished, break armed but not started.
    BreakReady,
    BreakRunning,
    BreakPaused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    FocusComplete,
    BreakComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroState {
    pub is_active: bool,
    pub is_paused: bool,
    pub time_remaining: u32,
    pub total_time: u32,
    #[serde(default)]
    pub active_task: Option<ActiveTask>,
    pub is_break: bool,
    #[serde(default)]
    pub completed_count: u32,
}

impl Default for PomodoroState {
    fn default() -> Self {
        Self {
            is_active: false,
            is_paused: false,
            time_remaining: FOCUS_SECONDS,
            total_time: FOCUS_SECONDS,
            active_task: None,
            is_break: false,
            completed_count: 0,
        }
    }
}

impl PomodoroState {
    pub fn phase(&self) -> Phase {
        match (self.is_break, self.is_active, self.is_paused) {
            (false, false, _) => Phase::Idle,
            (false, true, false) => Phase::FocusRunning,
            (false, true, true) => Phase::FocusPaused,
            (true, false, _) => Phase::BreakReady,
            (true, true, false) => Phase::BreakRunning,
            (true, true, true) => Phase::BreakPaused,
        }
    }

    /// Repairs a hand-edited or stale snapshot: the clock never exceeds
    /// its period and only an active session can be paused.
    pub fn normalized(mut self) -> Self {
        self.time_remaining = self.time_remaining.min(self.total_time);
        if !self.is_active {
            self.is_paused = false;
        }
        self
    }

    /// Whether the one-second countdown should be running.
    pub fn is_counting(&self) -> bool {
        self.is_active && !self.is_paused
    }

    /// Rebinding while a session runs silently replaces the old binding.
    pub fn start(&mut self, task_id: u64, task_text: &str) {
        if let Some(previous) = &self.active_task {
            debug!(previous = previous.id, next = task_id, "rebinding pomodoro");
        }
        self.is_active = true;
        self.is_paused = false;
        self.active_task = Some(ActiveTask {
            id: task_id,
            text: task_text.to_string(),
        });
        self.time_remaining = FOCUS_SECONDS;
        self.total_time = FOCUS_SECONDS;
        self.is_break = false;
    }

    pub fn pause(&mut self) {
        if !self.is_active {
            debug!("pause ignored: no running session");
            return;
        }
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        if !self.is_active {
            debug!("resume ignored: no running session");
            return;
        }
        self.is_paused = false;
    }

    pub fn tick(&mut self) {
        if self.is_counting() && self.time_remaining > 0 {
            self.time_remaining -= 1;
        }
    }

    /// What completion, if any, the current state calls for. The store
    /// never completes on its own; the driver checks this after each tick.
    pub fn boundary(&self) -> Option<Boundary> {
        if !self.is_active || self.time_remaining > 0 {
            return None;
        }
        Some(if self.is_break {
            Boundary::BreakComplete
        } else {
            Boundary::FocusComplete
        })
    }

    pub fn complete_pomodoro(&mut self) {
        self.completed_count += 1;
        self.is_active = false;
        self.is_paused = false;

        let break_time = if self.completed_count % LONG_BREAK_EVERY == 0 {
            LONG_BREAK_SECONDS
        } else {
            SHORT_BREAK_SECONDS
        };
        self.time_remaining = break_time;
        self.total_time = break_time;
        self.is_break = true;
        info!(
            completed = self.completed_count,
            break_seconds = break_time,
            "pomodoro completed"
        );
    }

    pub fn start_break(&mut self) {
        if !self.is_break {
            debug!("start_break ignored: no break armed");
            return;
        }
        self.is_active = true;
        self.is_paused = false;
    }

    pub fn complete_break(&mut self) {
        self.is_active = false;
        self.is_paused = false;
        self.is_break = false;
        self.time_remaining = FOCUS_SECONDS;
        self.total_time = FOCUS_SECONDS;
        self.active_task = None;
    }

    /// Back to idle with a fresh focus duration; the completed count is kept.
    pub fn stop(&mut self) {
        let completed_count = self.completed_count;
        *self = Self {
            completed_count,
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn clock(&self) -> String {
        format_clock(self.time_remaining)
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total_time == 0 {
            return 100.0;
        }
        f64::from(self.total_time - self.time_remaining.min(self.total_time)) * 100.0
            / f64::from(self.total_time)
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
