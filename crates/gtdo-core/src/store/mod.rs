pub mod custom_contexts;
pub mod filter;
pub mod image;
pub mod plan;
pub mod pomodoro;
pub mod todos;

use tracing::{debug, trace};

use crate::contexts::CustomContext;
use crate::extract::ExtractionResult;
use crate::task::ContextId;
use custom_contexts::CustomContextState;
use filter::{ContextFilter, FilterState, StatusFilter};
use image::ImageProcessingState;
use plan::UserPlan;
use pomodoro::{Boundary, PomodoroState};
use todos::TodoState;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddTodo {
        text: String,
        context: Option<ContextId>,
    },
    ToggleTodo(u64),
    RemoveTodo(u64),
    UpdateTodoContext {
        id: u64,
        context: ContextId,
    },

    SetStatusFilter(StatusFilter),
    SetContextFilter(ContextFilter),

    AddCustomContext(CustomContext),
    RemoveCustomContext(ContextId),
    UpdateCustomContext(CustomContext),
    LoadCustomContexts(Vec<CustomContext>),

    StartPomodoro {
        task_id: u64,
        task_text: String,
    },
    PausePomodoro,
    ResumePomodoro,
    Tick,
    CompletePomodoro,
    StartBreak,
    CompleteBreak,
    StopPomodoro,
    ResetPomodoro,

    ImageServiceInitializing,
    ImageServiceReady,
    ImageServiceFailed(String),
    ExtractionStarted,
    ExtractionProgress {
        request: u64,
        percent: u8,
    },
    ExtractionFinished {
        request: u64,
        result: ExtractionResult,
    },
    ExtractionFailed {
        request: u64,
        error: String,
    },
    ToggleCandidate(String),
    SelectAllCandidates,
    DeselectAllCandidates,
    EditCandidate {
        original: String,
        text: String,
    },
    SetCandidateContext {
        text: String,
        context: ContextId,
    },
    ClearImageError,
    ClearImageResults,
    /// Files every selected candidate as a task, then drops the review.
    ImportSelectedCandidates,

    SetPlan(UserPlan),
}

impl Action {
    /// Actions a user would expect `undo` to revert. Clock ticks and
    /// extraction bookkeeping are not among them.
    pub fn is_undoable(&self) -> bool {
        matches!(
            self,
            Action::AddTodo { .. }
                | Action::ToggleTodo(_)
                | Action::RemoveTodo(_)
                | Action::UpdateTodoContext { .. }
                | Action::SetStatusFilter(_)
                | Action::SetContextFilter(_)
                | Action::AddCustomContext(_)
                | Action::RemoveCustomContext(_)
                | Action::UpdateCustomContext(_)
                | Action::ImportSelectedCandidates
        )
    }

    pub fn touches_image(&self) -> bool {
        matches!(
            self,
            Action::ImageServiceInitializing
                | Action::ImageServiceReady
                | Action::ImageServiceFailed(_)
                | Action::ExtractionStarted
                | Action::ExtractionProgress { .. }
                | Action::ExtractionFinished { .. }
                | Action::ExtractionFailed { .. }
                | Action::ToggleCandidate(_)
                | Action::SelectAllCandidates
                | Action::DeselectAllCandidates
                | Action::EditCandidate { .. }
                | Action::SetCandidateContext { .. }
                | Action::ClearImageError
                | Action::ClearImageResults
                | Action::ImportSelectedCandidates
        )
    }
}

impl From<Boundary> for Action {
    fn from(boundary: Boundary) -> Self {
        match boundary {
            Boundary::FocusComplete => Action::CompletePomodoro,
            Boundary::BreakComplete => Action::CompleteBreak,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub todos: TodoState,
    pub filter: FilterState,
    pub custom_contexts: CustomContextState,
    pub pomodoro: PomodoroState,
    pub image: ImageProcessingState,
    pub plan: UserPlan,
}

impl AppState {
    /// Pure transition: the next state after `action`.
    pub fn reduce(mut self, action: &Action) -> Self {
        match action {
            Action::AddTodo { text, context } => {
                self.todos.add(text, context.as_ref());
            }
            Action::ToggleTodo(id) => self.todos.toggle(*id),
            Action::RemoveTodo(id) => self.todos.remove(*id),
            Action::UpdateTodoContext { id, context } => self.todos.update_context(*id, context),

            Action::SetStatusFilter(status) => self.filter.set_status(*status),
            Action::SetContextFilter(context) => self.filter.set_context(context.clone()),

            Action::AddCustomContext(ctx) => self.custom_contexts.add(ctx),
            Action::RemoveCustomContext(id) => self.custom_contexts.remove(id),
            Action::UpdateCustomContext(ctx) => self.custom_contexts.update(ctx),
            Action::LoadCustomContexts(list) => self.custom_contexts.load(list),

            Action::StartPomodoro { task_id, task_text } => {
                self.pomodoro.start(*task_id, task_text)
            }
            Action::PausePomodoro => self.pomodoro.pause(),
            Action::ResumePomodoro => self.pomodoro.resume(),
            Action::Tick => self.pomodoro.tick(),
            Action::CompletePomodoro => self.pomodoro.complete_pomodoro(),
            Action::StartBreak => self.pomodoro.start_break(),
            Action::CompleteBreak => self.pomodoro.complete_break(),
            Action::StopPomodoro => self.pomodoro.stop(),
            Action::ResetPomodoro => self.pomodoro.reset(),

            Action::ImageServiceInitializing => self.image.initializing(),
            Action::ImageServiceReady => self.image.initialized(),
            Action::ImageServiceFailed(error) => self.image.initialization_failed(error),
            Action::ExtractionStarted => {
                self.image.begin();
            }
            Action::ExtractionProgress { request, percent } => {
                self.image.report_progress(*request, *percent)
            }
            Action::ExtractionFinished { request, result } => self.image.fulfill(*request, result),
            Action::ExtractionFailed { request, error } => self.image.reject(*request, error),
            Action::ToggleCandidate(text) => self.image.toggle(text),
            Action::SelectAllCandidates => self.image.select_all(),
            Action::DeselectAllCandidates => self.image.deselect_all(),
            Action::EditCandidate { original, text } => self.image.edit(original, text),
            Action::SetCandidateContext { text, context } => self.image.set_context(text, context),
            Action::ClearImageError => self.image.clear_error(),
            Action::ClearImageResults => self.image.clear_results(),
            Action::ImportSelectedCandidates => {
                for (text, context) in self.image.selected_for_import() {
                    self.todos.add(&text, Some(&context));
                }
                self.image.clear_results();
                self.image.clear_error();
            }

            Action::SetPlan(plan) => self.plan = *plan,
        }
        self
    }
}

/// Notified after every dispatched action, with the state that action
/// produced.
pub trait Subscriber {
    fn state_changed(&mut self, previous: &AppState, state: &AppState, action: &Action);
}

/// Single owner of the application state; every mutation goes through
/// [`Store::dispatch`].
pub struct Store {
    state: AppState,
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn dispatch(&mut self, action: Action) -> &AppState {
        trace!(?action, "dispatch");
        let previous = std::mem::take(&mut self.state);
        self.state = previous.clone().reduce(&action);

        if self.state == previous {
            debug!(?action, "action left state unchanged");
        }
        for subscriber in &mut self.subscribers {
            subscriber.state_changed(&previous, &self.state, &action);
        }
        &self.state
    }

    pub fn into_state(self) -> AppState {
        self.state
    }
}
