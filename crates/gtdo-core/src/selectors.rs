use std::sync::Arc;

use serde::Serialize;

use crate::store::AppState;
use crate::store::filter::FilterState;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

/// Status first, then context; relative order is preserved.
pub fn visible_todos(todos: &[Task], filter: &FilterState) -> Vec<Task> {
    todos
        .iter()
        .filter(|t| filter.status.matches(t))
        .filter(|t| filter.context.matches(t))
        .cloned()
        .collect()
}

pub fn todo_stats(todos: &[Task]) -> TodoStats {
    let completed = todos.iter().filter(|t| t.completed).count();
    TodoStats {
        total: todos.len(),
        completed,
        active: todos.len() - completed,
    }
}

/// Memoized [`visible_todos`]: recomputes only when the task list
/// allocation or the filter differs from the previous call.
#[derive(Debug, Default)]
pub struct VisibleTodos {
    cached: Option<(Arc<Vec<Task>>, FilterState, Arc<Vec<Task>>)>,
    recomputations: usize,
}

impl VisibleTodos {
    pub fn select(&mut self, state: &AppState) -> Arc<Vec<Task>> {
        if let Some((todos, filter, visible)) = &self.cached
            && Arc::ptr_eq(todos, &state.todos.todos)
            && filter == &state.filter
        {
            return Arc::clone(visible);
        }

        self.recomputations += 1;
        let visible = Arc::new(visible_todos(&state.todos.todos, &state.filter));
        self.cached = Some((
            Arc::clone(&state.todos.todos),
            state.filter.clone(),
            Arc::clone(&visible),
        ));
        visible
    }

    pub fn recomputations(&self) -> usize {
        self.recomputations
    }
}
