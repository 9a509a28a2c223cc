use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::task::{ContextId, Task};

/// Ordered task list. The list sits behind an `Arc` so selectors can
/// tell an untouched list from a modified one by pointer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoState {
    #[serde(default)]
    pub todos: Arc<Vec<Task>>,

    #[serde(default = "first_id")]
    pub next_id: u64,
}

fn first_id() -> u64 {
    1
}

impl Default for TodoState {
    fn default() -> Self {
        Self {
            todos: Arc::new(Vec::new()),
            next_id: first_id(),
        }
    }
}

impl TodoState {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            todos: Arc::new(tasks),
            next_id: first_id(),
        }
        .normalized()
    }

    /// Keeps `next_id` ahead of every stored id, whatever a stale or
    /// hand-edited snapshot says.
    pub fn normalized(mut self) -> Self {
        let max_id = self.todos.iter().map(|t| t.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        self
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn add(&mut self, text: &str, context: Option<&ContextId>) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring todo with empty text");
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        let context = context.cloned().unwrap_or_default();
        Arc::make_mut(&mut self.todos).push(Task::new(id, text.to_string(), context));
        debug!(id, "todo added");
        Some(id)
    }

    pub fn toggle(&mut self, id: u64) {
        if self.get(id).is_none() {
            debug!(id, "toggle on unknown todo ignored");
            return;
        }
        if let Some(task) = Arc::make_mut(&mut self.todos).iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
        }
    }

    pub fn remove(&mut self, id: u64) {
        if self.get(id).is_none() {
            debug!(id, "remove on unknown todo ignored");
            return;
        }
        Arc::make_mut(&mut self.todos).retain(|t| t.id != id);
    }

    pub fn update_context(&mut self, id: u64, context: &ContextId) {
        if self.get(id).is_none() {
            debug!(id, "recategorize on unknown todo ignored");
            return;
        }
        if let Some(task) = Arc::make_mut(&mut self.todos).iter_mut().find(|t| t.id == id) {
            task.context = context.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::TodoState;
    use crate::task::ContextId;

    #[test]
    fn add_assigns_increasing_ids_and_defaults_to_inbox() {
        let mut state = TodoState::default();
        let a = state.add("write report", None).expect("added");
        let b = state
            .add("call plumber", Some(&ContextId::from("calls")))
            .expect("added");
        assert!(b > a);
        assert_eq!(state.len(), 2);
        assert_eq!(state.todos[0].context, ContextId::inbox());
        assert_eq!(state.todos[1].context.as_str(), "calls");
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut state = TodoState::default();
        assert_eq!(state.add("", None), None);
        assert_eq!(state.add("   ", None), None);
        assert!(state.is_empty());
        assert_eq!(state.next_id, 1);
    }

    #[test]
    fn text_is_trimmed_and_duplicates_are_distinct() {
        let mut state = TodoState::default();
        state.add("  milk ", None);
        state.add("milk", None);
        assert_eq!(state.todos[0].text, "milk");
        assert_ne!(state.todos[0].id, state.todos[1].id);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut state = TodoState::default();
        let first = state.add("a", None).expect("added");
        state.remove(first);
        let second = state.add("b", None).expect("added");
        assert!(second > first);
    }

    #[test]
    fn toggle_twice_restores_completion() {
        let mut state = TodoState::default();
        let id = state.add("stretch", None).expect("added");
        state.toggle(id);
        assert!(state.get(id).expect("exists").completed);
        state.toggle(id);
        assert!(!state.get(id).expect("exists").completed);
    }

    #[test]
    fn unknown_ids_leave_list_identity_untouched() {
        let mut state = TodoState::default();
        state.add("only", None);
        let before = Arc::clone(&state.todos);

        state.toggle(99);
        state.remove(99);
        state.update_context(99, &ContextId::from("home"));

        assert!(Arc::ptr_eq(&before, &state.todos));
    }

    #[test]
    fn normalized_moves_next_id_past_stored_ids() {
        let mut state = TodoState::default();
        state.add("one", None);
        state.add("two", None);
        let mut stale = state.clone();
        stale.next_id = 1;
        assert_eq!(stale.normalized().next_id, 3);
    }
}
