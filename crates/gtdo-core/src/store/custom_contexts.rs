use tracing::{debug, warn};

use crate::contexts::{CustomContext, id_conflict};
use crate::task::ContextId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomContextState {
    pub contexts: Vec<CustomContext>,
}

impl CustomContextState {
    /// Appends. Ids that collide with a built-in, an existing custom
    /// context or the `all` filter keyword are refused.
    pub fn add(&mut self, context: &CustomContext) {
        if let Some(reason) = id_conflict(context.id.as_str(), &self.contexts) {
            warn!(id = %context.id, reason, "custom context not added");
            return;
        }
        self.contexts.push(context.clone());
    }

    pub fn remove(&mut self, id: &ContextId) {
        let before = self.contexts.len();
        self.contexts.retain(|ctx| &ctx.id != id);
        if self.contexts.len() == before {
            debug!(%id, "remove on unknown custom context ignored");
        }
    }

    pub fn update(&mut self, context: &CustomContext) {
        match self.contexts.iter_mut().find(|ctx| ctx.id == context.id) {
            Some(slot) => *slot = context.clone(),
            None => debug!(id = %context.id, "update on unknown custom context ignored"),
        }
    }

    /// Full replace, used to hydrate from storage.
    pub fn load(&mut self, contexts: &[CustomContext]) {
        self.contexts = contexts.to_vec();
    }

    pub fn get(&self, id: &str) -> Option<&CustomContext> {
        self.contexts.iter().find(|ctx| ctx.id.as_str() == id)
    }
}
