use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::plan::UserPlan;
use crate::task::ContextId;

/// Reserved by the context filter to mean "every context".
pub const ALL_CONTEXTS: &str = "all";

pub const DEFAULT_CUSTOM_ICON: &str = "🏷️";
pub const DEFAULT_CUSTOM_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextInfo<'a> {
    pub id: &'a str,
    pub label: &'a str,
    pub icon: &'a str,
    pub color: &'a str,
    pub description: &'a str,
    pub builtin: bool,
}

const fn builtin(
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    color: &'static str,
    description: &'static str,
) -> ContextInfo<'static> {
    ContextInfo {
        id,
        label,
        icon,
        color,
        description,
        builtin: true,
    }
}

pub const BUILTIN_CONTEXTS: [ContextInfo<'static>; 8] = [
    builtin("inbox", "Inbox", "📥", "#6B7280", "Unprocessed items to be organized"),
    builtin("calls", "@Calls", "📞", "#10B981", "Phone calls to make"),
    builtin("computer", "@Computer", "💻", "#3B82F6", "Tasks requiring a computer"),
    builtin("errands", "@Errands", "🚗", "#F59E0B", "Tasks to do while out"),
    builtin("home", "@Home", "🏠", "#8B5CF6", "Tasks to do at home"),
    builtin("office", "@Office", "🏢", "#EF4444", "Tasks to do at the office"),
    builtin("waiting-for", "@Waiting For", "⏳", "#F97316", "Waiting for someone else"),
    builtin("someday-maybe", "Someday/Maybe", "💭", "#6366F1", "Future possibilities"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomContext {
    pub id: ContextId,
    pub label: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub description: String,
}

impl CustomContext {
    pub fn info(&self) -> ContextInfo<'_> {
        ContextInfo {
            id: self.id.as_str(),
            label: &self.label,
            icon: &self.icon,
            color: &self.color,
            description: &self.description,
            builtin: false,
        }
    }
}

pub fn is_builtin(id: &str) -> bool {
    BUILTIN_CONTEXTS.iter().any(|ctx| ctx.id == id)
}

/// Built-ins win over customs; anything unresolvable is the inbox.
pub fn get_context_info<'a>(id: &str, custom: &'a [CustomContext]) -> ContextInfo<'a> {
    if let Some(found) = BUILTIN_CONTEXTS.iter().find(|ctx| ctx.id == id) {
        return *found;
    }

    if let Some(found) = custom.iter().find(|ctx| ctx.id.as_str() == id) {
        return found.info();
    }

    debug!(context = id, "unknown context, falling back to inbox");
    BUILTIN_CONTEXTS[0]
}

pub fn all_contexts(custom: &[CustomContext]) -> Vec<ContextInfo<'_>> {
    BUILTIN_CONTEXTS
        .iter()
        .copied()
        .chain(custom.iter().map(CustomContext::info))
        .collect()
}

/// The catalog as offered for selection: custom entries only show up on
/// plans that unlock them.
pub fn visible_contexts(custom: &[CustomContext], plan: UserPlan) -> Vec<ContextInfo<'_>> {
    if plan.allows_custom_contexts() {
        all_contexts(custom)
    } else {
        BUILTIN_CONTEXTS.to_vec()
    }
}

pub fn generate_context_id(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_hyphen = false;

    for ch in label.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Why a custom context id cannot be used, if it cannot.
pub fn id_conflict(id: &str, existing: &[CustomContext]) -> Option<&'static str> {
    if id.is_empty() {
        Some("label must contain at least one letter or digit")
    } else if id == ALL_CONTEXTS {
        Some("`all` is reserved for the context filter")
    } else if is_builtin(id) {
        Some("a built-in context already uses this id")
    } else if existing.iter().any(|ctx| ctx.id.as_str() == id) {
        Some("a custom context already uses this id")
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextDraft {
    pub label: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl ContextDraft {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn build(self, existing: &[CustomContext]) -> anyhow::Result<CustomContext> {
        let label = self.label.trim().to_string();
        if label.is_empty() {
            return Err(anyhow!("context label cannot be empty"));
        }

        let id = generate_context_id(&label);
        if let Some(reason) = id_conflict(&id, existing) {
            return Err(anyhow!("cannot create context `{label}` (id `{id}`): {reason}"));
        }

        let color = self
            .color
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| DEFAULT_CUSTOM_COLOR.to_string());
        if !is_hex_color(&color) {
            return Err(anyhow!("invalid color {color:?}; expected #RGB or #RRGGBB"));
        }

        let icon = self
            .icon
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_CUSTOM_ICON.to_string());

        Ok(CustomContext {
            id: ContextId::new(id),
            label,
            icon,
            color,
            description: self.description.unwrap_or_default().trim().to_string(),
        })
    }
}

pub fn is_hex_color(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(id: &str, label: &str) -> CustomContext {
        CustomContext {
            id: ContextId::from(id),
            label: label.to_string(),
            icon: "🧪".to_string(),
            color: "#123456".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn slug_collapses_runs_and_trims_hyphens() {
        assert_eq!(generate_context_id("  Deep Work!! (AM) "), "deep-work-am");
        assert_eq!(generate_context_id("@Garage"), "garage");
        assert_eq!(generate_context_id("Q3 -- Planning"), "q3-planning");
        assert_eq!(generate_context_id("!!!"), "");
    }

    #[test]
    fn unknown_context_resolves_to_inbox() {
        let info = get_context_info("no-such-context", &[]);
        assert_eq!(info.id, "inbox");
        assert_eq!(info.label, "Inbox");
    }

    #[test]
    fn builtins_shadow_customs_with_same_id() {
        let customs = vec![custom("calls", "My Calls")];
        assert_eq!(get_context_info("calls", &customs).label, "@Calls");
    }

    #[test]
    fn custom_contexts_follow_builtins_in_creation_order() {
        let customs = vec![custom("garage", "Garage"), custom("gym", "Gym")];
        let ids: Vec<&str> = all_contexts(&customs).iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], "inbox");
        assert_eq!(&ids[8..], &["garage", "gym"]);
    }

    #[test]
    fn free_plan_hides_custom_contexts_from_catalog() {
        let customs = vec![custom("garage", "Garage")];
        assert_eq!(visible_contexts(&customs, UserPlan::Free).len(), 8);
        assert_eq!(visible_contexts(&customs, UserPlan::Pro).len(), 9);
        assert_eq!(get_context_info("garage", &customs).label, "Garage");
    }

    #[test]
    fn draft_rejects_collisions_and_bad_colors() {
        let existing = vec![custom("garage", "Garage")];
        assert!(ContextDraft::new("Garage").build(&existing).is_err());
        assert!(ContextDraft::new("@Home").build(&existing).is_err());
        assert!(ContextDraft::new("All").build(&existing).is_err());
        assert!(ContextDraft::new("   ").build(&existing).is_err());

        let mut bad_color = ContextDraft::new("Studio");
        bad_color.color = Some("blue".to_string());
        assert!(bad_color.build(&existing).is_err());
    }

    #[test]
    fn draft_fills_defaults() {
        let built = ContextDraft::new("  Reading List ")
            .build(&[])
            .expect("valid draft");
        assert_eq!(built.id.as_str(), "reading-list");
        assert_eq!(built.label, "Reading List");
        assert_eq!(built.icon, DEFAULT_CUSTOM_ICON);
        assert_eq!(built.color, DEFAULT_CUSTOM_COLOR);
        assert!(built.description.is_empty());
    }
}
