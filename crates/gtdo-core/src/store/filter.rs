use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::contexts::ALL_CONTEXTS;
use crate::task::{ContextId, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum StatusFilter {
    #[default]
    #[serde(rename = "SHOW_ALL")]
    All,
    #[serde(rename = "SHOW_ACTIVE")]
    Active,
    #[serde(rename = "SHOW_COMPLETED")]
    Completed,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextFilter {
    #[default]
    All,
    Only(ContextId),
}

impl ContextFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            ContextFilter::All => true,
            ContextFilter::Only(id) => &task.context == id,
        }
    }
}

impl From<String> for ContextFilter {
    fn from(value: String) -> Self {
        if value == ALL_CONTEXTS {
            ContextFilter::All
        } else {
            ContextFilter::Only(ContextId::new(value))
        }
    }
}

impl From<ContextFilter> for String {
    fn from(value: ContextFilter) -> Self {
        match value {
            ContextFilter::All => ALL_CONTEXTS.to_string(),
            ContextFilter::Only(id) => id.as_str().to_string(),
        }
    }
}

impl fmt::Display for ContextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextFilter::All => f.write_str(ALL_CONTEXTS),
            ContextFilter::Only(id) => write!(f, "{id}"),
        }
    }
}

/// Current view filters. Setters overwrite unconditionally; an unknown
/// context id simply yields an empty view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(rename = "currentFilter", default)]
    pub status: StatusFilter,

    #[serde(rename = "selectedContext", default)]
    pub context: ContextFilter,
}

impl FilterState {
    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
    }

    pub fn set_context(&mut self, context: ContextFilter) {
        self.context = context;
    }
}
