use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPlan {
    #[default]
    Free,
    Pro,
}

impl UserPlan {
    pub fn allows_custom_contexts(self) -> bool {
        self == UserPlan::Pro
    }

    pub fn name(self) -> &'static str {
        match self {
            UserPlan::Free => "Free Plan",
            UserPlan::Pro => "Pro Plan",
        }
    }

    pub fn features(self) -> &'static [&'static str] {
        match self {
            UserPlan::Free => &[
                "Basic todo management",
                "Pomodoro timer",
                "8 built-in GTD contexts",
                "Keyboard shortcuts",
            ],
            UserPlan::Pro => &[
                "Everything in Free",
                "Custom GTD contexts",
                "Advanced context management",
                "Context color customization",
            ],
        }
    }
}

impl fmt::Display for UserPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
