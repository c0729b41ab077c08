use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    Registered,
    Resolved,
    Active,
    Deactivated,
    Broken,
    Destroyed,
}

impl ConsumerState {
    pub fn can_transition_to(self, next: ConsumerState) -> bool {
        use ConsumerState::*;
        match (self, next) {
            (Destroyed, _) => false,
            (_, Destroyed) | (_, Broken) => true,
            (Registered, Resolved) | (Resolved, Active) => true,
            (Active, Deactivated) | (Deactivated, Active) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConsumerState::Destroyed
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsumerState::Registered => "registered",
            ConsumerState::Resolved => "resolved",
            ConsumerState::Active => "active",
            ConsumerState::Deactivated => "deactivated",
            ConsumerState::Broken => "broken",
            ConsumerState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}
