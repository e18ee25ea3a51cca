//! Remote operation snapshots
//!
//! The bridge never changes remote state; it only observes the latest
//! snapshot returned by the service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A snapshot of one remote task, as returned by the minimal view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    /// Missing when the service has not reported a state yet
    #[serde(default)]
    pub state: Option<OperationState>,
}

impl Operation {
    pub fn new(id: impl Into<String>, state: OperationState) -> Self {
        Self {
            id: id.into(),
            state: Some(state),
        }
    }

    /// Whether polling should stop on this snapshot
    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(|s| s.is_terminal())
    }
}

/// Remote task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Queued,
    Initializing,
    Running,
    Complete,
    Canceled,
    Error,
    SystemError,
    /// Any state string this client does not know about
    #[serde(other)]
    Unknown,
}

impl OperationState {
    /// Terminal states, matched by value
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Complete
                | OperationState::Canceled
                | OperationState::Error
                | OperationState::SystemError
        )
    }

    /// Terminal states other than `COMPLETE`
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != OperationState::Complete
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::Queued => "QUEUED",
            OperationState::Initializing => "INITIALIZING",
            OperationState::Running => "RUNNING",
            OperationState::Complete => "COMPLETE",
            OperationState::Canceled => "CANCELED",
            OperationState::Error => "ERROR",
            OperationState::SystemError => "SYSTEM_ERROR",
            OperationState::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}
