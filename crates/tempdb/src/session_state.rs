use std::fmt;

use serde::Serialize;

/// Lifecycle state of a [`Session`](crate::Session).
///
/// ```text
/// Starting -> Ready | Failed
/// Ready | Failed -> Stopping -> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Server launched, waiting for a readiness or failure sentinel
    Starting,
    /// Server is accepting client connections
    Ready,
    /// Server never became ready
    Failed,
    /// Termination requested, waiting for the process to disappear
    Stopping,
    /// Process confirmed gone
    Stopped,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Starting, Ready)
                | (Starting, Failed)
                | (Ready, Stopping)
                | (Failed, Stopping)
                | (Stopping, Stopped)
        )
    }

    /// No further transition is possible.
    pub fn is_terminal(self) -> bool {
        self == SessionState::Stopped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
