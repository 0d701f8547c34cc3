use std::fmt;

/// Lifecycle of a `QuizSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Questions are loaded but play has not begun.
    NotStarted,
    /// Waiting for an answer to the current question.
    InProgress,
    /// Current question answered; waiting for the user to move on.
    AwaitingAdvance,
    /// Terminal until `restart`. The summary has been produced.
    Completed,
}

impl SessionState {
    /// Play is underway and the countdown (if any) is running.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::InProgress | SessionState::AwaitingAdvance)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::NotStarted => "not started",
            SessionState::InProgress => "in progress",
            SessionState::AwaitingAdvance => "awaiting advance",
            SessionState::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Caller-facing operations, used to describe rejected transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    SelectAnswer,
    Advance,
    Restart,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::Start => "start",
            Operation::SelectAnswer => "select an answer",
            Operation::Advance => "advance",
            Operation::Restart => "restart",
        };
        f.write_str(label)
    }
}
