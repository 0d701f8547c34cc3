use super::state::SessionState;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub state: SessionState,
    pub total: usize,
    pub answered: usize,
    /// 1-based position of the question on screen; 0 before start or for an empty quiz.
    pub position: usize,
    pub time_remaining: Option<u32>,
}

impl SessionProgress {
    /// "3/5"-style label, matching the quiz header.
    #[must_use]
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.position, self.total)
    }
}
