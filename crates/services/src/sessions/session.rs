use chrono::{DateTime, Utc};
use std::fmt;

use log::debug;
use quiz_core::countdown::{Countdown, TickOutcome};
use quiz_core::model::{
    AttemptId, Question, ResultSummary, SessionEnding, SessionTag, TimeBudget,
};
use quiz_core::scoring;

use super::progress::SessionProgress;
use super::state::{Operation, SessionState};
use crate::error::SessionError;

//
// ─── ANSWER FEEDBACK ───────────────────────────────────────────────────────────
//

/// Immediate outcome of selecting an option, for the "right/wrong" highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub selected: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    pub encouragement: Option<String>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a fixed, ordered list of questions.
///
/// Walks the user through the questions one at a time:
/// `NotStarted -> InProgress <-> AwaitingAdvance -> Completed`.
/// Answers are write-once per question, the index only moves forward, and the
/// `ResultSummary` is produced exactly once on entering `Completed`.
///
/// The session holds no timer of its own: whoever drives it calls [`tick`]
/// once per elapsed second (see `CountdownTimer`).
///
/// [`tick`]: QuizSession::tick
pub struct QuizSession {
    attempt_id: AttemptId,
    tag: SessionTag,
    questions: Vec<Question>,
    time_budget: Option<TimeBudget>,
    state: SessionState,
    current: usize,
    answers: Vec<Option<usize>>,
    countdown: Option<Countdown>,
    started_at: Option<DateTime<Utc>>,
    summary: Option<ResultSummary>,
}

impl QuizSession {
    /// Create a session in `NotStarted`.
    ///
    /// A zero-second budget is treated as untimed.
    #[must_use]
    pub fn new(tag: SessionTag, questions: Vec<Question>, time_budget: Option<TimeBudget>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            attempt_id: AttemptId::generate(),
            tag,
            questions,
            time_budget: time_budget.filter(|b| b.secs() > 0),
            state: SessionState::NotStarted,
            current: 0,
            answers,
            countdown: None,
            started_at: None,
            summary: None,
        }
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn tag(&self) -> &SessionTag {
        &self.tag
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn time_budget(&self) -> Option<TimeBudget> {
        self.time_budget
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen. `None` before start and after completion.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.state.is_active() {
            self.questions.get(self.current)
        } else {
            None
        }
    }

    /// Recorded answers, indexed by question position.
    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, index: usize) -> Option<usize> {
        self.answers.get(index).copied().flatten()
    }

    /// Whether the recorded answer at `index` is correct; `None` if unanswered.
    #[must_use]
    pub fn is_answer_correct(&self, index: usize) -> Option<bool> {
        let answer = self.answer_for(index)?;
        self.questions.get(index).map(|q| q.is_correct(answer))
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().flatten().count()
    }

    /// Live score over answers recorded so far.
    #[must_use]
    pub fn score(&self) -> u32 {
        scoring::score(&self.questions, &self.answers)
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        scoring::percentage(self.score(), total)
    }

    /// Seconds left, when the session is timed and has started.
    #[must_use]
    pub fn time_remaining(&self) -> Option<u32> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// The summary produced on completion.
    #[must_use]
    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let position = if self.state.is_active() {
            self.current + 1
        } else if self.is_complete() {
            self.questions.len()
        } else {
            0
        };
        SessionProgress {
            state: self.state,
            total: self.questions.len(),
            answered: self.answered_count(),
            position,
            time_remaining: self.time_remaining(),
        }
    }

    /// Begin play at the first question and arm the countdown.
    ///
    /// An empty question list completes immediately and the summary is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `NotStarted`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Option<ResultSummary>, SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(self.invalid(Operation::Start));
        }

        self.started_at = Some(now);
        self.current = 0;

        if self.questions.is_empty() {
            debug!("session {} started with no questions", self.attempt_id);
            return self.finalize(SessionEnding::Finished, now).map(Some);
        }

        self.countdown = self.time_budget.map(|b| Countdown::new(b.secs()));
        self.state = SessionState::InProgress;
        debug!(
            "session {} started: {} questions, budget {:?}",
            self.attempt_id,
            self.questions.len(),
            self.time_budget.map(TimeBudget::secs)
        );
        Ok(None)
    }

    /// Record the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyAnswered` if the current question already
    /// has an answer, `SessionError::OptionOutOfRange` for an index past the
    /// options, and `SessionError::InvalidTransition` outside of play.
    pub fn select_answer(&mut self, option: usize) -> Result<AnswerFeedback, SessionError> {
        match self.state {
            SessionState::InProgress => {}
            SessionState::AwaitingAdvance => {
                return Err(SessionError::AlreadyAnswered {
                    index: self.current,
                });
            }
            SessionState::NotStarted | SessionState::Completed => {
                return Err(self.invalid(Operation::SelectAnswer));
            }
        }

        let question = &self.questions[self.current];
        let len = question.options().len();
        if option >= len {
            return Err(SessionError::OptionOutOfRange { option, len });
        }

        let is_correct = question.is_correct(option);
        let feedback = AnswerFeedback {
            question_index: self.current,
            selected: option,
            correct_index: question.correct_option_index(),
            is_correct,
            encouragement: if is_correct {
                question.encouragement().map(str::to_owned)
            } else {
                None
            },
        };

        self.answers[self.current] = Some(option);
        self.state = SessionState::AwaitingAdvance;
        debug!(
            "session {} answered question {} with {option} (correct: {is_correct})",
            self.attempt_id, self.current
        );
        Ok(feedback)
    }

    /// Move past an answered question, completing the session after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the current question
    /// has been answered (`AwaitingAdvance`).
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Option<ResultSummary>, SessionError> {
        if self.state != SessionState::AwaitingAdvance {
            return Err(self.invalid(Operation::Advance));
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.state = SessionState::InProgress;
            return Ok(None);
        }

        self.finalize(SessionEnding::Finished, now).map(Some)
    }

    /// Account for one elapsed second.
    ///
    /// Returns the summary when this tick expires the countdown. Ticks outside
    /// of play, on untimed sessions, or after expiry do nothing.
    ///
    /// The budget covers the whole quiz, so the countdown also runs while an
    /// answered question waits in `AwaitingAdvance`, not only in `InProgress`.
    /// Moving on is user-paced and would otherwise stop the clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the summary cannot be built.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<ResultSummary>, SessionError> {
        if !self.state.is_active() {
            return Ok(None);
        }
        let Some(countdown) = self.countdown.as_mut() else {
            return Ok(None);
        };

        match countdown.tick() {
            TickOutcome::Expired => {
                debug!(
                    "session {} timed out after {} answers",
                    self.attempt_id,
                    self.answered_count()
                );
                self.finalize(SessionEnding::TimedOut, now).map(Some)
            }
            TickOutcome::Running(_) | TickOutcome::Inert => Ok(None),
        }
    }

    /// Reset a completed session for another attempt on the same questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `Completed`.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Completed {
            return Err(self.invalid(Operation::Restart));
        }
        self.reset();
        Ok(())
    }

    /// Reset a completed session with a newly supplied question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `Completed`.
    pub fn restart_with(
        &mut self,
        tag: SessionTag,
        questions: Vec<Question>,
        time_budget: Option<TimeBudget>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Completed {
            return Err(self.invalid(Operation::Restart));
        }
        self.tag = tag;
        self.questions = questions;
        self.time_budget = time_budget.filter(|b| b.secs() > 0);
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.attempt_id = AttemptId::generate();
        self.state = SessionState::NotStarted;
        self.current = 0;
        self.answers = vec![None; self.questions.len()];
        self.countdown = None;
        self.started_at = None;
        self.summary = None;
    }

    fn finalize(
        &mut self,
        ending: SessionEnding,
        now: DateTime<Utc>,
    ) -> Result<ResultSummary, SessionError> {
        let started_at = self.started_at.unwrap_or(now);
        // Wall clocks can step backwards; never let that invert the range.
        let completed_at = now.max(started_at);
        let summary = ResultSummary::from_answers(
            self.attempt_id,
            self.tag.clone(),
            &self.questions,
            &self.answers,
            ending,
            started_at,
            completed_at,
        )?;

        self.state = SessionState::Completed;
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    fn invalid(&self, operation: Operation) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("attempt_id", &self.attempt_id)
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.answered_count())
            .field("time_remaining", &self.time_remaining())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
