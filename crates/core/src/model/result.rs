use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{AttemptId, SessionTag};
use crate::model::question::Question;
use crate::scoring;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },

    #[error("answers length ({answers}) does not match total ({total})")]
    AnswerLengthMismatch { answers: usize, total: u32 },

    #[error("answered count ({answered}) does not match recorded answers ({recorded})")]
    AnsweredCountMismatch { answered: u32, recorded: u32 },

    #[error("score ({score}) exceeds answered count ({answered})")]
    ScoreExceedsAnswered { score: u32, answered: u32 },

    #[error("unknown session ending: {0}")]
    UnknownEnding(String),
}

/// How a session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnding {
    /// Every question was answered and the user advanced past the last one.
    Finished,
    /// The countdown hit zero first.
    TimedOut,
}

impl SessionEnding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionEnding::Finished => "finished",
            SessionEnding::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SessionEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionEnding {
    type Err = ResultSummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finished" => Ok(Self::Finished),
            "timed_out" => Ok(Self::TimedOut),
            other => Err(ResultSummaryError::UnknownEnding(other.to_owned())),
        }
    }
}

/// Outcome of one finished session, handed to the result sink once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    attempt_id: AttemptId,
    session_tag: SessionTag,
    score: u32,
    total: u32,
    answered_count: u32,
    answers: Vec<Option<usize>>,
    ending: SessionEnding,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl ResultSummary {
    /// Score a finished session.
    ///
    /// `answers[i]` is the option picked for `questions[i]`, `None` if the
    /// question was never reached or answered.
    ///
    /// # Errors
    ///
    /// Returns `ResultSummaryError` if the slices disagree in length, the
    /// question count does not fit in `u32`, or the time range is inverted.
    #[allow(clippy::too_many_arguments)]
    pub fn from_answers(
        attempt_id: AttemptId,
        session_tag: SessionTag,
        questions: &[Question],
        answers: &[Option<usize>],
        ending: SessionEnding,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultSummaryError> {
        let total = u32::try_from(questions.len()).map_err(|_| {
            ResultSummaryError::TooManyQuestions {
                len: questions.len(),
            }
        })?;
        let answered_count = u32::try_from(answers.iter().flatten().count()).map_err(|_| {
            ResultSummaryError::TooManyQuestions {
                len: answers.len(),
            }
        })?;
        let score = scoring::score(questions, answers);

        Self::from_persisted(
            attempt_id,
            session_tag,
            score,
            total,
            answered_count,
            answers.to_vec(),
            ending,
            started_at,
            completed_at,
        )
    }

    /// Rehydrate a summary from storage, re-checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `ResultSummaryError` when counts are inconsistent or the time
    /// range is inverted.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        attempt_id: AttemptId,
        session_tag: SessionTag,
        score: u32,
        total: u32,
        answered_count: u32,
        answers: Vec<Option<usize>>,
        ending: SessionEnding,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultSummaryError> {
        if completed_at < started_at {
            return Err(ResultSummaryError::InvalidTimeRange);
        }
        if u32::try_from(answers.len()).ok() != Some(total) {
            return Err(ResultSummaryError::AnswerLengthMismatch {
                answers: answers.len(),
                total,
            });
        }
        let recorded = u32::try_from(answers.iter().flatten().count()).unwrap_or(u32::MAX);
        if recorded != answered_count {
            return Err(ResultSummaryError::AnsweredCountMismatch {
                answered: answered_count,
                recorded,
            });
        }
        if score > answered_count {
            return Err(ResultSummaryError::ScoreExceedsAnswered {
                score,
                answered: answered_count,
            });
        }

        Ok(Self {
            attempt_id,
            session_tag,
            score,
            total,
            answered_count,
            answers,
            ending,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn session_tag(&self) -> &SessionTag {
        &self.session_tag
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn answered_count(&self) -> u32 {
        self.answered_count
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn ending(&self) -> SessionEnding {
        self.ending
    }

    /// Alias for `completed_at`; the moment the summary was produced.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        scoring::percentage(self.score, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::model::question::QuestionDraft;
    use crate::time::fixed_now;

    fn questions() -> Vec<Question> {
        vec![
            QuestionDraft::new("Q1", vec!["A".into(), "B".into()], 1)
                .validate(QuestionId::new(1))
                .unwrap(),
            QuestionDraft::new("Q2", vec!["X".into(), "Y".into()], 0)
                .validate(QuestionId::new(2))
                .unwrap(),
            QuestionDraft::new("Q3", vec!["X".into(), "Y".into()], 0)
                .validate(QuestionId::new(3))
                .unwrap(),
        ]
    }

    #[test]
    fn summary_counts_answers_and_score() {
        let now = fixed_now();
        let summary = ResultSummary::from_answers(
            AttemptId::generate(),
            SessionTag::new("quiz:1"),
            &questions(),
            &[Some(1), Some(1), None],
            SessionEnding::TimedOut,
            now,
            now,
        )
        .unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.answered_count(), 2);
        assert_eq!(summary.score(), 1);
        assert_eq!(summary.percentage(), 33);
        assert_eq!(summary.ending(), SessionEnding::TimedOut);
    }

    #[test]
    fn persisted_summary_rejects_inconsistent_counts() {
        let now = fixed_now();
        let tag = SessionTag::new("quiz:1");
        let err = ResultSummary::from_persisted(
            AttemptId::generate(),
            tag.clone(),
            2,
            2,
            1,
            vec![Some(0), None],
            SessionEnding::Finished,
            now,
            now,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResultSummaryError::ScoreExceedsAnswered {
                score: 2,
                answered: 1
            }
        );

        let err = ResultSummary::from_persisted(
            AttemptId::generate(),
            tag,
            0,
            3,
            0,
            vec![None],
            SessionEnding::Finished,
            now,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, ResultSummaryError::AnswerLengthMismatch { .. }));
    }

    #[test]
    fn rejects_inverted_time_range() {
        let now = fixed_now();
        let err = ResultSummary::from_answers(
            AttemptId::generate(),
            SessionTag::new("t"),
            &[],
            &[],
            SessionEnding::Finished,
            now,
            now - chrono::Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, ResultSummaryError::InvalidTimeRange);
    }

    #[test]
    fn ending_round_trips_through_str() {
        for ending in [SessionEnding::Finished, SessionEnding::TimedOut] {
            assert_eq!(ending.as_str().parse::<SessionEnding>().unwrap(), ending);
        }
    }
}
