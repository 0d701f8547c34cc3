use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};
use crate::model::question::Question;

/// Seconds granted per question when a quiz has no explicit limit.
pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 20;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("duplicate question id {0} in quiz")]
    DuplicateQuestionId(QuestionId),

    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl QuizDifficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizDifficulty::Easy => "easy",
            QuizDifficulty::Medium => "medium",
            QuizDifficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for QuizDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizDifficulty {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" | "" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(QuizError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── TIME BUDGET ───────────────────────────────────────────────────────────────
//

/// Whole-quiz countdown length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget(u32);

impl TimeBudget {
    #[must_use]
    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Explicit limit if the question set carries one, otherwise
    /// `seconds_per_question` for each question.
    #[must_use]
    pub fn resolve(explicit: Option<u32>, seconds_per_question: u32, question_count: usize) -> Self {
        match explicit {
            Some(secs) => Self(secs),
            None => {
                let count = u32::try_from(question_count).unwrap_or(u32::MAX);
                Self(seconds_per_question.saturating_mul(count))
            }
        }
    }

    #[must_use]
    pub fn secs(self) -> u32 {
        self.0
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A stored question set as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    difficulty: QuizDifficulty,
    time_limit_secs: Option<u32>,
    questions: Vec<Question>,
}

impl Quiz {
    /// Build a catalog quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` for a blank title,
    /// `QuizError::InvalidTimeLimit` for a zero limit, and
    /// `QuizError::DuplicateQuestionId` if two questions share an id.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        difficulty: QuizDifficulty,
        time_limit_secs: Option<u32>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if time_limit_secs == Some(0) {
            return Err(QuizError::InvalidTimeLimit);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestionId(question.id()));
            }
        }

        Ok(Self {
            id,
            title,
            difficulty,
            time_limit_secs,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn difficulty(&self) -> QuizDifficulty {
        self.difficulty
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }

    #[must_use]
    pub fn time_budget(&self) -> TimeBudget {
        TimeBudget::resolve(
            self.time_limit_secs,
            DEFAULT_SECONDS_PER_QUESTION,
            self.questions.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::QuestionDraft;

    fn question(id: u64) -> Question {
        QuestionDraft::new(format!("Q{id}"), vec!["a".into(), "b".into()], 0)
            .validate(QuestionId::new(id))
            .unwrap()
    }

    #[test]
    fn budget_defaults_to_twenty_seconds_per_question() {
        let quiz = Quiz::new(
            QuizId::new(1),
            "Civic sense",
            QuizDifficulty::Easy,
            None,
            vec![question(1), question(2), question(3)],
        )
        .unwrap();
        assert_eq!(quiz.time_budget().secs(), 60);
    }

    #[test]
    fn explicit_limit_overrides_per_question_budget() {
        let quiz = Quiz::new(
            QuizId::new(1),
            "Civic sense",
            QuizDifficulty::Medium,
            Some(45),
            vec![question(1)],
        )
        .unwrap();
        assert_eq!(quiz.time_budget().secs(), 45);
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let err = Quiz::new(
            QuizId::new(1),
            "Dupes",
            QuizDifficulty::Hard,
            None,
            vec![question(1), question(1)],
        )
        .unwrap_err();
        assert_eq!(err, QuizError::DuplicateQuestionId(QuestionId::new(1)));
    }

    #[test]
    fn rejects_blank_title_and_zero_limit() {
        assert_eq!(
            Quiz::new(QuizId::new(1), "  ", QuizDifficulty::Easy, None, vec![]).unwrap_err(),
            QuizError::EmptyTitle
        );
        assert_eq!(
            Quiz::new(QuizId::new(1), "T", QuizDifficulty::Easy, Some(0), vec![]).unwrap_err(),
            QuizError::InvalidTimeLimit
        );
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<QuizDifficulty>().unwrap(), QuizDifficulty::Hard);
        assert_eq!("".parse::<QuizDifficulty>().unwrap(), QuizDifficulty::Medium);
        assert!("brutal".parse::<QuizDifficulty>().is_err());
    }
}
