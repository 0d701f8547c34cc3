//! Where session questions come from.
//!
//! Every source hands back validated `Question`s; loosely shaped input is
//! checked once here and malformed entries never reach a session.

mod builtin;
mod catalog;
mod fallback;
mod generator;

use async_trait::async_trait;
use std::collections::HashSet;

use quiz_core::model::{Question, QuestionDraft, QuestionError, QuestionId, Quiz, QuizId, SessionTag};

use crate::error::SourceError;

pub use builtin::{BUILTIN_QUIZ_TITLE, BuiltinSource, builtin_questions, builtin_quiz};
pub use catalog::CatalogSource;
pub use fallback::FallbackSource;
pub use generator::{GeneratorConfig, GeneratorSource, parse_generated};

/// What the caller wants to play. Passed through to the source untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCriteria {
    pub language: String,
    pub topic: Option<String>,
    pub quiz_id: Option<QuizId>,
}

impl QuizCriteria {
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            topic: None,
            quiz_id: None,
        }
    }

    #[must_use]
    pub fn for_quiz(quiz_id: QuizId) -> Self {
        Self::new("en").with_quiz_id(quiz_id)
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_quiz_id(mut self, quiz_id: QuizId) -> Self {
        self.quiz_id = Some(quiz_id);
        self
    }
}

impl Default for QuizCriteria {
    fn default() -> Self {
        Self::new("en")
    }
}

/// An ordered set of questions ready for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBatch {
    pub tag: SessionTag,
    pub title: String,
    pub questions: Vec<Question>,
    /// Explicit countdown length, if the question set defines one.
    pub time_limit_secs: Option<u32>,
}

impl QuestionBatch {
    #[must_use]
    pub fn from_quiz(quiz: Quiz) -> Self {
        Self {
            tag: SessionTag::for_quiz(quiz.id()),
            title: quiz.title().to_owned(),
            time_limit_secs: quiz.time_limit_secs(),
            questions: quiz.into_questions(),
        }
    }
}

/// Supplies the question batch for a session.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the questions matching `criteria`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the questions cannot be obtained or are unusable.
    async fn fetch_questions(&self, criteria: &QuizCriteria) -> Result<QuestionBatch, SourceError>;
}

/// Validate loosely shaped drafts, keeping the good ones in order.
///
/// Drafts without an id get the lowest id not claimed by any other draft, so
/// an assigned id never shadows an explicit one. Rejected entries, including
/// repeated explicit ids, are returned alongside their position so callers
/// can decide how loud to be.
#[must_use]
pub fn validate_drafts(drafts: Vec<QuestionDraft>) -> (Vec<Question>, Vec<(usize, QuestionError)>) {
    let mut claimed: HashSet<u64> = drafts.iter().filter_map(|d| d.id).collect();
    let mut next_free = 1_u64;
    let mut questions = Vec::with_capacity(drafts.len());
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();

    for (position, draft) in drafts.into_iter().enumerate() {
        let fallback = match draft.id {
            Some(id) => QuestionId::new(id),
            None => {
                while claimed.contains(&next_free) {
                    next_free = next_free.saturating_add(1);
                }
                claimed.insert(next_free);
                QuestionId::new(next_free)
            }
        };
        match draft.validate(fallback) {
            Ok(question) if seen.insert(question.id()) => questions.push(question),
            Ok(question) => rejected.push((position, QuestionError::DuplicateId(question.id()))),
            Err(err) => rejected.push((position, err)),
        }
    }

    (questions, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_drafts_keeps_order_and_reports_rejects() {
        let drafts = vec![
            QuestionDraft::new("Q1", vec!["a".into(), "b".into()], 0),
            QuestionDraft::new("Q2", vec!["a".into()], 0),
            QuestionDraft::new("Q3", vec!["a".into(), "b".into()], 1),
        ];
        let (questions, rejected) = validate_drafts(drafts);

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id(), QuestionId::new(1));
        assert_eq!(questions[1].id(), QuestionId::new(3));
        assert_eq!(rejected, vec![(1, QuestionError::TooFewOptions { len: 1 })]);
    }

    #[test]
    fn repeated_explicit_id_is_rejected() {
        let drafts = vec![
            QuestionDraft::new("Q1", vec!["a".into(), "b".into()], 0).with_id(5),
            QuestionDraft::new("Q2", vec!["a".into(), "b".into()], 0).with_id(5),
        ];
        let (questions, rejected) = validate_drafts(drafts);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].prompt(), "Q1");
        assert_eq!(rejected, vec![(1, QuestionError::DuplicateId(QuestionId::new(5)))]);
    }

    #[test]
    fn assigned_ids_skip_explicit_ones() {
        let drafts = vec![
            QuestionDraft::new("Q1", vec!["a".into(), "b".into()], 0),
            QuestionDraft::new("Q2", vec!["a".into(), "b".into()], 0).with_id(1),
            QuestionDraft::new("Q3", vec!["a".into(), "b".into()], 0),
            QuestionDraft::new("Q4", vec!["a".into(), "b".into()], 0).with_id(3),
        ];
        let (questions, rejected) = validate_drafts(drafts);

        assert!(rejected.is_empty());
        let ids: Vec<u64> = questions.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![2, 1, 4, 3]);
    }

    #[test]
    fn criteria_builder_passes_values_through() {
        let criteria = QuizCriteria::new("hi")
            .with_topic("museums")
            .with_quiz_id(QuizId::new(3));
        assert_eq!(criteria.language, "hi");
        assert_eq!(criteria.topic.as_deref(), Some("museums"));
        assert_eq!(criteria.quiz_id, Some(QuizId::new(3)));
    }
}
