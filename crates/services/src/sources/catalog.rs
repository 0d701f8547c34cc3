use std::sync::Arc;

use async_trait::async_trait;
use rand::rng;
use rand::seq::SliceRandom;

use storage::repository::{QuizRepository, StorageError};

use super::{QuestionBatch, QuestionSource, QuizCriteria};
use crate::error::SourceError;

/// Serves authored quizzes from the catalog repository.
#[derive(Clone)]
pub struct CatalogSource {
    quizzes: Arc<dyn QuizRepository>,
    shuffle: bool,
}

impl CatalogSource {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizRepository>) -> Self {
        Self {
            quizzes,
            shuffle: false,
        }
    }

    /// Present the questions in random order on each fetch.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

#[async_trait]
impl QuestionSource for CatalogSource {
    async fn fetch_questions(&self, criteria: &QuizCriteria) -> Result<QuestionBatch, SourceError> {
        let quiz_id = criteria.quiz_id.ok_or(SourceError::MissingQuizId)?;
        let quiz = self.quizzes.get_quiz(quiz_id).await.map_err(|err| match err {
            StorageError::NotFound => SourceError::NotFound(quiz_id),
            other => SourceError::Storage(other),
        })?;

        let mut batch = QuestionBatch::from_quiz(quiz);
        if self.shuffle {
            batch.questions.shuffle(&mut rng());
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuizId, SessionTag};
    use storage::repository::InMemoryRepository;

    use crate::sources::builtin_quiz;

    #[tokio::test]
    async fn fetches_quiz_by_id() {
        let repo = InMemoryRepository::new();
        let quiz = builtin_quiz(QuizId::new(4)).unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();

        let source = CatalogSource::new(Arc::new(repo));
        let batch = source
            .fetch_questions(&QuizCriteria::for_quiz(QuizId::new(4)))
            .await
            .unwrap();

        assert_eq!(batch.tag, SessionTag::for_quiz(QuizId::new(4)));
        assert_eq!(batch.questions, quiz.questions());
    }

    #[tokio::test]
    async fn shuffled_fetch_keeps_the_same_questions() {
        let repo = InMemoryRepository::new();
        let quiz = builtin_quiz(QuizId::new(1)).unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();

        let source = CatalogSource::new(Arc::new(repo)).with_shuffle(true);
        let batch = source
            .fetch_questions(&QuizCriteria::for_quiz(QuizId::new(1)))
            .await
            .unwrap();

        let mut got: Vec<_> = batch.questions.iter().map(|q| q.id()).collect();
        let mut want: Vec<_> = quiz.questions().iter().map(|q| q.id()).collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn missing_quiz_and_missing_id_are_distinct_errors() {
        let source = CatalogSource::new(Arc::new(InMemoryRepository::new()));

        let err = source
            .fetch_questions(&QuizCriteria::for_quiz(QuizId::new(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(id) if id == QuizId::new(9)));
        assert!(!err.is_retryable());

        let err = source
            .fetch_questions(&QuizCriteria::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingQuizId));
    }
}
