use async_trait::async_trait;
use quiz_core::model::{Quiz, QuizId, ResultSummary, SessionTag};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored result together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub summary: ResultSummary,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: i64, summary: ResultSummary) -> Self {
        Self { id, summary }
    }
}

/// Catalog of authored quizzes.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// List quizzes ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError>;
}

/// Append-only log of finished sessions.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Store a finished session and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, summary: &ResultSummary) -> Result<i64, StorageError>;

    /// Fetch a stored result by row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<ResultSummary, StorageError>;

    /// Most recent results first, optionally restricted to one question set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_recent_results(
        &self,
        tag: Option<&SessionTag>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    results: Arc<Mutex<Vec<ResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        let mut quizzes: Vec<Quiz> = guard.values().cloned().collect();
        quizzes.sort_by_key(Quiz::id);
        quizzes.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(quizzes)
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, summary: &ResultSummary) -> Result<i64, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        if guard
            .iter()
            .any(|row| row.summary.attempt_id() == summary.attempt_id())
        {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        guard.push(ResultRow::new(id, summary.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<ResultSummary, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.summary.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_recent_results(
        &self,
        tag: Option<&SessionTag>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<ResultRow> = guard
            .iter()
            .filter(|row| tag.is_none_or(|t| row.summary.session_tag() == t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Bundles the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Self { quizzes, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{
        AttemptId, QuestionDraft, QuestionId, QuizDifficulty, SessionEnding,
    };
    use quiz_core::time::fixed_now;

    fn build_quiz(id: u64) -> Quiz {
        let question = QuestionDraft::new("Q", vec!["A".into(), "B".into()], 1)
            .validate(QuestionId::new(1))
            .unwrap();
        Quiz::new(
            QuizId::new(id),
            format!("Quiz {id}"),
            QuizDifficulty::Easy,
            None,
            vec![question],
        )
        .unwrap()
    }

    fn build_result(tag: &str, offset_secs: i64) -> ResultSummary {
        let at = fixed_now() + Duration::seconds(offset_secs);
        ResultSummary::from_persisted(
            AttemptId::generate(),
            SessionTag::new(tag),
            1,
            1,
            1,
            vec![Some(1)],
            SessionEnding::Finished,
            at,
            at,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn quizzes_round_trip_and_list_in_id_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_quiz(&build_quiz(2)).await.unwrap();
        repo.upsert_quiz(&build_quiz(1)).await.unwrap();

        let fetched = repo.get_quiz(QuizId::new(2)).await.unwrap();
        assert_eq!(fetched.title(), "Quiz 2");

        let listed = repo.list_quizzes(10).await.unwrap();
        let ids: Vec<_> = listed.iter().map(Quiz::id).collect();
        assert_eq!(ids, vec![QuizId::new(1), QuizId::new(2)]);

        assert!(matches!(
            repo.get_quiz(QuizId::new(9)).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn recent_results_are_newest_first_and_filtered() {
        let repo = InMemoryRepository::new();
        let first = repo.append_result(&build_result("quiz:1", 0)).await.unwrap();
        repo.append_result(&build_result("quiz:2", 10)).await.unwrap();
        let third = repo.append_result(&build_result("quiz:1", 20)).await.unwrap();

        let all = repo.list_recent_results(None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, third);

        let tag = SessionTag::new("quiz:1");
        let filtered = repo.list_recent_results(Some(&tag), 1).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, third);

        let fetched = repo.get_result(first).await.unwrap();
        assert_eq!(fetched.session_tag().as_str(), "quiz:1");
    }
}
