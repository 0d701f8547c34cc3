use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{AttemptId, ResultSummary, SessionEnding, SessionTag};
use storage::repository::{QuizResultRepository, ResultRow};

use crate::error::HistoryError;

/// Number of past results shown on the dashboard.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Storage identifier for a persisted result (`SQLite` row id).
pub type ResultId = i64;

/// Presentation-agnostic list item for a past result.
///
/// No pre-formatted strings; the front-end formats timestamps and
/// percentages as it likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultListItem {
    pub id: ResultId,
    pub attempt_id: AttemptId,
    pub session_tag: SessionTag,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub total: u32,
    pub answered: u32,
    pub percentage: u8,
    pub ending: SessionEnding,
}

impl ResultListItem {
    #[must_use]
    pub fn from_summary(id: ResultId, summary: &ResultSummary) -> Self {
        Self {
            id,
            attempt_id: summary.attempt_id(),
            session_tag: summary.session_tag().clone(),
            completed_at: summary.completed_at(),
            score: summary.score(),
            total: summary.total(),
            answered: summary.answered_count(),
            percentage: summary.percentage(),
            ending: summary.ending(),
        }
    }

    #[must_use]
    pub fn from_row(row: &ResultRow) -> Self {
        Self::from_summary(row.id, &row.summary)
    }
}

/// One point of the score chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendPoint {
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub percentage: u8,
}

/// Read side of the results log: recent attempts and the score trend.
#[derive(Clone)]
pub struct QuizHistoryService {
    results: Arc<dyn QuizResultRepository>,
    limit: u32,
}

impl QuizHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn QuizResultRepository>) -> Self {
        Self {
            results,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Most recent results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        tag: Option<&SessionTag>,
    ) -> Result<Vec<ResultListItem>, HistoryError> {
        let rows = self.results.list_recent_results(tag, self.limit).await?;
        Ok(rows.iter().map(ResultListItem::from_row).collect())
    }

    /// Scores of the recent results, oldest first for charting.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn score_trend(
        &self,
        tag: Option<&SessionTag>,
    ) -> Result<Vec<TrendPoint>, HistoryError> {
        let rows = self.results.list_recent_results(tag, self.limit).await?;
        Ok(rows
            .iter()
            .rev()
            .map(|row| TrendPoint {
                completed_at: row.summary.completed_at(),
                score: row.summary.score(),
                percentage: row.summary.percentage(),
            })
            .collect())
    }

    /// Fetch one stored result.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage`, including `NotFound` for unknown ids.
    pub async fn get(&self, id: ResultId) -> Result<ResultSummary, HistoryError> {
        Ok(self.results.get_result(id).await?)
    }
}
