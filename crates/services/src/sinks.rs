//! Where finished sessions go.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use quiz_core::model::ResultSummary;
use storage::repository::QuizResultRepository;

use crate::error::SinkError;

/// Acknowledgement from a sink. `id` is the storage row id when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultReceipt {
    pub id: Option<i64>,
}

/// Accepts the summary of a finished session.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Submit a finished session.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` when the summary could not be recorded.
    async fn submit_result(&self, summary: &ResultSummary) -> Result<ResultReceipt, SinkError>;
}

/// Appends results to a `QuizResultRepository`.
#[derive(Clone)]
pub struct RepositorySink {
    results: Arc<dyn QuizResultRepository>,
}

impl RepositorySink {
    #[must_use]
    pub fn new(results: Arc<dyn QuizResultRepository>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl ResultSink for RepositorySink {
    async fn submit_result(&self, summary: &ResultSummary) -> Result<ResultReceipt, SinkError> {
        let id = self.results.append_result(summary).await?;
        debug!("stored result {} as row {id}", summary.attempt_id());
        Ok(ResultReceipt { id: Some(id) })
    }
}

/// Accepts and drops everything, for untracked play.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn submit_result(&self, _summary: &ResultSummary) -> Result<ResultReceipt, SinkError> {
        Ok(ResultReceipt::default())
    }
}
