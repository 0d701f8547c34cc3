use std::sync::Arc;

use async_trait::async_trait;
use log::warn;

use super::{QuestionBatch, QuestionSource, QuizCriteria};
use crate::error::SourceError;

/// Tries `primary` first and serves `fallback` when it fails.
///
/// Used to fall back to the built-in set when the generator is down, so a
/// player always gets a quiz instead of an empty session.
#[derive(Clone)]
pub struct FallbackSource {
    primary: Arc<dyn QuestionSource>,
    fallback: Arc<dyn QuestionSource>,
}

impl FallbackSource {
    #[must_use]
    pub fn new(primary: Arc<dyn QuestionSource>, fallback: Arc<dyn QuestionSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl QuestionSource for FallbackSource {
    async fn fetch_questions(&self, criteria: &QuizCriteria) -> Result<QuestionBatch, SourceError> {
        match self.primary.fetch_questions(criteria).await {
            Ok(batch) => Ok(batch),
            Err(err) => {
                warn!("primary question source failed, using fallback: {err}");
                self.fallback.fetch_questions(criteria).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::BuiltinSource;

    struct Failing;

    #[async_trait]
    impl QuestionSource for Failing {
        async fn fetch_questions(&self, _: &QuizCriteria) -> Result<QuestionBatch, SourceError> {
            Err(SourceError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let source = FallbackSource::new(Arc::new(Failing), Arc::new(BuiltinSource));
        let batch = source.fetch_questions(&QuizCriteria::default()).await.unwrap();
        assert_eq!(batch.questions.len(), 5);
    }

    #[tokio::test]
    async fn surfaces_error_when_both_fail() {
        let source = FallbackSource::new(Arc::new(Failing), Arc::new(Failing));
        let err = source
            .fetch_questions(&QuizCriteria::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
