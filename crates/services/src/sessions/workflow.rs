use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use quiz_core::Clock;
use quiz_core::model::{DEFAULT_SECONDS_PER_QUESTION, ResultSummary, TimeBudget};

use super::session::{AnswerFeedback, QuizSession};
use super::timer::CountdownTimer;
use crate::error::{QuizLoopError, SessionError};
use crate::sinks::{ResultReceipt, ResultSink};
use crate::sources::{QuestionBatch, QuestionSource, QuizCriteria};

/// Knobs applied to every session started by a `QuizLoopService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    /// Used when the question set carries no explicit time limit.
    pub seconds_per_question: u32,
    pub timed: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            seconds_per_question: DEFAULT_SECONDS_PER_QUESTION,
            timed: true,
        }
    }
}

impl QuizSettings {
    fn budget_for(self, batch: &QuestionBatch) -> Option<TimeBudget> {
        self.timed.then(|| {
            TimeBudget::resolve(
                batch.time_limit_secs,
                self.seconds_per_question,
                batch.questions.len(),
            )
        })
    }
}

/// Outcome of handing the summary to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    /// Session still running, nothing submitted.
    #[default]
    Idle,
    Submitted(ResultReceipt),
    /// The sink failed. The result on screen is final anyway.
    Failed(String),
}

/// What a countdown tick did to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    Remaining(u32),
    TimedOut(ResultSummary),
}

/// Orchestrates fetch, session start and result submission.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    sink: Arc<dyn ResultSink>,
    settings: QuizSettings,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn QuestionSource>, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            clock,
            source,
            sink,
            settings: QuizSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    /// Fetch questions and start a session.
    ///
    /// An empty batch completes immediately and its summary is submitted.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::Source` when the questions cannot be fetched;
    /// no session exists in that case.
    pub async fn begin(&self, criteria: &QuizCriteria) -> Result<QuizRun, QuizLoopError> {
        let batch = self.source.fetch_questions(criteria).await?;
        info!(
            "starting {} ({} questions)",
            batch.tag,
            batch.questions.len()
        );
        let budget = self.settings.budget_for(&batch);
        let session = QuizSession::new(batch.tag, batch.questions, budget);

        let mut run = QuizRun {
            session,
            title: batch.title,
            timer: None,
            sink: Arc::clone(&self.sink),
            clock: self.clock,
            submission: SubmissionStatus::Idle,
        };
        run.start().await?;
        Ok(run)
    }

    /// Restart a completed run with a freshly fetched question set.
    ///
    /// # Errors
    ///
    /// Returns `QuizLoopError::Source` when the fetch fails, leaving the run
    /// untouched, or `QuizLoopError::Session` if the run is not completed.
    pub async fn refresh(
        &self,
        run: &mut QuizRun,
        criteria: &QuizCriteria,
    ) -> Result<(), QuizLoopError> {
        if !run.session.is_complete() {
            return Err(SessionError::InvalidTransition {
                operation: super::Operation::Restart,
                state: run.session.state(),
            }
            .into());
        }
        let batch = self.source.fetch_questions(criteria).await?;
        let budget = self.settings.budget_for(&batch);
        run.session.restart_with(batch.tag, batch.questions, budget)?;
        run.title = batch.title;
        run.submission = SubmissionStatus::Idle;
        run.start().await?;
        Ok(())
    }
}

/// A live session bound to its countdown timer and result sink.
///
/// The timer is owned here and stopped on every path out of play:
/// completion, timeout, [`abandon`](QuizRun::abandon) or drop.
pub struct QuizRun {
    session: QuizSession,
    title: String,
    timer: Option<CountdownTimer>,
    sink: Arc<dyn ResultSink>,
    clock: Clock,
    submission: SubmissionStatus,
}

impl QuizRun {
    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionStatus {
        &self.submission
    }

    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(CountdownTimer::is_running)
    }

    /// Record an answer for the current question.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::select_answer`].
    pub fn select_answer(&mut self, option: usize) -> Result<AnswerFeedback, SessionError> {
        self.session.select_answer(option)
    }

    /// Move on from an answered question; submits the summary after the last one.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::advance`].
    pub async fn advance(&mut self) -> Result<Option<ResultSummary>, SessionError> {
        let summary = self.session.advance(self.clock.now())?;
        if let Some(summary) = &summary {
            self.complete(summary).await;
        }
        Ok(summary)
    }

    /// Wait for the next countdown tick and apply it.
    ///
    /// Returns `None` right away when the run has no running timer. If the
    /// future is dropped while the timed-out summary is being submitted,
    /// call [`ensure_submitted`](QuizRun::ensure_submitted) afterwards.
    pub async fn next_tick(&mut self) -> Option<TickEvent> {
        self.timer.as_mut()?.tick().await?;
        self.clock.advance_secs(1);

        match self.session.tick(self.clock.now()) {
            Ok(Some(summary)) => {
                self.complete(&summary).await;
                Some(TickEvent::TimedOut(summary))
            }
            Ok(None) => self.session.time_remaining().map(TickEvent::Remaining),
            Err(err) => {
                warn!("countdown tick failed for {}: {err}", self.session.attempt_id());
                self.stop_timer();
                None
            }
        }
    }

    /// Submit the summary of a completed run if that has not happened yet.
    pub async fn ensure_submitted(&mut self) {
        if let Some(summary) = self.session.summary().cloned() {
            self.complete(&summary).await;
        }
    }

    /// Replay the same questions after completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the run is completed.
    pub async fn restart(&mut self) -> Result<(), SessionError> {
        self.session.restart()?;
        self.submission = SubmissionStatus::Idle;
        self.start().await
    }

    /// Tear the run down without submitting anything.
    pub fn abandon(mut self) {
        if self.session.state().is_active() {
            debug!(
                "abandoning session {} after {} answers",
                self.session.attempt_id(),
                self.session.answered_count()
            );
        }
        self.stop_timer();
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        if let Some(summary) = self.session.start(self.clock.now())? {
            self.complete(&summary).await;
            return Ok(());
        }
        if self.session.time_budget().is_some() {
            self.timer = Some(CountdownTimer::every_second());
        }
        Ok(())
    }

    async fn complete(&mut self, summary: &ResultSummary) {
        self.stop_timer();
        if self.submission != SubmissionStatus::Idle {
            return;
        }
        info!(
            "session {} finished: {}/{} ({})",
            summary.attempt_id(),
            summary.score(),
            summary.total(),
            summary.ending()
        );
        self.submission = match self.sink.submit_result(summary).await {
            Ok(receipt) => SubmissionStatus::Submitted(receipt),
            Err(err) => {
                warn!("failed to submit result {}: {err}", summary.attempt_id());
                SubmissionStatus::Failed(err.to_string())
            }
        };
    }

    fn stop_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
    }
}

impl fmt::Debug for QuizRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizRun")
            .field("title", &self.title)
            .field("session", &self.session)
            .field("has_timer", &self.has_timer())
            .field("submission", &self.submission)
            .finish_non_exhaustive()
    }
}
