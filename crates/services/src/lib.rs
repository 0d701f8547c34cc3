#![forbid(unsafe_code)]

pub mod error;
pub mod history;
pub mod sessions;
pub mod sinks;
pub mod sources;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{HistoryError, QuizLoopError, SessionError, SinkError, SourceError};
pub use history::{DEFAULT_HISTORY_LIMIT, QuizHistoryService, ResultId, ResultListItem, TrendPoint};
pub use sinks::{NullSink, RepositorySink, ResultReceipt, ResultSink};
pub use sources::{
    BuiltinSource, CatalogSource, FallbackSource, GeneratorConfig, GeneratorSource,
    QuestionBatch, QuestionSource, QuizCriteria,
};

pub use sessions::{
    AnswerFeedback, CountdownTimer, Operation, QuizLoopService, QuizRun, QuizSession,
    QuizSettings, SessionProgress, SessionState, SubmissionStatus, TickEvent,
};
