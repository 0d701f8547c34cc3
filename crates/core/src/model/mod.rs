mod ids;
mod question;
mod quiz;
mod result;

pub use ids::{AttemptId, ParseIdError, QuestionId, QuizId, SessionTag};
pub use question::{MIN_OPTIONS, Question, QuestionDraft, QuestionError};
pub use quiz::{DEFAULT_SECONDS_PER_QUESTION, Quiz, QuizDifficulty, QuizError, TimeBudget};
pub use result::{ResultSummary, ResultSummaryError, SessionEnding};
