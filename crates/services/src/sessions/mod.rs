//! The quiz session state machine and the loop that drives it.

mod progress;
mod session;
mod state;
mod timer;
mod workflow;

pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use session::{AnswerFeedback, QuizSession};
pub use state::{Operation, SessionState};
pub use timer::CountdownTimer;
pub use workflow::{QuizLoopService, QuizRun, QuizSettings, SubmissionStatus, TickEvent};
