mod answers;
mod controller;
mod progress;
mod queries;
mod report;
mod runner;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use answers::{AnswerSheet, Selection};
pub use controller::{SessionEvent, SessionPhase, TestSession};
pub use progress::SessionProgress;
pub use report::build_report;
pub use runner::SessionRunner;
pub use timer::{CountdownTimer, QuestionTimer, TimerTick};
pub use workflow::ExamService;
