#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use exam_core::Clock;

pub use error::SessionError;
pub use sessions::{
    AnswerSheet, CountdownTimer, ExamService, QuestionTimer, Selection, SessionEvent,
    SessionPhase, SessionProgress, SessionRunner, TestSession, TimerTick, build_report,
};
