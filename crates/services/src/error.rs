//! Shared error types for the services crate.

use thiserror::Error;

use bank::BankError;
use exam_core::model::ReportError;

/// Errors emitted by the test session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session is not completed yet")]
    NotCompleted,
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Bank(#[from] BankError),
}
