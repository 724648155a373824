use thiserror::Error;

use crate::model::Subject;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("test duration must be > 0")]
    InvalidTestDuration,

    #[error("question duration must be > 0")]
    InvalidQuestionDuration,

    #[error("question duration must not exceed test duration")]
    QuestionDurationTooLong,

    #[error("pass mark must be between 1 and 100")]
    InvalidPassMark,

    #[error("feedback hold seconds must be between 1 and 60")]
    InvalidFeedbackHold,

    #[error("question counts must be > 0")]
    InvalidQuestionCount,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// How a session reacts to an answer being selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Show feedback for a short hold, then advance automatically.
    Practice,
    /// Leave navigation to the per-question timer or the user.
    Mock,
}

/// Configuration for a test session.
///
/// Passed into the session at construction; there is no ambient global
/// configuration anywhere in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSettings {
    mode: TestMode,
    test_duration_secs: u32,
    question_duration_secs: u32,
    feedback_hold_secs: u32,
    pass_mark_percent: u8,
    practice_question_count: u32,
    mock_subject_counts: [u32; 3],
}

impl TestSettings {
    /// Reference practice configuration: 10 minute test, 30 second
    /// questions, 2 second feedback hold, 60 % pass mark.
    #[must_use]
    pub fn practice() -> Self {
        Self {
            mode: TestMode::Practice,
            test_duration_secs: 600,
            question_duration_secs: 30,
            feedback_hold_secs: 2,
            pass_mark_percent: 60,
            practice_question_count: 20,
            mock_subject_counts: [7, 7, 6],
        }
    }

    /// Reference mock-test configuration: same clock values as practice,
    /// but navigation waits for the question timer or the user.
    #[must_use]
    pub fn mock() -> Self {
        Self {
            mode: TestMode::Mock,
            ..Self::practice()
        }
    }

    /// Creates custom settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a duration, pass mark, or count is out
    /// of range.
    pub fn new(
        mode: TestMode,
        test_duration_secs: u32,
        question_duration_secs: u32,
        feedback_hold_secs: u32,
        pass_mark_percent: u8,
        practice_question_count: u32,
        mock_subject_counts: [u32; 3],
    ) -> Result<Self, SettingsError> {
        if test_duration_secs == 0 {
            return Err(SettingsError::InvalidTestDuration);
        }
        if question_duration_secs == 0 {
            return Err(SettingsError::InvalidQuestionDuration);
        }
        if question_duration_secs > test_duration_secs {
            return Err(SettingsError::QuestionDurationTooLong);
        }
        if pass_mark_percent == 0 || pass_mark_percent > 100 {
            return Err(SettingsError::InvalidPassMark);
        }
        if !(1..=60).contains(&feedback_hold_secs) {
            return Err(SettingsError::InvalidFeedbackHold);
        }
        if practice_question_count == 0 || mock_subject_counts.iter().any(|&count| count == 0) {
            return Err(SettingsError::InvalidQuestionCount);
        }

        Ok(Self {
            mode,
            test_duration_secs,
            question_duration_secs,
            feedback_hold_secs,
            pass_mark_percent,
            practice_question_count,
            mock_subject_counts,
        })
    }

    // Accessors
    #[must_use]
    pub fn mode(&self) -> TestMode {
        self.mode
    }

    #[must_use]
    pub fn test_duration_secs(&self) -> u32 {
        self.test_duration_secs
    }

    #[must_use]
    pub fn question_duration_secs(&self) -> u32 {
        self.question_duration_secs
    }

    #[must_use]
    pub fn feedback_hold_secs(&self) -> u32 {
        self.feedback_hold_secs
    }

    #[must_use]
    pub fn pass_mark_percent(&self) -> u8 {
        self.pass_mark_percent
    }

    #[must_use]
    pub fn practice_question_count(&self) -> u32 {
        self.practice_question_count
    }

    /// How many questions a mock test draws from `subject`.
    #[must_use]
    pub fn mock_count(&self, subject: Subject) -> u32 {
        let position = Subject::ALL
            .iter()
            .position(|candidate| *candidate == subject)
            .unwrap_or(0);
        self.mock_subject_counts[position]
    }

    /// Total size of a fully stocked mock test.
    #[must_use]
    pub fn mock_total(&self) -> u32 {
        self.mock_subject_counts.iter().sum()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
