use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, warn};

use exam_core::model::{Choice, Question, TestMode, TestReport, TestSettings};

use super::answers::{AnswerSheet, Selection};
use super::progress::SessionProgress;
use super::report::build_report;
use super::timer::{CountdownTimer, QuestionTimer, TimerTick};
use crate::error::SessionError;

//
// ─── STATES AND EVENTS ─────────────────────────────────────────────────────────
//

/// Lifecycle of a test session. Exactly one phase holds at a time and
/// `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// Observable transitions, emitted by `tick` and the input methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Moved { index: usize },
    Answered { index: usize, correct: bool },
    QuestionExpired { index: usize },
    TimeExpired,
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one timed test, from start through completion.
///
/// The session is the sole writer over its answers and timers; callers feed
/// it user input and a one-second `tick`, and read state back through the
/// accessors. Invalid input is ignored or clamped, never an error: the
/// engine sits behind a UI that already constrains what users can do.
pub struct TestSession {
    settings: TestSettings,
    questions: Vec<Question>,
    sheet: AnswerSheet,
    current: usize,
    test_timer: CountdownTimer,
    question_timer: QuestionTimer,
    feedback_hold: Option<CountdownTimer>,
    phase: SessionPhase,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TestSession {
    /// Create a session over a fixed question sequence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(
        questions: Vec<Question>,
        settings: TestSettings,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        let key = questions.iter().map(Question::correct).collect();
        let test_timer = CountdownTimer::new(settings.test_duration_secs());
        let question_timer = QuestionTimer::new(settings.question_duration_secs());

        Ok(Self {
            sheet: AnswerSheet::new(key),
            questions,
            current: 0,
            test_timer,
            question_timer,
            feedback_hold: None,
            phase: SessionPhase::NotStarted,
            started_at: created_at,
            completed_at: None,
            settings,
        })
    }

    /// Begin the test: arms both timers and enters `InProgress`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<SessionEvent> {
        if self.phase != SessionPhase::NotStarted {
            return None;
        }
        self.phase = SessionPhase::InProgress;
        self.started_at = now;

        if matches!(self.test_timer.activate(), TimerTick::Expired) {
            self.complete(now);
            return Some(SessionEvent::Completed);
        }
        self.question_timer.activate();
        debug!(questions = self.questions.len(), "session started");
        Some(SessionEvent::Started)
    }

    /// Advance the session by one second of wall time.
    ///
    /// Drives the practice feedback hold, the per-question timer (parked
    /// while a feedback hold is showing), and the overall timer, in that
    /// order. Ticks outside `InProgress` do nothing.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase != SessionPhase::InProgress {
            return events;
        }

        let hold_lapsed = match self.feedback_hold.as_mut() {
            Some(hold) => matches!(hold.tick(), TimerTick::Expired),
            None => false,
        };

        if hold_lapsed {
            self.feedback_hold = None;
            if self.current + 1 < self.questions.len() {
                events.push(self.move_to(self.current + 1));
            } else {
                self.complete(now);
                events.push(SessionEvent::Completed);
                return events;
            }
        } else if self.feedback_hold.is_none()
            && matches!(self.question_timer.tick(), TimerTick::Expired)
        {
            events.push(SessionEvent::QuestionExpired {
                index: self.current,
            });
            if self.current + 1 < self.questions.len() {
                events.push(self.move_to(self.current + 1));
            } else {
                debug!("question timer expired on the final question; submitting");
                self.complete(now);
                events.push(SessionEvent::Completed);
                return events;
            }
        }

        if matches!(self.test_timer.tick(), TimerTick::Expired) {
            warn!(
                unanswered = self.sheet.unanswered_count(),
                "test time expired; forcing submission"
            );
            events.push(SessionEvent::TimeExpired);
            self.complete(now);
            events.push(SessionEvent::Completed);
        }

        events
    }

    /// Record an answer for the current question.
    ///
    /// Practice mode enters the feedback hold that later auto-advances;
    /// mock mode leaves navigation to the question timer or the caller.
    pub fn select_answer(&mut self, choice: Choice) -> Option<SessionEvent> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        match self.sheet.select(self.current, choice) {
            Selection::Ignored => None,
            Selection::First { correct } | Selection::Changed { correct } => {
                if self.settings.mode() == TestMode::Practice {
                    let mut hold = CountdownTimer::new(self.settings.feedback_hold_secs());
                    hold.activate();
                    self.feedback_hold = Some(hold);
                }
                Some(SessionEvent::Answered {
                    index: self.current,
                    correct,
                })
            }
        }
    }

    /// Move to the next question; a no-op on the last one.
    pub fn next(&mut self) -> Option<SessionEvent> {
        if self.phase != SessionPhase::InProgress || self.current + 1 >= self.questions.len() {
            return None;
        }
        Some(self.move_to(self.current + 1))
    }

    /// Move to the previous question; a no-op on the first one.
    pub fn previous(&mut self) -> Option<SessionEvent> {
        if self.phase != SessionPhase::InProgress || self.current == 0 {
            return None;
        }
        Some(self.move_to(self.current - 1))
    }

    /// Submit the test from any position; unanswered questions stay
    /// unanswered in the report.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Option<SessionEvent> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        self.complete(now);
        Some(SessionEvent::Completed)
    }

    fn move_to(&mut self, index: usize) -> SessionEvent {
        self.current = index;
        self.feedback_hold = None;
        self.question_timer.observe(index);
        SessionEvent::Moved { index }
    }

    fn complete(&mut self, now: DateTime<Utc>) {
        if self.phase == SessionPhase::Completed {
            return;
        }
        self.phase = SessionPhase::Completed;
        self.completed_at = Some(now);
        self.feedback_hold = None;
        self.test_timer.pause();
        self.question_timer.pause();
        debug!(
            correct = self.sheet.correct_count(),
            wrong = self.sheet.wrong_count(),
            "session completed"
        );
    }

    // Accessors
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.sheet
    }

    #[must_use]
    pub fn settings(&self) -> &TestSettings {
        &self.settings
    }

    #[must_use]
    pub fn test_remaining_secs(&self) -> u32 {
        self.test_timer.remaining_secs()
    }

    #[must_use]
    pub fn question_remaining_secs(&self) -> u32 {
        self.question_timer.remaining_secs()
    }

    /// Seconds consumed from the overall test timer.
    #[must_use]
    pub fn time_taken_secs(&self) -> u32 {
        self.test_timer.elapsed_secs()
    }

    #[must_use]
    pub fn showing_feedback(&self) -> bool {
        self.feedback_hold.is_some()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Snapshot of the running state for a UI.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.sheet.answered_count(),
            correct: self.sheet.correct_count(),
            wrong: self.sheet.wrong_count(),
            current_index: self.current,
            test_remaining_secs: self.test_timer.remaining_secs(),
            question_remaining_secs: self.question_timer.remaining_secs(),
            showing_feedback: self.feedback_hold.is_some(),
            is_complete: self.is_complete(),
        }
    }

    /// Final score, available once the session has completed.
    ///
    /// Pure function of the final state: repeated calls yield identical
    /// reports.
    #[must_use]
    pub fn report(&self) -> Option<TestReport> {
        if self.phase != SessionPhase::Completed {
            return None;
        }
        build_report(
            &self.questions,
            &self.sheet,
            self.settings.pass_mark_percent(),
        )
        .ok()
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.sheet.answered_count())
            .field("test_remaining_secs", &self.test_timer.remaining_secs())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
