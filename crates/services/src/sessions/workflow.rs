use std::sync::Arc;

use tracing::{debug, info};

use bank::{Bank, ProgressStore, QuestionBank, ResultId, ResultStore, TestResultRecord};
use exam_core::Clock;
use exam_core::model::{Language, Subject, SubjectProgress, TestMode, TestReport, TestSettings};

use super::controller::TestSession;
use super::queries::ExamQueries;
use crate::error::SessionError;

/// Subject code persisted for mixed-subject mock tests.
const MOCK_SUBJECT_CODE: &str = "mock_test";

/// Orchestrates session start, retake, and result persistence.
///
/// Owns the time source and the bank trait objects so the session engine
/// itself never touches I/O.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    questions: Arc<dyn QuestionBank>,
    results: Arc<dyn ResultStore>,
    progress: Arc<dyn ProgressStore>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionBank>,
        results: Arc<dyn ResultStore>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            clock,
            questions,
            results,
            progress,
        }
    }

    /// Build the service over a `Bank` aggregate.
    #[must_use]
    pub fn with_bank(clock: Clock, bank: Bank) -> Self {
        Self::new(clock, bank.questions, bank.results, bank.progress)
    }

    /// Service over a fresh in-memory bank, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::with_bank(clock, Bank::in_memory())
    }

    /// Build a practice session for one subject.
    ///
    /// The returned session is `NotStarted`; callers start it once the user
    /// leaves the instructions screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when the bank has no questions, or
    /// `SessionError::Bank` on fetch failures.
    pub async fn start_practice(
        &self,
        subject: Subject,
        language: Language,
        settings: TestSettings,
    ) -> Result<TestSession, SessionError> {
        let questions = ExamQueries::practice_set(
            self.questions.as_ref(),
            subject,
            language,
            settings.practice_question_count(),
        )
        .await?;
        info!(subject = %subject, count = questions.len(), "starting practice session");
        TestSession::new(questions, settings, self.clock.now())
    }

    /// Build a mock test drawing from every subject.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no subject yields questions, or
    /// `SessionError::Bank` on fetch failures.
    pub async fn start_mock(
        &self,
        language: Language,
        settings: TestSettings,
    ) -> Result<TestSession, SessionError> {
        let questions =
            ExamQueries::mock_set(self.questions.as_ref(), language, &settings).await?;
        info!(count = questions.len(), "starting mock session");
        TestSession::new(questions, settings, self.clock.now())
    }

    /// Build a fresh session with the same shape as `session`.
    ///
    /// Questions are refetched so a retake gets new randomization; the old
    /// session (and its timers) is simply dropped by the caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` or `SessionError::Bank` as the start
    /// methods do.
    pub async fn retake(&self, session: &TestSession) -> Result<TestSession, SessionError> {
        let first = session.questions().first().ok_or(SessionError::Empty)?;
        let language = first.language();
        let settings = session.settings().clone();
        match settings.mode() {
            TestMode::Practice => {
                self.start_practice(first.subject(), language, settings).await
            }
            TestMode::Mock => self.start_mock(language, settings).await,
        }
    }

    /// Score a completed session and, for signed-in users, persist the
    /// result and fold it into the subject's progress aggregate. Guest
    /// sessions are scored but never stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` while the session is still
    /// running, or `SessionError::Bank` on persistence failures.
    pub async fn finish(
        &self,
        session: &TestSession,
        user_id: Option<&str>,
    ) -> Result<TestReport, SessionError> {
        let report = session.report().ok_or(SessionError::NotCompleted)?;
        let completed_at = session.completed_at().ok_or(SessionError::NotCompleted)?;

        let Some(user_id) = user_id else {
            debug!("guest session; skipping persistence");
            return Ok(report);
        };

        let subject_code = match session.settings().mode() {
            TestMode::Mock => MOCK_SUBJECT_CODE.to_owned(),
            TestMode::Practice => session
                .questions()
                .first()
                .map(|question| question.subject().as_str().to_owned())
                .unwrap_or_else(|| MOCK_SUBJECT_CODE.to_owned()),
        };
        let time_taken_secs = session.time_taken_secs();

        let record = TestResultRecord::from_report(
            user_id,
            &subject_code,
            &report,
            time_taken_secs,
            completed_at,
        );
        let result_id: ResultId = self.results.append_result(&record).await?;

        let mut aggregate = self
            .progress
            .get_progress(user_id, &subject_code)
            .await?
            .unwrap_or_else(SubjectProgress::new);
        aggregate.record(
            report.percentage(),
            report.passed(),
            time_taken_secs,
            completed_at,
        );
        self.progress
            .upsert_progress(user_id, &subject_code, &aggregate)
            .await?;

        info!(result_id, subject = %subject_code, score = report.percentage(), "test result persisted");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank::InMemoryBank;
    use exam_core::model::{Choice, Difficulty, QuestionDraft, QuestionId};
    use exam_core::time::fixed_clock;

    fn service(bank: &InMemoryBank) -> ExamService {
        ExamService::new(
            fixed_clock(),
            Arc::new(bank.clone()),
            Arc::new(bank.clone()),
            Arc::new(bank.clone()),
        )
    }

    fn seed(bank: &InMemoryBank, subject: Subject, how_many: usize) {
        let questions = (0..how_many).map(|n| {
            QuestionDraft {
                prompt: format!("{subject} {n}"),
                options: [
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string(),
                    "d".to_string(),
                ],
                correct: Choice::A,
                explanation: None,
                image_url: None,
                subject,
                difficulty: Difficulty::Easy,
                language: Language::English,
            }
            .validate(QuestionId::random())
            .unwrap()
        });
        bank.seed_questions(questions).unwrap();
    }

    #[tokio::test]
    async fn practice_start_fails_without_questions() {
        let svc = ExamService::in_memory(fixed_clock());
        let err = svc
            .start_practice(Subject::RoadSigns, Language::English, TestSettings::practice())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[tokio::test]
    async fn finish_requires_a_completed_session() {
        let bank = InMemoryBank::new();
        seed(&bank, Subject::RoadSigns, 3);
        let svc = service(&bank);

        let mut session = svc
            .start_practice(Subject::RoadSigns, Language::English, TestSettings::practice())
            .await
            .unwrap();
        session.start(svc.clock.now());

        let err = svc.finish(&session, Some("user-1")).await.unwrap_err();
        assert!(matches!(err, SessionError::NotCompleted));
    }

    #[tokio::test]
    async fn finish_persists_result_and_progress_for_users() {
        let bank = InMemoryBank::new();
        seed(&bank, Subject::RoadSigns, 3);
        let svc = service(&bank);

        let mut session = svc
            .start_practice(Subject::RoadSigns, Language::English, TestSettings::practice())
            .await
            .unwrap();
        session.start(svc.clock.now());
        session.select_answer(Choice::A);
        session.next();
        session.select_answer(Choice::B);
        session.submit(svc.clock.now());

        let report = svc.finish(&session, Some("user-1")).await.unwrap();
        assert_eq!(report.correct(), 1);
        assert_eq!(report.total(), 3);

        let results = bank.recent_results("user-1", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subject, "road_signs");
        assert_eq!(results[0].score, 33);

        let progress = bank
            .get_progress("user-1", "road_signs")
            .await
            .unwrap()
            .expect("progress created");
        assert_eq!(progress.tests_taken(), 1);
        assert_eq!(progress.tests_passed(), 0);
    }

    #[tokio::test]
    async fn guest_sessions_are_scored_but_never_stored() {
        let bank = InMemoryBank::new();
        seed(&bank, Subject::RoadRules, 2);
        let svc = service(&bank);

        let mut session = svc
            .start_practice(Subject::RoadRules, Language::English, TestSettings::practice())
            .await
            .unwrap();
        session.start(svc.clock.now());
        session.select_answer(Choice::A);
        session.submit(svc.clock.now());

        let report = svc.finish(&session, None).await.unwrap();
        assert_eq!(report.correct(), 1);

        assert!(bank.recent_results("", 10).await.unwrap().is_empty());
        assert!(
            bank.get_progress("", "road_rules").await.unwrap().is_none()
        );
    }

    #[tokio::test]
    async fn mock_results_are_filed_under_the_mock_code() {
        let bank = InMemoryBank::new();
        seed(&bank, Subject::RoadSigns, 7);
        seed(&bank, Subject::RoadRules, 7);
        seed(&bank, Subject::DrivingPrinciples, 6);
        let svc = service(&bank);

        let mut session = svc
            .start_mock(Language::English, TestSettings::mock())
            .await
            .unwrap();
        session.start(svc.clock.now());
        session.submit(svc.clock.now());

        svc.finish(&session, Some("user-2")).await.unwrap();
        let results = bank.recent_results("user-2", 10).await.unwrap();
        assert_eq!(results[0].subject, "mock_test");
        assert_eq!(results[0].total_questions, 20);
    }

    #[tokio::test]
    async fn retake_builds_a_fresh_not_started_session() {
        let bank = InMemoryBank::new();
        seed(&bank, Subject::RoadSigns, 3);
        let svc = service(&bank);

        let mut session = svc
            .start_practice(Subject::RoadSigns, Language::English, TestSettings::practice())
            .await
            .unwrap();
        session.start(svc.clock.now());
        session.select_answer(Choice::A);
        session.submit(svc.clock.now());

        let fresh = svc.retake(&session).await.unwrap();
        assert_eq!(fresh.phase(), crate::sessions::SessionPhase::NotStarted);
        assert_eq!(fresh.current_index(), 0);
        assert_eq!(fresh.answers().answered_count(), 0);
        assert_eq!(fresh.answers().correct_count(), 0);
        assert_eq!(
            fresh.test_remaining_secs(),
            fresh.settings().test_duration_secs()
        );
    }
}
