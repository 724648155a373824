use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use exam_core::model::{
    Choice, Difficulty, Language, Question, QuestionDraft, QuestionId, Subject, SubjectProgress,
    TestReport,
};

/// Errors surfaced by bank adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("not found")]
    NotFound,

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Row id assigned by the results store.
pub type ResultId = i64;

//
// ─── WIRE RECORDS ──────────────────────────────────────────────────────────────
//

/// Wire shape for a question row, as the backend serves it.
///
/// This mirrors the domain `Question` so adapters can serialize and
/// deserialize without leaking transport concerns into the domain layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: u8,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub language: Language,
    pub subject: Subject,
    pub difficulty_level: Difficulty,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        let [option_a, option_b, option_c, option_d] = question.options().clone();
        Self {
            id: question.id().to_string(),
            question_text: question.prompt().to_owned(),
            option_a,
            option_b,
            option_c,
            option_d,
            correct_answer: question.correct().index(),
            explanation: question.explanation().map(str::to_owned),
            image_url: question.image().map(ToString::to_string),
            language: question.language(),
            subject: question.subject(),
            difficulty_level: question.difficulty(),
        }
    }

    /// Convert the record into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Serialization` when the row carries a malformed
    /// id, an out-of-range answer number, or fails question validation.
    pub fn into_question(self) -> Result<Question, BankError> {
        let id: QuestionId = self
            .id
            .parse()
            .map_err(|err: exam_core::model::ParseIdError| {
                BankError::Serialization(err.to_string())
            })?;
        let correct = Choice::try_from(self.correct_answer)
            .map_err(|err| BankError::Serialization(err.to_string()))?;

        let draft = QuestionDraft {
            prompt: self.question_text,
            options: [self.option_a, self.option_b, self.option_c, self.option_d],
            correct,
            explanation: self.explanation,
            image_url: self.image_url,
            subject: self.subject,
            difficulty: self.difficulty_level,
            language: self.language,
        };
        draft
            .validate(id)
            .map_err(|err| BankError::Serialization(err.to_string()))
    }
}

/// One attempted question inside a persisted test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub question_id: String,
    /// 1-based option number, absent when the question was never answered.
    pub user_answer: Option<u8>,
    pub correct_answer: u8,
    pub is_correct: bool,
}

/// Persisted shape of a finished test, mirroring the backend results table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRecord {
    pub user_id: String,
    pub subject: String,
    pub score: u8,
    pub total_questions: u32,
    pub time_taken: u32,
    pub questions_attempted: Vec<AttemptRecord>,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

impl TestResultRecord {
    /// Build the persisted shape from a finished report.
    #[must_use]
    pub fn from_report(
        user_id: &str,
        subject: &str,
        report: &TestReport,
        time_taken_secs: u32,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let questions_attempted = report
            .entries()
            .iter()
            .map(|entry| AttemptRecord {
                question_id: entry.question_id.to_string(),
                user_answer: entry.selected.map(Choice::index),
                correct_answer: entry.correct_choice.index(),
                is_correct: entry.is_correct,
            })
            .collect();

        Self {
            user_id: user_id.to_owned(),
            subject: subject.to_owned(),
            score: report.percentage(),
            total_questions: report.total(),
            time_taken: time_taken_secs,
            questions_attempted,
            passed: report.passed(),
            completed_at,
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to the remote question bank.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Fetch up to `count` questions for a subject and language.
    ///
    /// May return fewer than requested, or none at all; deciding whether an
    /// empty set is fatal is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `BankError` when the backend cannot be reached or returns
    /// malformed rows.
    async fn fetch_questions(
        &self,
        subject: Subject,
        language: Language,
        count: u32,
    ) -> Result<Vec<Question>, BankError>;
}

/// Write access to the remote results store.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist a finished test and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `BankError` when the result cannot be stored.
    async fn append_result(&self, record: &TestResultRecord) -> Result<ResultId, BankError>;

    /// Most recent results for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BankError` on backend failures.
    async fn recent_results(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TestResultRecord>, BankError>;
}

/// Per-subject aggregate storage keyed by (user, subject code).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fetch a user's progress for a subject, `None` when no tests exist yet.
    ///
    /// # Errors
    ///
    /// Returns `BankError` on backend failures.
    async fn get_progress(
        &self,
        user_id: &str,
        subject: &str,
    ) -> Result<Option<SubjectProgress>, BankError>;

    /// Insert or replace a user's progress for a subject.
    ///
    /// # Errors
    ///
    /// Returns `BankError` when the aggregate cannot be stored.
    async fn upsert_progress(
        &self,
        user_id: &str,
        subject: &str,
        progress: &SubjectProgress,
    ) -> Result<(), BankError>;
}

//
// ─── IN-MEMORY BANK ────────────────────────────────────────────────────────────
//

/// In-memory implementation of all three contracts for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryBank {
    questions: Arc<Mutex<Vec<Question>>>,
    results: Arc<Mutex<Vec<TestResultRecord>>>,
    progress: Arc<Mutex<HashMap<(String, String), SubjectProgress>>>,
}

impl InMemoryBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load questions into the bank.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Connection` if the bank lock is poisoned.
    pub fn seed_questions(
        &self,
        questions: impl IntoIterator<Item = Question>,
    ) -> Result<(), BankError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|err| BankError::Connection(err.to_string()))?;
        guard.extend(questions);
        Ok(())
    }
}

#[async_trait]
impl QuestionBank for InMemoryBank {
    async fn fetch_questions(
        &self,
        subject: Subject,
        language: Language,
        count: u32,
    ) -> Result<Vec<Question>, BankError> {
        let guard = self
            .questions
            .lock()
            .map_err(|err| BankError::Connection(err.to_string()))?;
        Ok(guard
            .iter()
            .filter(|q| q.subject() == subject && q.language() == language)
            .take(count as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResultStore for InMemoryBank {
    async fn append_result(&self, record: &TestResultRecord) -> Result<ResultId, BankError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|err| BankError::Connection(err.to_string()))?;
        guard.push(record.clone());
        Ok(guard.len() as ResultId)
    }

    async fn recent_results(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TestResultRecord>, BankError> {
        let guard = self
            .results
            .lock()
            .map_err(|err| BankError::Connection(err.to_string()))?;
        Ok(guard
            .iter()
            .rev()
            .filter(|record| record.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressStore for InMemoryBank {
    async fn get_progress(
        &self,
        user_id: &str,
        subject: &str,
    ) -> Result<Option<SubjectProgress>, BankError> {
        let guard = self
            .progress
            .lock()
            .map_err(|err| BankError::Connection(err.to_string()))?;
        Ok(guard.get(&(user_id.to_owned(), subject.to_owned())).cloned())
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        subject: &str,
        progress: &SubjectProgress,
    ) -> Result<(), BankError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|err| BankError::Connection(err.to_string()))?;
        guard.insert((user_id.to_owned(), subject.to_owned()), progress.clone());
        Ok(())
    }
}

/// Aggregates the three contracts behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Bank {
    pub questions: Arc<dyn QuestionBank>,
    pub results: Arc<dyn ResultStore>,
    pub progress: Arc<dyn ProgressStore>,
}

impl Bank {
    #[must_use]
    pub fn in_memory() -> Self {
        let bank = InMemoryBank::new();
        let questions: Arc<dyn QuestionBank> = Arc::new(bank.clone());
        let results: Arc<dyn ResultStore> = Arc::new(bank.clone());
        let progress: Arc<dyn ProgressStore> = Arc::new(bank);
        Self {
            questions,
            results,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_question(subject: Subject, language: Language) -> Question {
        QuestionDraft {
            prompt: "Minimum age for a learner licence?".to_string(),
            options: [
                "16".to_string(),
                "18".to_string(),
                "21".to_string(),
                "25".to_string(),
            ],
            correct: Choice::B,
            explanation: None,
            image_url: None,
            subject,
            difficulty: Difficulty::Easy,
            language,
        }
        .validate(QuestionId::random())
        .unwrap()
    }

    #[test]
    fn record_round_trips_through_the_domain() {
        let question = build_question(Subject::RoadRules, Language::English);
        let record = QuestionRecord::from_question(&question);
        let restored = record.into_question().unwrap();
        assert_eq!(restored, question);
    }

    #[test]
    fn record_with_bad_answer_number_is_rejected() {
        let question = build_question(Subject::RoadRules, Language::English);
        let mut record = QuestionRecord::from_question(&question);
        record.correct_answer = 9;
        let err = record.into_question().unwrap_err();
        assert!(matches!(err, BankError::Serialization(_)));
    }

    #[tokio::test]
    async fn fetch_filters_by_subject_language_and_count() {
        let bank = InMemoryBank::new();
        bank.seed_questions([
            build_question(Subject::RoadSigns, Language::English),
            build_question(Subject::RoadSigns, Language::English),
            build_question(Subject::RoadSigns, Language::Telugu),
            build_question(Subject::RoadRules, Language::English),
        ])
        .unwrap();

        let fetched = bank
            .fetch_questions(Subject::RoadSigns, Language::English, 10)
            .await
            .unwrap();
        assert_eq!(fetched.len(), 2);

        let capped = bank
            .fetch_questions(Subject::RoadSigns, Language::English, 1)
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);

        let none = bank
            .fetch_questions(Subject::DrivingPrinciples, Language::Hindi, 5)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn progress_upsert_and_get() {
        let bank = InMemoryBank::new();
        assert!(bank.get_progress("u1", "road_signs").await.unwrap().is_none());

        let mut progress = SubjectProgress::new();
        progress.record(75, true, 420, exam_core::time::fixed_now());
        bank.upsert_progress("u1", "road_signs", &progress)
            .await
            .unwrap();

        let stored = bank
            .get_progress("u1", "road_signs")
            .await
            .unwrap()
            .expect("progress stored");
        assert_eq!(stored.tests_taken(), 1);
        assert_eq!(stored.best_score(), 75);
    }
}
