use rand::rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use bank::QuestionBank;
use exam_core::model::{Language, Question, Subject, TestSettings};

use crate::error::SessionError;

/// Bank-facing question-set assembly.
pub(crate) struct ExamQueries;

impl ExamQueries {
    /// Fetch a practice set for one subject.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when the bank has no questions for the
    /// subject/language pair, or `SessionError::Bank` on fetch failures.
    pub async fn practice_set(
        bank: &dyn QuestionBank,
        subject: Subject,
        language: Language,
        count: u32,
    ) -> Result<Vec<Question>, SessionError> {
        let questions = bank.fetch_questions(subject, language, count).await?;
        if questions.is_empty() {
            warn!(subject = %subject, language = %language, "bank returned no questions");
            return Err(SessionError::Empty);
        }
        debug!(subject = %subject, fetched = questions.len(), "assembled practice set");
        Ok(questions)
    }

    /// Compose a mock test: the configured number of questions per subject,
    /// concatenated and shuffled.
    ///
    /// A subject with too few questions contributes what it has; only a
    /// completely empty combined set is fatal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no subject yields any questions,
    /// or `SessionError::Bank` on fetch failures.
    pub async fn mock_set(
        bank: &dyn QuestionBank,
        language: Language,
        settings: &TestSettings,
    ) -> Result<Vec<Question>, SessionError> {
        let mut combined = Vec::new();
        for subject in Subject::ALL {
            let batch = bank
                .fetch_questions(subject, language, settings.mock_count(subject))
                .await?;
            combined.extend(batch);
        }
        if combined.is_empty() {
            warn!(language = %language, "bank returned no questions for any subject");
            return Err(SessionError::Empty);
        }

        combined.shuffle(&mut rng());
        debug!(total = combined.len(), "assembled mock set");
        Ok(combined)
    }
}
