use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use exam_core::model::{Language, Question, Subject, SubjectProgress};

use crate::repository::{
    BankError, ProgressStore, QuestionBank, QuestionRecord, ResultId, ResultStore,
    TestResultRecord,
};

/// Connection settings for the hosted backend.
#[derive(Clone, Debug)]
pub struct RestBankConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RestBankConfig {
    /// Read the backend location from `LLR_BANK_URL` / `LLR_BANK_API_KEY`.
    ///
    /// Returns `None` when no usable API key is configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("LLR_BANK_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("LLR_BANK_URL")
            .unwrap_or_else(|_| "https://api.llrprep.example.com/v1".into());
        Some(Self { base_url, api_key })
    }
}

/// Wire shape of a progress row, matching the backend's column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgressRow {
    total_tests_taken: u32,
    tests_passed: u32,
    average_score: f64,
    best_score: u8,
    total_time_spent: u64,
    #[serde(default)]
    last_test_date: Option<DateTime<Utc>>,
}

impl ProgressRow {
    fn from_progress(progress: &SubjectProgress) -> Self {
        Self {
            total_tests_taken: progress.tests_taken(),
            tests_passed: progress.tests_passed(),
            average_score: progress.average_score(),
            best_score: progress.best_score(),
            total_time_spent: progress.total_time_secs(),
            last_test_date: progress.last_test_at(),
        }
    }

    fn into_progress(self) -> Result<SubjectProgress, BankError> {
        SubjectProgress::from_persisted(
            self.total_tests_taken,
            self.tests_passed,
            self.average_score,
            self.best_score,
            self.total_time_spent,
            self.last_test_date,
        )
        .map_err(|err| BankError::Serialization(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: ResultId,
}

/// `reqwest`-backed implementation of the bank contracts.
#[derive(Clone)]
pub struct RestBank {
    client: Client,
    config: RestBankConfig,
}

impl RestBank {
    #[must_use]
    pub fn new(config: RestBankConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn check_status(response: Response) -> Result<Response, BankError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BankError::NotFound);
        }
        if !status.is_success() {
            return Err(BankError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

fn transport(err: reqwest::Error) -> BankError {
    BankError::Connection(err.to_string())
}

#[async_trait]
impl QuestionBank for RestBank {
    async fn fetch_questions(
        &self,
        subject: Subject,
        language: Language,
        count: u32,
    ) -> Result<Vec<Question>, BankError> {
        let limit = count.to_string();
        let response = self
            .client
            .get(self.endpoint("questions"))
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("subject", subject.as_str()),
                ("language", language.code()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let rows: Vec<QuestionRecord> = Self::check_status(response)?
            .json()
            .await
            .map_err(transport)?;
        debug!(subject = %subject, language = %language, rows = rows.len(), "fetched questions");

        rows.into_iter().map(QuestionRecord::into_question).collect()
    }
}

#[async_trait]
impl ResultStore for RestBank {
    async fn append_result(&self, record: &TestResultRecord) -> Result<ResultId, BankError> {
        let response = self
            .client
            .post(self.endpoint("test_results"))
            .bearer_auth(&self.config.api_key)
            .json(record)
            .send()
            .await
            .map_err(transport)?;

        let row: InsertedRow = Self::check_status(response)?
            .json()
            .await
            .map_err(transport)?;
        Ok(row.id)
    }

    async fn recent_results(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TestResultRecord>, BankError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.endpoint("test_results"))
            .bearer_auth(&self.config.api_key)
            .query(&[("user_id", user_id), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(transport)?;

        Self::check_status(response)?.json().await.map_err(transport)
    }
}

#[async_trait]
impl ProgressStore for RestBank {
    async fn get_progress(
        &self,
        user_id: &str,
        subject: &str,
    ) -> Result<Option<SubjectProgress>, BankError> {
        let response = self
            .client
            .get(self.endpoint("user_progress"))
            .bearer_auth(&self.config.api_key)
            .query(&[("user_id", user_id), ("subject", subject)])
            .send()
            .await
            .map_err(transport)?;

        let row: ProgressRow = match Self::check_status(response) {
            Ok(response) => response.json().await.map_err(transport)?,
            Err(BankError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        row.into_progress().map(Some)
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        subject: &str,
        progress: &SubjectProgress,
    ) -> Result<(), BankError> {
        #[derive(Serialize)]
        struct UpsertBody<'a> {
            user_id: &'a str,
            subject: &'a str,
            #[serde(flatten)]
            row: ProgressRow,
        }

        let response = self
            .client
            .post(self.endpoint("user_progress"))
            .bearer_auth(&self.config.api_key)
            .json(&UpsertBody {
                user_id,
                subject,
                row: ProgressRow::from_progress(progress),
            })
            .send()
            .await
            .map_err(transport)?;

        Self::check_status(response).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_row_round_trips() {
        let mut progress = SubjectProgress::new();
        progress.record(90, true, 540, exam_core::time::fixed_now());

        let row = ProgressRow::from_progress(&progress);
        let restored = row.into_progress().unwrap();
        assert_eq!(restored, progress);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let bank = RestBank::new(RestBankConfig {
            base_url: "https://api.example.com/v1/".to_string(),
            api_key: "k".to_string(),
        });
        assert_eq!(bank.endpoint("questions"), "https://api.example.com/v1/questions");
    }
}
