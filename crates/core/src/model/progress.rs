use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("average score must be a finite value in 0..=100")]
    InvalidAverage,

    #[error("best score must be <= 100")]
    InvalidBest,

    #[error("tests passed ({passed}) cannot exceed tests taken ({taken})")]
    PassedExceedsTaken { passed: u32, taken: u32 },
}

/// Per-subject aggregate of a user's test history.
///
/// Mirrors the backend's progress row; one instance per (user, subject).
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectProgress {
    tests_taken: u32,
    tests_passed: u32,
    average_score: f64,
    best_score: u8,
    total_time_secs: u64,
    last_test_at: Option<DateTime<Utc>>,
}

impl SubjectProgress {
    /// An empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tests_taken: 0,
            tests_passed: 0,
            average_score: 0.0,
            best_score: 0,
            total_time_secs: 0,
            last_test_at: None,
        }
    }

    /// Rehydrate a progress aggregate from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when the persisted values are inconsistent.
    pub fn from_persisted(
        tests_taken: u32,
        tests_passed: u32,
        average_score: f64,
        best_score: u8,
        total_time_secs: u64,
        last_test_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        if !average_score.is_finite() || !(0.0..=100.0).contains(&average_score) {
            return Err(ProgressError::InvalidAverage);
        }
        if best_score > 100 {
            return Err(ProgressError::InvalidBest);
        }
        if tests_passed > tests_taken {
            return Err(ProgressError::PassedExceedsTaken {
                passed: tests_passed,
                taken: tests_taken,
            });
        }

        Ok(Self {
            tests_taken,
            tests_passed,
            average_score,
            best_score,
            total_time_secs,
            last_test_at,
        })
    }

    /// Fold one completed test into the aggregate.
    pub fn record(&mut self, percentage: u8, passed: bool, time_taken_secs: u32, at: DateTime<Utc>) {
        let taken = f64::from(self.tests_taken);
        self.average_score =
            (self.average_score * taken + f64::from(percentage)) / (taken + 1.0);
        self.tests_taken = self.tests_taken.saturating_add(1);
        if passed {
            self.tests_passed = self.tests_passed.saturating_add(1);
        }
        self.best_score = self.best_score.max(percentage);
        self.total_time_secs = self.total_time_secs.saturating_add(u64::from(time_taken_secs));
        self.last_test_at = Some(at);
    }

    #[must_use]
    pub fn tests_taken(&self) -> u32 {
        self.tests_taken
    }

    #[must_use]
    pub fn tests_passed(&self) -> u32 {
        self.tests_passed
    }

    #[must_use]
    pub fn average_score(&self) -> f64 {
        self.average_score
    }

    #[must_use]
    pub fn best_score(&self) -> u8 {
        self.best_score
    }

    #[must_use]
    pub fn total_time_secs(&self) -> u64 {
        self.total_time_secs
    }

    #[must_use]
    pub fn last_test_at(&self) -> Option<DateTime<Utc>> {
        self.last_test_at
    }
}

impl Default for SubjectProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn record_folds_running_average_and_best() {
        let mut progress = SubjectProgress::new();
        let now = fixed_now();

        progress.record(80, true, 300, now);
        progress.record(40, false, 450, now);

        assert_eq!(progress.tests_taken(), 2);
        assert_eq!(progress.tests_passed(), 1);
        assert!((progress.average_score() - 60.0).abs() < f64::EPSILON);
        assert_eq!(progress.best_score(), 80);
        assert_eq!(progress.total_time_secs(), 750);
        assert_eq!(progress.last_test_at(), Some(now));
    }

    #[test]
    fn persisted_inconsistencies_are_rejected() {
        let err = SubjectProgress::from_persisted(2, 3, 50.0, 80, 0, None).unwrap_err();
        assert!(matches!(err, ProgressError::PassedExceedsTaken { .. }));

        let err = SubjectProgress::from_persisted(2, 1, 120.0, 80, 0, None).unwrap_err();
        assert_eq!(err, ProgressError::InvalidAverage);

        let err = SubjectProgress::from_persisted(2, 1, 50.0, 120, 0, None).unwrap_err();
        assert_eq!(err, ProgressError::InvalidBest);
    }

    #[test]
    fn persisted_round_trip() {
        let now = fixed_now();
        let progress =
            SubjectProgress::from_persisted(4, 3, 72.5, 95, 1_800, Some(now)).unwrap();
        assert_eq!(progress.tests_taken(), 4);
        assert_eq!(progress.best_score(), 95);
        assert_eq!(progress.last_test_at(), Some(now));
    }
}
