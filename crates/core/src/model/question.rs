use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::model::{Choice, QuestionId};

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// Exam subject a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    RoadSigns,
    RoadRules,
    DrivingPrinciples,
}

impl Subject {
    /// All subjects, in the order mock tests draw from them.
    pub const ALL: [Subject; 3] = [
        Subject::RoadSigns,
        Subject::RoadRules,
        Subject::DrivingPrinciples,
    ];

    /// Backend code for this subject.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::RoadSigns => "road_signs",
            Subject::RoadRules => "road_rules",
            Subject::DrivingPrinciples => "driving_principles",
        }
    }
}

/// Question difficulty tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Backend code for this difficulty.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Languages the question bank is available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "te")]
    Telugu,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    /// Two-letter backend code for this language.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Telugu => "te",
            Language::Hindi => "hi",
        }
    }
}

/// Error type for parsing classification codes from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCodeError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for ParseCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} code: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseCodeError {}

impl FromStr for Subject {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| ParseCodeError {
                kind: "subject",
                value: s.to_string(),
            })
    }
}

impl FromStr for Language {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Language::English, Language::Telugu, Language::Hindi]
            .into_iter()
            .find(|language| language.code() == s)
            .ok_or_else(|| ParseCodeError {
                kind: "language",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("option {0} cannot be empty")]
    EmptyOption(Choice),

    #[error("invalid image url: {0}")]
    InvalidImageUrl(String),
}

/// Unvalidated question data as received from the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: [String; 4],
    pub correct: Choice,
    pub explanation: Option<String>,
    pub image_url: Option<String>,
    pub subject: Subject,
    pub difficulty: Difficulty,
    pub language: Language,
}

impl QuestionDraft {
    /// Validate the draft and produce an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt or any option is blank, or
    /// the image reference is not a well-formed URL.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        for (choice, text) in Choice::ALL.iter().zip(self.options.iter()) {
            if text.trim().is_empty() {
                return Err(QuestionError::EmptyOption(*choice));
            }
        }
        let image = match self.image_url {
            Some(raw) => {
                Some(Url::parse(&raw).map_err(|_| QuestionError::InvalidImageUrl(raw))?)
            }
            None => None,
        };

        Ok(Question {
            id,
            prompt: self.prompt,
            options: self.options,
            correct: self.correct,
            explanation: self.explanation,
            image,
            subject: self.subject,
            difficulty: self.difficulty,
            language: self.language,
        })
    }
}

/// A validated exam question, immutable once loaded for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: [String; 4],
    correct: Choice,
    explanation: Option<String>,
    image: Option<Url>,
    subject: Subject,
    difficulty: Difficulty,
    language: Language,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String; 4] {
        &self.options
    }

    /// Text of the option behind `choice`.
    #[must_use]
    pub fn option_text(&self, choice: Choice) -> &str {
        &self.options[usize::from(choice.index() - 1)]
    }

    #[must_use]
    pub fn correct(&self) -> Choice {
        self.correct
    }

    #[must_use]
    pub fn is_correct(&self, choice: Choice) -> bool {
        self.correct == choice
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&Url> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            prompt: "What does a red octagonal sign mean?".to_string(),
            options: [
                "Stop".to_string(),
                "Yield".to_string(),
                "No entry".to_string(),
                "Speed limit".to_string(),
            ],
            correct: Choice::A,
            explanation: Some("A red octagon always means stop.".to_string()),
            image_url: None,
            subject: Subject::RoadSigns,
            difficulty: Difficulty::Easy,
            language: Language::English,
        }
    }

    #[test]
    fn valid_draft_produces_question() {
        let question = draft().validate(QuestionId::random()).unwrap();
        assert_eq!(question.option_text(Choice::A), "Stop");
        assert!(question.is_correct(Choice::A));
        assert!(!question.is_correct(Choice::B));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut d = draft();
        d.prompt = "   ".to_string();
        let err = d.validate(QuestionId::random()).unwrap_err();
        assert!(matches!(err, QuestionError::EmptyPrompt));
    }

    #[test]
    fn blank_option_is_rejected() {
        let mut d = draft();
        d.options[2] = String::new();
        let err = d.validate(QuestionId::random()).unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption(Choice::C));
    }

    #[test]
    fn malformed_image_url_is_rejected() {
        let mut d = draft();
        d.image_url = Some("not a url".to_string());
        let err = d.validate(QuestionId::random()).unwrap_err();
        assert!(matches!(err, QuestionError::InvalidImageUrl(_)));
    }

    #[test]
    fn subject_codes_round_trip() {
        for subject in Subject::ALL {
            assert_eq!(subject.as_str().parse::<Subject>().unwrap(), subject);
        }
        assert!("geography".parse::<Subject>().is_err());
    }
}
