use exam_core::model::{Question, ReportError, ReviewEntry, TestReport};

use super::answers::AnswerSheet;

/// Score a finished session: one review entry per question, cross-referenced
/// against the answer sheet.
///
/// Pure and deterministic; calling it twice over the same state yields the
/// same report. Unanswered questions carry `selected: None` and count
/// against the score.
///
/// # Errors
///
/// Returns `ReportError::Empty` when there are no questions, which a live
/// session never allows.
pub fn build_report(
    questions: &[Question],
    sheet: &AnswerSheet,
    pass_mark: u8,
) -> Result<TestReport, ReportError> {
    let entries: Vec<ReviewEntry> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let selected = sheet.selected(index);
            ReviewEntry {
                question_id: question.id(),
                subject: question.subject(),
                prompt: question.prompt().to_owned(),
                selected,
                correct_choice: question.correct(),
                correct_text: question.option_text(question.correct()).to_owned(),
                explanation: question.explanation().map(str::to_owned),
                is_correct: selected == Some(question.correct()),
            }
        })
        .collect();

    TestReport::from_entries(entries, pass_mark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Choice, Difficulty, Language, QuestionDraft, QuestionId, Subject};

    fn build_question(correct: Choice) -> Question {
        QuestionDraft {
            prompt: "prompt".to_string(),
            options: [
                "opt 1".to_string(),
                "opt 2".to_string(),
                "opt 3".to_string(),
                "opt 4".to_string(),
            ],
            correct,
            explanation: Some("because".to_string()),
            image_url: None,
            subject: Subject::DrivingPrinciples,
            difficulty: Difficulty::Hard,
            language: Language::Hindi,
        }
        .validate(QuestionId::random())
        .unwrap()
    }

    #[test]
    fn entries_carry_selection_and_correct_text() {
        let questions = vec![build_question(Choice::B), build_question(Choice::C)];
        let mut sheet = AnswerSheet::new(vec![Choice::B, Choice::C]);
        sheet.select(0, Choice::B);

        let report = build_report(&questions, &sheet, 60).unwrap();
        assert_eq!(report.correct(), 1);
        assert_eq!(report.total(), 2);

        let first = &report.entries()[0];
        assert_eq!(first.selected, Some(Choice::B));
        assert!(first.is_correct);
        assert_eq!(first.correct_text, "opt 2");

        let second = &report.entries()[1];
        assert_eq!(second.selected, None);
        assert!(!second.is_correct);
        assert_eq!(second.correct_text, "opt 3");
        assert_eq!(second.explanation.as_deref(), Some("because"));
    }

    #[test]
    fn correct_plus_rest_always_covers_every_question() {
        let questions: Vec<Question> = (0..7).map(|_| build_question(Choice::A)).collect();
        let mut sheet = AnswerSheet::new(vec![Choice::A; 7]);
        sheet.select(0, Choice::A);
        sheet.select(3, Choice::D);

        let report = build_report(&questions, &sheet, 60).unwrap();
        assert_eq!(
            report.correct() + report.incorrect_or_unanswered(),
            report.total()
        );
    }
}
