/// Aggregated view of a running session, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub correct: u32,
    pub wrong: u32,
    pub current_index: usize,
    pub test_remaining_secs: u32,
    pub question_remaining_secs: u32,
    pub showing_feedback: bool,
    pub is_complete: bool,
}
