//! Score and percentage arithmetic shared by sessions and stored results.

use crate::model::Question;

/// Number of questions whose recorded answer is the correct option.
///
/// Unanswered entries (`None`) and entries past the end of `answers` never count.
#[must_use]
pub fn score(questions: &[Question], answers: &[Option<usize>]) -> u32 {
    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| answer.is_some_and(|a| question.is_correct(a)))
        .count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// `round(100 * score / total)`, with an empty quiz defined as 0%.
#[must_use]
pub fn percentage(score: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score.min(total));
    let total = u64::from(total);
    let rounded = (200 * score + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Coarse praise bucket for the result screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Perfect,
    KeepTrying,
}

impl Verdict {
    #[must_use]
    pub fn for_score(score: u32, total: u32) -> Self {
        if total > 0 && score == total {
            Self::Perfect
        } else {
            Self::KeepTrying
        }
    }
}
