use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Minimum number of choices a multiple-choice question must offer.
pub const MIN_OPTIONS: usize = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least {MIN_OPTIONS} options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct option index is missing")]
    MissingCorrectIndex,

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: i64, len: usize },

    #[error("question id {0} is used more than once")]
    DuplicateId(QuestionId),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives from a generator or a stored catalog.
///
/// Accepts the historical field spellings (`question`, `correctAnswer`,
/// `correctIndex`) so older payloads keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, alias = "correctAnswer", alias = "correctIndex")]
    pub correct_option_index: Option<i64>,
    #[serde(default)]
    pub encouragement: Option<String>,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(prompt: impl Into<String>, options: Vec<String>, correct_option_index: i64) -> Self {
        Self {
            id: None,
            prompt: prompt.into(),
            options,
            correct_option_index: Some(correct_option_index),
            encouragement: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_encouragement(mut self, text: impl Into<String>) -> Self {
        self.encouragement = Some(text.into());
        self
    }

    /// Check the draft and freeze it into a `Question`.
    ///
    /// `fallback_id` is used when the draft carries no id of its own
    /// (generated questions usually don't).
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt or options are blank, fewer than
    /// two options are given, or the correct index does not point at an option.
    pub fn validate(self, fallback_id: QuestionId) -> Result<Question, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let options: Vec<String> = self.options.iter().map(|o| o.trim().to_owned()).collect();
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if let Some(index) = options.iter().position(String::is_empty) {
            return Err(QuestionError::EmptyOption { index });
        }

        let raw = self
            .correct_option_index
            .ok_or(QuestionError::MissingCorrectIndex)?;
        let correct_option_index = usize::try_from(raw)
            .ok()
            .filter(|idx| *idx < options.len())
            .ok_or(QuestionError::CorrectIndexOutOfRange {
                index: raw,
                len: options.len(),
            })?;

        let encouragement = self
            .encouragement
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Question {
            id: self.id.map_or(fallback_id, QuestionId::new),
            prompt,
            options,
            correct_option_index,
            encouragement,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated single-best-answer question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option_index: usize,
    encouragement: Option<String>,
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
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option_index(&self) -> usize {
        self.correct_option_index
    }

    #[must_use]
    pub fn encouragement(&self) -> Option<&str> {
        self.encouragement.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn validates_and_trims() {
        let q = QuestionDraft::new("  Where does litter go? ", opts(&["Floor", " Dustbin "]), 1)
            .with_encouragement("  Super! ")
            .validate(QuestionId::new(3))
            .unwrap();

        assert_eq!(q.id(), QuestionId::new(3));
        assert_eq!(q.prompt(), "Where does litter go?");
        assert_eq!(q.options()[1], "Dustbin");
        assert_eq!(q.encouragement(), Some("Super!"));
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn explicit_id_wins_over_fallback() {
        let q = QuestionDraft::new("Q", opts(&["a", "b"]), 0)
            .with_id(99)
            .validate(QuestionId::new(1))
            .unwrap();
        assert_eq!(q.id(), QuestionId::new(99));
    }

    #[test]
    fn rejects_single_option() {
        let err = QuestionDraft::new("Q", opts(&["only"]), 0)
            .validate(QuestionId::new(1))
            .unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn rejects_out_of_range_and_negative_index() {
        let err = QuestionDraft::new("Q", opts(&["a", "b"]), 2)
            .validate(QuestionId::new(1))
            .unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 });

        let err = QuestionDraft::new("Q", opts(&["a", "b"]), -1)
            .validate(QuestionId::new(1))
            .unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: -1, len: 2 });
    }

    #[test]
    fn rejects_blank_option_and_prompt() {
        let err = QuestionDraft::new("Q", opts(&["a", "  "]), 0)
            .validate(QuestionId::new(1))
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption { index: 1 });

        let err = QuestionDraft::new(" ", opts(&["a", "b"]), 0)
            .validate(QuestionId::new(1))
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn blank_encouragement_becomes_none() {
        let q = QuestionDraft::new("Q", opts(&["a", "b"]), 0)
            .with_encouragement("   ")
            .validate(QuestionId::new(1))
            .unwrap();
        assert_eq!(q.encouragement(), None);
    }

    #[test]
    fn deserializes_legacy_field_names() {
        let json = r#"[
            {"question": "Q1", "options": ["a", "b"], "correctAnswer": 1, "encouragement": "Yay"},
            {"prompt": "Q2", "options": ["a", "b"], "correctIndex": 0},
            {"prompt": "Q3", "options": ["a", "b", "c"], "correctOptionIndex": 2, "id": 7}
        ]"#;
        let drafts: Vec<QuestionDraft> = serde_json::from_str(json).unwrap();
        assert_eq!(drafts[0].prompt, "Q1");
        assert_eq!(drafts[0].correct_option_index, Some(1));
        assert_eq!(drafts[1].correct_option_index, Some(0));
        assert_eq!(drafts[2].correct_option_index, Some(2));
        assert_eq!(drafts[2].id, Some(7));
    }

    #[test]
    fn missing_correct_index_is_reported() {
        let json = r#"{"prompt": "Q", "options": ["a", "b"]}"#;
        let draft: QuestionDraft = serde_json::from_str(json).unwrap();
        assert_eq!(
            draft.validate(QuestionId::new(1)).unwrap_err(),
            QuestionError::MissingCorrectIndex
        );
    }
}
