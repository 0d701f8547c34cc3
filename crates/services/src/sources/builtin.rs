use async_trait::async_trait;

use quiz_core::error::Error as ModelError;
use quiz_core::model::{
    Question, QuestionDraft, QuestionError, QuestionId, Quiz, QuizDifficulty, QuizId, SessionTag,
};

use super::{QuestionBatch, QuestionSource, QuizCriteria};
use crate::error::SourceError;

pub const BUILTIN_QUIZ_TITLE: &str = "Heritage Explorer: Civic Sense";

const BUILTIN_TAG: &str = "builtin:civic-sense";

fn drafts() -> Vec<QuestionDraft> {
    fn opts(values: [&str; 4]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    vec![
        QuestionDraft::new(
            "You finish a snack near an old fort. Where does the wrapper go?",
            opts([
                "Behind a stone wall",
                "In the nearest dustbin",
                "On the grass",
                "Into the moat",
            ]),
            1,
        )
        .with_encouragement("Spotless! The fort thanks you."),
        QuestionDraft::new(
            "What should you do with a marker at an ancient temple?",
            opts([
                "Write your name on a pillar",
                "Draw on the carvings",
                "Keep it in your bag",
                "Sign the statue's base",
            ]),
            2,
        )
        .with_encouragement("History stays clean because of you!"),
        QuestionDraft::new(
            "How should you behave inside a museum gallery?",
            opts([
                "Shout to your friends",
                "Speak softly and walk calmly",
                "Run between the displays",
                "Play loud music",
            ]),
            1,
        )
        .with_encouragement("Quiet hero unlocked!"),
        QuestionDraft::new(
            "A sign says \"Do not touch the paintings\". What do you do?",
            opts([
                "Touch just one corner",
                "Take a selfie while touching it",
                "Admire it from a distance",
                "Ask a friend to touch it",
            ]),
            2,
        )
        .with_encouragement("Eyes only, great job!"),
        QuestionDraft::new(
            "The queue for the monument ticket counter is long. What is fair?",
            opts([
                "Wait for your turn",
                "Push to the front",
                "Climb over the barrier",
                "Sneak in without a ticket",
            ]),
            0,
        )
        .with_encouragement("Patience is a superpower!"),
    ]
}

/// The built-in civic-sense question set, with ids `1..=5`.
///
/// # Errors
///
/// Returns `QuestionError` if an entry fails validation.
pub fn builtin_questions() -> Result<Vec<Question>, QuestionError> {
    drafts()
        .into_iter()
        .zip(1_u64..)
        .map(|(draft, id)| draft.with_id(id).validate(QuestionId::new(id)))
        .collect()
}

/// The built-in set packaged as a catalog quiz, for seeding storage.
///
/// # Errors
///
/// Returns the model error if a question or the quiz itself is invalid.
pub fn builtin_quiz(id: QuizId) -> Result<Quiz, ModelError> {
    let questions = builtin_questions()?;
    Ok(Quiz::new(id, BUILTIN_QUIZ_TITLE, QuizDifficulty::Easy, None, questions)?)
}

/// Always serves the built-in question set, whatever the criteria.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSource;

#[async_trait]
impl QuestionSource for BuiltinSource {
    async fn fetch_questions(&self, _criteria: &QuizCriteria) -> Result<QuestionBatch, SourceError> {
        let questions = builtin_questions().map_err(|e| SourceError::Malformed(e.to_string()))?;
        Ok(QuestionBatch {
            tag: SessionTag::new(BUILTIN_TAG),
            title: BUILTIN_QUIZ_TITLE.to_owned(),
            questions,
            time_limit_secs: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_is_valid() {
        let questions = builtin_questions().unwrap();
        assert_eq!(questions.len(), 5);
        assert!(questions.iter().all(|q| q.options().len() == 4));
        assert!(questions.iter().all(|q| q.encouragement().is_some()));
    }

    #[test]
    fn builtin_quiz_uses_default_budget() {
        let quiz = builtin_quiz(QuizId::new(1)).unwrap();
        assert_eq!(quiz.title(), BUILTIN_QUIZ_TITLE);
        assert_eq!(quiz.time_budget().secs(), 100);
    }

    #[tokio::test]
    async fn source_ignores_criteria() {
        let batch = BuiltinSource
            .fetch_questions(&QuizCriteria::new("fr").with_topic("anything"))
            .await
            .unwrap();
        assert_eq!(batch.questions.len(), 5);
        assert_eq!(batch.tag.as_str(), "builtin:civic-sense");
    }
}
