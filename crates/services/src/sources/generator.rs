use std::env;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::{Question, QuestionDraft, SessionTag};

use super::{QuestionBatch, QuestionSource, QuizCriteria, validate_drafts};
use crate::error::SourceError;

const DEFAULT_QUESTION_COUNT: usize = 5;
const DEFAULT_TOPIC: &str = "civic sense at heritage sites and tourist places \
    (e.g. not writing on walls, using dustbins, keeping silent in museums)";

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub question_count: usize,
}

impl GeneratorConfig {
    /// Read `QUIZ_AI_API_KEY`, `QUIZ_AI_BASE_URL` and `QUIZ_AI_MODEL`.
    ///
    /// Returns `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("QUIZ_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("QUIZ_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
            question_count: DEFAULT_QUESTION_COUNT,
        })
    }
}

/// Generates a fresh question batch with a chat-completions model.
#[derive(Clone)]
pub struct GeneratorSource {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl GeneratorSource {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

fn build_prompt(criteria: &QuizCriteria, count: usize) -> String {
    let topic = criteria.topic.as_deref().unwrap_or(DEFAULT_TOPIC);
    format!(
        "Generate {count} multiple-choice quiz questions for children about {topic}.\n\
         Target language: {language}.\n\
         The questions should be simple, fun, and educational, with four options each.\n\
         Include a short, funny or motivating \"encouragement\" message for getting the answer right.\n\
         Reply with JSON only: an array of objects with the fields \
         \"question\" (string), \"options\" (array of strings), \
         \"correctAnswer\" (0-based index of the correct option) and \"encouragement\" (string).",
        language = criteria.language,
    )
}

/// Extract validated questions from a model reply.
///
/// Accepts a bare JSON array or an object with a `questions` array, with or
/// without a Markdown code fence. Individual malformed entries are dropped.
///
/// # Errors
///
/// Returns `SourceError::Malformed` when the reply is not JSON of either
/// shape or no entry survives validation.
pub fn parse_generated(reply: &str) -> Result<Vec<Question>, SourceError> {
    let body = strip_code_fence(reply);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let entries = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("questions") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err(SourceError::Malformed("missing questions array".into())),
        },
        _ => return Err(SourceError::Malformed("expected a JSON array".into())),
    };

    let mut drafts = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<QuestionDraft>(entry) {
            Ok(draft) => drafts.push(draft),
            Err(err) => warn!("dropping generated entry {position}: {err}"),
        }
    }

    let (questions, rejected) = validate_drafts(drafts);
    for (position, err) in &rejected {
        warn!("dropping generated question {position}: {err}");
    }
    if questions.is_empty() {
        return Err(SourceError::Malformed("no usable questions in reply".into()));
    }
    Ok(questions)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language hint on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl QuestionSource for GeneratorSource {
    async fn fetch_questions(&self, criteria: &QuizCriteria) -> Result<QuestionBatch, SourceError> {
        let config = self.config.as_ref().ok_or(SourceError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(criteria, config.question_count),
            }],
            temperature: 0.7,
        };

        debug!("requesting {} generated questions", config.question_count);
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SourceError::Unavailable("empty generator response".into()))?;

        let questions = parse_generated(&content)?;
        Ok(QuestionBatch {
            tag: SessionTag::generated(&criteria.language),
            title: "Civic Sense Quiz".to_owned(),
            questions,
            time_limit_secs: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
