use quiz_core::model::{
    AttemptId, Question, QuestionDraft, QuestionId, QuizId, ResultSummary, SessionEnding,
    SessionTag,
};
use sqlx::Row;

use crate::repository::{ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Unique-constraint failures become `Conflict`; everything else is a connection error.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
        return StorageError::Conflict;
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = i64_to_u64("question_id", row.try_get::<i64, _>("id").map_err(ser)?)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;

    let draft = QuestionDraft {
        id: Some(id),
        prompt: row.try_get("prompt").map_err(ser)?,
        options,
        correct_option_index: Some(row.try_get::<i64, _>("correct_option_index").map_err(ser)?),
        encouragement: row.try_get("encouragement").map_err(ser)?,
    };
    draft.validate(QuestionId::new(id)).map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let attempt_id: AttemptId = row
        .try_get::<String, _>("attempt_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let session_tag = SessionTag::new(row.try_get::<String, _>("session_tag").map_err(ser)?);
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<Option<usize>> = serde_json::from_str(&answers_json).map_err(ser)?;
    let ending: SessionEnding = row
        .try_get::<String, _>("ending")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let summary = ResultSummary::from_persisted(
        attempt_id,
        session_tag,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        u32_from_i64(
            "answered_count",
            row.try_get::<i64, _>("answered_count").map_err(ser)?,
        )?,
        answers,
        ending,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(ResultRow::new(id, summary))
}
