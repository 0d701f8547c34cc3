use quiz_core::model::{ResultSummary, SessionTag};

use super::SqliteRepository;
use super::mapping::{db_err, map_result_row, ser};
use crate::repository::{QuizResultRepository, ResultRow, StorageError};

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, summary: &ResultSummary) -> Result<i64, StorageError> {
        let answers = serde_json::to_string(summary.answers()).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    attempt_id, session_tag, score, total, answered_count,
                    answers, ending, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(summary.attempt_id().to_string())
        .bind(summary.session_tag().as_str())
        .bind(i64::from(summary.score()))
        .bind(i64::from(summary.total()))
        .bind(i64::from(summary.answered_count()))
        .bind(answers)
        .bind(summary.ending().as_str())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<ResultSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, attempt_id, session_tag, score, total, answered_count,
                    answers, ending, started_at, completed_at
                FROM quiz_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        Ok(map_result_row(&row)?.summary)
    }

    async fn list_recent_results(
        &self,
        tag: Option<&SessionTag>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT
                    id, attempt_id, session_tag, score, total, answered_count,
                    answers, ending, started_at, completed_at
                FROM quiz_results
            ",
        );

        let mut bind_index = 1;
        if tag.is_some() {
            sql.push_str(" WHERE session_tag = ?1");
            bind_index += 1;
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql);
        if let Some(tag) = tag {
            query = query.bind(tag.as_str());
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_result_row(row)?);
        }
        Ok(out)
    }
}
