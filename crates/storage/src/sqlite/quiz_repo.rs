use quiz_core::model::{Quiz, QuizDifficulty, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_question_row, quiz_id_from_i64, ser};
use crate::repository::{QuizRepository, StorageError};

impl SqliteRepository {
    async fn load_quiz_row(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Quiz, StorageError> {
        let raw_id: i64 = row.try_get("id").map_err(ser)?;
        let id = quiz_id_from_i64(raw_id)?;
        let difficulty: QuizDifficulty = row
            .try_get::<String, _>("difficulty")
            .map_err(ser)?
            .parse()
            .map_err(ser)?;
        let time_limit_secs = row
            .try_get::<Option<i64>, _>("time_limit_secs")
            .map_err(ser)?
            .map(|v| {
                u32::try_from(v)
                    .map_err(|_| StorageError::Serialization(format!("invalid time limit: {v}")))
            })
            .transpose()?;

        let question_rows = sqlx::query(
            r"
                SELECT id, prompt, options, correct_option_index, encouragement
                FROM questions
                WHERE quiz_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let questions = question_rows
            .iter()
            .map(map_question_row)
            .collect::<Result<Vec<_>, _>>()?;

        Quiz::new(
            id,
            row.try_get::<String, _>("title").map_err(ser)?,
            difficulty,
            time_limit_secs,
            questions,
        )
        .map_err(ser)
    }
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let quiz_id = id_i64("quiz_id", quiz.id().value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
                INSERT INTO quizzes (id, title, difficulty, time_limit_secs)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    difficulty = excluded.difficulty,
                    time_limit_secs = excluded.time_limit_secs
            ",
        )
        .bind(quiz_id)
        .bind(quiz.title())
        .bind(quiz.difficulty().as_str())
        .bind(quiz.time_limit_secs().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("DELETE FROM questions WHERE quiz_id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for (position, question) in quiz.questions().iter().enumerate() {
            let options = serde_json::to_string(question.options()).map_err(ser)?;
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            let correct = i64::try_from(question.correct_option_index())
                .map_err(|_| StorageError::Serialization("correct index overflow".into()))?;

            sqlx::query(
                r"
                    INSERT INTO questions (
                        quiz_id, id, position, prompt, options,
                        correct_option_index, encouragement
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(quiz_id)
            .bind(id_i64("question_id", question.id().value())?)
            .bind(position)
            .bind(question.prompt())
            .bind(options)
            .bind(correct)
            .bind(question.encouragement())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, difficulty, time_limit_secs
                FROM quizzes
                WHERE id = ?1
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        self.load_quiz_row(&row).await
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, difficulty, time_limit_secs
                FROM quizzes
                ORDER BY id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.load_quiz_row(row).await?);
        }
        Ok(out)
    }
}
