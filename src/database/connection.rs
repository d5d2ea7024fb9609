use std::collections::HashMap;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use super::model::{Difficulty, Question, Topic, UserProfile};
use crate::importer::ImportBatch;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("question references unknown topic '{0}'")]
    UnknownTopic(String),
}

/// How many topics and questions a batch insert actually added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub topics: usize,
    pub questions: usize,
}

pub struct Connection {
    pool: SqlitePool,
}

impl Connection {
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store for tests. The pool is capped at one connection so
    /// every query sees the same database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }
}

pub trait QuizStore {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError>;

    async fn list_questions(&self, topic: &str) -> Result<Vec<Question>, StoreError>;

    async fn replace_all(&self, batch: &ImportBatch) -> Result<ImportStats, StoreError>;

    async fn append_all(&self, batch: &ImportBatch) -> Result<ImportStats, StoreError>;

    async fn clear_all(&self) -> Result<(), StoreError>;

    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StoreError>;
}

impl QuizStore for Connection {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        let records =
            sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM topics ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(records
            .into_iter()
            .map(|(id, name)| Topic { id, name })
            .collect())
    }

    async fn list_questions(&self, topic: &str) -> Result<Vec<Question>, StoreError> {
        let records = sqlx::query_as::<_, (i64, String, String, String, String)>(
            "SELECT q.id, q.question_text, q.hint, q.answer, q.difficulty \
             FROM questions q JOIN topics t ON q.topic_id = t.id \
             WHERE LOWER(t.name) = LOWER(?1) ORDER BY q.id",
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|(id, text, hint, answer, difficulty)| Question {
                id,
                text,
                hint,
                answer,
                difficulty: Difficulty::parse(&difficulty),
            })
            .collect())
    }

    async fn replace_all(&self, batch: &ImportBatch) -> Result<ImportStats, StoreError> {
        log::debug!("replacing the question bank");
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM questions").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM topics").execute(&mut *tx).await?;

        let stats = insert_batch(&mut tx, batch).await?;
        tx.commit().await?;

        Ok(stats)
    }

    async fn append_all(&self, batch: &ImportBatch) -> Result<ImportStats, StoreError> {
        log::debug!("appending to the question bank");
        let mut tx = self.pool.begin().await?;
        let stats = insert_batch(&mut tx, batch).await?;
        tx.commit().await?;

        Ok(stats)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM questions").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM topics").execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, first_name, username) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET first_name = excluded.first_name, \
             username = excluded.username",
        )
        .bind(user.telegram_id)
        .bind(&user.first_name)
        .bind(&user.username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Inserts a parsed batch inside the caller's transaction. A row naming a
/// topic outside the batch's topic list fails the whole transaction.
async fn insert_batch(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    batch: &ImportBatch,
) -> Result<ImportStats, StoreError> {
    let mut topic_ids: HashMap<&str, i64> = HashMap::new();
    let mut stats = ImportStats::default();

    for name in &batch.topics {
        let inserted =
            sqlx::query("INSERT INTO topics (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
                .bind(name)
                .execute(&mut **tx)
                .await?;
        if inserted.rows_affected() > 0 {
            stats.topics += 1;
        }

        let id: i64 = sqlx::query_scalar("SELECT id FROM topics WHERE name = ?1")
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;
        topic_ids.insert(name.as_str(), id);
    }

    for row in &batch.rows {
        let topic_id = topic_ids
            .get(row.topic.as_str())
            .copied()
            .ok_or_else(|| StoreError::UnknownTopic(row.topic.clone()))?;

        sqlx::query(
            "INSERT INTO questions (topic_id, question_text, hint, answer, difficulty) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(topic_id)
        .bind(&row.question)
        .bind(&row.hint)
        .bind(&row.answer)
        .bind(row.difficulty.as_str())
        .execute(&mut **tx)
        .await?;
        stats.questions += 1;
    }

    Ok(stats)
}
