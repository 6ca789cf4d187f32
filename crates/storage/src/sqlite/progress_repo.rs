use async_trait::async_trait;
use chrono::Utc;
use course_core::model::Progress;
use sqlx::{Row, Sqlite, Transaction};

use crate::repository::{ProgressStore, StorageError};

use super::SqliteRepository;

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn decode(body: Option<String>) -> Result<Progress, StorageError> {
    match body {
        Some(body) => serde_json::from_str(&body).map_err(ser),
        None => Ok(Progress::default()),
    }
}

async fn load_in(tx: &mut Transaction<'_, Sqlite>) -> Result<Progress, StorageError> {
    let row = sqlx::query("SELECT body FROM progress_document WHERE id = 1")
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?;
    let body = row
        .map(|row| row.try_get::<String, _>("body"))
        .transpose()
        .map_err(ser)?;
    decode(body)
}

#[async_trait]
impl ProgressStore for SqliteRepository {
    async fn read(&self) -> Result<Progress, StorageError> {
        let row = sqlx::query("SELECT body FROM progress_document WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        let body = row
            .map(|row| row.try_get::<String, _>("body"))
            .transpose()
            .map_err(ser)?;
        decode(body)
    }

    async fn atomic_update(
        &self,
        mutation: &mut (dyn for<'p> FnMut(&'p mut Progress) + Send),
    ) -> Result<Progress, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let mut progress = load_in(&mut tx).await?;
        mutation(&mut progress);
        let body = serde_json::to_string(&progress).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO progress_document (id, body, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
        )
        .bind(body)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(progress)
    }

    async fn reset(&self) -> Result<Progress, StorageError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM progress_document")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(Progress::default())
    }
}
