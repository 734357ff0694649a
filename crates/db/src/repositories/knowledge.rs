//! Keyword lookup over stored knowledge chunks, the doc pipeline's fallback
//! when vector retrieval returns nothing.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use opsdeck_core::{KnowledgeStore, StorageError};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlKnowledgeStore {
    pool: DbPool,
}

impl SqlKnowledgeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store chunks in document order under one collection and source file.
    pub async fn add_chunks(
        &self,
        collection: &str,
        source_file: &str,
        chunks: &[String],
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        for (index, content) in chunks.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO knowledge_chunks (
                    id, collection, content, source_file, chunk_index, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(collection)
            .bind(content)
            .bind(source_file)
            .bind(index as i64)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn find_matching(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT content
            FROM knowledge_chunks
            WHERE lower(content) LIKE '%' || lower(?) || '%'
            ORDER BY source_file ASC, chunk_index ASC
            LIMIT ?
            "#,
        )
        .bind(term)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("content")).collect())
    }
}

#[async_trait]
impl KnowledgeStore for SqlKnowledgeStore {
    async fn find_chunks_matching(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        Ok(self.find_matching(term, limit).await?)
    }
}
