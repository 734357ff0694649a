//! The chat route's conversation and message store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::run::parse_timestamp;
use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub channel: String,
    pub agent_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub tokens: Option<i64>,
    pub latency_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn create(
        &self,
        channel: &str,
        agent_id: Option<&str>,
    ) -> Result<Conversation, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO conversations (id, channel, agent_id, status, created_at, updated_at)
            VALUES (?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(&id)
        .bind(channel)
        .bind(agent_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Conversation {
            id,
            channel: channel.to_string(),
            agent_id: agent_id.map(str::to_string),
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find(&self, id: &str) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, channel, agent_id, status, created_at, updated_at
            FROM conversations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| conversation_from_row(&r)).transpose()
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        tokens: Option<i64>,
        latency_ms: Option<i64>,
    ) -> Result<Message, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, tokens, latency_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(tokens)
        .bind(latency_ms)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(now.to_rfc3339())
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            tokens,
            latency_ms,
            created_at: now,
        })
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, role, content, tokens, latency_ms, created_at
            FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }
}

fn conversation_from_row(row: &SqliteRow) -> Result<Conversation, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Conversation {
        id: row.try_get("id")?,
        channel: row.try_get("channel")?,
        agent_id: row.try_get("agent_id")?,
        status: row.try_get("status")?,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        role: row.try_get("role")?,
        content: row.try_get("content")?,
        tokens: row.try_get("tokens")?,
        latency_ms: row.try_get("latency_ms")?,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}
