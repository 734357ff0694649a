use async_trait::async_trait;
use thiserror::Error;

use opsdeck_core::StorageError;

pub mod conversation;
pub mod knowledge;
pub mod memory;
pub mod run;

pub use conversation::{Conversation, Message, SqlConversationRepository};
pub use knowledge::SqlKnowledgeStore;
pub use memory::{InMemoryConversationRepository, InMemoryKnowledgeStore, InMemoryRunStore};
pub use run::SqlRunStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StorageError {
    fn from(value: RepositoryError) -> Self {
        StorageError::Backend(value.to_string())
    }
}

/// Store for the chat route's conversations and their messages.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Create a conversation on the given channel, optionally pinned to one
    /// agent.
    async fn create(
        &self,
        channel: &str,
        agent_id: Option<&str>,
    ) -> Result<Conversation, RepositoryError>;

    async fn find(&self, id: &str) -> Result<Option<Conversation>, RepositoryError>;

    /// Append a message and bump the conversation's `updated_at`.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        tokens: Option<i64>,
        latency_ms: Option<i64>,
    ) -> Result<Message, RepositoryError>;

    async fn list_messages(&self, conversation_id: &str)
        -> Result<Vec<Message>, RepositoryError>;
}
