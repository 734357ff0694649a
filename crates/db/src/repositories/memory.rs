//! In-memory repository doubles for tests and credential-less demos.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use opsdeck_core::{
    KnowledgeStore, PersistenceSink, RunRecord, StorageError, TokenUsageEvent,
};

use super::conversation::{Conversation, Message};
use super::{ConversationRepository, RepositoryError};

/// `PersistenceSink` backed by vectors, assigning sequential ids.
#[derive(Default)]
pub struct InMemoryRunStore {
    runs: Mutex<Vec<RunRecord>>,
    events: Mutex<Vec<TokenUsageEvent>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn events(&self) -> Vec<TokenUsageEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PersistenceSink for InMemoryRunStore {
    async fn save_run(&self, mut record: RunRecord) -> Result<RunRecord, StorageError> {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        if record.id.is_none() {
            record.id = Some(format!("run-{}", runs.len() + 1));
        }
        runs.push(record.clone());
        Ok(record)
    }

    async fn record_token_usage(&self, mut event: TokenUsageEvent) -> Result<(), StorageError> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if event.id.is_none() {
            event.id = Some(format!("usage-{}", events.len() + 1));
        }
        events.push(event);
        Ok(())
    }
}

/// `KnowledgeStore` over a fixed chunk list, substring-matched without case.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    chunks: Mutex<Vec<String>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<String>) -> Self {
        Self { chunks: Mutex::new(chunks) }
    }

    pub fn add_chunk(&self, content: impl Into<String>) {
        self.chunks.lock().unwrap_or_else(|e| e.into_inner()).push(content.into());
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn find_chunks_matching(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        let term_lower = term.to_lowercase();
        let chunks = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
        Ok(chunks
            .iter()
            .filter(|chunk| chunk.to_lowercase().contains(&term_lower))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// `ConversationRepository` backed by vectors.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: Mutex<Vec<Conversation>>,
    messages: Mutex<Vec<Message>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(
        &self,
        channel: &str,
        agent_id: Option<&str>,
    ) -> Result<Conversation, RepositoryError> {
        let mut conversations =
            self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let conversation = Conversation {
            id: format!("conv-{}", conversations.len() + 1),
            channel: channel.to_string(),
            agent_id: agent_id.map(str::to_string),
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        };
        conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn find(&self, id: &str) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        Ok(conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        tokens: Option<i64>,
        latency_ms: Option<i64>,
    ) -> Result<Message, RepositoryError> {
        let now = Utc::now();
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        let message = Message {
            id: format!("msg-{}", messages.len() + 1),
            conversation_id: conversation_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            tokens,
            latency_ms,
            created_at: now,
        };
        messages.push(message.clone());
        drop(messages);

        let mut conversations =
            self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(conversation) =
            conversations.iter_mut().find(|c| c.id == conversation_id)
        {
            conversation.updated_at = now;
        }
        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        Ok(messages.iter().filter(|m| m.conversation_id == conversation_id).cloned().collect())
    }
}
