//! SQLite persistence for agent runs, token usage, knowledge chunks, and
//! chat conversations.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    Conversation, ConversationRepository, InMemoryConversationRepository, InMemoryKnowledgeStore,
    InMemoryRunStore, Message, RepositoryError, SqlConversationRepository, SqlKnowledgeStore,
    SqlRunStore,
};
