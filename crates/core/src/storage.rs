//! Storage collaborator traits the agent runtime writes through.
//!
//! The runtime never talks to a database directly; it hands finished run
//! records and token usage events to a [`PersistenceSink`], and the document
//! pipeline's keyword fallback reads stored chunks through a
//! [`KnowledgeStore`]. Implementations must be safe under concurrent
//! independent writes - each run writes only its own records.

use async_trait::async_trait;

use crate::domain::run::{RunRecord, TokenUsageEvent};
use crate::errors::StorageError;

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store one finished run. Assigns an identifier if the record carries
    /// none and returns the stored form.
    async fn save_run(&self, record: RunRecord) -> Result<RunRecord, StorageError>;

    /// Store one token usage event.
    async fn record_token_usage(&self, event: TokenUsageEvent) -> Result<(), StorageError>;
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Return up to `limit` stored chunk texts containing `term`
    /// (case-insensitive substring match).
    async fn find_chunks_matching(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError>;
}
