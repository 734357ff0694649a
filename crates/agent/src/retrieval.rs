use std::collections::HashMap;

use async_trait::async_trait;
use opsdeck_core::AgentError;
use tokio::sync::RwLock;

/// One ranked text passage returned for a query.
#[derive(Clone, Debug, PartialEq)]
pub struct Passage {
    pub content: String,
    pub source_file: String,
    pub chunk_index: u32,
    pub score: f32,
}

/// Vector-search collaborator. An empty result list is not an error; a
/// failure means the backend itself was unreachable.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<Passage>, AgentError>;
}

/// Token-overlap retrieval over in-process collections. Stands in for the
/// vector backend in tests and credential-less deployments.
#[derive(Default)]
pub struct InMemoryRetrieval {
    collections: RwLock<HashMap<String, Vec<Passage>>>,
}

impl InMemoryRetrieval {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_passages(&self, collection: &str, passages: Vec<Passage>) {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().extend(passages);
    }
}

#[async_trait]
impl RetrievalClient for InMemoryRetrieval {
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<Passage>, AgentError> {
        let collections = self.collections.read().await;
        let Some(passages) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let query_tokens: Vec<String> = query_text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut scored: Vec<(usize, Passage)> = passages
            .iter()
            .map(|passage| {
                let content = passage.content.to_lowercase();
                let overlap =
                    query_tokens.iter().filter(|token| content.contains(token.as_str())).count();
                (overlap, passage.clone())
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(top_k).map(|(_, passage)| passage).collect())
    }
}
