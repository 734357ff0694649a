//! Trait doubles shared by the pipeline and runner tests.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use opsdeck_core::{
    AgentError, KnowledgeStore, PersistenceSink, RunRecord, StorageError, TokenUsageEvent,
};

use crate::llm::{Completion, LlmClient};
use crate::pipeline::AgentDeps;
use crate::retrieval::InMemoryRetrieval;

/// Records every persisted run and usage event for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub runs: Mutex<Vec<RunRecord>>,
    pub events: Mutex<Vec<TokenUsageEvent>>,
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn save_run(&self, mut record: RunRecord) -> Result<RunRecord, StorageError> {
        if record.id.is_none() {
            record.id = Some(format!("run-{}", self.runs.lock().unwrap().len() + 1));
        }
        self.runs.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn record_token_usage(&self, event: TokenUsageEvent) -> Result<(), StorageError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Knowledge store double returning a fixed chunk list for any term.
pub struct StaticKnowledge(pub Vec<String>);

impl StaticKnowledge {
    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

#[async_trait]
impl KnowledgeStore for StaticKnowledge {
    async fn find_chunks_matching(
        &self,
        _term: &str,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

/// LLM double that replays scripted completions in order, or fails every
/// call with a fixed provider error.
pub struct ScriptedLlm {
    responses: Mutex<Vec<Completion>>,
    failure: Option<String>,
}

impl ScriptedLlm {
    pub fn replying(texts: &[(&str, Option<(u32, u32)>)]) -> Self {
        let responses = texts
            .iter()
            .map(|(text, usage)| Completion {
                text: (*text).to_string(),
                input_tokens: usage.map(|(input, _)| input),
                output_tokens: usage.map(|(_, output)| output),
            })
            .collect();
        Self { responses: Mutex::new(responses), failure: None }
    }

    pub fn failing(message: &str) -> Self {
        Self { responses: Mutex::new(Vec::new()), failure: Some(message.to_string()) }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: u32,
    ) -> Result<Completion, AgentError> {
        if let Some(message) = &self.failure {
            return Err(AgentError::Provider(message.clone()));
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(AgentError::Provider("scripted responses exhausted".to_string()));
        }
        Ok(responses.remove(0))
    }
}

/// Deps wired for mock mode: no LLM, empty retrieval, empty knowledge base.
pub fn mock_deps() -> AgentDeps {
    AgentDeps {
        llm: None,
        retrieval: Arc::new(InMemoryRetrieval::new()),
        knowledge: Arc::new(StaticKnowledge::empty()),
    }
}

/// Deps wired for live mode with the given scripted client.
pub fn live_deps(llm: ScriptedLlm) -> AgentDeps {
    AgentDeps { llm: Some(Arc::new(llm)), ..mock_deps() }
}
