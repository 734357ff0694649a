use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opsdeck_core::{
    AgentError, AgentId, KnowledgeStore, LlmPricing, PersistenceSink, StepRecord, TokenUsageEvent,
};

use crate::ledger::TokenLedger;
use crate::llm::LlmClient;
use crate::recorder::StepRecorder;
use crate::retrieval::RetrievalClient;

/// Collaborators shared by every pipeline. The `llm` slot doubles as the mode
/// switch: `None` means every pipeline takes its deterministic mock path.
#[derive(Clone)]
pub struct AgentDeps {
    pub llm: Option<Arc<dyn LlmClient>>,
    pub retrieval: Arc<dyn RetrievalClient>,
    pub knowledge: Arc<dyn KnowledgeStore>,
}

/// A fixed, linear sequence of named steps transforming a per-run state.
///
/// Exactly three implementations exist: document Q&A, incident
/// classification, and conversation summarization. Steps never branch, never
/// repeat, and suspend only on collaborator calls.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn id(&self) -> AgentId;

    /// Run every step in order and return the final response text. Any step
    /// error aborts the remainder immediately.
    async fn execute(
        &self,
        ctx: &mut RunContext<'_>,
        input: &str,
    ) -> Result<String, AgentError>;
}

/// Per-run telemetry state, owned by one runner invocation and discarded
/// afterwards. Steps append records here; provider calls that report usage
/// are priced into the ledger and written through the sink immediately.
pub struct RunContext<'a> {
    recorder: StepRecorder,
    ledger: TokenLedger,
    conversation_id: Option<String>,
    sink: &'a dyn PersistenceSink,
}

impl<'a> RunContext<'a> {
    pub fn new(
        model: &str,
        pricing: LlmPricing,
        conversation_id: Option<&str>,
        sink: &'a dyn PersistenceSink,
    ) -> Self {
        Self {
            recorder: StepRecorder::new(),
            ledger: TokenLedger::new(model, pricing),
            conversation_id: conversation_id.map(str::to_string),
            sink,
        }
    }

    /// Append the record for a step that returned normally.
    pub fn record_step(
        &mut self,
        name: &str,
        duration: Duration,
        input_preview: Option<&str>,
        output_preview: Option<&str>,
    ) {
        self.recorder.record_completed(name, duration, input_preview, output_preview);
    }

    /// Price one provider call's reported usage and persist the event.
    pub async fn track_tokens(
        &mut self,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Result<(), AgentError> {
        let event = self.ledger.track(input_tokens, output_tokens, self.conversation_id.as_deref());
        self.sink.record_token_usage(event).await?;
        Ok(())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn steps(&self) -> &[StepRecord] {
        self.recorder.steps()
    }

    pub fn tokens_used(&self) -> u64 {
        self.ledger.total_tokens()
    }

    pub fn usage_events(&self) -> &[TokenUsageEvent] {
        self.ledger.events()
    }

    pub(crate) fn into_telemetry(self) -> (Vec<StepRecord>, u64) {
        let tokens_used = self.ledger.total_tokens();
        (self.recorder.into_steps(), tokens_used)
    }
}
