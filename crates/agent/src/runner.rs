//! Drives one pipeline invocation end-to-end and guarantees exactly one
//! persisted run record per invocation, success or failure.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use opsdeck_core::{
    AgentError, AgentId, LlmPricing, PersistenceSink, RunRecord, RunStatus, StepRecord,
};

use crate::pipeline::{AgentDeps, Pipeline, RunContext};
use crate::pipelines::{DocPipeline, IncidentPipeline, SummaryPipeline};

/// What a completed run hands back to the caller, alongside the durable
/// record the sink kept.
#[derive(Debug)]
pub struct RunOutcome {
    pub response: String,
    pub record: RunRecord,
}

pub struct AgentRunner {
    deps: AgentDeps,
    sink: Arc<dyn PersistenceSink>,
    model: String,
    pricing: LlmPricing,
}

impl AgentRunner {
    pub fn new(
        deps: AgentDeps,
        sink: Arc<dyn PersistenceSink>,
        model: impl Into<String>,
        pricing: LlmPricing,
    ) -> Self {
        Self { deps, sink, model: model.into(), pricing }
    }

    fn pipeline_for(&self, agent: AgentId) -> Box<dyn Pipeline> {
        match agent {
            AgentId::Doc => Box::new(DocPipeline::new(&self.deps)),
            AgentId::Incident => Box::new(IncidentPipeline::new(&self.deps)),
            AgentId::Slack => Box::new(SummaryPipeline::new(&self.deps)),
        }
    }

    /// Resolve an agent by its string id and run it. An unknown id fails
    /// before any record is written.
    pub async fn run_agent(
        &self,
        agent_id: &str,
        input: &str,
        conversation_id: Option<&str>,
    ) -> Result<RunOutcome, AgentError> {
        let agent: AgentId = agent_id.parse()?;
        self.run(agent, input, conversation_id).await
    }

    /// Run one pipeline invocation. The run record persists whether the
    /// pipeline succeeds or fails; on failure the original pipeline error is
    /// returned and the record carries its message plus the steps that
    /// completed before the abort.
    pub async fn run(
        &self,
        agent: AgentId,
        input: &str,
        conversation_id: Option<&str>,
    ) -> Result<RunOutcome, AgentError> {
        let started = Instant::now();
        let pipeline = self.pipeline_for(agent);
        let mut ctx = RunContext::new(&self.model, self.pricing, conversation_id, &*self.sink);

        tracing::info!(
            event_name = "agent.run.started",
            agent = agent.as_str(),
            conversation_id = conversation_id.unwrap_or(""),
        );

        let result = pipeline.execute(&mut ctx, input).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let (steps, tokens_used) = ctx.into_telemetry();

        match result {
            Ok(response) => {
                let record = self
                    .persist(
                        agent,
                        conversation_id,
                        RunStatus::Completed,
                        duration_ms,
                        None,
                        steps,
                        tokens_used,
                    )
                    .await?;

                tracing::info!(
                    event_name = "agent.run.completed",
                    agent = agent.as_str(),
                    duration_ms,
                    tokens_used,
                );
                Ok(RunOutcome { response, record })
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.run.failed",
                    agent = agent.as_str(),
                    duration_ms,
                    error = %error,
                );

                let saved = self
                    .persist(
                        agent,
                        conversation_id,
                        RunStatus::Failed,
                        duration_ms,
                        Some(error.to_string()),
                        steps,
                        tokens_used,
                    )
                    .await;
                if let Err(save_error) = saved {
                    // the pipeline error stays the primary failure
                    tracing::error!(
                        event_name = "agent.run.record_lost",
                        agent = agent.as_str(),
                        error = %save_error,
                    );
                }
                Err(error)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        agent: AgentId,
        conversation_id: Option<&str>,
        status: RunStatus,
        duration_ms: u64,
        error: Option<String>,
        steps: Vec<StepRecord>,
        tokens_used: u64,
    ) -> Result<RunRecord, AgentError> {
        let record = RunRecord {
            id: None,
            agent,
            conversation_id: conversation_id.map(str::to_string),
            status,
            duration_ms,
            error,
            steps,
            tokens_used,
            created_at: Utc::now(),
        };
        Ok(self.sink.save_run(record).await?)
    }
}
