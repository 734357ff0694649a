//! Agent runtime - deterministic multi-step LLM pipelines with telemetry.
//!
//! Every agent follows the same constrained lifecycle:
//! 1. **Pipeline execution** (`pipelines`) - a fixed, linear sequence of named
//!    steps transforming a per-run state, each step timed and recorded
//! 2. **Telemetry** (`recorder`, `ledger`) - ordered step records plus token
//!    usage and cost accounting
//! 3. **Persistence** (`runner`) - exactly one durable run record per
//!    invocation, success or failure
//!
//! # Key Types
//!
//! - `AgentRunner` - drives a pipeline end-to-end (see `runner`)
//! - `Pipeline` - the capability interface the three agents implement
//! - `LlmClient` / `RetrievalClient` - pluggable collaborator traits
//!
//! # Degraded mode
//!
//! When no provider credential is configured, every pipeline completes
//! deterministically from local keyword rules and string templates. Mock mode
//! is a configuration decision, not an error-recovery path: step previews,
//! durations, and response shape are indistinguishable from the live path.

pub mod ledger;
pub mod llm;
pub mod pipeline;
pub mod pipelines;
pub mod recorder;
pub mod retrieval;
pub mod runner;

#[cfg(test)]
mod testutil;

pub use ledger::TokenLedger;
pub use llm::{AnthropicClient, Completion, LlmClient};
pub use pipeline::{AgentDeps, Pipeline, RunContext};
pub use pipelines::{DocPipeline, IncidentPipeline, SummaryPipeline};
pub use recorder::StepRecorder;
pub use retrieval::{InMemoryRetrieval, Passage, RetrievalClient};
pub use runner::{AgentRunner, RunOutcome};
