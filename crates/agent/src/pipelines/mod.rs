//! The three concrete agent pipelines.
//!
//! Each one is a fixed two-step flow over its own typed state. Mock mode
//! (no configured LLM client) substitutes deterministic local logic for the
//! provider calls; the recorded telemetry keeps the same shape either way.

mod doc;
mod incident;
mod summary;

pub use doc::DocPipeline;
pub use incident::IncidentPipeline;
pub use summary::SummaryPipeline;
