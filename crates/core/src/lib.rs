//! Core domain for the opsdeck agent service.
//!
//! This crate holds the types shared by every layer:
//! - the run telemetry model (`StepRecord`, `RunRecord`, `TokenUsageEvent`)
//! - the incident classification vocabulary (`Severity`, `Category`)
//! - the error taxonomy (`AgentError`, `StorageError`)
//! - application configuration (`AppConfig`)
//! - the storage collaborator traits the agent runtime writes through
//!
//! It performs no I/O of its own beyond reading the config file.

pub mod config;
pub mod domain;
pub mod errors;
pub mod storage;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmPricing, LoadOptions, LogFormat};
pub use domain::incident::{Category, Severity};
pub use domain::run::{
    AgentId, RunRecord, RunStatus, StepRecord, StepStatus, TokenUsageEvent, PREVIEW_MAX_CHARS,
};
pub use errors::{AgentError, StorageError};
pub use storage::{KnowledgeStore, PersistenceSink};
