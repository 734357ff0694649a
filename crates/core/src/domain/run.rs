use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Maximum characters kept in a step's input/output preview.
pub const PREVIEW_MAX_CHARS: usize = 200;

/// The closed set of agent pipelines this service exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Doc,
    Incident,
    Slack,
}

impl AgentId {
    pub const ALL: [AgentId; 3] = [AgentId::Doc, AgentId::Incident, AgentId::Slack];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Incident => "incident",
            Self::Slack => "slack",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Doc => "DocAgent",
            Self::Incident => "IncidentAgent",
            Self::Slack => "SlackAgent",
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentId {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "doc" => Ok(Self::Doc),
            "incident" => Ok(Self::Incident),
            "slack" => Ok(Self::Slack),
            other => Err(AgentError::UnknownAgent(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One executed pipeline step. Immutable once appended to a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
    pub input_preview: Option<String>,
    pub output_preview: Option<String>,
}

impl StepRecord {
    /// Build a record for a step that returned normally. Previews are
    /// truncated to [`PREVIEW_MAX_CHARS`] characters on construction.
    pub fn completed(
        name: impl Into<String>,
        duration_ms: u64,
        input_preview: Option<&str>,
        output_preview: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Completed,
            duration_ms: Some(duration_ms),
            input_preview: input_preview.map(truncate_preview),
            output_preview: output_preview.map(truncate_preview),
        }
    }
}

fn truncate_preview(text: &str) -> String {
    text.chars().take(PREVIEW_MAX_CHARS).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Durable audit record of one pipeline execution. Written exactly once per
/// runner invocation, success or failure, and never mutated afterward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Assigned by the persistence sink when absent.
    pub id: Option<String>,
    pub agent: AgentId,
    pub conversation_id: Option<String>,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
    pub tokens_used: u64,
    pub created_at: DateTime<Utc>,
}

/// One billing-relevant record of provider token consumption. Emitted once
/// per provider call that reports usage, independent of step records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenUsageEvent {
    /// Assigned by the persistence sink when absent.
    pub id: Option<String>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub conversation_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
