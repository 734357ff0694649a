use thiserror::Error;

/// Failures that can abort an agent run.
///
/// `Retrieval` never reaches a caller: the document pipeline masks it with its
/// local keyword fallback. Every other variant propagates out of the pipeline,
/// is recorded verbatim on the run record, and is then re-raised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("provider call failed: {0}")]
    Provider(String),
    #[error("retrieval backend unavailable: {0}")]
    Retrieval(String),
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("agent execution failed: {0}")]
    Execution(String),
}

impl From<StorageError> for AgentError {
    fn from(value: StorageError) -> Self {
        Self::Execution(value.to_string())
    }
}

/// Failures from the persistence sink or knowledge store collaborators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::{AgentError, StorageError};

    #[test]
    fn error_messages_carry_the_cause_verbatim() {
        let error = AgentError::Provider("401 invalid x-api-key".to_string());
        assert_eq!(error.to_string(), "provider call failed: 401 invalid x-api-key");
    }

    #[test]
    fn storage_errors_surface_as_execution_errors() {
        let error = AgentError::from(StorageError::Backend("disk full".to_string()));
        assert!(matches!(error, AgentError::Execution(ref message) if message.contains("disk full")));
    }
}
