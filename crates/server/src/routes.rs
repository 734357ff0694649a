//! The chat and agent-catalog API surface.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use opsdeck_agent::AgentRunner;
use opsdeck_core::{AgentError, AgentId, StepRecord};
use opsdeck_db::ConversationRepository;

#[derive(Clone)]
pub struct ApiState {
    pub runner: Arc<AgentRunner>,
    pub conversations: Arc<dyn ConversationRepository>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/agents", get(list_agents))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub agent_id: Option<String>,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    pub agent_id: String,
    pub steps: Vec<StepRecord>,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct AgentDetail {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub steps: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub items: Vec<AgentDetail>,
}

pub enum ApiError {
    UnknownAgent(String),
    ConversationNotFound,
    Storage(String),
    AgentFailed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::UnknownAgent(id) => {
                (StatusCode::BAD_REQUEST, format!("Unknown agent: {id}"))
            }
            ApiError::ConversationNotFound => {
                (StatusCode::NOT_FOUND, "Conversation not found".to_string())
            }
            ApiError::Storage(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            ApiError::AgentFailed(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Agent error: {message}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<opsdeck_db::RepositoryError> for ApiError {
    fn from(value: opsdeck_db::RepositoryError) -> Self {
        ApiError::Storage(value.to_string())
    }
}

/// Run one agent turn inside a conversation. The conversation is created on
/// first contact; the user message is stored before the run, the assistant
/// message after it.
async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let started = Instant::now();

    let agent_id = request.agent_id.as_deref().unwrap_or("doc");
    let agent: AgentId =
        agent_id.parse().map_err(|_| ApiError::UnknownAgent(agent_id.to_string()))?;

    let conversation = match &request.conversation_id {
        Some(id) => state
            .conversations
            .find(id)
            .await?
            .ok_or(ApiError::ConversationNotFound)?,
        None => state.conversations.create("chat", Some(agent.as_str())).await?,
    };

    state
        .conversations
        .append_message(&conversation.id, "user", &request.message, None, None)
        .await?;

    let outcome = state
        .runner
        .run(agent, &request.message, Some(&conversation.id))
        .await
        .map_err(|error: AgentError| ApiError::AgentFailed(error.to_string()))?;

    let latency_ms = started.elapsed().as_millis() as u64;
    state
        .conversations
        .append_message(
            &conversation.id,
            "assistant",
            &outcome.response,
            Some(outcome.record.tokens_used as i64),
            Some(latency_ms as i64),
        )
        .await?;

    Ok(Json(ChatResponse {
        response: outcome.response,
        conversation_id: conversation.id,
        agent_id: agent.as_str().to_string(),
        steps: outcome.record.steps,
        tokens_used: outcome.record.tokens_used,
        latency_ms,
    }))
}

async fn list_agents() -> Json<AgentListResponse> {
    Json(AgentListResponse {
        items: AgentId::ALL.iter().map(|agent| agent_detail(*agent)).collect(),
    })
}

fn agent_detail(agent: AgentId) -> AgentDetail {
    let (description, steps): (&'static str, &'static [&'static str]) = match agent {
        AgentId::Doc => (
            "RAG agent for answering questions from documents",
            &["retrieve_docs", "generate_response"],
        ),
        AgentId::Incident => (
            "Classifies log snippets and proposes remediation actions",
            &["classify", "propose_actions"],
        ),
        AgentId::Slack => (
            "Summarizes conversations and extracts action items",
            &["summarize", "extract_actions"],
        ),
    };

    AgentDetail { id: agent.as_str(), name: agent.display_name(), description, steps }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    use opsdeck_agent::{AgentDeps, AgentRunner, InMemoryRetrieval};
    use opsdeck_core::LlmPricing;
    use opsdeck_db::{InMemoryConversationRepository, InMemoryKnowledgeStore, InMemoryRunStore};

    use super::{router, ApiState};

    fn mock_state() -> ApiState {
        let deps = AgentDeps {
            llm: None,
            retrieval: Arc::new(InMemoryRetrieval::new()),
            knowledge: Arc::new(InMemoryKnowledgeStore::new()),
        };
        let runner = AgentRunner::new(
            deps,
            Arc::new(InMemoryRunStore::new()),
            "claude-3-5-sonnet-20241022",
            LlmPricing { input_cost_per_mtok: 3.0, output_cost_per_mtok: 15.0 },
        );
        ApiState {
            runner: Arc::new(runner),
            conversations: Arc::new(InMemoryConversationRepository::new()),
        }
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn chat_runs_the_requested_agent_and_returns_telemetry() {
        let app = router(mock_state());

        let response = app
            .oneshot(chat_request(
                r#"{"message": "ERROR: database connection failed", "agent_id": "incident"}"#,
            ))
            .await
            .expect("chat response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["response"].as_str().expect("response").contains("## Incident Analysis"));
        assert_eq!(body["agent_id"], "incident");
        assert!(!body["conversation_id"].as_str().expect("conversation id").is_empty());
        assert_eq!(body["steps"].as_array().expect("steps").len(), 2);
        assert_eq!(body["tokens_used"], 0);
    }

    #[tokio::test]
    async fn chat_defaults_to_the_doc_agent() {
        let app = router(mock_state());

        let response = app
            .oneshot(chat_request(r#"{"message": "how do I reset a password?"}"#))
            .await
            .expect("chat response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["agent_id"], "doc");
        assert!(body["response"].as_str().expect("response").starts_with("[Mock Response]"));
    }

    #[tokio::test]
    async fn chat_continues_an_existing_conversation() {
        let state = mock_state();
        let app = router(state.clone());

        let first = app
            .clone()
            .oneshot(chat_request(r#"{"message": "first", "agent_id": "slack"}"#))
            .await
            .expect("first response");
        let first_body = json_body(first).await;
        let conversation_id = first_body["conversation_id"].as_str().expect("id").to_string();

        let second = app
            .oneshot(chat_request(&format!(
                r#"{{"message": "second", "agent_id": "slack", "conversation_id": "{conversation_id}"}}"#
            )))
            .await
            .expect("second response");

        assert_eq!(second.status(), StatusCode::OK);
        let second_body = json_body(second).await;
        assert_eq!(second_body["conversation_id"], conversation_id.as_str());

        // two user and two assistant messages
        let messages =
            state.conversations.list_messages(&conversation_id).await.expect("messages");
        assert_eq!(messages.len(), 4);
    }

    #[tokio::test]
    async fn chat_rejects_unknown_agents_with_400() {
        let app = router(mock_state());

        let response = app
            .oneshot(chat_request(r#"{"message": "hello", "agent_id": "quantum"}"#))
            .await
            .expect("chat response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["detail"], "Unknown agent: quantum");
    }

    #[tokio::test]
    async fn chat_rejects_unknown_conversations_with_404() {
        let app = router(mock_state());

        let response = app
            .oneshot(chat_request(
                r#"{"message": "hello", "agent_id": "doc", "conversation_id": "missing"}"#,
            ))
            .await
            .expect("chat response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn agents_endpoint_lists_the_three_pipelines() {
        let app = router(mock_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/agents")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("agents response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let items = body["items"].as_array().expect("items");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], "doc");
        assert_eq!(items[0]["name"], "DocAgent");
        assert_eq!(items[1]["steps"][0], "classify");
    }
}
