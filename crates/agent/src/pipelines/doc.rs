use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use opsdeck_core::{AgentError, AgentId, KnowledgeStore};

use crate::llm::LlmClient;
use crate::pipeline::{AgentDeps, Pipeline, RunContext};
use crate::retrieval::RetrievalClient;

const COLLECTION: &str = "project-docs";
const TOP_K: usize = 3;
const GENERATE_MAX_TOKENS: u32 = 1024;
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
const NO_DOCUMENTS_FALLBACK: &str =
    "No relevant documents found. Please provide more context or try a different query.";

const GENERATE_SYSTEM_PROMPT: &str = "\
You are a helpful AI assistant that answers questions based on the provided context.
Use only the information from the context to answer. If the context doesn't contain relevant information, say so.
Be concise and direct in your responses.";

/// Retrieval-augmented question answering: retrieve passages, then generate
/// an answer constrained to them.
pub struct DocPipeline {
    llm: Option<Arc<dyn LlmClient>>,
    retrieval: Arc<dyn RetrievalClient>,
    knowledge: Arc<dyn KnowledgeStore>,
}

struct DocState {
    query: String,
    retrieved_docs: Vec<String>,
    context: String,
    response: String,
}

impl DocPipeline {
    pub fn new(deps: &AgentDeps) -> Self {
        Self {
            llm: deps.llm.clone(),
            retrieval: Arc::clone(&deps.retrieval),
            knowledge: Arc::clone(&deps.knowledge),
        }
    }

    /// Retrieve up to three passages for the query. A retrieval failure or an
    /// empty result falls back to a keyword match over stored chunks, and
    /// failing that, to a single sentinel passage; retrieval errors never
    /// surface to the caller.
    async fn retrieve_docs(
        &self,
        ctx: &mut RunContext<'_>,
        mut state: DocState,
    ) -> Result<DocState, AgentError> {
        let started = Instant::now();

        let mut docs: Vec<String> = match self
            .retrieval
            .query(COLLECTION, &state.query, TOP_K)
            .await
        {
            Ok(passages) => passages.into_iter().map(|passage| passage.content).collect(),
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.doc.retrieval_unavailable",
                    error = %error,
                    "vector retrieval failed, falling back to keyword search"
                );
                Vec::new()
            }
        };

        if docs.is_empty() {
            if let Some(first_token) = state.query.split_whitespace().next() {
                docs = self.knowledge.find_chunks_matching(first_token, TOP_K).await?;
            }
        }

        if docs.is_empty() {
            docs.push(NO_DOCUMENTS_FALLBACK.to_string());
        }

        state.context = docs.join(CONTEXT_SEPARATOR);
        state.retrieved_docs = docs;

        let output_preview = format!("Retrieved {} documents", state.retrieved_docs.len());
        ctx.record_step(
            "retrieve_docs",
            started.elapsed(),
            Some(&state.query),
            Some(&output_preview),
        );
        Ok(state)
    }

    async fn generate_response(
        &self,
        ctx: &mut RunContext<'_>,
        mut state: DocState,
    ) -> Result<DocState, AgentError> {
        let started = Instant::now();

        let Some(llm) = &self.llm else {
            let response = format!(
                "[Mock Response] Based on the retrieved documents about '{}', here is a \
                 synthesized answer. In production, this would use Claude to generate a \
                 contextual response based on the retrieved documents.",
                state.query
            );
            ctx.record_step(
                "generate_response",
                started.elapsed(),
                Some(&state.context),
                Some(&response),
            );
            state.response = response;
            return Ok(state);
        };

        let user = format!("Context:\n{}\n\nQuestion: {}", state.context, state.query);
        let completion = llm.complete(GENERATE_SYSTEM_PROMPT, &user, GENERATE_MAX_TOKENS).await?;

        if let Some((input_tokens, output_tokens)) = completion.usage() {
            ctx.track_tokens(input_tokens, output_tokens).await?;
        }

        let input_preview = format!("Query: {}", state.query);
        ctx.record_step(
            "generate_response",
            started.elapsed(),
            Some(&input_preview),
            Some(&completion.text),
        );

        state.response = completion.text;
        Ok(state)
    }
}

#[async_trait]
impl Pipeline for DocPipeline {
    fn id(&self) -> AgentId {
        AgentId::Doc
    }

    async fn execute(
        &self,
        ctx: &mut RunContext<'_>,
        input: &str,
    ) -> Result<String, AgentError> {
        let state = DocState {
            query: input.to_string(),
            retrieved_docs: Vec::new(),
            context: String::new(),
            response: String::new(),
        };

        let state = self.retrieve_docs(ctx, state).await?;
        let state = self.generate_response(ctx, state).await?;
        Ok(state.response)
    }
}
