use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use opsdeck_core::{AgentError, AgentId};

use crate::llm::LlmClient;
use crate::pipeline::{AgentDeps, Pipeline, RunContext};

const STEP_MAX_TOKENS: u32 = 512;

const SUMMARIZE_SYSTEM_PROMPT: &str = "\
You are an expert at summarizing conversations.
Create a concise summary that captures:
1. Main topics discussed
2. Key points made
3. Overall outcome/conclusion

Keep the summary to 2-3 paragraphs maximum.";

const EXTRACT_SYSTEM_PROMPT: &str = "\
You are an expert at identifying action items and decisions from conversations.
Extract:
1. ACTION ITEMS: Tasks that need to be done (format: \"- [owner if mentioned]: task\")
2. KEY DECISIONS: Important decisions made during the conversation

Format your response as:
ACTION ITEMS:
- item 1
- item 2

KEY DECISIONS:
- decision 1
- decision 2";

/// Conversation digest: summarize the transcript, then extract action items
/// and key decisions.
pub struct SummaryPipeline {
    llm: Option<Arc<dyn LlmClient>>,
}

struct SummaryState {
    conversation_text: String,
    summary: String,
    action_items: Vec<String>,
    key_decisions: Vec<String>,
}

impl SummaryPipeline {
    pub fn new(deps: &AgentDeps) -> Self {
        Self { llm: deps.llm.clone() }
    }

    async fn summarize(
        &self,
        ctx: &mut RunContext<'_>,
        mut state: SummaryState,
    ) -> Result<SummaryState, AgentError> {
        let started = Instant::now();

        match &self.llm {
            None => {
                let word_count = state.conversation_text.split_whitespace().count();
                state.summary = format!(
                    "[Mock Summary] This conversation contains approximately {word_count} words. \
                     It appears to discuss project-related topics. Key participants engaged in a \
                     productive discussion about implementation details and next steps."
                );
            }
            Some(llm) => {
                let user = format!("Conversation:\n{}", state.conversation_text);
                let completion =
                    llm.complete(SUMMARIZE_SYSTEM_PROMPT, &user, STEP_MAX_TOKENS).await?;

                if let Some((input_tokens, output_tokens)) = completion.usage() {
                    ctx.track_tokens(input_tokens, output_tokens).await?;
                }

                state.summary = completion.text;
            }
        }

        ctx.record_step(
            "summarize",
            started.elapsed(),
            Some(&state.conversation_text),
            Some(&state.summary),
        );
        Ok(state)
    }

    async fn extract_actions(
        &self,
        ctx: &mut RunContext<'_>,
        mut state: SummaryState,
    ) -> Result<SummaryState, AgentError> {
        let started = Instant::now();

        match &self.llm {
            None => {
                state.action_items = vec![
                    "Review and approve the proposed changes".to_string(),
                    "Schedule follow-up meeting for next week".to_string(),
                    "Update documentation with new requirements".to_string(),
                    "Share findings with the team".to_string(),
                ];
                state.key_decisions = vec![
                    "Agreed to proceed with the proposed approach".to_string(),
                    "Timeline set for end of sprint".to_string(),
                ];
            }
            Some(llm) => {
                let user = format!(
                    "Conversation:\n{}\n\nSummary:\n{}",
                    state.conversation_text, state.summary
                );
                let completion =
                    llm.complete(EXTRACT_SYSTEM_PROMPT, &user, STEP_MAX_TOKENS).await?;

                if let Some((input_tokens, output_tokens)) = completion.usage() {
                    ctx.track_tokens(input_tokens, output_tokens).await?;
                }

                let (action_items, key_decisions) = parse_sections(&completion.text);
                state.action_items = action_items;
                state.key_decisions = key_decisions;
            }
        }

        let input_preview = format!("Summary length: {} chars", state.summary.chars().count());
        let output_preview = format!(
            "{} actions, {} decisions",
            state.action_items.len(),
            state.key_decisions.len()
        );
        ctx.record_step(
            "extract_actions",
            started.elapsed(),
            Some(&input_preview),
            Some(&output_preview),
        );
        Ok(state)
    }
}

#[async_trait]
impl Pipeline for SummaryPipeline {
    fn id(&self) -> AgentId {
        AgentId::Slack
    }

    async fn execute(
        &self,
        ctx: &mut RunContext<'_>,
        input: &str,
    ) -> Result<String, AgentError> {
        let state = SummaryState {
            conversation_text: input.to_string(),
            summary: String::new(),
            action_items: Vec::new(),
            key_decisions: Vec::new(),
        };

        let state = self.summarize(ctx, state).await?;
        let state = self.extract_actions(ctx, state).await?;
        Ok(render_digest(&state))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Actions,
    Decisions,
}

/// Split the model's sectioned reply into action items and decisions. The
/// section cursor starts unset, so bullets before any header are discarded.
/// Header detection runs before bullet detection, so a bullet whose text
/// mentions DECISIONS moves the cursor instead of being collected.
fn parse_sections(content: &str) -> (Vec<String>, Vec<String>) {
    let mut action_items = Vec::new();
    let mut key_decisions = Vec::new();
    let mut current = Section::None;

    for line in content.lines() {
        let line = line.trim();
        let line_upper = line.to_uppercase();
        if line_upper.contains("ACTION ITEMS") {
            current = Section::Actions;
        } else if line_upper.contains("KEY DECISIONS") || line_upper.contains("DECISIONS") {
            current = Section::Decisions;
        } else if line.starts_with('-') || line.starts_with('•') {
            let item = line.trim_start_matches(['-', '•']).trim();
            if !item.is_empty() {
                match current {
                    Section::Actions => action_items.push(item.to_string()),
                    Section::Decisions => key_decisions.push(item.to_string()),
                    Section::None => {}
                }
            }
        }
    }

    (action_items, key_decisions)
}

fn render_digest(state: &SummaryState) -> String {
    let mut response =
        format!("## Conversation Summary\n\n{}\n\n### Action Items\n", state.summary);

    if state.action_items.is_empty() {
        response.push_str("No action items identified.\n");
    } else {
        for item in &state.action_items {
            let _ = writeln!(response, "- [ ] {item}");
        }
    }

    response.push_str("\n### Key Decisions\n");
    if state.key_decisions.is_empty() {
        response.push_str("No key decisions identified.\n");
    } else {
        for decision in &state.key_decisions {
            let _ = writeln!(response, "- {decision}");
        }
    }

    response
}
