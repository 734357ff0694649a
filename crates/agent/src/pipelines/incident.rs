use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use opsdeck_core::{AgentError, AgentId, Category, Severity};

use crate::llm::LlmClient;
use crate::pipeline::{AgentDeps, Pipeline, RunContext};

const STEP_MAX_TOKENS: u32 = 512;

const CLASSIFY_SYSTEM_PROMPT: &str = "\
You are an expert DevOps engineer analyzing log snippets.
Classify the log based on:
1. Severity: critical, high, medium, or low
2. Category: error, warning, performance, security, info

Respond in this exact format:
SEVERITY: [level]
CATEGORY: [category]
ANALYSIS: [brief explanation]";

/// Log triage: classify a snippet, then propose remediation actions.
pub struct IncidentPipeline {
    llm: Option<Arc<dyn LlmClient>>,
}

struct IncidentState {
    log_snippet: String,
    severity: Severity,
    category: Category,
    analysis: Option<String>,
    recommended_actions: Vec<String>,
}

impl IncidentPipeline {
    pub fn new(deps: &AgentDeps) -> Self {
        Self { llm: deps.llm.clone() }
    }

    async fn classify(
        &self,
        ctx: &mut RunContext<'_>,
        mut state: IncidentState,
    ) -> Result<IncidentState, AgentError> {
        let started = Instant::now();

        match &self.llm {
            None => {
                let (severity, category) = classify_by_keywords(&state.log_snippet);
                state.severity = severity;
                state.category = category;
            }
            Some(llm) => {
                let user = format!("Log snippet:\n{}", state.log_snippet);
                let completion =
                    llm.complete(CLASSIFY_SYSTEM_PROMPT, &user, STEP_MAX_TOKENS).await?;

                if let Some((input_tokens, output_tokens)) = completion.usage() {
                    ctx.track_tokens(input_tokens, output_tokens).await?;
                }

                let parsed = parse_classification(&completion.text);
                state.severity = parsed.severity;
                state.category = parsed.category;
                state.analysis = Some(parsed.analysis);
            }
        }

        let output_preview =
            format!("Severity: {}, Category: {}", state.severity, state.category);
        ctx.record_step(
            "classify",
            started.elapsed(),
            Some(&state.log_snippet),
            Some(&output_preview),
        );
        Ok(state)
    }

    async fn propose_actions(
        &self,
        ctx: &mut RunContext<'_>,
        mut state: IncidentState,
    ) -> Result<IncidentState, AgentError> {
        let started = Instant::now();

        match &self.llm {
            None => {
                state.recommended_actions = mock_actions(state.category);
            }
            Some(llm) => {
                let system = format!(
                    "You are an expert DevOps engineer.\nBased on a {} severity {} incident, \
                     propose specific remediation actions.\nList 3-5 actionable steps, ordered \
                     by priority.\nBe specific and technical.",
                    state.severity, state.category
                );
                let user = format!(
                    "Log: {}\nSeverity: {}\nCategory: {}",
                    state.log_snippet, state.severity, state.category
                );
                let completion = llm.complete(&system, &user, STEP_MAX_TOKENS).await?;

                if let Some((input_tokens, output_tokens)) = completion.usage() {
                    ctx.track_tokens(input_tokens, output_tokens).await?;
                }

                state.recommended_actions = parse_action_lines(&completion.text);
            }
        }

        let input_preview =
            format!("Severity: {}, Category: {}", state.severity, state.category);
        let output_preview = format!("{} actions proposed", state.recommended_actions.len());
        ctx.record_step(
            "propose_actions",
            started.elapsed(),
            Some(&input_preview),
            Some(&output_preview),
        );
        Ok(state)
    }
}

#[async_trait]
impl Pipeline for IncidentPipeline {
    fn id(&self) -> AgentId {
        AgentId::Incident
    }

    async fn execute(
        &self,
        ctx: &mut RunContext<'_>,
        input: &str,
    ) -> Result<String, AgentError> {
        let state = IncidentState {
            log_snippet: input.to_string(),
            severity: Severity::Low,
            category: Category::Info,
            analysis: None,
            recommended_actions: Vec::new(),
        };

        let state = self.classify(ctx, state).await?;
        let state = self.propose_actions(ctx, state).await?;
        Ok(render_report(&state))
    }
}

/// Ordered keyword rules over the lower-cased log text. The error group is
/// checked before the warning and performance groups, and every input maps to
/// exactly one severity/category pair.
fn classify_by_keywords(log_snippet: &str) -> (Severity, Category) {
    let log_lower = log_snippet.to_lowercase();

    let contains_any =
        |words: &[&str]| words.iter().any(|word| log_lower.contains(word));

    if contains_any(&["error", "exception", "failed", "critical"]) {
        (Severity::High, Category::Error)
    } else if contains_any(&["warning", "warn", "deprecated"]) {
        (Severity::Medium, Category::Warning)
    } else if contains_any(&["timeout", "slow", "latency"]) {
        (Severity::Medium, Category::Performance)
    } else {
        (Severity::Low, Category::Info)
    }
}

struct Classification {
    severity: Severity,
    category: Category,
    analysis: String,
}

/// Parse the `SEVERITY:`/`CATEGORY:`/`ANALYSIS:` line format. Prefixes match
/// case-sensitively as the instruction spells them; a missing or unreadable
/// field keeps its default (medium / error / the full raw text).
fn parse_classification(content: &str) -> Classification {
    let mut severity = Severity::Medium;
    let mut category = Category::Error;
    let mut analysis = content.to_string();

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("SEVERITY:") {
            if let Some(parsed) = Severity::parse_lenient(rest) {
                severity = parsed;
            }
        } else if let Some(rest) = line.strip_prefix("CATEGORY:") {
            if let Some(parsed) = Category::parse_lenient(rest) {
                category = parsed;
            }
        } else if let Some(rest) = line.strip_prefix("ANALYSIS:") {
            analysis = rest.trim().to_string();
        }
    }

    Classification { severity, category, analysis }
}

/// Keep lines that look like enumerated steps (digit, `-`, or `•` first),
/// stripped of their enumeration characters. A response with no such line
/// becomes a single action verbatim.
fn parse_action_lines(content: &str) -> Vec<String> {
    let mut actions = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let Some(first) = line.chars().next() else { continue };
        if first.is_ascii_digit() || first == '-' || first == '•' {
            let action = line
                .trim_start_matches(|c: char| c.is_ascii_digit() || ".-•) ".contains(c))
                .trim();
            if !action.is_empty() {
                actions.push(action.to_string());
            }
        }
    }

    if actions.is_empty() {
        actions.push(content.to_string());
    }
    actions
}

fn mock_actions(category: Category) -> Vec<String> {
    let actions: &[&str] = match category {
        Category::Error => &[
            "Check application logs for stack traces",
            "Review recent deployments",
            "Verify database connections",
            "Check service health endpoints",
        ],
        Category::Warning => &[
            "Monitor for escalation",
            "Review deprecated code usage",
            "Schedule technical debt cleanup",
        ],
        Category::Performance => &[
            "Check system resources (CPU, memory)",
            "Review database query performance",
            "Check network latency",
            "Consider scaling resources",
        ],
        Category::Security => &[
            "Review access logs",
            "Check for unauthorized access attempts",
            "Verify SSL certificates",
            "Run security scan",
        ],
        Category::Info => &["No immediate action required", "Log for reference"],
    };

    actions.iter().map(|action| (*action).to_string()).collect()
}

// The analysis section renders verbatim, so a keyword-classified run (which
// produces none) keeps the section empty.
fn render_report(state: &IncidentState) -> String {
    let mut response = format!(
        "## Incident Analysis\n\n**Severity:** {}\n**Category:** {}\n\n### Analysis\n{}\n\n### Recommended Actions\n",
        state.severity.as_str().to_uppercase(),
        state.category.title(),
        state.analysis.as_deref().unwrap_or(""),
    );

    for (index, action) in state.recommended_actions.iter().enumerate() {
        let _ = writeln!(response, "{}. {}", index + 1, action);
    }

    response
}
