use chrono::Utc;
use opsdeck_core::{LlmPricing, TokenUsageEvent};

const TOKENS_PER_MTOK: f64 = 1_000_000.0;

/// Accumulates token usage for one run and prices it.
///
/// One event is tracked per provider call that reports usage; the ledger's
/// running total always equals the sum of `total_tokens` across its events.
#[derive(Debug)]
pub struct TokenLedger {
    model: String,
    pricing: LlmPricing,
    events: Vec<TokenUsageEvent>,
    total_tokens: u64,
}

impl TokenLedger {
    pub fn new(model: impl Into<String>, pricing: LlmPricing) -> Self {
        Self { model: model.into(), pricing, events: Vec::new(), total_tokens: 0 }
    }

    /// Record one provider call's usage and return the priced event.
    pub fn track(
        &mut self,
        input_tokens: u32,
        output_tokens: u32,
        conversation_id: Option<&str>,
    ) -> TokenUsageEvent {
        let total_tokens = u64::from(input_tokens) + u64::from(output_tokens);
        let cost_usd = f64::from(input_tokens) * self.pricing.input_cost_per_mtok
            / TOKENS_PER_MTOK
            + f64::from(output_tokens) * self.pricing.output_cost_per_mtok / TOKENS_PER_MTOK;

        let event = TokenUsageEvent {
            id: None,
            model: self.model.clone(),
            input_tokens,
            output_tokens,
            total_tokens,
            cost_usd,
            conversation_id: conversation_id.map(str::to_string),
            occurred_at: Utc::now(),
        };

        self.total_tokens += total_tokens;
        self.events.push(event.clone());
        event
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn events(&self) -> &[TokenUsageEvent] {
        &self.events
    }
}
