// src/core/cost.rs — Fixed per-model price table

use crate::provider::TokenUsage;

/// Calculate cost in USD for a given model and token usage. The single place
/// token counts become dollars.
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> f64 {
    let (input_price, output_price) = model_pricing(model);
    let input_cost = (usage.input_tokens as f64 / 1_000_000.0) * input_price;
    let output_cost = (usage.output_tokens as f64 / 1_000_000.0) * output_price;

    input_cost + output_cost
}

/// Returns (input_price_per_mtok, output_price_per_mtok).
pub fn model_pricing(model: &str) -> (f64, f64) {
    match model {
        // OpenAI
        m if m.contains("gpt-4.1-mini") => (0.4, 1.6),
        m if m.contains("gpt-4.1") => (2.0, 8.0),
        m if m.contains("gpt-4o-mini") => (0.15, 0.6),
        m if m.contains("gpt-4o") => (2.5, 10.0),
        m if m.contains("o3-mini") => (1.1, 4.4),
        m if m.contains("o3") && !m.contains("o3-mini") => (10.0, 40.0),
        m if m.contains("o4-mini") => (1.1, 4.4),

        // Anthropic
        m if m.contains("claude-opus") => (15.0, 75.0),
        m if m.contains("claude-sonnet") => (3.0, 15.0),
        m if m.contains("claude-haiku") || m.contains("haiku") => (0.8, 4.0),

        // Local / open-weight (free)
        m if m.contains("llama")
            || m.contains("mistral")
            || m.contains("gemma")
            || m.contains("qwen")
            || m.contains("deepseek") =>
        {
            (0.0, 0.0)
        }

        // Default: assume moderate pricing
        _ => (1.0, 3.0),
    }
}
