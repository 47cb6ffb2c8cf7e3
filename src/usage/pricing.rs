//! Pricing calculation for Claude models

use std::collections::HashMap;

use crate::usage::models::UsageRecord;

/// Pricing per million tokens (USD)
#[derive(Debug, Clone)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
    pub cache_creation: f64,
    pub cache_read: f64,
}

impl ModelPricing {
    pub fn new(input: f64, output: f64, cache_creation: f64, cache_read: f64) -> Self {
        Self {
            input,
            output,
            cache_creation,
            cache_read,
        }
    }
}

/// Calculator for API costs based on token usage
pub struct PricingCalculator {
    pricing: HashMap<String, ModelPricing>,
    fallback: ModelPricing,
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingCalculator {
    pub fn new() -> Self {
        let mut pricing = HashMap::new();

        pricing.insert(
            "claude-opus-4-6".to_string(),
            ModelPricing::new(5.0, 25.0, 6.25, 0.5),
        );
        pricing.insert(
            "claude-sonnet-4-5-20250929".to_string(),
            ModelPricing::new(3.0, 15.0, 3.75, 0.3),
        );
        pricing.insert(
            "claude-haiku-4-5-20251001".to_string(),
            ModelPricing::new(1.0, 5.0, 1.25, 0.1),
        );

        Self {
            pricing,
            // Unknown models are billed at Sonnet rates rather than rejected
            fallback: ModelPricing::new(3.0, 15.0, 3.75, 0.3),
        }
    }

    /// Rates for a model id, falling back when the id has no table entry
    pub fn rates_for(&self, model: &str) -> &ModelPricing {
        self.pricing.get(model).unwrap_or(&self.fallback)
    }

    /// Calculate cost for token usage
    pub fn calculate_cost(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cache_creation_tokens: u64,
        cache_read_tokens: u64,
    ) -> f64 {
        let p = self.rates_for(model);

        (input_tokens as f64 * p.input
            + output_tokens as f64 * p.output
            + cache_creation_tokens as f64 * p.cache_creation
            + cache_read_tokens as f64 * p.cache_read)
            / 1_000_000.0
    }

    /// Cost of a single usage record
    pub fn record_cost(&self, record: &UsageRecord) -> f64 {
        self.calculate_cost(
            &record.model,
            record.input_tokens,
            record.output_tokens,
            record.cache_creation_tokens,
            record.cache_read_tokens,
        )
    }
}
