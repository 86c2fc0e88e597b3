//! Price table for completion cost estimation.
//!
//! Prices are USD per 1K tokens with separate prompt and completion
//! rates. The table is checked in order and the first substring match
//! wins, so entries are ordered most-specific-first (`gpt-4-32k` before
//! `gpt-4`). Models matching no entry use the default tier. The whole
//! module is pure: same inputs always produce the same cost.

/// Per-1K-token pricing for a model tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTier {
    /// USD per 1K prompt tokens.
    pub prompt_per_1k: f64,
    /// USD per 1K completion tokens.
    pub completion_per_1k: f64,
}

impl PriceTier {
    /// Compute cost for the given token counts.
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.prompt_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_per_1k
    }
}

/// Known model tiers, ordered most-specific-first.
const PRICE_TABLE: &[(&str, PriceTier)] = &[
    (
        "gpt-4-32k",
        PriceTier {
            prompt_per_1k: 0.06,
            completion_per_1k: 0.12,
        },
    ),
    (
        "gpt-4",
        PriceTier {
            prompt_per_1k: 0.03,
            completion_per_1k: 0.06,
        },
    ),
    (
        "gpt-3.5-turbo-16k",
        PriceTier {
            prompt_per_1k: 0.003,
            completion_per_1k: 0.004,
        },
    ),
    (
        "gpt-3.5-turbo",
        PriceTier {
            prompt_per_1k: 0.0015,
            completion_per_1k: 0.002,
        },
    ),
];

/// Tier applied when no table entry matches the model name.
const DEFAULT_TIER: PriceTier = PriceTier {
    prompt_per_1k: 0.0015,
    completion_per_1k: 0.002,
};

/// Look up the price tier for a model. First substring match wins;
/// unmatched models land on the default tier.
pub fn tier_for(model: &str) -> PriceTier {
    for (marker, tier) in PRICE_TABLE {
        if model.contains(marker) {
            return *tier;
        }
    }
    DEFAULT_TIER
}

/// Estimate the USD cost of a completion.
pub fn estimate_cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    tier_for(model).cost(prompt_tokens, completion_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt4_cost() {
        // 1000 prompt + 500 completion on gpt-4: 0.03 + 0.5*0.06 = 0.06
        let cost = estimate_cost("gpt-4", 1000, 500);
        assert!((cost - 0.06).abs() < 1e-12);
    }

    #[test]
    fn gpt4o_matches_gpt4_tier() {
        assert_eq!(tier_for("gpt-4o"), tier_for("gpt-4"));
    }

    #[test]
    fn specific_tier_wins_over_family() {
        // gpt-4-32k must land on its own tier, not the broader gpt-4 entry
        let tier = tier_for("gpt-4-32k-0613");
        assert!((tier.prompt_per_1k - 0.06).abs() < 1e-12);
        assert!((tier.completion_per_1k - 0.12).abs() < 1e-12);

        let tier = tier_for("gpt-3.5-turbo-16k");
        assert!((tier.prompt_per_1k - 0.003).abs() < 1e-12);
    }

    #[test]
    fn unmatched_model_uses_default_tier() {
        let tier = tier_for("claude-3-haiku");
        assert_eq!(tier, DEFAULT_TIER);
        assert_eq!(tier_for(""), DEFAULT_TIER);
    }

    #[test]
    fn cost_formula_is_exact() {
        // p/1000 * prompt_price + c/1000 * completion_price, no rounding
        for (p, c) in [(0u32, 0u32), (1, 1), (999, 1), (123_456, 654_321)] {
            let expected = (p as f64 / 1000.0) * 0.0015 + (c as f64 / 1000.0) * 0.002;
            let cost = estimate_cost("gpt-3.5-turbo", p, c);
            assert!((cost - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(estimate_cost("gpt-4", 0, 0), 0.0);
    }

    #[test]
    fn estimation_is_deterministic() {
        let a = estimate_cost("gpt-4o", 777, 333);
        let b = estimate_cost("gpt-4o", 777, 333);
        assert_eq!(a, b);
    }
}
