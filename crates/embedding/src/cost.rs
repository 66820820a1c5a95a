/// Rough cost estimate for a batch of texts (spec.md §4.5 "Cost
/// estimation"). `estTokens` approximates 4 chars/token; unknown models
/// estimate zero cost rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub total_chars: usize,
    pub est_tokens: u64,
    pub est_cost_usd: f64,
}

/// USD per million tokens, keyed by model name. Unknown models fall back to
/// `0.0` (spec.md §4.5).
#[must_use]
pub fn per_million_rate(model: &str) -> f64 {
    match model {
        "text-embedding-3-small" => 0.02,
        "text-embedding-3-large" => 0.13,
        "voyage-code-3" => 0.18,
        _ => 0.0,
    }
}

#[must_use]
pub fn estimate_tokens(texts: &[String], model: &str) -> CostEstimate {
    let total_chars: usize = texts.iter().map(String::len).sum();
    let est_tokens = (total_chars as f64 / 4.0).ceil() as u64;
    let est_cost_usd = est_tokens as f64 / 1_000_000.0 * per_million_rate(model);
    CostEstimate {
        total_chars,
        est_tokens,
        est_cost_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_has_zero_rate() {
        let est = estimate_tokens(&["hello".to_string()], "some-future-model");
        assert_eq!(est.est_cost_usd, 0.0);
        assert_eq!(est.est_tokens, 2);
    }

    #[test]
    fn token_estimate_rounds_up() {
        let est = estimate_tokens(&["abcde".to_string()], "text-embedding-3-small");
        assert_eq!(est.total_chars, 5);
        assert_eq!(est.est_tokens, 2);
    }
}
