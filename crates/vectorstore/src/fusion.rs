//! Blended reciprocal-rank fusion and normalized term-frequency scoring
//! (spec.md §4.3 steps 5–6).
//!
//! These are pure functions operating on `(id, score)` pairs so they can be
//! unit-tested without a live backend, and so the dense-only fallback mode
//! (spec.md §4.4) can call `reciprocal_rank_fusion` with an empty lexical
//! list.

use regex::escape;
use std::collections::HashMap;

/// RRF blend constants (spec.md §4.3 step 6).
pub const RRF_K: f32 = 5.0;
pub const RRF_ALPHA: f32 = 0.7;

/// One ranked hit going into fusion: an opaque id plus a raw score already
/// normalized to `[0, 1]` (dense similarity or normalized TF).
#[derive(Debug, Clone)]
pub struct RankedHit {
    pub id: String,
    pub score: f32,
}

/// Contribution of a single rank position in one list to the blended score
/// (spec.md §4.3 step 6): `alpha * 1/(K + r + 1) + (1 - alpha) * s`.
fn contribution(rank: usize, score: f32) -> f32 {
    RRF_ALPHA * (1.0 / (RRF_K + rank as f32 + 1.0)) + (1.0 - RRF_ALPHA) * score
}

/// Blended RRF across two ranked lists (dense + lexical). Contributions sum
/// per unique id; the result is sorted descending by fused score.
///
/// Monotonicity (spec.md §8 property 5): if id A outranks id B in *both*
/// input lists, A outranks B in the output, because each list's
/// contribution function is strictly decreasing in rank.
#[must_use]
pub fn reciprocal_rank_fusion(dense: &[RankedHit], lexical: &[RankedHit]) -> Vec<(String, f32)> {
    let mut scores: HashMap<&str, f32> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for (rank, hit) in dense.iter().enumerate() {
        let entry = scores.entry(hit.id.as_str()).or_insert_with(|| {
            order.push(hit.id.as_str());
            0.0
        });
        *entry += contribution(rank, hit.score);
    }
    for (rank, hit) in lexical.iter().enumerate() {
        let entry = scores.entry(hit.id.as_str()).or_insert_with(|| {
            order.push(hit.id.as_str());
            0.0
        });
        *entry += contribution(rank, hit.score);
    }

    let mut fused: Vec<(String, f32)> = order
        .into_iter()
        .map(|id| (id.to_string(), scores[id]))
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Normalized term-frequency scoring for the lexical path (spec.md §4.3
/// "Normalized TF"): unique lowercased whitespace-separated query terms,
/// count of regex-escaped case-insensitive matches per point, divided by
/// `max(1, wordCount)`, then normalized to `[0, 1]` by the maximum raw
/// score. Input order (scroll order) is preserved as the tie-break, so the
/// sort below must be stable.
#[must_use]
pub fn normalized_term_frequency(query: &str, points: &[(String, String)]) -> Vec<RankedHit> {
    let terms: Vec<String> = {
        let mut seen = std::collections::HashSet::new();
        query
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|t| seen.insert(t.clone()))
            .collect()
    };

    if terms.is_empty() {
        return points
            .iter()
            .map(|(id, _)| RankedHit {
                id: id.clone(),
                score: 0.0,
            })
            .collect();
    }

    let patterns: Vec<regex::Regex> = terms
        .iter()
        .filter_map(|t| regex::RegexBuilder::new(&escape(t)).case_insensitive(true).build().ok())
        .collect();

    let mut raw: Vec<(String, usize)> = points
        .iter()
        .map(|(id, content)| {
            let word_count = content.split_whitespace().count().max(1);
            let matches: usize = patterns
                .iter()
                .map(|re| re.find_iter(content).count())
                .sum();
            (id.clone(), matches.saturating_mul(1000) / word_count)
        })
        .collect();

    // stable sort descending preserves scroll order among ties
    raw.sort_by(|a, b| b.1.cmp(&a.1));

    let max = raw.iter().map(|(_, s)| *s).max().unwrap_or(0);
    raw.into_iter()
        .map(|(id, s)| RankedHit {
            id,
            score: if max == 0 { 0.0 } else { s as f32 / max as f32 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dense_only_matches_worked_example() {
        // spec.md §8 S4: dense rank-0 raw 0.8, text absent.
        let dense = vec![RankedHit {
            id: "a".into(),
            score: 0.8,
        }];
        let fused = reciprocal_rank_fusion(&dense, &[]);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 0.3567).abs() < 0.001);
    }

    #[test]
    fn dense_and_text_both_rank_zero_matches_worked_example() {
        let dense = vec![RankedHit {
            id: "a".into(),
            score: 0.8,
        }];
        let lexical = vec![RankedHit {
            id: "a".into(),
            score: 1.0,
        }];
        let fused = reciprocal_rank_fusion(&dense, &lexical);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 0.7734).abs() < 0.001);
    }

    #[test]
    fn monotonicity_holds_when_a_outranks_b_in_both_lists() {
        let dense = vec![
            RankedHit { id: "a".into(), score: 0.9 },
            RankedHit { id: "b".into(), score: 0.5 },
        ];
        let lexical = vec![
            RankedHit { id: "a".into(), score: 0.8 },
            RankedHit { id: "b".into(), score: 0.2 },
        ];
        let fused = reciprocal_rank_fusion(&dense, &lexical);
        let rank_of = |id: &str| fused.iter().position(|(i, _)| i == id).unwrap();
        assert!(rank_of("a") < rank_of("b"));
    }

    #[test]
    fn empty_query_yields_all_zero_raw_scores() {
        let points = vec![("a".to_string(), "hello world".to_string())];
        let hits = normalized_term_frequency("   ", &points);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn max_scoring_point_normalizes_to_one() {
        let points = vec![
            ("a".to_string(), "foo foo foo bar".to_string()),
            ("b".to_string(), "foo bar bar".to_string()),
        ];
        let hits = normalized_term_frequency("foo", &points);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].score, 1.0);
    }
}
