use eidetic_protocol::SearchResult;
use std::collections::HashMap;

/// Walks `results` in order, accepting a result iff its `[start_line,
/// end_line]` range does not overlap any previously accepted range from the
/// same `file_path`; stops once `limit` results have been accepted (spec.md
/// §4.3 step 8, §8 property 6).
#[must_use]
pub fn deduplicate_results(results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    let mut accepted_ranges: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
    let mut out = Vec::new();

    for result in results {
        if out.len() >= limit {
            break;
        }
        let ranges = accepted_ranges.entry(result.file_path.clone()).or_default();
        let overlaps = ranges
            .iter()
            .any(|&(start, end)| result.start_line <= end && start <= result.end_line);
        if overlaps {
            continue;
        }
        ranges.push((result.start_line, result.end_line));
        out.push(result);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidetic_protocol::FileCategory;
    use pretty_assertions::assert_eq;

    fn result(path: &str, start: usize, end: usize, score: f32) -> SearchResult {
        SearchResult {
            id: format!("{path}:{start}:{end}"),
            content: String::new(),
            start_line: start,
            end_line: end,
            language: "rust".to_string(),
            file_path: path.to_string(),
            symbol_name: None,
            symbol_kind: None,
            symbol_signature: None,
            parent_symbol: None,
            file_extension: ".rs".to_string(),
            file_category: Some(FileCategory::Source),
            score,
        }
    }

    #[test]
    fn spec_worked_example_keeps_first_and_third() {
        let results = vec![
            result("a.ts", 1, 20, 1.0),
            result("a.ts", 15, 30, 0.9),
            result("b.ts", 1, 10, 0.8),
        ];
        let deduped = deduplicate_results(results, 10);
        let paths: Vec<(&str, usize, usize)> =
            deduped.iter().map(|r| (r.file_path.as_str(), r.start_line, r.end_line)).collect();
        assert_eq!(paths, vec![("a.ts", 1, 20), ("b.ts", 1, 10)]);
    }

    #[test]
    fn non_overlapping_ranges_in_same_file_are_both_kept() {
        let results = vec![result("a.ts", 1, 10, 1.0), result("a.ts", 11, 20, 0.9)];
        let deduped = deduplicate_results(results, 10);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn stops_at_limit() {
        let results = vec![
            result("a.ts", 1, 5, 1.0),
            result("b.ts", 1, 5, 0.9),
            result("c.ts", 1, 5, 0.8),
        ];
        let deduped = deduplicate_results(results, 2);
        assert_eq!(deduped.len(), 2);
    }
}
