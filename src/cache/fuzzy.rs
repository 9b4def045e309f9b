// Approximate query matching (token-set ratio on a 0-100 scale)
// Author: kelexine (https://github.com/kelexine)

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

static NON_WORD: OnceLock<Regex> = OnceLock::new();
static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();

fn non_word() -> &'static Regex {
    NON_WORD.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex is valid"))
}

fn stop_words() -> &'static HashSet<&'static str> {
    STOP_WORDS.get_or_init(|| {
        [
            "a", "an", "and", "are", "as", "at", "be", "by", "can", "could", "do", "does", "for",
            "from", "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "should", "that",
            "the", "this", "to", "what", "when", "where", "which", "why", "with", "you", "your",
        ]
        .into_iter()
        .collect()
    })
}

/// Lowercase and replace every run of non-alphanumerics with one space.
fn preprocess(text: &str) -> String {
    non_word()
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Content-bearing tokens of `text`, sorted and deduplicated.
///
/// Stop words are dropped unless nothing else remains.
fn token_set(text: &str) -> BTreeSet<String> {
    let processed = preprocess(text);
    let all: BTreeSet<String> = processed.split_whitespace().map(str::to_string).collect();
    let content: BTreeSet<String> = all
        .iter()
        .filter(|token| !stop_words().contains(token.as_str()))
        .cloned()
        .collect();

    if content.is_empty() {
        all
    } else {
        content
    }
}

/// Length of the longest common subsequence of two character slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev_row = vec![0usize; b.len() + 1];
    let mut curr_row = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr_row[j + 1] = if ca == cb {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Normalized Indel similarity (insertions and deletions only), 0-100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let distance = total - 2 * lcs_len(&a, &b);
    100.0 * (1.0 - distance as f64 / total as f64)
}

/// Token-set similarity between two queries, 0-100.
///
/// Insensitive to word order and duplicates. A query whose content tokens
/// are a subset of the other's scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = token_set(a);
    let tokens_b = token_set(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).map(String::as_str).collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).map(String::as_str).collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).map(String::as_str).collect();

    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab = diff_ab.join(" ");
    let diff_ba = diff_ba.join(" ");
    let sect_len = intersection.join(" ").chars().count();
    if sect_len == 0 {
        return ratio(&diff_ab, &diff_ba).clamp(0.0, 100.0);
    }

    let ab: Vec<char> = diff_ab.chars().collect();
    let ba: Vec<char> = diff_ba.chars().collect();
    // "sect diff_ab" vs "sect diff_ba" share the "sect " prefix outright
    let sect_ab_len = sect_len + 1 + ab.len();
    let sect_ba_len = sect_len + 1 + ba.len();
    let common = sect_len + 1 + lcs_len(&ab, &ba);
    let mut best = 100.0 * (2 * common) as f64 / (sect_ab_len + sect_ba_len) as f64;

    // "sect" vs "sect diff" differs by the diff plus one joining space
    let sect_ab = 100.0 * (1.0 - (ab.len() + 1) as f64 / (sect_len + sect_ab_len) as f64);
    let sect_ba = 100.0 * (1.0 - (ba.len() + 1) as f64 / (sect_len + sect_ba_len) as f64);
    best = best.max(sect_ab).max(sect_ba);

    best.clamp(0.0, 100.0)
}

/// A scored candidate from a fuzzy lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub key: String,
    pub score: f64,
}

/// Finds the previously cached query most similar to a new one.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 100.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, query: &str, candidate: &str) -> f64 {
        token_set_ratio(query, candidate)
    }

    /// Best-scoring `(key, candidate_query)` pair. Ties keep the first seen.
    pub fn best_match<I, K, Q>(&self, query: &str, candidates: I) -> Option<FuzzyMatch>
    where
        I: IntoIterator<Item = (K, Q)>,
        K: Into<String>,
        Q: AsRef<str>,
    {
        let mut best: Option<FuzzyMatch> = None;
        for (key, candidate) in candidates {
            let score = self.score(query, candidate.as_ref());
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    key: key.into(),
                    score,
                });
            }
        }
        best
    }

    /// Whether a score is high enough to serve a cached value.
    pub fn accepts(&self, score: f64) -> bool {
        score >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        let partial = ratio("kitten", "sitting");
        assert!(partial > 0.0 && partial < 100.0);
    }

    #[test]
    fn test_word_order_is_ignored() {
        assert_eq!(
            token_set_ratio("middleware setup examples", "examples setup middleware"),
            100.0
        );
    }

    #[test]
    fn test_punctuation_and_stop_words_ignored() {
        assert_eq!(token_set_ratio("how do i add middleware?", "add middleware"), 100.0);
    }

    #[test]
    fn test_shared_content_word_scores_above_default_threshold() {
        let score = token_set_ratio("middleware setup examples", "how do i add middleware?");
        assert!(score >= 75.0, "score was {}", score);
    }

    #[test]
    fn test_shared_words_count_toward_differing_tails() {
        // 2 * (17 + 9) / (27 + 27)
        let score = token_set_ratio("middleware setup zzzzzzzzzz", "middleware setup zzzzzzzzzy");
        assert!((score - 96.296).abs() < 0.01, "score = {}", score);
    }

    #[test]
    fn test_unrelated_queries_score_low() {
        let score = token_set_ratio("how to configure logging", "how to deploy to kubernetes");
        assert!(score < 75.0, "score was {}", score);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(token_set_ratio("", "anything"), 0.0);
        assert_eq!(token_set_ratio("???", "anything"), 0.0);
    }

    #[test]
    fn test_best_match_prefers_first_on_tie() {
        let matcher = FuzzyMatcher::new(75.0);
        let best = matcher
            .best_match(
                "database migrations",
                vec![
                    ("first", "database migrations"),
                    ("second", "migrations database"),
                    ("third", "logging"),
                ],
            )
            .unwrap();
        assert_eq!(best.key, "first");
        assert_eq!(best.score, 100.0);
        assert!(matcher.accepts(best.score));
    }

    #[test]
    fn test_threshold_is_clamped() {
        assert_eq!(FuzzyMatcher::new(250.0).threshold(), 100.0);
        assert_eq!(FuzzyMatcher::new(-3.0).threshold(), 0.0);
    }
}
