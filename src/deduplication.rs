// 🔍 Deduplication Engine - Detect duplicate quotes in a collection
// Three strategies: Exact Text, Cross Category, Normalized Text

use crate::quote::Quote;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Exact match: same text, same category
    ExactText,

    /// Same text filed under different categories
    CrossCategory,

    /// Texts differ only by case or whitespace (legal, identity is exact)
    NormalizedText,
}

impl MatchStrategy {
    /// True if this match breaks the unique-text invariant
    pub fn violates_identity(&self) -> bool {
        matches!(self, MatchStrategy::ExactText | MatchStrategy::CrossCategory)
    }
}

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Index of first quote
    pub first_index: usize,

    /// Index of second quote
    pub second_index: usize,

    /// Which strategy detected this match
    pub strategy: MatchStrategy,

    /// Human-readable reason
    pub reason: String,
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

pub struct DeduplicationEngine {
    /// Report NormalizedText matches (default: true)
    pub include_near_duplicates: bool,
}

impl DeduplicationEngine {
    pub fn new() -> Self {
        DeduplicationEngine {
            include_near_duplicates: true,
        }
    }

    /// Only report pairs that break the unique-text invariant
    pub fn strict() -> Self {
        DeduplicationEngine {
            include_near_duplicates: false,
        }
    }

    /// Find all duplicate pairs in a list of quotes
    pub fn find_duplicates(&self, quotes: &[Quote]) -> Vec<DuplicateMatch> {
        let mut matches = Vec::new();

        for i in 0..quotes.len() {
            for j in (i + 1)..quotes.len() {
                if let Some(m) = self.check_pair(i, j, &quotes[i], &quotes[j]) {
                    matches.push(m);
                }
            }
        }

        matches
    }

    /// True if no two quotes share text. Independent of the engine settings.
    pub fn is_unique(quotes: &[Quote]) -> bool {
        let mut seen = HashSet::new();
        quotes.iter().all(|q| seen.insert(q.key()))
    }

    fn check_pair(&self, i: usize, j: usize, q1: &Quote, q2: &Quote) -> Option<DuplicateMatch> {
        if q1.text == q2.text {
            let (strategy, reason) = if q1.category == q2.category {
                (
                    MatchStrategy::ExactText,
                    format!("Exact duplicate: \"{}\"", q1.text),
                )
            } else {
                (
                    MatchStrategy::CrossCategory,
                    format!(
                        "Same text in categories '{}' and '{}': \"{}\"",
                        q1.category, q2.category, q1.text
                    ),
                )
            };
            return Some(DuplicateMatch {
                first_index: i,
                second_index: j,
                strategy,
                reason,
            });
        }

        if self.include_near_duplicates && normalize(&q1.text) == normalize(&q2.text) {
            return Some(DuplicateMatch {
                first_index: i,
                second_index: j,
                strategy: MatchStrategy::NormalizedText,
                reason: format!("Near duplicate: \"{}\" ≈ \"{}\"", q1.text, q2.text),
            });
        }

        None
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase and collapse whitespace runs
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
