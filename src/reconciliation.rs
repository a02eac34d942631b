// ⚖️ Reconciliation Engine - Merge local and remote quote collections
//
// Precedence policy:
//   remote text unknown locally  → appended after all local quotes
//   remote text already known    → dropped, local entry (and its category) kept
//   remote record without text   → skipped
//
// Pure function: no I/O, no clock, no randomness. `changed` is the only signal
// the caller needs to decide whether to persist and re-render.

use crate::quote::{Quote, QuoteRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Local quotes in original order, followed by newly admitted remote quotes
    pub merged: Vec<Quote>,

    /// True iff at least one remote quote was admitted
    pub changed: bool,

    /// Remote quotes appended to the collection
    pub admitted: usize,

    /// Remote quotes dropped because their text was already present
    pub skipped_known: usize,

    /// Remote records dropped for lacking usable text
    pub skipped_malformed: usize,
}

impl ReconciliationReport {
    /// The quotes admitted from the remote side, in admission order
    pub fn admitted_quotes(&self) -> &[Quote] {
        &self.merged[self.merged.len().saturating_sub(self.admitted)..]
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} quotes total, {} admitted, {} already known, {} malformed",
            self.merged.len(),
            self.admitted,
            self.skipped_known,
            self.skipped_malformed
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// Merge `remote` into `local` under the local-wins precedence policy.
///
/// `local` is expected to hold unique texts (`QuoteLibrary` guarantees it).
/// Under that precondition `merged` never contains two quotes with the same
/// text; duplicates already present in `local` are passed through untouched.
///
/// Example:
/// ```
/// use quote_sync::{reconcile, Quote, QuoteRecord};
///
/// let local = vec![Quote::new("A", "x")];
/// let remote = vec![QuoteRecord::new("A", "z"), QuoteRecord::new("B", "y")];
///
/// let report = reconcile(&local, &remote);
/// assert!(report.changed);
/// assert_eq!(report.merged, vec![Quote::new("A", "x"), Quote::new("B", "y")]);
/// ```
pub fn reconcile(local: &[Quote], remote: &[QuoteRecord]) -> ReconciliationReport {
    let mut merged: Vec<Quote> = local.to_vec();
    let mut known: HashSet<String> = local.iter().map(|q| q.key().to_string()).collect();

    let mut admitted = 0;
    let mut skipped_known = 0;
    let mut skipped_malformed = 0;

    for record in remote {
        let quote = match record.to_quote() {
            Some(q) => q,
            None => {
                skipped_malformed += 1;
                continue;
            }
        };

        // insert() is false when the text is already present (local or earlier remote)
        if !known.insert(quote.key().to_string()) {
            skipped_known += 1;
            continue;
        }

        merged.push(quote);
        admitted += 1;
    }

    ReconciliationReport {
        merged,
        changed: admitted > 0,
        admitted,
        skipped_known,
        skipped_malformed,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(text: &str, category: &str) -> Quote {
        Quote::new(text, category)
    }

    fn r(text: &str, category: &str) -> QuoteRecord {
        QuoteRecord::new(text, category)
    }

    #[test]
    fn test_scenario_empty_remote() {
        let local = vec![q("A", "x")];

        let report = reconcile(&local, &[]);

        assert_eq!(report.merged, vec![q("A", "x")]);
        assert!(!report.changed);
        assert_eq!(report.admitted, 0);
    }

    #[test]
    fn test_scenario_new_remote_quote_appended() {
        let local = vec![q("A", "x")];
        let remote = vec![r("B", "y")];

        let report = reconcile(&local, &remote);

        assert_eq!(report.merged, vec![q("A", "x"), q("B", "y")]);
        assert!(report.changed);
        assert_eq!(report.admitted_quotes(), &[q("B", "y")]);
    }

    #[test]
    fn test_scenario_local_wins_on_known_text() {
        let local = vec![q("A", "x")];
        let remote = vec![r("A", "z")];

        let report = reconcile(&local, &remote);

        assert_eq!(report.merged, vec![q("A", "x")]);
        assert!(!report.changed);
        assert_eq!(report.skipped_known, 1);
    }

    #[test]
    fn test_scenario_record_without_text_skipped() {
        let local = vec![q("A", "x")];
        let remote = vec![QuoteRecord::without_text("y")];

        let report = reconcile(&local, &remote);
        let baseline = reconcile(&local, &[]);

        assert_eq!(report.merged, baseline.merged);
        assert_eq!(report.changed, baseline.changed);
        assert_eq!(report.skipped_malformed, 1);
    }

    #[test]
    fn test_comparison_is_exact() {
        let local = vec![q("Hello", "x")];
        let remote = vec![r("hello", "y"), r("Hello ", "z")];

        let report = reconcile(&local, &remote);

        assert_eq!(report.admitted, 2);
        assert_eq!(report.merged[1].text, "hello");
        assert_eq!(report.merged[2].text, "Hello ");
    }

    #[test]
    fn test_duplicate_within_remote_admitted_once() {
        let remote = vec![r("B", "first"), r("C", "c"), r("B", "second")];

        let report = reconcile(&[], &remote);

        assert_eq!(report.merged, vec![q("B", "first"), q("C", "c")]);
        assert_eq!(report.skipped_known, 1);
    }

    #[test]
    fn test_remote_order_preserved() {
        let local = vec![q("A", "x"), q("B", "x")];
        let remote = vec![r("D", "y"), r("A", "z"), r("C", "y")];

        let report = reconcile(&local, &remote);

        let texts: Vec<&str> = report.merged.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn test_both_empty() {
        let report = reconcile(&[], &[]);
        assert!(report.merged.is_empty());
        assert!(!report.changed);
    }

    #[test]
    fn test_admitted_quotes_on_hand_built_report() {
        let report = ReconciliationReport {
            merged: vec![q("A", "x")],
            changed: true,
            admitted: 3,
            skipped_known: 0,
            skipped_malformed: 0,
        };
        assert_eq!(report.admitted_quotes(), &[q("A", "x")]);
    }

    #[test]
    fn test_summary() {
        let report = reconcile(&[q("A", "x")], &[r("A", "y"), r("B", "y")]);
        assert_eq!(
            report.summary(),
            "Reconciliation: 2 quotes total, 1 admitted, 1 already known, 0 malformed"
        );
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    fn arb_record() -> impl Strategy<Value = QuoteRecord> {
        prop_oneof![
            8 => ("[A-E]{1,2}", "[xyz]?").prop_map(|(t, c)| QuoteRecord::new(t, c)),
            1 => "[xyz]".prop_map(QuoteRecord::without_text),
        ]
    }

    fn arb_local() -> impl Strategy<Value = Vec<Quote>> {
        proptest::collection::vec(("[A-E]{1,2}", "[xyz]?"), 0..8).prop_map(|pairs| {
            let mut seen = HashSet::new();
            pairs
                .into_iter()
                .filter(|(t, _)| seen.insert(t.clone()))
                .map(|(t, c)| Quote::new(t, c))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_idempotent(local in arb_local(), remote in proptest::collection::vec(arb_record(), 0..10)) {
            let first = reconcile(&local, &remote);
            let second = reconcile(&first.merged, &[]);
            prop_assert_eq!(&second.merged, &first.merged);
            prop_assert!(!second.changed);

            let again = reconcile(&first.merged, &remote);
            prop_assert_eq!(&again.merged, &first.merged);
            prop_assert!(!again.changed);
        }

        #[test]
        fn prop_no_duplicate_text(local in arb_local(), remote in proptest::collection::vec(arb_record(), 0..10)) {
            let report = reconcile(&local, &remote);
            let mut seen = HashSet::new();
            for quote in &report.merged {
                prop_assert!(seen.insert(quote.text.clone()));
            }
        }

        #[test]
        fn prop_local_preserved_as_prefix(local in arb_local(), remote in proptest::collection::vec(arb_record(), 0..10)) {
            let report = reconcile(&local, &remote);
            prop_assert_eq!(&report.merged[..local.len()], &local[..]);
            prop_assert_eq!(report.changed, report.merged.len() > local.len());
        }

        #[test]
        fn prop_local_category_wins(local in arb_local(), remote in proptest::collection::vec(arb_record(), 0..10)) {
            let report = reconcile(&local, &remote);
            for quote in &local {
                let merged = report.merged.iter().find(|m| m.text == quote.text).unwrap();
                prop_assert_eq!(&merged.category, &quote.category);
            }
        }

        #[test]
        fn prop_counts_add_up(local in arb_local(), remote in proptest::collection::vec(arb_record(), 0..10)) {
            let report = reconcile(&local, &remote);
            prop_assert_eq!(
                report.admitted + report.skipped_known + report.skipped_malformed,
                remote.len()
            );
        }
    }
}
