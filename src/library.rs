// 📚 Quote Library - the explicitly-owned quote collection
// All user-facing operations on the list live here; no I/O.

use crate::quote::{seed_quotes, Quote, QuoteRecord};
use crate::reconciliation::{reconcile, ReconciliationReport};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error("quote text must not be empty")]
    EmptyText,

    #[error("a quote with this text already exists: \"{0}\"")]
    DuplicateText(String),

    #[error("no quote at index {index} (library has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

// ============================================================================
// IMPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Drop the current collection and use the imported quotes
    Replace,

    /// Keep the current collection, add quotes with unknown text
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub mode: ImportMode,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub skipped_malformed: usize,
    pub total: usize,
}

// ============================================================================
// LIBRARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteLibrary {
    quotes: Vec<Quote>,
    last_viewed: Option<usize>,
}

impl QuoteLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed() -> Self {
        QuoteLibrary {
            quotes: seed_quotes(),
            last_viewed: None,
        }
    }

    /// Build from raw stored records. Unusable records are dropped and
    /// repeated texts collapse onto their first occurrence.
    pub fn from_records(records: &[QuoteRecord]) -> Self {
        QuoteLibrary {
            quotes: reconcile(&[], records).merged,
            last_viewed: None,
        }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.quotes.iter().any(|q| q.key() == text)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Add a user-authored quote. Both fields are trimmed.
    pub fn add(&mut self, text: &str, category: &str) -> Result<&Quote, LibraryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LibraryError::EmptyText);
        }
        if self.contains_text(text) {
            return Err(LibraryError::DuplicateText(text.to_string()));
        }

        self.quotes.push(Quote::new(text, category.trim()));
        Ok(&self.quotes[self.quotes.len() - 1])
    }

    pub fn remove(&mut self, index: usize) -> Result<Quote, LibraryError> {
        if index >= self.quotes.len() {
            return Err(LibraryError::IndexOutOfRange {
                index,
                len: self.quotes.len(),
            });
        }

        let removed = self.quotes.remove(index);

        // Keep last_viewed pointing at the same quote
        self.last_viewed = match self.last_viewed {
            Some(v) if v == index => None,
            Some(v) if v > index => Some(v - 1),
            other => other,
        };

        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
        self.last_viewed = None;
    }

    /// Adopt the merged collection when the reconciliation changed anything
    pub fn merge_remote(&mut self, remote: &[QuoteRecord]) -> ReconciliationReport {
        let report = reconcile(&self.quotes, remote);
        if report.changed {
            self.quotes = report.merged.clone();
        }
        report
    }

    pub fn import(&mut self, records: &[QuoteRecord], mode: ImportMode) -> ImportSummary {
        // Imported records are user data: trim like add() does
        let mut malformed = 0;
        let trimmed: Vec<QuoteRecord> = records
            .iter()
            .filter_map(|r| match r.to_trimmed_quote() {
                Some(q) => Some(QuoteRecord::from(q)),
                None => {
                    malformed += 1;
                    None
                }
            })
            .collect();

        let report = match mode {
            ImportMode::Replace => {
                let report = reconcile(&[], &trimmed);
                self.quotes = report.merged.clone();
                self.last_viewed = None;
                report
            }
            ImportMode::Append => self.merge_remote(&trimmed),
        };

        ImportSummary {
            mode,
            imported: report.admitted,
            skipped_duplicates: report.skipped_known,
            skipped_malformed: malformed,
            total: self.quotes.len(),
        }
    }

    // ------------------------------------------------------------------------
    // Viewing
    // ------------------------------------------------------------------------

    /// Pick a random quote and remember it as last viewed
    pub fn random<R: Rng>(&mut self, rng: &mut R) -> Option<(usize, &Quote)> {
        if self.quotes.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.quotes.len());
        self.last_viewed = Some(index);
        Some((index, &self.quotes[index]))
    }

    pub fn show(&mut self, index: usize) -> Result<&Quote, LibraryError> {
        let len = self.quotes.len();
        match self.quotes.get(index) {
            Some(q) => {
                self.last_viewed = Some(index);
                Ok(q)
            }
            None => Err(LibraryError::IndexOutOfRange { index, len }),
        }
    }

    pub fn last_viewed(&self) -> Option<usize> {
        self.last_viewed
    }

    /// Restore a saved last-viewed index; stale indexes are ignored
    pub fn restore_last_viewed(&mut self, index: Option<usize>) {
        self.last_viewed = index.filter(|i| *i < self.quotes.len());
    }

    pub fn last_viewed_quote(&self) -> Option<(usize, &Quote)> {
        self.last_viewed
            .and_then(|i| self.quotes.get(i).map(|q| (i, q)))
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    /// Distinct non-empty categories, sorted
    pub fn categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .filter(|q| !q.category.is_empty())
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Quotes with their indexes; `None` or "all" returns everything
    pub fn filter_by_category(&self, category: Option<&str>) -> Vec<(usize, &Quote)> {
        self.quotes
            .iter()
            .enumerate()
            .filter(|(_, q)| match category {
                None | Some("all") => true,
                Some(c) => q.category == c,
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library(pairs: &[(&str, &str)]) -> QuoteLibrary {
        let records: Vec<QuoteRecord> = pairs.iter().map(|(t, c)| QuoteRecord::new(*t, *c)).collect();
        QuoteLibrary::from_records(&records)
    }

    #[test]
    fn test_from_records_drops_bad_and_duplicate() {
        let records = vec![
            QuoteRecord::new("A", "x"),
            QuoteRecord::without_text("y"),
            QuoteRecord::new("A", "z"),
            QuoteRecord::new("B", ""),
        ];

        let lib = QuoteLibrary::from_records(&records);

        assert_eq!(lib.quotes(), &[Quote::new("A", "x"), Quote::new("B", "")]);
    }

    #[test]
    fn test_add_trims() {
        let mut lib = QuoteLibrary::new();
        let added = lib.add("  Hello  ", " greeting ").unwrap().clone();
        assert_eq!(added, Quote::new("Hello", "greeting"));
    }

    #[test]
    fn test_add_rejects_empty_text() {
        let mut lib = QuoteLibrary::new();
        assert_eq!(lib.add("   ", "x"), Err(LibraryError::EmptyText));
        assert!(lib.is_empty());
    }

    #[test]
    fn test_add_rejects_duplicate_text() {
        let mut lib = library(&[("A", "x")]);
        assert_eq!(
            lib.add("A", "other").unwrap_err(),
            LibraryError::DuplicateText("A".to_string())
        );
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn test_add_allows_empty_category() {
        let mut lib = QuoteLibrary::new();
        assert!(lib.add("A", "").is_ok());
        assert!(lib.categories().is_empty());
    }

    #[test]
    fn test_remove_adjusts_last_viewed() {
        let mut lib = library(&[("A", "x"), ("B", "x"), ("C", "x")]);

        lib.show(2).unwrap();
        lib.remove(0).unwrap();
        assert_eq!(lib.last_viewed_quote().unwrap().1.text, "C");

        lib.remove(1).unwrap();
        assert_eq!(lib.last_viewed(), None);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut lib = library(&[("A", "x")]);
        assert_eq!(
            lib.remove(3),
            Err(LibraryError::IndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_clear() {
        let mut lib = QuoteLibrary::with_seed();
        lib.show(0).unwrap();
        lib.clear();
        assert!(lib.is_empty());
        assert_eq!(lib.last_viewed(), None);
    }

    #[test]
    fn test_random_records_last_viewed() {
        let mut lib = QuoteLibrary::with_seed();
        let mut rng = StdRng::seed_from_u64(7);

        let (index, _) = lib.random(&mut rng).unwrap();

        assert!(index < 3);
        assert_eq!(lib.last_viewed(), Some(index));
    }

    #[test]
    fn test_random_on_empty() {
        let mut lib = QuoteLibrary::new();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(lib.random(&mut rng).is_none());
    }

    #[test]
    fn test_restore_last_viewed_ignores_stale_index() {
        let mut lib = library(&[("A", "x")]);
        lib.restore_last_viewed(Some(5));
        assert_eq!(lib.last_viewed(), None);
        lib.restore_last_viewed(Some(0));
        assert_eq!(lib.last_viewed(), Some(0));
    }

    #[test]
    fn test_categories_sorted_distinct() {
        let lib = library(&[("A", "life"), ("B", "art"), ("C", "life"), ("D", "")]);
        assert_eq!(lib.categories(), vec!["art".to_string(), "life".to_string()]);
    }

    #[test]
    fn test_filter_by_category() {
        let lib = library(&[("A", "life"), ("B", "art"), ("C", "life")]);

        let life: Vec<usize> = lib.filter_by_category(Some("life")).iter().map(|(i, _)| *i).collect();
        assert_eq!(life, vec![0, 2]);

        assert_eq!(lib.filter_by_category(Some("all")).len(), 3);
        assert_eq!(lib.filter_by_category(None).len(), 3);
        assert!(lib.filter_by_category(Some("none")).is_empty());
    }

    #[test]
    fn test_merge_remote_local_wins() {
        let mut lib = library(&[("A", "x")]);

        let report = lib.merge_remote(&[QuoteRecord::new("A", "server"), QuoteRecord::new("B", "server")]);

        assert!(report.changed);
        assert_eq!(lib.quotes(), &[Quote::new("A", "x"), Quote::new("B", "server")]);
    }

    #[test]
    fn test_import_replace() {
        let mut lib = library(&[("A", "x")]);
        lib.show(0).unwrap();

        let summary = lib.import(
            &[QuoteRecord::new(" B ", " y "), QuoteRecord::without_text("z")],
            ImportMode::Replace,
        );

        assert_eq!(lib.quotes(), &[Quote::new("B", "y")]);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_malformed, 1);
        assert_eq!(lib.last_viewed(), None);
    }

    #[test]
    fn test_import_append_skips_known() {
        let mut lib = library(&[("A", "x")]);

        let summary = lib.import(
            &[QuoteRecord::new("A ", "y"), QuoteRecord::new("B", "y")],
            ImportMode::Append,
        );

        assert_eq!(lib.quotes(), &[Quote::new("A", "x"), Quote::new("B", "y")]);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_duplicates, 1);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn test_import_blank_text_is_malformed() {
        let mut lib = QuoteLibrary::new();
        let summary = lib.import(&[QuoteRecord::new("   ", "y")], ImportMode::Append);
        assert_eq!(summary.skipped_malformed, 1);
        assert!(lib.is_empty());
    }
}
