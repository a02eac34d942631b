// 💬 Quote Model - the only entity
// Quote = validated {text, category}; QuoteRecord = whatever arrives from outside

use serde::{Deserialize, Serialize};

// ============================================================================
// QUOTE
// ============================================================================

/// A quote held in the library.
///
/// `text` is the identity key: exact, case-sensitive comparison, never normalized.
/// `category` is free-form and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,

    #[serde(default)]
    pub category: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Quote {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Identity key used for deduplication
    pub fn key(&self) -> &str {
        &self.text
    }

    /// Human-readable one-liner: `"text" (category)`
    pub fn display_line(&self) -> String {
        if self.category.is_empty() {
            format!("\"{}\"", self.text)
        } else {
            format!("\"{}\" ({})", self.text, self.category)
        }
    }
}

impl From<Quote> for QuoteRecord {
    fn from(quote: Quote) -> Self {
        QuoteRecord {
            text: Some(quote.text),
            category: Some(quote.category),
        }
    }
}

// ============================================================================
// QUOTE RECORD (lenient external shape)
// ============================================================================

/// Record as received from storage, import files or the remote source.
///
/// Any field may be missing; unknown fields are ignored. Only records with
/// usable text become quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
}

impl QuoteRecord {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        QuoteRecord {
            text: Some(text.into()),
            category: Some(category.into()),
        }
    }

    /// Record with a category but no text (malformed)
    pub fn without_text(category: impl Into<String>) -> Self {
        QuoteRecord {
            text: None,
            category: Some(category.into()),
        }
    }

    /// Text is present and not blank
    pub fn is_usable(&self) -> bool {
        self.text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    /// Convert without touching the text. Missing category becomes "".
    pub fn to_quote(&self) -> Option<Quote> {
        if !self.is_usable() {
            return None;
        }
        Some(Quote {
            text: self.text.clone().unwrap_or_default(),
            category: self.category.clone().unwrap_or_default(),
        })
    }

    /// Convert with both fields trimmed (user-facing import path)
    pub fn to_trimmed_quote(&self) -> Option<Quote> {
        let quote = self.to_quote()?;
        Some(Quote {
            text: quote.text.trim().to_string(),
            category: quote.category.trim().to_string(),
        })
    }
}

/// Non-string values (numbers, null, objects) are treated as absent
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

// ============================================================================
// SEED QUOTES
// ============================================================================

/// Quotes installed the first time an empty store is opened
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The only way to do great work is to love what you do.",
            "inspiration",
        ),
        Quote::new("Simplicity is the ultimate sophistication.", "philosophy"),
        Quote::new("Mistakes are proof that you are trying.", "encouragement"),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
