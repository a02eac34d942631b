// 🌐 Remote Source - fetch "server" quotes over HTTP
// The endpoint is a black box: any JSON whose records look like quotes
// (or placeholder posts with a title) is accepted.

use crate::config::RemoteConfig;
use crate::quote::{Quote, QuoteRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("remote sync is disabled")]
    Disabled,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RemoteError::Status(status.as_u16()),
            None => RemoteError::Network(err.to_string()),
        }
    }
}

// ============================================================================
// REMOTE SOURCE TRAIT
// ============================================================================

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the current server-side quotes. Records may lack usable text.
    async fn fetch_quotes(&self) -> Result<Vec<QuoteRecord>, RemoteError>;

    /// Post a locally-authored quote to the server
    async fn publish_quote(&self, quote: &Quote) -> Result<(), RemoteError>;
}

// ============================================================================
// HTTP SOURCE
// ============================================================================

pub struct HttpRemoteSource {
    http: reqwest::Client,
    url: String,
    default_category: String,
    limit: Option<usize>,
}

impl HttpRemoteSource {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("quote-sync/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(HttpRemoteSource {
            http,
            url: config.url.clone(),
            default_category: config.default_category.clone(),
            limit: config.limit,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_quotes(&self) -> Result<Vec<QuoteRecord>, RemoteError> {
        debug!(url = %self.url, "fetching remote quotes");

        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        let mut records = records_from_json(&body, &self.default_category)?;
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }

        debug!(count = records.len(), "remote quotes received");
        Ok(records)
    }

    async fn publish_quote(&self, quote: &Quote) -> Result<(), RemoteError> {
        let response = self.http.post(&self.url).json(quote).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}

// ============================================================================
// RESPONSE MAPPING
// ============================================================================

/// Map an arbitrary JSON body to quote records.
///
/// The list is taken from the top level, or from a `quotes` / `data` field.
/// Per object: text from `text`, `quote` or `title`; category from
/// `category`, else `default_category`. Non-object items are skipped.
pub fn records_from_json(body: &Value, default_category: &str) -> Result<Vec<QuoteRecord>, RemoteError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("quotes").or_else(|| map.get("data")) {
            Some(Value::Array(items)) => items,
            _ => return Err(RemoteError::Parse("no quote list in response".to_string())),
        },
        _ => return Err(RemoteError::Parse("response is not a list".to_string())),
    };

    Ok(items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|obj| {
            let text = ["text", "quote", "title"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            let category = obj
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or(default_category)
                .to_string();
            QuoteRecord {
                text,
                category: Some(category),
            }
        })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
