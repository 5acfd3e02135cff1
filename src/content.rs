//! Joke source: wraps the joke supplier and stamps each joke with metadata.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::collaborators::JokeProvider;
use crate::history::{ContentRecord, HistoryStore};

pub const FALLBACK_TEXT: &str = "Why don't scientists trust atoms? Because they make up everything!";
pub const ERROR_TEXT: &str = "Error getting joke. Please try again.";

pub const FALLBACK_CATEGORY: &str = "fallback";
pub const ERROR_CATEGORY: &str = "error";
pub const GENERAL_CATEGORY: &str = "general";

pub struct ContentSource {
    provider: Arc<dyn JokeProvider>,
    available: bool,
    categories: BTreeSet<String>,
}

impl ContentSource {
    /// Probe the supplier once and remember the result.
    pub async fn probe(provider: Arc<dyn JokeProvider>, categories: BTreeSet<String>) -> Self {
        let available = provider.probe().await;
        if available {
            debug!("Joke supplier '{}' is available", provider.name());
        } else {
            warn!(
                "Joke supplier '{}' is not available, fallback jokes will be used",
                provider.name()
            );
        }
        Self::new(provider, available, categories)
    }

    pub fn new(provider: Arc<dyn JokeProvider>, available: bool, categories: BTreeSet<String>) -> Self {
        Self {
            provider,
            available,
            categories,
        }
    }

    /// Fetch one joke and append it to `history`.
    ///
    /// Never fails: an absent supplier yields the `fallback` record and a
    /// failing one yields the `error` record. A category that is not
    /// configured is ignored.
    pub async fn next(&self, history: &mut HistoryStore, category: Option<&str>) -> ContentRecord {
        let id = history.next_sequence_id();

        let record = if !self.available {
            ContentRecord::new(FALLBACK_TEXT, FALLBACK_CATEGORY, id)
        } else {
            let category = category.filter(|c| {
                let known = self.categories.contains(*c);
                if !known {
                    debug!("Category '{c}' is not configured, using the default");
                }
                known
            });

            match self.provider.fetch(category).await {
                Ok(text) => ContentRecord::new(text, category.unwrap_or(GENERAL_CATEGORY), id),
                Err(e) => {
                    error!("Error getting joke: {e}");
                    ContentRecord::new(ERROR_TEXT, ERROR_CATEGORY, id)
                }
            }
        };

        history.append(record.clone());
        record
    }
}
