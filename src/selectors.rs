use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, SELECTORS_KEY};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Host name to CSS selector of the input field the injector should target.
pub type SelectorMap = BTreeMap<String, String>;

pub fn default_selectors() -> SelectorMap {
    [
        ("chat.openai.com", "#prompt-textarea"),
        ("gemini.google.com", r#"[contenteditable="true"]"#),
        ("claude.ai", r#"[contenteditable="true"]"#),
        ("chat.mistral.ai", "textarea"),
        ("grok.x.ai", "textarea"),
        ("www.perplexity.ai", "textarea"),
        ("chat.deepseek.com", "textarea"),
    ]
    .into_iter()
    .map(|(host, selector)| (host.to_string(), selector.to_string()))
    .collect()
}

/// Per-site selector overrides persisted under the `selectors` key.
#[derive(Clone)]
pub struct SelectorStore {
    store: Arc<dyn KeyValueStore>,
}

impl SelectorStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored selectors, or the built-in defaults when none are stored or reading fails.
    #[instrument(skip(self))]
    pub async fn get(&self) -> SelectorMap {
        let stored = match self.store.get(SELECTORS_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Error getting selectors");
                return default_selectors();
            }
        };
        match stored.map(serde_json::from_value::<SelectorMap>) {
            Some(Ok(map)) => map,
            Some(Err(e)) => {
                warn!(error = %e, "Stored selectors are unreadable, using defaults");
                default_selectors()
            }
            None => default_selectors(),
        }
    }

    pub async fn save(&self, selectors: &SelectorMap) -> Result<()> {
        let value = serde_json::to_value(selectors)
            .map_err(|e| Error::store("Failed to serialize selectors", e))?;
        self.store.set(SELECTORS_KEY, value).await
    }

    /// Selector for `host`, ignoring a leading `www.` when there is no exact entry.
    pub async fn selector_for(&self, host: &str) -> Option<String> {
        let selectors = self.get().await;
        selectors
            .get(host)
            .or_else(|| host.strip_prefix("www.").and_then(|bare| selectors.get(bare)))
            .cloned()
    }
}
