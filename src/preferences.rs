use crate::error::Result;
use crate::storage::{KeyValueStore, THEME_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Theme::Auto => Theme::Light,
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Auto,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current theme; unset, unknown or unreadable values read as `Auto`.
    pub async fn theme(&self) -> Theme {
        match self.store.get(THEME_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(None) => Theme::Auto,
            Err(e) => {
                warn!(error = %e, "Error getting theme");
                Theme::Auto
            }
        }
    }

    /// Advances auto -> light -> dark -> auto and persists the result.
    pub async fn cycle_theme(&self) -> Result<Theme> {
        let next = self.theme().await.next();
        self.store.set(THEME_KEY, Value::String(next.to_string())).await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn cycles_through_all_themes() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.theme().await, Theme::Auto);
        assert_eq!(prefs.cycle_theme().await.unwrap(), Theme::Light);
        assert_eq!(prefs.cycle_theme().await.unwrap(), Theme::Dark);
        assert_eq!(prefs.cycle_theme().await.unwrap(), Theme::Auto);
    }

    #[tokio::test]
    async fn unknown_stored_theme_reads_as_auto() {
        let store = MemoryStore::with_entries([(THEME_KEY, json!("sepia"))]);
        let prefs = Preferences::new(Arc::new(store));
        assert_eq!(prefs.theme().await, Theme::Auto);
    }
}
