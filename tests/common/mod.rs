#![allow(dead_code)]

use async_trait::async_trait;
use prompt_keeper::storage::{KeyValueStore, MemoryStore, BACKUPS_KEY};
use prompt_keeper::{Error, PromptDraft, PromptKeeper, Result};
use serde_json::Value;
use std::sync::Arc;

/// A store whose every call fails, standing in for an unavailable browser store.
pub struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        Err(Error::StoreUnavailable("storage disabled".into()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<()> {
        Err(Error::StoreUnavailable("storage disabled".into()))
    }
}

pub fn keeper() -> (PromptKeeper, MemoryStore) {
    let store = MemoryStore::new();
    (PromptKeeper::new(Arc::new(store.clone())), store)
}

pub async fn add(keeper: &PromptKeeper, label: &str, template: &str, tags: &str) -> String {
    keeper
        .prompts
        .save(PromptDraft::new(label, template).with_tags(tags))
        .await
        .unwrap()
        .id
}

/// Pushes every stored backup timestamp `ms` into the past.
pub async fn age_backups(store: &MemoryStore, ms: i64) {
    let Some(Value::Array(mut ring)) = store.get(BACKUPS_KEY).await.unwrap() else {
        return;
    };
    for backup in ring.iter_mut() {
        let ts = backup["timestamp"].as_i64().unwrap();
        backup["timestamp"] = Value::from(ts - ms);
    }
    store.set(BACKUPS_KEY, Value::Array(ring)).await.unwrap();
}
