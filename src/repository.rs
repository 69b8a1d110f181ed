use crate::error::{Error, Result};
use crate::models::prompt::{generate_id, Prompt, PromptDraft};
use crate::storage::{KeyValueStore, PROMPTS_KEY};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const ID_PREFIX: &str = "prompt";

/// The collection as stored: decoded prompts plus entries that are not prompt objects.
///
/// Unreadable entries are written back after the prompts on every persist.
#[derive(Debug, Default)]
pub(crate) struct StoredCollection {
    pub(crate) prompts: Vec<Prompt>,
    unreadable: Vec<Value>,
}

/// Owns the prompt collection stored under the `prompts` key.
///
/// Every mutation is a full read, an in-memory change and a single write of the whole
/// collection. There is no locking: two writers racing on the same store can lose an
/// update, which is accepted for a single-user extension.
#[derive(Clone)]
pub struct PromptRepository {
    store: Arc<dyn KeyValueStore>,
}

impl PromptRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Lists prompts with favorites first, otherwise in storage order.
    ///
    /// Best-effort: a store failure is logged and yields an empty list.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<Prompt> {
        match self.load().await {
            Ok(mut prompts) => {
                sort_favorites_first(&mut prompts);
                prompts
            }
            Err(e) => {
                warn!(error = %e, "Error getting prompts");
                Vec::new()
            }
        }
    }

    /// Validates, normalizes and upserts a prompt, returning the stored record.
    #[instrument(skip(self, draft), fields(id = ?draft.id))]
    pub async fn save(&self, draft: PromptDraft) -> Result<Prompt> {
        let label = draft.label.trim();
        let template = draft.template.trim();
        if label.is_empty() {
            return Err(Error::InvalidPrompt("label must not be empty".into()));
        }
        if template.is_empty() {
            return Err(Error::InvalidPrompt("template must not be empty".into()));
        }

        let mut collection = self.load_collection().await?;
        let prompts = &mut collection.prompts;
        let mut normalized = Prompt {
            id: String::new(),
            label: label.to_string(),
            template: template.to_string(),
            tags: draft.tags.normalize(),
            favorite: draft.favorite.unwrap_or(false),
        };

        match draft.id.as_deref().filter(|id| !id.is_empty()) {
            None => {
                normalized.id = generate_id(ID_PREFIX);
                prompts.push(normalized.clone());
            }
            Some(id) => {
                normalized.id = id.to_string();
                match prompts.iter().position(|p| p.id == id) {
                    Some(idx) => {
                        if draft.favorite.is_none() {
                            normalized.favorite = prompts[idx].favorite;
                        }
                        prompts[idx] = normalized.clone();
                    }
                    None => {
                        debug!(id, "No prompt with this id, appending");
                        prompts.push(normalized.clone());
                    }
                }
            }
        }

        self.persist(&collection).await?;
        info!(id = %normalized.id, "Prompt saved");
        Ok(normalized)
    }

    /// Removes every prompt with `id`. Deleting an unknown id is a no-op.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let mut collection = self.load_collection().await?;
        let before = collection.prompts.len();
        collection.prompts.retain(|p| p.id != id);
        let removed = before - collection.prompts.len();
        if removed == 0 {
            debug!("Nothing to delete");
            return Ok(());
        }
        self.persist(&collection).await?;
        info!(removed, "Prompt deleted");
        Ok(())
    }

    /// Looks up a prompt. Missing ids and store failures both yield `None`.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Option<Prompt> {
        match self.load().await {
            Ok(prompts) => prompts.into_iter().find(|p| p.id == id),
            Err(e) => {
                warn!(error = %e, "Error getting prompt by ID");
                None
            }
        }
    }

    /// Flips the favorite flag and returns its new value.
    ///
    /// Unlike delete and lookup this is strict: an unknown id is `Error::NotFound`.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let mut collection = self.load_collection().await?;
        let prompt = collection
            .prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::prompt_not_found(id))?;
        prompt.favorite = !prompt.favorite;
        let favorite = prompt.favorite;
        self.persist(&collection).await?;
        Ok(favorite)
    }

    /// Distinct trimmed tags across all prompts, sorted ascending.
    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> Vec<String> {
        let prompts = match self.load().await {
            Ok(prompts) => prompts,
            Err(e) => {
                warn!(error = %e, "Error getting tags");
                return Vec::new();
            }
        };
        let tags: BTreeSet<String> = prompts
            .iter()
            .flat_map(|p| p.tags.iter())
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tags.into_iter().collect()
    }

    /// Overwrites the whole collection, unreadable entries too. Used by restore.
    pub async fn replace_all(&self, prompts: &[Prompt]) -> Result<()> {
        self.write(prompts, &[]).await
    }

    /// Reads the collection in storage order.
    pub(crate) async fn load(&self) -> Result<Vec<Prompt>> {
        Ok(self.load_collection().await?.prompts)
    }

    /// Reads the collection, migrating legacy shapes in place.
    pub(crate) async fn load_collection(&self) -> Result<StoredCollection> {
        let records = match self.store.get(PROMPTS_KEY).await? {
            None => return Ok(StoredCollection::default()),
            Some(Value::Array(items)) => items,
            Some(Value::Object(mut wrapper)) => match wrapper.remove("prompts") {
                Some(Value::Array(items)) => {
                    info!(count = items.len(), "Unwrapping legacy prompt collection");
                    self.store.set(PROMPTS_KEY, Value::Array(items.clone())).await?;
                    items
                }
                _ => {
                    self.reset_malformed().await?;
                    return Ok(StoredCollection::default());
                }
            },
            Some(_) => {
                self.reset_malformed().await?;
                return Ok(StoredCollection::default());
            }
        };

        let mut collection = StoredCollection::default();
        for record in records {
            match serde_json::from_value::<Prompt>(record.clone()) {
                Ok(prompt) => collection.prompts.push(prompt),
                Err(e) => {
                    warn!(error = %e, "Unreadable prompt record, keeping it as stored");
                    collection.unreadable.push(record);
                }
            }
        }
        Ok(collection)
    }

    async fn reset_malformed(&self) -> Result<()> {
        warn!("Prompt collection has an unknown shape, resetting to empty");
        self.store.set(PROMPTS_KEY, Value::Array(Vec::new())).await
    }

    pub(crate) async fn persist(&self, collection: &StoredCollection) -> Result<()> {
        self.write(&collection.prompts, &collection.unreadable).await
    }

    async fn write(&self, prompts: &[Prompt], unreadable: &[Value]) -> Result<()> {
        let mut records = Vec::with_capacity(prompts.len() + unreadable.len());
        for prompt in prompts {
            records.push(
                serde_json::to_value(prompt)
                    .map_err(|e| Error::store("Failed to serialize prompts", e))?,
            );
        }
        records.extend(unreadable.iter().cloned());
        self.store.set(PROMPTS_KEY, Value::Array(records)).await?;
        debug!(count = prompts.len(), unreadable = unreadable.len(), "Persisted prompt collection");
        Ok(())
    }
}

/// Stable partition: favorites first, relative order otherwise untouched.
pub fn sort_favorites_first(prompts: &mut [Prompt]) {
    prompts.sort_by_key(|p| !p.favorite);
}
