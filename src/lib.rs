pub mod backup;
pub mod error;
pub mod models;
pub mod preferences;
pub mod repository;
pub mod selectors;
pub mod storage;
pub mod transfer;

use std::sync::Arc;
use tracing::instrument;

pub use crate::backup::{BackupManager, BackupPolicy, LifecycleEvent, RateLimitScope, RestoreSummary};
pub use crate::error::{Error, Result};
pub use crate::models::{Backup, BackupReason, Prompt, PromptDraft, TagInput};
pub use crate::preferences::{Preferences, Theme};
pub use crate::repository::PromptRepository;
pub use crate::selectors::SelectorStore;
pub use crate::storage::KeyValueStore;
pub use crate::transfer::{ImportOutcome, ImportSummary, TransferEngine};

/// Handle to every component, all sharing one store.
///
/// Construct once per session and pass it (or a clone) to whoever needs it.
#[derive(Clone)]
pub struct PromptKeeper {
    pub prompts: PromptRepository,
    pub transfer: TransferEngine,
    pub backups: BackupManager,
    pub selectors: SelectorStore,
    pub preferences: Preferences,
}

impl PromptKeeper {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_policy(store, BackupPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn KeyValueStore>, policy: BackupPolicy) -> Self {
        let prompts = PromptRepository::new(store.clone());
        Self {
            transfer: TransferEngine::new(prompts.clone()),
            backups: BackupManager::new(store.clone(), prompts.clone(), policy),
            selectors: SelectorStore::new(store.clone()),
            preferences: Preferences::new(store),
            prompts,
        }
    }

    /// Takes a `pre-import` snapshot, then imports `document`.
    #[instrument(skip(self, document))]
    pub async fn import_with_backup(&self, document: &str) -> Result<ImportSummary> {
        self.backups.create_backup(BackupReason::PreImport).await;
        self.transfer.import(document).await
    }

    /// Takes a `pre-restore` snapshot, then restores backup `id`.
    ///
    /// The target is read before the snapshot is pushed, so restoring the oldest
    /// entry of a full ring still works after it gets evicted.
    #[instrument(skip(self))]
    pub async fn restore_with_backup(&self, id: &str) -> Result<RestoreSummary> {
        let target = self.backups.find_backup(id).await?;
        self.backups.create_backup(BackupReason::PreRestore).await;
        self.backups.apply(&target).await
    }
}
