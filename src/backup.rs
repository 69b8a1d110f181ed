//! Bounded ring of point-in-time snapshots of the prompt collection.

use crate::error::{Error, Result};
use crate::models::backup::{Backup, BackupReason};
use crate::models::prompt::generate_id;
use crate::repository::PromptRepository;
use crate::storage::{KeyValueStore, BACKUPS_KEY};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Which backup reasons the minimum interval applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitScope {
    /// Only browser-fired startup/update snapshots are throttled.
    #[default]
    AutomaticOnly,
    /// Every snapshot is throttled, including manual and pre-import/pre-restore ones.
    All,
}

#[derive(Debug, Clone)]
pub struct BackupPolicy {
    pub max_backups: usize,
    pub min_interval_ms: i64,
    pub scope: RateLimitScope,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            max_backups: 3,
            min_interval_ms: 3_600_000,
            scope: RateLimitScope::AutomaticOnly,
        }
    }
}

impl BackupPolicy {
    fn throttles(&self, reason: BackupReason) -> bool {
        match self.scope {
            RateLimitScope::AutomaticOnly => reason.is_automatic(),
            RateLimitScope::All => true,
        }
    }
}

/// Why the extension was installed, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    BrowserUpdate,
}

/// Browser lifecycle events that may trigger an automatic snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Installed { reason: InstallReason },
    Startup,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
}

/// One ring slot. Entries that do not decode keep their slot and are written back unchanged.
#[derive(Debug, Clone)]
enum RingEntry {
    Readable(Backup),
    Unreadable(Value),
}

impl RingEntry {
    fn backup(&self) -> Option<&Backup> {
        match self {
            RingEntry::Readable(backup) => Some(backup),
            RingEntry::Unreadable(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct BackupManager {
    store: Arc<dyn KeyValueStore>,
    repository: PromptRepository,
    policy: BackupPolicy,
}

impl BackupManager {
    pub fn new(store: Arc<dyn KeyValueStore>, repository: PromptRepository, policy: BackupPolicy) -> Self {
        Self { store, repository, policy }
    }

    /// Snapshots the collection and pushes it onto the ring.
    ///
    /// Returns `None` when nothing was written: the collection is empty, the last
    /// snapshot is too recent for this reason, or the store failed. Failures are only
    /// logged so a snapshot never blocks the operation it guards.
    #[instrument(skip(self))]
    pub async fn create_backup(&self, reason: BackupReason) -> Option<Backup> {
        match self.try_create_backup(reason).await {
            Ok(backup) => backup,
            Err(e) => {
                error!(error = %e, "Backup failed");
                None
            }
        }
    }

    async fn try_create_backup(&self, reason: BackupReason) -> Result<Option<Backup>> {
        let prompts = self.repository.load().await?;
        if prompts.is_empty() {
            debug!("Collection is empty, nothing to back up");
            return Ok(None);
        }

        let mut ring = self.load_ring().await?;
        let now: DateTime<Utc> = Utc::now();
        let now_ms = now.timestamp_millis();

        if let Some(latest) = ring.first().and_then(RingEntry::backup) {
            if self.policy.throttles(reason) && now_ms - latest.timestamp < self.policy.min_interval_ms {
                debug!(last = latest.timestamp, "Last backup is too recent, skipping");
                return Ok(None);
            }
        }

        let backup = Backup {
            id: generate_id("backup"),
            timestamp: now_ms,
            date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            reason,
            prompt_count: prompts.len(),
            prompts,
        };
        ring.insert(0, RingEntry::Readable(backup.clone()));
        ring.truncate(self.policy.max_backups);
        self.persist_ring(&ring).await?;

        info!(id = %backup.id, count = backup.prompt_count, "Backup created");
        Ok(Some(backup))
    }

    /// The ring as stored, newest first. Best-effort: store failures yield an empty list.
    #[instrument(skip(self))]
    pub async fn list_backups(&self) -> Vec<Backup> {
        match self.load_ring().await {
            Ok(ring) => ring
                .into_iter()
                .filter_map(|entry| match entry {
                    RingEntry::Readable(backup) => Some(backup),
                    RingEntry::Unreadable(_) => None,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Error getting backups");
                Vec::new()
            }
        }
    }

    /// Replaces the whole collection with the snapshot's prompts.
    ///
    /// This is destructive; callers are expected to take a `pre-restore` backup first.
    #[instrument(skip(self))]
    pub async fn restore_backup(&self, id: &str) -> Result<RestoreSummary> {
        let backup = self.find_backup(id).await?;
        self.apply(&backup).await
    }

    pub(crate) async fn find_backup(&self, id: &str) -> Result<Backup> {
        self.load_ring()
            .await?
            .into_iter()
            .find_map(|entry| match entry {
                RingEntry::Readable(backup) if backup.id == id => Some(backup),
                _ => None,
            })
            .ok_or_else(|| Error::backup_not_found(id))
    }

    pub(crate) async fn apply(&self, backup: &Backup) -> Result<RestoreSummary> {
        self.repository.replace_all(&backup.prompts).await?;
        info!(id = %backup.id, count = backup.prompt_count, "Backup restored");
        Ok(RestoreSummary { restored: backup.prompt_count })
    }

    /// Entry point for the browser's install/update and startup notifications.
    pub async fn handle_event(&self, event: LifecycleEvent) {
        let reason = match event {
            LifecycleEvent::Installed { reason: InstallReason::Update } => BackupReason::Update,
            LifecycleEvent::Startup => BackupReason::Startup,
            LifecycleEvent::Installed { .. } => return,
        };
        self.create_backup(reason).await;
    }

    async fn load_ring(&self) -> Result<Vec<RingEntry>> {
        let items = match self.store.get(BACKUPS_KEY).await? {
            Some(Value::Array(items)) => items,
            None => return Ok(Vec::new()),
            Some(_) => {
                warn!("Backup ring has an unknown shape, treating as empty");
                return Ok(Vec::new());
            }
        };
        Ok(items
            .into_iter()
            .map(|item| match serde_json::from_value::<Backup>(item.clone()) {
                Ok(backup) => RingEntry::Readable(backup),
                Err(e) => {
                    warn!(error = %e, "Unreadable backup, keeping it as stored");
                    RingEntry::Unreadable(item)
                }
            })
            .collect())
    }

    async fn persist_ring(&self, ring: &[RingEntry]) -> Result<()> {
        let mut items = Vec::with_capacity(ring.len());
        for entry in ring {
            items.push(match entry {
                RingEntry::Readable(backup) => serde_json::to_value(backup)
                    .map_err(|e| Error::store("Failed to serialize backups", e))?,
                RingEntry::Unreadable(raw) => raw.clone(),
            });
        }
        self.store.set(BACKUPS_KEY, Value::Array(items)).await
    }
}
