mod common;

use common::{add, age_backups, keeper, UnavailableStore};
use prompt_keeper::backup::InstallReason;
use prompt_keeper::storage::{KeyValueStore, MemoryStore, BACKUPS_KEY};
use prompt_keeper::{BackupPolicy, BackupReason, LifecycleEvent, PromptKeeper, RateLimitScope};
use serde_json::json;
use std::sync::Arc;

const HOUR_MS: i64 = 3_600_000;

#[tokio::test]
async fn empty_collection_is_not_backed_up() {
    let (keeper, _) = keeper();
    assert!(keeper.backups.create_backup(BackupReason::Manual).await.is_none());
    assert!(keeper.backups.list_backups().await.is_empty());
}

#[tokio::test]
async fn backup_captures_collection() {
    let (keeper, _) = keeper();
    add(&keeper, "A", "alpha", "x").await;
    add(&keeper, "B", "beta", "").await;

    let backup = keeper.backups.create_backup(BackupReason::Manual).await.unwrap();

    assert!(backup.id.starts_with("backup_"));
    assert_eq!(backup.reason, BackupReason::Manual);
    assert_eq!(backup.prompt_count, 2);
    assert_eq!(backup.prompts.len(), 2);
    assert!(chrono::DateTime::parse_from_rfc3339(&backup.date).is_ok());
    assert_eq!(keeper.backups.list_backups().await, vec![backup]);
}

#[tokio::test]
async fn automatic_backups_within_an_hour_are_throttled() {
    let (keeper, _) = keeper();
    add(&keeper, "A", "alpha", "").await;

    assert!(keeper.backups.create_backup(BackupReason::Startup).await.is_some());
    assert!(keeper.backups.create_backup(BackupReason::Update).await.is_none());

    assert_eq!(keeper.backups.list_backups().await.len(), 1);
}

#[tokio::test]
async fn throttle_lifts_after_an_hour() {
    let (keeper, store) = keeper();
    add(&keeper, "A", "alpha", "").await;

    keeper.backups.create_backup(BackupReason::Startup).await.unwrap();
    age_backups(&store, HOUR_MS).await;

    assert!(keeper.backups.create_backup(BackupReason::Startup).await.is_some());
    assert_eq!(keeper.backups.list_backups().await.len(), 2);
}

#[tokio::test]
async fn user_initiated_backups_bypass_throttle_by_default() {
    let (keeper, _) = keeper();
    add(&keeper, "A", "alpha", "").await;

    keeper.backups.create_backup(BackupReason::Startup).await.unwrap();
    assert!(keeper.backups.create_backup(BackupReason::PreImport).await.is_some());
    assert!(keeper.backups.create_backup(BackupReason::Manual).await.is_some());
}

#[tokio::test]
async fn throttle_can_cover_every_reason() {
    let store = MemoryStore::new();
    let policy = BackupPolicy { scope: RateLimitScope::All, ..BackupPolicy::default() };
    let keeper = PromptKeeper::with_policy(Arc::new(store), policy);
    add(&keeper, "A", "alpha", "").await;

    keeper.backups.create_backup(BackupReason::Startup).await.unwrap();
    assert!(keeper.backups.create_backup(BackupReason::PreImport).await.is_none());
}

#[tokio::test]
async fn ring_keeps_three_most_recent() {
    let (keeper, store) = keeper();
    add(&keeper, "A", "alpha", "").await;

    let mut created = Vec::new();
    for _ in 0..5 {
        created.push(keeper.backups.create_backup(BackupReason::Startup).await.unwrap().id);
        age_backups(&store, 2 * HOUR_MS).await;
    }

    let ids: Vec<String> = keeper.backups.list_backups().await.into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![created[4].clone(), created[3].clone(), created[2].clone()]);
}

#[tokio::test]
async fn restore_brings_back_exact_collection() {
    let (keeper, _) = keeper();
    add(&keeper, "A", "alpha", "one, two").await;
    let b = add(&keeper, "B", "beta", "").await;
    keeper.prompts.toggle_favorite(&b).await.unwrap();
    let before = keeper.prompts.list().await;
    let backup = keeper.backups.create_backup(BackupReason::Manual).await.unwrap();

    for prompt in &before {
        keeper.prompts.delete_by_id(&prompt.id).await.unwrap();
    }
    assert!(keeper.prompts.list().await.is_empty());

    let summary = keeper.backups.restore_backup(&backup.id).await.unwrap();

    assert_eq!(summary.restored, 2);
    assert_eq!(keeper.prompts.list().await, before);
}

#[tokio::test]
async fn restore_unknown_backup_is_not_found() {
    let (keeper, _) = keeper();
    let err = keeper.backups.restore_backup("backup_missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn guarded_restore_snapshots_then_restores_oldest() {
    let (keeper, store) = keeper();
    add(&keeper, "A", "alpha", "").await;
    let oldest = keeper.backups.create_backup(BackupReason::Manual).await.unwrap();
    add(&keeper, "B", "beta", "").await;
    keeper.backups.create_backup(BackupReason::Manual).await.unwrap();
    add(&keeper, "C", "gamma", "").await;
    keeper.backups.create_backup(BackupReason::Manual).await.unwrap();
    age_backups(&store, HOUR_MS).await;

    let summary = keeper.restore_with_backup(&oldest.id).await.unwrap();

    assert_eq!(summary.restored, 1);
    assert_eq!(keeper.prompts.list().await, oldest.prompts);
    let ring = keeper.backups.list_backups().await;
    assert_eq!(ring.len(), 3);
    assert_eq!(ring[0].reason, BackupReason::PreRestore);
    assert_eq!(ring[0].prompt_count, 3);
}

#[tokio::test]
async fn lifecycle_events_map_to_reasons() {
    let (keeper, store) = keeper();
    add(&keeper, "A", "alpha", "").await;

    keeper.backups.handle_event(LifecycleEvent::Installed { reason: InstallReason::Install }).await;
    keeper
        .backups
        .handle_event(LifecycleEvent::Installed { reason: InstallReason::BrowserUpdate })
        .await;
    assert!(keeper.backups.list_backups().await.is_empty());

    keeper.backups.handle_event(LifecycleEvent::Installed { reason: InstallReason::Update }).await;
    age_backups(&store, HOUR_MS).await;
    keeper.backups.handle_event(LifecycleEvent::Startup).await;

    let reasons: Vec<BackupReason> = keeper.backups.list_backups().await.into_iter().map(|b| b.reason).collect();
    assert_eq!(reasons, vec![BackupReason::Startup, BackupReason::Update]);
}

#[tokio::test]
async fn store_failures_never_escape_backup_creation() {
    let keeper = PromptKeeper::new(Arc::new(UnavailableStore));
    assert!(keeper.backups.create_backup(BackupReason::Manual).await.is_none());
    assert!(keeper.backups.list_backups().await.is_empty());
    assert!(keeper.restore_with_backup("backup_x").await.is_err());
}

#[tokio::test]
async fn unreadable_backups_keep_their_ring_slot() {
    let (keeper, store) = keeper();
    add(&keeper, "A", "alpha", "").await;
    store
        .set(
            BACKUPS_KEY,
            json!([
                {
                    "id": "backup_old",
                    "timestamp": 1_000,
                    "date": "1970-01-01T00:00:01.000Z",
                    "reason": "startup",
                    "promptCount": 1,
                    "prompts": [{ "label": "no id", "template": "body" }]
                },
                { "id": "backup_odd", "timestamp": 500, "reason": "weekly", "prompts": [] }
            ]),
        )
        .await
        .unwrap();

    let listed = keeper.backups.list_backups().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].prompts[0].label, "no id");

    keeper.backups.create_backup(BackupReason::Manual).await.unwrap();

    let raw = store.get(BACKUPS_KEY).await.unwrap().unwrap();
    let ids: Vec<&str> = raw.as_array().unwrap().iter().map(|b| b["id"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(&ids[1..], ["backup_old", "backup_odd"]);
    assert_eq!(raw[2]["reason"], json!("weekly"));
}
