//! Integration tests for the retention service.
//!
//! These tests verify:
//! - Backup pruning keeping exactly the newest N snapshots
//! - The 60-day archived-record aging boundary
//! - Per-kind fallback timestamp fields
//! - All-settled delete semantics: one failure never blocks the rest

use std::sync::Arc;
use std::time::Duration;

use hearthbase::{
    Config, HearthBase, MemoryStore, StoreClient, Timestamp, Uid, UserProfile, MILLIS_PER_DAY,
};
use serde_json::json;

fn setup() -> (Arc<MemoryStore>, HearthBase) {
    let store = Arc::new(MemoryStore::new());
    let engine = HearthBase::new(
        Arc::clone(&store) as Arc<dyn StoreClient>,
        Config::default(),
    )
    .unwrap();
    (store, engine)
}

/// Epoch ms for a record archived `days` days ago, nudged by `nudge_ms`
/// to land strictly inside or outside the cutoff window regardless of the
/// few milliseconds that elapse before the service computes "now".
fn archived_millis(days: i64, nudge_ms: i64) -> i64 {
    Timestamp::now().as_millis() - days * MILLIS_PER_DAY + nudge_ms
}

// ============================================================================
// Backup pruning
// ============================================================================

#[tokio::test]
async fn test_twelve_backups_keep_the_ten_newest() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    let profile = UserProfile::new(uid.clone(), "a@x.com", "Ana");
    store
        .write("users/u1/profile", serde_json::to_value(&profile).unwrap())
        .await
        .unwrap();

    let mut keys = Vec::new();
    for _ in 0..12 {
        keys.push(engine.backups().backup(&uid).await.unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let deleted = engine.retention().prune_backups(&uid).await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = engine.backups().list(&uid).await.unwrap();
    assert_eq!(remaining.len(), 10);

    // Exactly the two oldest are gone
    assert!(!remaining.contains(&keys[0]));
    assert!(!remaining.contains(&keys[1]));
    for key in &keys[2..] {
        assert!(remaining.contains(key), "newer backup {} must survive", key);
    }
}

#[tokio::test]
async fn test_prune_backups_under_limit_is_noop() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    let profile = UserProfile::new(uid.clone(), "a@x.com", "Ana");
    store
        .write("users/u1/profile", serde_json::to_value(&profile).unwrap())
        .await
        .unwrap();

    for _ in 0..3 {
        engine.backups().backup(&uid).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(engine.retention().prune_backups(&uid).await.unwrap(), 0);
    assert_eq!(engine.backups().list(&uid).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_prune_backups_with_none_is_noop() {
    let (_, engine) = setup();
    assert_eq!(
        engine.retention().prune_backups(&Uid::new("u1")).await.unwrap(),
        0
    );
}

// ============================================================================
// Archived-record aging: the 60-day boundary
// ============================================================================

#[tokio::test]
async fn test_aging_deletes_only_strictly_past_the_cutoff() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    store
        .write(
            "users/u1/tasks/old",
            json!({"title": "old", "archived": true, "archived_date": archived_millis(61, 0)}),
        )
        .await
        .unwrap();
    store
        .write(
            "users/u1/tasks/young",
            json!({"title": "young", "archived": true, "archived_date": archived_millis(59, 0)}),
        )
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.retained, 1);
    assert_eq!(report.failed, 0);

    assert!(!store.read("users/u1/tasks/old").await.unwrap().exists());
    assert!(store.read("users/u1/tasks/young").await.unwrap().exists());
}

#[tokio::test]
async fn test_aging_boundary_is_exclusive_at_sixty_days() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    // One second inside the 60-day window: day 60 itself is retained
    store
        .write(
            "users/u1/tasks/at_cutoff",
            json!({"archived": true, "archived_date": archived_millis(60, 1000), "title": "t"}),
        )
        .await
        .unwrap();
    // One second past the window: deleted
    store
        .write(
            "users/u1/tasks/past_cutoff",
            json!({"archived": true, "archived_date": archived_millis(60, -1000), "title": "t"}),
        )
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.retained, 1);

    assert!(store.read("users/u1/tasks/at_cutoff").await.unwrap().exists());
    assert!(!store.read("users/u1/tasks/past_cutoff").await.unwrap().exists());
}

#[tokio::test]
async fn test_aging_ignores_unarchived_records() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    store
        .write(
            "users/u1/tasks/active",
            json!({"title": "old but live", "archived_date": archived_millis(200, 0)}),
        )
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 0);
    assert!(store.read("users/u1/tasks/active").await.unwrap().exists());
}

#[tokio::test]
async fn test_aging_retains_archived_records_with_no_age_marker() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    store
        .write("users/u1/tasks/unknowable", json!({"archived": true, "title": "t"}))
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(report.retained, 1);
    assert!(store.read("users/u1/tasks/unknowable").await.unwrap().exists());
}

// ============================================================================
// Archived-record aging: fallback fields and kind coverage
// ============================================================================

#[tokio::test]
async fn test_aging_uses_per_kind_fallback_timestamps() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    // No archived_date anywhere; each kind falls back to its own field
    store
        .write(
            "users/u1/tasks/t1",
            json!({"archived": true, "completed_date": archived_millis(90, 0)}),
        )
        .await
        .unwrap();
    store
        .write(
            "users/u1/shopping_list_items/s1",
            json!({"archived": true, "purchased_date": archived_millis(90, 0)}),
        )
        .await
        .unwrap();
    store
        .write(
            "users/u1/inventory_items/i1",
            json!({"archived": true, "updated_date": archived_millis(90, 0)}),
        )
        .await
        .unwrap();
    store
        .write(
            "users/u1/events/e1",
            json!({"archived": true, "event_date": archived_millis(90, 0)}),
        )
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 4, "every archivable kind ages out");

    for path in [
        "users/u1/tasks/t1",
        "users/u1/shopping_list_items/s1",
        "users/u1/inventory_items/i1",
        "users/u1/events/e1",
    ] {
        assert!(!store.read(path).await.unwrap().exists(), "{} survived", path);
    }
}

#[tokio::test]
async fn test_aging_prefers_archived_date_over_fallback() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    // Completed long ago but archived recently: retained
    store
        .write(
            "users/u1/tasks/t1",
            json!({
                "archived": true,
                "archived_date": archived_millis(5, 0),
                "completed_date": archived_millis(300, 0)
            }),
        )
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(report.retained, 1);
}

// ============================================================================
// All-settled delete semantics
// ============================================================================

#[tokio::test]
async fn test_delete_failures_are_counted_not_fatal() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");

    for i in 0..5 {
        store
            .write(
                &format!("users/u1/tasks/t{}", i),
                json!({"archived": true, "archived_date": archived_millis(90, 0)}),
            )
            .await
            .unwrap();
    }
    // Poison a single record's delete path after seeding
    store.fail_matching("tasks/t3");

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 4);
    assert_eq!(report.failed, 1);

    // The poisoned record is still there; every other one is gone
    store.clear_failures();
    assert!(store.read("users/u1/tasks/t3").await.unwrap().exists());
    for i in [0, 1, 2, 4] {
        assert!(!store
            .read(&format!("users/u1/tasks/t{}", i))
            .await
            .unwrap()
            .exists());
    }
}

#[tokio::test]
async fn test_aging_respects_custom_retention_window() {
    let store = Arc::new(MemoryStore::new());
    let engine = HearthBase::new(
        Arc::clone(&store) as Arc<dyn StoreClient>,
        Config {
            archive_retention_days: 7,
            ..Default::default()
        },
    )
    .unwrap();
    let uid = Uid::new("u1");

    store
        .write(
            "users/u1/tasks/t1",
            json!({"archived": true, "archived_date": archived_millis(8, 0)}),
        )
        .await
        .unwrap();

    let report = engine.retention().prune_archived(&uid).await.unwrap();
    assert_eq!(report.deleted, 1);
}
