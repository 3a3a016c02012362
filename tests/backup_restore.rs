//! Integration tests for per-user backup and restore.
//!
//! These tests verify:
//! - The backup → restore round trip
//! - Missing partitions being omitted, not errors
//! - Restore overwriting present fields and leaving absent ones untouched
//! - NotFound on unknown backup keys

use std::sync::Arc;
use std::time::Duration;

use hearthbase::{Config, HearthBase, MemoryStore, StoreClient, Timestamp, Uid, UserProfile};
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

async fn seed_user(store: &MemoryStore, uid: &str) {
    let profile = UserProfile::new(Uid::new(uid), format!("{}@x.com", uid), "Test User");
    store
        .write(
            &format!("users/{}/profile", uid),
            serde_json::to_value(&profile).unwrap(),
        )
        .await
        .unwrap();
    store
        .write(
            &format!("users/{}/tasks/t1", uid),
            json!({"title": "Buy milk"}),
        )
        .await
        .unwrap();
    store
        .write(
            &format!("users/{}/shopping_list_items/s1", uid),
            json!({"name": "Eggs", "quantity": 12}),
        )
        .await
        .unwrap();
    store
        .write(
            &format!("users/{}/inventory_items/i1", uid),
            json!({"name": "Flour"}),
        )
        .await
        .unwrap();
}

// ============================================================================
// Round trip
// ============================================================================

#[tokio::test]
async fn test_backup_then_restore_round_trip() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    seed_user(&store, "u1").await;

    let before = store.read("users/u1").await.unwrap().into_value().unwrap();
    let key = engine.backups().backup(&uid).await.unwrap();

    // Mutate everything after the snapshot
    store.delete("users/u1/tasks").await.unwrap();
    store
        .write("users/u1/shopping_list_items/s2", json!({"name": "Noise"}))
        .await
        .unwrap();
    store
        .write("users/u1/profile/full_name", json!("Renamed"))
        .await
        .unwrap();

    engine.backups().restore(&uid, key).await.unwrap();

    let after = store.read("users/u1").await.unwrap().into_value().unwrap();
    assert_eq!(before, after, "restore must reproduce the snapshot state");
}

#[tokio::test]
async fn test_restore_overwrites_not_merges() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    seed_user(&store, "u1").await;

    let key = engine.backups().backup(&uid).await.unwrap();

    // A record added after the backup must NOT survive a restore of that
    // partition.
    store
        .write("users/u1/tasks/t2", json!({"title": "Added later"}))
        .await
        .unwrap();

    engine.backups().restore(&uid, key).await.unwrap();

    assert!(store.read("users/u1/tasks/t1").await.unwrap().exists());
    assert!(!store.read("users/u1/tasks/t2").await.unwrap().exists());
}

// ============================================================================
// Missing data
// ============================================================================

#[tokio::test]
async fn test_backup_tolerates_missing_partitions() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    // Profile only; no partitions exist yet
    let profile = UserProfile::new(uid.clone(), "a@x.com", "Ana");
    store
        .write("users/u1/profile", serde_json::to_value(&profile).unwrap())
        .await
        .unwrap();

    let key = engine.backups().backup(&uid).await.unwrap();

    let record = store
        .read(&format!("backups/users/u1/{}", key.as_key()))
        .await
        .unwrap()
        .into_value()
        .unwrap();
    assert!(record["data"].get("profile").is_some());
    assert!(record["data"].get("tasks").is_none());
    assert!(record["data"].get("shopping_list_items").is_none());
    assert!(record["data"].get("inventory_items").is_none());
}

#[tokio::test]
async fn test_restore_leaves_absent_fields_untouched() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    let profile = UserProfile::new(uid.clone(), "a@x.com", "Ana");
    store
        .write("users/u1/profile", serde_json::to_value(&profile).unwrap())
        .await
        .unwrap();
    store
        .write("users/u1/tasks/t1", json!({"title": "Old task"}))
        .await
        .unwrap();

    // Snapshot taken before inventory existed
    let key = engine.backups().backup(&uid).await.unwrap();

    store
        .write("users/u1/inventory_items/i1", json!({"name": "Flour"}))
        .await
        .unwrap();

    engine.backups().restore(&uid, key).await.unwrap();

    // Restoring an old backup must not erase the partition it never saw
    assert!(store.read("users/u1/inventory_items/i1").await.unwrap().exists());
    assert!(store.read("users/u1/tasks/t1").await.unwrap().exists());
}

#[tokio::test]
async fn test_restore_unknown_key_is_not_found() {
    let (store, engine) = setup();
    seed_user(&store, "u1").await;

    let err = engine
        .backups()
        .restore(&Uid::new("u1"), Timestamp::from_millis(12345))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_returns_newest_first() {
    let (store, engine) = setup();
    let uid = Uid::new("u1");
    seed_user(&store, "u1").await;

    let mut keys = Vec::new();
    for _ in 0..3 {
        keys.push(engine.backups().backup(&uid).await.unwrap());
        // Distinct millisecond keys
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let listed = engine.backups().list(&uid).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(listed[0], *keys.last().unwrap());

    // Decimal ms keys: lexical order equals chronological order
    let rendered: Vec<String> = listed.iter().map(|t| t.as_key()).collect();
    let mut sorted = rendered.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(rendered, sorted);
}
