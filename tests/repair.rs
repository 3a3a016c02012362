//! Integration tests for the repair service.
//!
//! These tests verify:
//! - Back-fill of missing profile fields with configured defaults
//! - Seeding of the fixed metadata datasets
//! - Per-record failure isolation: one bad record never blocks the rest

use std::sync::Arc;

use hearthbase::{Config, HearthBase, MemoryStore, StoreClient, Uid, UserProfile};
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

// ============================================================================
// Profile back-fill
// ============================================================================

#[tokio::test]
async fn test_backfills_missing_profile_fields() {
    let (store, engine) = setup();

    // A bare profile: no timestamps, no language, no timezone
    store
        .write(
            "users/u1/profile",
            json!({"uid": "u1", "email": "a@x.com", "full_name": "Ana"}),
        )
        .await
        .unwrap();

    let report = engine.repair().repair_all().await.unwrap();
    // 4 profile fields + 2 metadata datasets
    assert_eq!(report.repairs, 6);
    assert_eq!(report.failures, 0);

    let profile = store.read("users/u1/profile").await.unwrap().into_value().unwrap();
    assert!(profile["created_at"].is_i64());
    assert!(profile["updated_at"].is_i64());
    assert_eq!(profile["language_preference"], "en");
    assert_eq!(profile["timezone"], "UTC");
}

#[tokio::test]
async fn test_existing_fields_are_left_alone() {
    let (store, engine) = setup();

    let profile = UserProfile {
        language_preference: Some("de".into()),
        timezone: Some("Europe/Berlin".into()),
        ..UserProfile::new(Uid::new("u1"), "a@x.com", "Ana")
    };
    store
        .write("users/u1/profile", serde_json::to_value(&profile).unwrap())
        .await
        .unwrap();
    let before = store.read("users/u1/profile").await.unwrap().into_value().unwrap();

    let report = engine.repair().repair_all().await.unwrap();
    // Only the metadata datasets needed seeding
    assert_eq!(report.repairs, 2);

    let after = store.read("users/u1/profile").await.unwrap().into_value().unwrap();
    assert_eq!(before, after, "a complete profile must not be touched");
}

#[tokio::test]
async fn test_uses_configured_default_language() {
    let store = Arc::new(MemoryStore::new());
    let engine = HearthBase::new(
        Arc::clone(&store) as Arc<dyn StoreClient>,
        Config {
            default_language: "fr".into(),
            ..Default::default()
        },
    )
    .unwrap();

    store
        .write(
            "users/u1/profile",
            json!({"uid": "u1", "email": "a@x.com", "full_name": "Ana"}),
        )
        .await
        .unwrap();

    engine.repair().repair_all().await.unwrap();

    let profile = store.read("users/u1/profile").await.unwrap().into_value().unwrap();
    assert_eq!(profile["language_preference"], "fr");
}

// ============================================================================
// Metadata seeding
// ============================================================================

#[tokio::test]
async fn test_seeds_missing_metadata_datasets() {
    let (store, engine) = setup();

    engine.repair().repair_all().await.unwrap();

    let categories = store.read("metadata/categories").await.unwrap().into_value().unwrap();
    assert!(!categories.as_array().unwrap().is_empty());
    let units = store.read("metadata/units").await.unwrap().into_value().unwrap();
    assert!(!units.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_existing_metadata_is_not_overwritten() {
    let (store, engine) = setup();

    store
        .write("metadata/categories", json!(["custom-only"]))
        .await
        .unwrap();

    engine.repair().repair_all().await.unwrap();

    let categories = store.read("metadata/categories").await.unwrap().into_value().unwrap();
    assert_eq!(categories, json!(["custom-only"]));
}

#[tokio::test]
async fn test_empty_metadata_counts_as_missing() {
    let (store, engine) = setup();

    store.write("metadata/categories", json!([])).await.unwrap();

    let report = engine.repair().repair_all().await.unwrap();
    assert_eq!(report.repairs, 2);

    let categories = store.read("metadata/categories").await.unwrap().into_value().unwrap();
    assert!(!categories.as_array().unwrap().is_empty());
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_malformed_profile_does_not_block_the_scan() {
    let (store, engine) = setup();

    store
        .write("users/broken/profile", json!("not an object"))
        .await
        .unwrap();
    store
        .write(
            "users/u1/profile",
            json!({"uid": "u1", "email": "a@x.com", "full_name": "Ana"}),
        )
        .await
        .unwrap();

    let report = engine.repair().repair_all().await.unwrap();
    assert_eq!(report.failures, 1);
    assert!(report.repairs >= 4, "the healthy profile is still repaired");

    let profile = store.read("users/u1/profile").await.unwrap().into_value().unwrap();
    assert!(profile["created_at"].is_i64());
}

#[tokio::test]
async fn test_store_failure_on_one_profile_is_isolated() {
    let (store, engine) = setup();

    for uid in ["u1", "u2"] {
        store
            .write(
                &format!("users/{}/profile", uid),
                json!({"uid": uid, "email": format!("{}@x.com", uid), "full_name": "X"}),
            )
            .await
            .unwrap();
    }
    // Writes to u2's profile fail; the scan itself reads "users" and is
    // unaffected.
    store.fail_matching("users/u2/profile");

    let report = engine.repair().repair_all().await.unwrap();
    assert_eq!(report.failures, 1);

    store.clear_failures();
    let healthy = store.read("users/u1/profile").await.unwrap().into_value().unwrap();
    assert!(healthy["created_at"].is_i64());
    let skipped = store.read("users/u2/profile").await.unwrap().into_value().unwrap();
    assert!(skipped.get("created_at").is_none());
}

#[tokio::test]
async fn test_repair_on_empty_store_seeds_only_metadata() {
    let (_, engine) = setup();
    let report = engine.repair().repair_all().await.unwrap();
    assert_eq!(report.repairs, 2);
    assert_eq!(report.failures, 0);
}
