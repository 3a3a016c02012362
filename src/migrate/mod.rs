//! Versioned, ordered, idempotent schema migrations.
//!
//! A single persisted scalar (the version marker) records the highest
//! successfully applied version. The runner sorts the registry with a
//! segment-wise numeric comparator, applies every migration strictly
//! greater than the marker, and persists the marker after EACH step
//! before moving to the next. A crash mid-run therefore leaves the marker
//! at the last fully applied version and a re-run skips everything at or
//! below it.
//!
//! Each migration body must itself be idempotent: a crash *during* a
//! migration (after partial writes, before the marker update) re-runs
//! that migration from the start.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::Result;
use crate::repair::{default_categories, default_units};
use crate::store::{paths, StoreHandle};
use crate::types::Timestamp;

/// Version the marker defaults to when the store has never been migrated.
pub const BASE_VERSION: &str = "0.0.0";

type MigrationFn = Arc<dyn for<'a> Fn(&'a StoreHandle) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// One schema migration: a version, a description, and an idempotent
/// async body.
#[derive(Clone)]
pub struct Migration {
    /// Dotted-integer version string, e.g. `"1.1.0"`.
    pub version: &'static str,
    /// What the migration does, for logs.
    pub description: &'static str,
    run: MigrationFn,
}

impl Migration {
    /// Wraps an async migration body.
    ///
    /// ```rust,ignore
    /// Migration::new("1.2.0", "add widget defaults", |store| {
    ///     Box::pin(async move {
    ///         store.write_if_absent("metadata/widgets", json!({})).await?;
    ///         Ok(())
    ///     })
    /// })
    /// ```
    pub fn new(
        version: &'static str,
        description: &'static str,
        run: impl for<'a> Fn(&'a StoreHandle) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            version,
            description,
            run: Arc::new(run),
        }
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Compares two dotted version strings segment-wise and numerically.
///
/// Missing trailing segments count as 0, so `"1.2"` equals `"1.2.0"`.
/// Numeric, not lexical: `"1.2.0"` sorts before `"1.10.0"`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| -> Vec<u64> {
        s.split('.')
            .map(|seg| seg.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let (x, y) = (
            a.get(i).copied().unwrap_or(0),
            b.get(i).copied().unwrap_or(0),
        );
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Applies registered migrations against the store in version order.
pub struct MigrationRunner {
    store: StoreHandle,
    registry: Vec<Migration>,
}

impl MigrationRunner {
    /// Creates a runner with the builtin registry.
    pub fn new(store: StoreHandle) -> Self {
        Self::with_registry(store, builtin_registry())
    }

    /// Creates a runner with a custom registry (tests, staged rollouts).
    pub fn with_registry(store: StoreHandle, registry: Vec<Migration>) -> Self {
        Self { store, registry }
    }

    /// Reads the current version marker, defaulting to [`BASE_VERSION`].
    pub async fn current_version(&self) -> Result<String> {
        let snap = self.store.read(&paths::schema_version()).await?;
        Ok(snap
            .value()
            .and_then(Value::as_str)
            .unwrap_or(BASE_VERSION)
            .to_string())
    }

    /// Runs every migration strictly above the marker, persisting the
    /// marker after each.
    ///
    /// Returns the number of migrations applied. The first failing
    /// migration aborts the remainder; already-applied steps stay
    /// committed and their marker updates stand.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<usize> {
        let current = self.current_version().await?;

        let mut pending: Vec<&Migration> = self
            .registry
            .iter()
            .filter(|m| compare_versions(m.version, &current) == Ordering::Greater)
            .collect();
        pending.sort_by(|a, b| compare_versions(a.version, b.version));

        if pending.is_empty() {
            info!(current = %current, "Schema up to date");
            return Ok(0);
        }

        let mut applied = 0usize;
        for migration in pending {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );
            (migration.run)(&self.store).await?;
            // Marker BEFORE the next step: a crash here re-runs nothing
            // already finished.
            self.store
                .write(&paths::schema_version(), Value::from(migration.version))
                .await?;
            applied += 1;
        }

        info!(applied, "Migrations complete");
        Ok(applied)
    }
}

impl std::fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("registry", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// The shipped migration history.
pub fn builtin_registry() -> Vec<Migration> {
    vec![
        Migration::new(
            "1.0.0",
            "Seed metadata category and unit datasets",
            seed_metadata_datasets,
        ),
        Migration::new(
            "1.1.0",
            "Back-fill profile lifecycle timestamps",
            backfill_profile_timestamps,
        ),
    ]
}

fn seed_metadata_datasets(store: &StoreHandle) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        store
            .write_if_absent(&paths::metadata_categories(), default_categories())
            .await?;
        store
            .write_if_absent(&paths::metadata_units(), default_units())
            .await?;
        Ok(())
    })
}

fn backfill_profile_timestamps(store: &StoreHandle) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let snap = store.read(&paths::users_root()).await?;
        let Some(users) = snap.value().and_then(Value::as_object) else {
            return Ok(());
        };
        let now = Value::from(Timestamp::now().as_millis());
        // Collect first: the snapshot borrows end before the writes start.
        let mut missing: Vec<String> = Vec::new();
        for (uid, subtree) in users {
            let Some(profile) = subtree.get("profile").and_then(Value::as_object) else {
                continue;
            };
            for field in ["created_at", "updated_at"] {
                if !profile.contains_key(field) {
                    missing.push(format!("users/{}/profile/{}", uid, field));
                }
            }
        }
        for path in missing {
            store.write(&path, now.clone()).await?;
        }
        Ok(())
    })
}
