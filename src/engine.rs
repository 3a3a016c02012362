//! Hearthbase main struct and lifecycle service wiring.
//!
//! The [`HearthBase`] struct is the primary interface for the persistence
//! engine. It owns the injected store client plus configuration and hands
//! out the lifecycle services:
//!
//! - [`sharing()`](HearthBase::sharing) — partner linking and unlinking
//! - [`migrations()`](HearthBase::migrations) — versioned schema evolution
//! - [`backups()`](HearthBase::backups) — per-user snapshot and restore
//! - [`repair()`](HearthBase::repair) — back-fill of missing required data
//! - [`retention()`](HearthBase::retention) — backup pruning and
//!   archived-record aging
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hearthbase::{Config, HearthBase, MemoryStore};
//!
//! let engine = HearthBase::new(Arc::new(MemoryStore::new()), Config::default())?;
//!
//! // First-login maintenance
//! engine.migrations().run().await?;
//!
//! // Link two partners
//! engine.sharing().link_partner(&uid, "partner@example.com").await?;
//! ```
//!
//! # Thread Safety
//!
//! `HearthBase` is `Send + Sync`; the store client is shared through an
//! `Arc` and every service holds only that shared handle, so services may
//! be created freely and used from any task.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::backup::BackupService;
use crate::config::Config;
use crate::error::{HearthError, Result};
use crate::migrate::{Migration, MigrationRunner};
use crate::repair::RepairService;
use crate::retention::RetentionService;
use crate::sharing::SharedSpaceManager;
use crate::store::{paths, StoreClient, StoreHandle};
use crate::types::{ItemId, PartitionKind, SpaceId, Uid};
use crate::validate::{apply_timestamps, ensure_valid, sanitize};

/// The Hearthbase persistence engine handle.
///
/// Constructed once per app session with an injected [`StoreClient`];
/// substituting [`MemoryStore`](crate::MemoryStore) makes every operation
/// testable without a remote store.
pub struct HearthBase {
    /// Shared store access with the uniform timeout applied.
    store: StoreHandle,

    /// Configuration used to build this engine.
    config: Config,
}

impl std::fmt::Debug for HearthBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HearthBase")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HearthBase {
    /// Builds an engine over the injected store client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` fails validation
    /// (see [`Config::validate`]).
    #[instrument(skip(client, config))]
    pub fn new(client: Arc<dyn StoreClient>, config: Config) -> Result<Self> {
        config.validate().map_err(HearthError::from)?;

        let store = StoreHandle::new(client, config.op_timeout);
        info!(timeout_ms = config.op_timeout.as_millis() as u64, "Engine ready");

        Ok(Self { store, config })
    }

    /// Returns the engine configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shared store handle, for entity-layer callers.
    #[inline]
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// The shared-space manager.
    pub fn sharing(&self) -> SharedSpaceManager {
        SharedSpaceManager::new(self.store.clone())
    }

    /// The migration runner with the builtin registry.
    pub fn migrations(&self) -> MigrationRunner {
        MigrationRunner::new(self.store.clone())
    }

    /// A migration runner with a custom registry.
    pub fn migrations_with(&self, registry: Vec<Migration>) -> MigrationRunner {
        MigrationRunner::with_registry(self.store.clone(), registry)
    }

    /// The backup service.
    pub fn backups(&self) -> BackupService {
        BackupService::new(self.store.clone())
    }

    /// The repair service.
    pub fn repair(&self) -> RepairService {
        RepairService::new(self.store.clone(), &self.config)
    }

    /// The retention service.
    pub fn retention(&self) -> RetentionService {
        RetentionService::new(self.store.clone(), &self.config)
    }

    // =========================================================================
    // Entity record writes
    // =========================================================================
    //
    // Entity-layer callers mostly read and write partitions directly via
    // the path schema. These helpers exist for the write path because it
    // carries a cross-cutting rule: sanitize and validate BEFORE any
    // store call, so a rejected payload never leaves a partial write.

    /// Writes a record into `uid`'s private partition of `kind`.
    ///
    /// The payload is sanitized, validated against the kind's rule table,
    /// and stamped with lifecycle timestamps before the single store
    /// write. Pass `id: None` to generate a fresh item id; the id used is
    /// returned.
    ///
    /// # Errors
    ///
    /// Validation errors reject the payload before any store access.
    pub async fn put_private_item(
        &self,
        uid: &Uid,
        kind: PartitionKind,
        id: Option<ItemId>,
        payload: &Value,
        is_update: bool,
    ) -> Result<ItemId> {
        let record = self.prepare_record(kind, payload, is_update)?;
        let id = id.unwrap_or_else(ItemId::generate);
        let path = format!("{}/{}", paths::user_partition(uid, kind), id);
        self.store.write(&path, record).await?;
        Ok(id)
    }

    /// Writes a record into a shared space's partition of `kind`.
    ///
    /// Same sanitize-validate-stamp pipeline as
    /// [`put_private_item`](Self::put_private_item).
    pub async fn put_shared_item(
        &self,
        space_id: &SpaceId,
        kind: PartitionKind,
        id: Option<ItemId>,
        payload: &Value,
        is_update: bool,
    ) -> Result<ItemId> {
        let record = self.prepare_record(kind, payload, is_update)?;
        let id = id.unwrap_or_else(ItemId::generate);
        let path = format!("{}/{}", paths::shared_partition(space_id, kind), id);
        self.store.write(&path, record).await?;
        Ok(id)
    }

    fn prepare_record(
        &self,
        kind: PartitionKind,
        payload: &Value,
        is_update: bool,
    ) -> Result<Value> {
        let mut record = sanitize(payload);
        ensure_valid(kind.entity_type(), &record)?;
        apply_timestamps(&mut record, is_update);
        Ok(record)
    }
}
