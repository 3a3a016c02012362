//! # Hearthbase
//!
//! Persistence lifecycle engine for household coordination apps.
//!
//! Hearthbase owns the data that backs tasks, shopping lists, inventory,
//! and events in a remote hierarchical key-value store: how it is
//! partitioned between private per-user storage and a shared "couple"
//! namespace, how it migrates between those partitions when partners link
//! and unlink, how the schema evolves over time, and how stale data is
//! backed up, repaired, and retired.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hearthbase::{Config, HearthBase, MemoryStore};
//!
//! // Wire the engine over an injected store client
//! let engine = HearthBase::new(Arc::new(MemoryStore::new()), Config::default())?;
//!
//! // Bring the schema up to date (first login, app start)
//! engine.migrations().run().await?;
//!
//! // Link two partners: creates the shared space and copies the
//! // caller's private data in
//! let space = engine.sharing().link_partner(&uid, "partner@example.com").await?;
//!
//! // Periodic maintenance
//! engine.backups().backup(&uid).await?;
//! engine.retention().prune_backups(&uid).await?;
//! engine.retention().prune_archived(&uid).await?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Shared space
//!
//! A **shared space** holds a linked pair's jointly visible data. Its id
//! is derived deterministically from the two member uids (sorted, joined
//! with `_`), so at most one space exists per couple and either member
//! can recompute it. Linking is a saga: the space record carries a
//! persisted migration-state marker so an interrupted link resumes
//! instead of leaving a half-linked pair.
//!
//! ### Private partitions
//!
//! Each user owns `tasks`, `shopping_list_items`, `inventory_items`, and
//! `events` subtrees. Linking *copies* (never moves) the caller's records
//! into the shared space; unlinking copies shared records back into the
//! caller's namespace.
//!
//! ### Store client
//!
//! The engine never holds a global connection. Every component receives
//! an injected [`StoreClient`], and all calls go through a handle that
//! enforces one uniform timeout. [`MemoryStore`] is the in-memory
//! implementation used by the test suite.
//!
//! ## Thread Safety
//!
//! [`HearthBase`] is `Send + Sync`; services borrow nothing but the
//! shared store handle and can be used from any task.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod engine;
mod error;
mod types;

pub mod store;
pub mod validate;

// Lifecycle service modules
mod backup;
mod migrate;
mod repair;
mod retention;
mod sharing;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main engine interface
pub use engine::HearthBase;

// Configuration
pub use config::Config;

// Error handling
pub use error::{
    HearthError, LinkError, NotFoundError, Result, StoreError, ValidationError,
};

// Core types
pub use types::{ItemId, PartitionKind, SpaceId, Timestamp, Uid, MILLIS_PER_DAY};

// Domain types
pub use backup::{Backup, BackupData, BackupService};
pub use migrate::{builtin_registry, compare_versions, Migration, MigrationRunner, BASE_VERSION};
pub use repair::{default_categories, default_units, RepairReport, RepairService};
pub use retention::{RetentionReport, RetentionService};
pub use sharing::{MigrationState, SharedSpace, SharedSpaceManager, UserProfile};

// Store surface (for entity-layer callers and tests)
pub use store::{MemoryStore, Snapshot, StoreClient, StoreHandle, Subscription, UpdateMap};

// Validation surface
pub use validate::{
    apply_timestamps, ensure_valid, sanitize, sanitize_f64, validate, ValidationReport,
};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common Hearthbase usage.
///
/// ```rust
/// use hearthbase::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::HearthBase;
    pub use crate::error::{HearthError, Result};
    pub use crate::store::{MemoryStore, StoreClient, StoreHandle};
    pub use crate::types::{ItemId, PartitionKind, SpaceId, Timestamp, Uid};
}
