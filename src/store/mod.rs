//! Store client abstractions for Hearthbase.
//!
//! This module defines the contract the engine assumes of the remote
//! hierarchical key-value store, and a timeout-enforcing handle every
//! component goes through.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HearthBase                               │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │    StoreHandle      │  ← uniform timeout     │
//! │              └─────────────────────┘                        │
//! │                         │                                    │
//! │              ┌─────────────────────┐                        │
//! │              │    StoreClient      │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                    ▲         ▲                              │
//! │                    │         │                              │
//! │          ┌────────┴──┐  ┌───┴─────────┐                    │
//! │          │ remote SDK │  │ MemoryStore │                    │
//! │          └───────────┘  └─────────────┘                    │
//! │            (prod)           (test)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store is addressed by slash-separated paths. Atomicity exists only
//! at the granularity of one [`StoreClient::atomic_update`] call; across
//! separate calls there is no transaction, which is why multi-step
//! operations persist saga markers (see [`crate::sharing`]).

pub mod memory;
pub mod paths;

pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// A multi-path update: path → new value, where `None` deletes the path.
///
/// BTreeMap keeps iteration deterministic, which makes atomic writes
/// reproducible in tests.
pub type UpdateMap = BTreeMap<String, Option<Value>>;

/// Callback invoked with the new value at a subscribed path
/// (`None` when the path was deleted).
pub type ChangeCallback = Box<dyn Fn(Option<&Value>) + Send + Sync>;

/// Result of a single-path read.
///
/// Mirrors the remote SDK's snapshot shape: "not exists" is a normal
/// outcome, not an error.
#[derive(Clone, Debug)]
pub struct Snapshot {
    path: String,
    value: Option<Value>,
}

impl Snapshot {
    /// Builds a snapshot for `path` holding `value`.
    pub fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// The path this snapshot was read from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if a value exists at the path.
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// Borrows the value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Consumes the snapshot, yielding the value.
    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// Deserializes the value into `T`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the value exists but does not
    /// match `T`'s shape. A missing value yields `Ok(None)`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.value {
            None => Ok(None),
            Some(v) => {
                let decoded = serde_json::from_value(v.clone()).map_err(|e| {
                    StoreError::serialization(format!("at {}: {}", self.path, e))
                })?;
                Ok(Some(decoded))
            }
        }
    }
}

/// Guard for a change subscription. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps an unsubscribe action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Explicitly unsubscribes, consuming the guard.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Contract the engine assumes of the remote store.
///
/// Implementations must be `Send + Sync`; the engine shares one client
/// across all services via `Arc`. The store is globally shared and
/// globally mutable: there is no per-record versioning, so concurrent
/// writers to the same leaf overwrite each other (last write wins).
///
/// [`write_if_absent`](Self::write_if_absent) is the one conditional
/// primitive, used to make deterministic-id creation race-safe.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Reads the value at a single path.
    ///
    /// A missing path yields a snapshot with `exists() == false`,
    /// not an error.
    async fn read(&self, path: &str) -> Result<Snapshot>;

    /// Replaces the value at a single path.
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Writes every listed path as one indivisible transaction.
    ///
    /// `None` deletes that path. All paths commit together or not at all;
    /// this is the only atomicity primitive the store offers.
    async fn atomic_update(&self, updates: UpdateMap) -> Result<()>;

    /// Deletes the value at a single path. Deleting a missing path is a
    /// no-op.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Writes `value` at `path` only if the path currently holds nothing.
    ///
    /// Returns `true` if the write happened, `false` if the path was
    /// already occupied (no write performed).
    async fn write_if_absent(&self, path: &str, value: Value) -> Result<bool>;

    /// Registers a change callback for a path. The callback fires on any
    /// write affecting the path or its subtree. The engine itself never
    /// subscribes; this exists for entity-layer callers sharing the
    /// client.
    fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Subscription;
}

/// Store access handle shared by every engine component.
///
/// Wraps the injected client with the uniform per-call timeout from
/// [`Config::op_timeout`](crate::Config::op_timeout). A call that exceeds
/// the deadline fails with [`StoreError::Timeout`] instead of hanging the
/// caller.
#[derive(Clone)]
pub struct StoreHandle {
    client: Arc<dyn StoreClient>,
    timeout: Duration,
}

impl StoreHandle {
    /// Creates a handle over `client` with the given per-call timeout.
    pub fn new(client: Arc<dyn StoreClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The configured per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying client, for entity-layer callers that need
    /// subscriptions.
    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    /// Reads the value at `path` under the timeout.
    pub async fn read(&self, path: &str) -> Result<Snapshot> {
        self.timed(path, self.client.read(path)).await
    }

    /// Replaces the value at `path` under the timeout.
    pub async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.timed(path, self.client.write(path, value)).await
    }

    /// Commits a multi-path update under the timeout.
    pub async fn atomic_update(&self, updates: UpdateMap) -> Result<()> {
        let label = updates
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "<empty update>".into());
        self.timed(&label, self.client.atomic_update(updates)).await
    }

    /// Deletes the value at `path` under the timeout.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.timed(path, self.client.delete(path)).await
    }

    /// Conditionally creates `path` under the timeout.
    pub async fn write_if_absent(&self, path: &str, value: Value) -> Result<bool> {
        self.timed(path, self.client.write_if_absent(path, value))
            .await
    }

    async fn timed<T>(&self, path: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::timeout(path, self.timeout.as_millis() as u64).into()),
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
