//! Backup and restore of a single user's data.
//!
//! A backup snapshots the profile plus the three private partitions into
//! one record keyed by its creation time in milliseconds. Because the key
//! is a decimal millisecond timestamp, lexical key ordering equals
//! chronological ordering; the retention service relies on this when
//! pruning.

use futures::join;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::{NotFoundError, Result};
use crate::store::{paths, StoreHandle, UpdateMap};
use crate::types::{PartitionKind, Timestamp, Uid};

/// One backup snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// The user the snapshot belongs to.
    pub user_id: Uid,
    /// Creation time in epoch milliseconds; also the store key.
    pub timestamp: Timestamp,
    /// The captured data. Fields are omitted when the source path did not
    /// exist at backup time.
    pub data: BackupData,
}

/// The captured subtrees of a backup.
///
/// "Did not exist" is recorded as an omitted field, not an error, and an
/// omitted field is left untouched by restore.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    /// The profile record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
    /// The private tasks partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Value>,
    /// The private shopping list partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_list_items: Option<Value>,
    /// The private inventory partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_items: Option<Value>,
}

/// Snapshots and restores per-user data.
#[derive(Clone, Debug)]
pub struct BackupService {
    store: StoreHandle,
}

impl BackupService {
    /// Creates a service over the given store handle.
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Takes a snapshot of `uid`'s profile and private partitions.
    ///
    /// The four reads run in parallel; a missing path omits that field
    /// rather than failing. Returns the timestamp key of the new backup.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn backup(&self, uid: &Uid) -> Result<Timestamp> {
        let profile_path = paths::user_profile(uid);
        let tasks_path = paths::user_partition(uid, PartitionKind::Tasks);
        let shopping_path = paths::user_partition(uid, PartitionKind::ShoppingListItems);
        let inventory_path = paths::user_partition(uid, PartitionKind::InventoryItems);
        let (profile, tasks, shopping, inventory) = join!(
            self.store.read(&profile_path),
            self.store.read(&tasks_path),
            self.store.read(&shopping_path),
            self.store.read(&inventory_path),
        );

        let timestamp = Timestamp::now();
        let backup = Backup {
            user_id: uid.clone(),
            timestamp,
            data: BackupData {
                profile: profile?.into_value(),
                tasks: tasks?.into_value(),
                shopping_list_items: shopping?.into_value(),
                inventory_items: inventory?.into_value(),
            },
        };

        self.store
            .write(
                &paths::backup_entry(uid, timestamp),
                serde_json::to_value(&backup)?,
            )
            .await?;

        info!(key = %timestamp, "Backup written");
        Ok(timestamp)
    }

    /// Restores the snapshot taken at `timestamp`.
    ///
    /// Overwrites (does not merge) the profile and each partition present
    /// in the snapshot, in one atomic update. Fields absent from the
    /// backup leave the live data untouched — restoring a snapshot taken
    /// before a partition existed will not erase that partition.
    ///
    /// # Errors
    ///
    /// `NotFound` when no backup exists at that key.
    #[instrument(skip(self), fields(uid = %uid, key = %timestamp))]
    pub async fn restore(&self, uid: &Uid, timestamp: Timestamp) -> Result<()> {
        let snap = self.store.read(&paths::backup_entry(uid, timestamp)).await?;
        let backup: Backup = snap
            .decode()?
            .ok_or_else(|| NotFoundError::backup(uid, timestamp))?;

        let mut updates = UpdateMap::new();
        if let Some(profile) = backup.data.profile {
            updates.insert(paths::user_profile(uid), Some(profile));
        }
        for (kind, partition) in [
            (PartitionKind::Tasks, backup.data.tasks),
            (
                PartitionKind::ShoppingListItems,
                backup.data.shopping_list_items,
            ),
            (PartitionKind::InventoryItems, backup.data.inventory_items),
        ] {
            if let Some(value) = partition {
                updates.insert(paths::user_partition(uid, kind), Some(value));
            }
        }

        if updates.is_empty() {
            info!("Backup contains no data; nothing restored");
            return Ok(());
        }

        self.store.atomic_update(updates).await?;
        info!("Backup restored");
        Ok(())
    }

    /// Lists a user's backup keys, newest first.
    pub async fn list(&self, uid: &Uid) -> Result<Vec<Timestamp>> {
        let snap = self.store.read(&paths::backups_root(uid)).await?;
        let mut keys: Vec<Timestamp> = snap
            .value()
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .keys()
                    .filter_map(|k| k.parse::<i64>().ok())
                    .map(Timestamp::from_millis)
                    .collect()
            })
            .unwrap_or_default();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        Ok(keys)
    }
}
