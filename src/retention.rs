//! Retention: backup pruning and archived-record aging.
//!
//! Two independent jobs, both invoked at periodic maintenance points:
//!
//! - **Backup pruning** keeps the newest N snapshots per user and deletes
//!   the rest, relying on backup keys (decimal millisecond timestamps)
//!   sorting chronologically.
//! - **Archived-record aging** deletes records archived longer ago than
//!   the retention cutoff. The rule is centralized here for every
//!   archivable entity kind rather than scattered across callers, with
//!   one shared cutoff constant.
//!
//! Aging deletes are issued in small concurrent batches with all-settled
//! semantics: one record's failure is counted and the job carries on.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::store::{paths, StoreHandle};
use crate::types::{PartitionKind, Timestamp, Uid};

/// Outcome of an archived-record aging pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Records deleted.
    pub deleted: usize,
    /// Delete attempts that failed (record left in place).
    pub failed: usize,
    /// Archived records inspected and kept (younger than the cutoff or
    /// with no provable age).
    pub retained: usize,
}

/// Deletes stale backups and aged-out archived records.
#[derive(Clone, Debug)]
pub struct RetentionService {
    store: StoreHandle,
    keep_count: usize,
    retention_days: i64,
    delete_batch: usize,
}

impl RetentionService {
    /// Creates a service over the given store handle, taking policy from
    /// `config`.
    pub fn new(store: StoreHandle, config: &Config) -> Self {
        Self {
            store,
            keep_count: config.backup_keep_count,
            retention_days: config.archive_retention_days,
            delete_batch: config.retention_delete_batch,
        }
    }

    /// Deletes `uid`'s backups beyond the keep count, newest retained.
    ///
    /// Returns the number of backups deleted.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn prune_backups(&self, uid: &Uid) -> Result<usize> {
        let snap = self.store.read(&paths::backups_root(uid)).await?;
        let Some(entries) = snap.value().and_then(Value::as_object) else {
            return Ok(0);
        };

        let mut keys: Vec<i64> = entries.keys().filter_map(|k| k.parse().ok()).collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));

        if keys.len() <= self.keep_count {
            return Ok(0);
        }

        let stale = &keys[self.keep_count..];
        let mut updates = crate::store::UpdateMap::new();
        for key in stale {
            updates.insert(
                paths::backup_entry(uid, Timestamp::from_millis(*key)),
                None,
            );
        }
        self.store.atomic_update(updates).await?;

        info!(deleted = stale.len(), kept = self.keep_count, "Backups pruned");
        Ok(stale.len())
    }

    /// Ages out archived records across every archivable partition kind.
    ///
    /// A record is deleted when `archived == true` and its
    /// `archived_date` (or, when absent, the kind's fallback timestamp
    /// field) is strictly older than `now - retention_days`. A record
    /// archived exactly at the cutoff is retained; so is an archived
    /// record carrying neither timestamp, since its age cannot be proved.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn prune_archived(&self, uid: &Uid) -> Result<RetentionReport> {
        let cutoff = Timestamp::now().days_ago(self.retention_days);
        let mut report = RetentionReport::default();
        let mut stale_paths: Vec<String> = Vec::new();

        for kind in PartitionKind::ALL {
            let partition = paths::user_partition(uid, kind);
            let snap = self.store.read(&partition).await?;
            let Some(items) = snap.value().and_then(Value::as_object) else {
                continue;
            };

            for (item_id, record) in items {
                if !is_archived(record) {
                    continue;
                }
                match archive_age_marker(record, kind) {
                    Some(archived_at) if archived_at < cutoff => {
                        stale_paths.push(format!("{}/{}", partition, item_id));
                    }
                    _ => report.retained += 1,
                }
            }
        }

        if stale_paths.is_empty() {
            return Ok(report);
        }
        debug!(candidates = stale_paths.len(), cutoff = %cutoff, "Aging archived records");

        // Concurrent batches with all-settled semantics: every delete in
        // a batch runs to completion and failures only bump the counter.
        for batch in stale_paths.chunks(self.delete_batch) {
            let results = join_all(batch.iter().map(|path| self.store.delete(path))).await;
            for (path, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => report.deleted += 1,
                    Err(e) => {
                        warn!(path = %path, error = %e, "Archived-record delete failed");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            deleted = report.deleted,
            failed = report.failed,
            retained = report.retained,
            "Archived records aged out"
        );
        Ok(report)
    }
}

fn is_archived(record: &Value) -> bool {
    record.get("archived").and_then(Value::as_bool).unwrap_or(false)
}

/// The timestamp aging compares against the cutoff: `archived_date`
/// when present, otherwise the kind-specific fallback field.
fn archive_age_marker(record: &Value, kind: PartitionKind) -> Option<Timestamp> {
    record
        .get("archived_date")
        .and_then(Value::as_i64)
        .or_else(|| {
            record
                .get(kind.archive_fallback_field())
                .and_then(Value::as_i64)
        })
        .map(Timestamp::from_millis)
}
