//! Canonical store paths for every logical entity.
//!
//! Pure functions, no state, no validation. Every component builds paths
//! through this module rather than hand-assembling strings, so a future
//! layout change is a one-place edit.
//!
//! # Layout
//!
//! ```text
//! users/<uid>/profile                      UserProfile
//! users/<uid>/tasks/<item>                 private partitions
//! users/<uid>/shopping_list_items/<item>
//! users/<uid>/inventory_items/<item>
//! users/<uid>/events/<item>
//! shared/<space_id>                        SharedSpace root (record fields
//! shared/<space_id>/tasks/<item>           and partitions share the subtree)
//! shared/<space_id>/sessions
//! metadata/categories                      fixed datasets
//! metadata/units
//! system/schema_version                    scalar version string
//! backups/users/<uid>/<millis>             Backup snapshots
//! ```

use crate::types::{PartitionKind, SpaceId, Timestamp, Uid};

/// Root of all user subtrees. Reading it fans out over every user.
pub fn users_root() -> String {
    "users".into()
}

/// A user's whole subtree.
pub fn user_root(uid: &Uid) -> String {
    format!("users/{}", uid)
}

/// A user's profile record.
pub fn user_profile(uid: &Uid) -> String {
    format!("users/{}/profile", uid)
}

/// One field of a user's profile, for field-granular atomic updates.
pub fn user_profile_field(uid: &Uid, field: &str) -> String {
    format!("users/{}/profile/{}", uid, field)
}

/// A user's private partition of the given kind.
pub fn user_partition(uid: &Uid, kind: PartitionKind) -> String {
    format!("users/{}/{}", uid, kind.segment())
}

/// A shared space's root. Deleting it removes the record and every
/// partition beneath it.
pub fn shared_root(space_id: &SpaceId) -> String {
    format!("shared/{}", space_id)
}

/// One field of a shared space's record (members, migration_state, ...).
pub fn shared_field(space_id: &SpaceId, field: &str) -> String {
    format!("shared/{}/{}", space_id, field)
}

/// A shared space's partition of the given kind.
pub fn shared_partition(space_id: &SpaceId, kind: PartitionKind) -> String {
    format!("shared/{}/{}", space_id, kind.segment())
}

/// A shared space's sessions partition (entity-layer use).
pub fn shared_sessions(space_id: &SpaceId) -> String {
    format!("shared/{}/sessions", space_id)
}

/// The fixed categories dataset.
pub fn metadata_categories() -> String {
    "metadata/categories".into()
}

/// The fixed units dataset.
pub fn metadata_units() -> String {
    "metadata/units".into()
}

/// The single scalar schema-version marker.
pub fn schema_version() -> String {
    "system/schema_version".into()
}

/// Root of a user's backups. Keys beneath are decimal millisecond
/// timestamps, so lexical order equals chronological order.
pub fn backups_root(uid: &Uid) -> String {
    format!("backups/users/{}", uid)
}

/// A single backup snapshot keyed by its creation time.
pub fn backup_entry(uid: &Uid, timestamp: Timestamp) -> String {
    format!("backups/users/{}/{}", uid, timestamp.as_key())
}
