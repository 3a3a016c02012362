//! Type definitions for profiles and shared spaces.
//!
//! A **shared space** is the storage partition holding a linked pair's
//! jointly visible data. Its id is derived deterministically from the two
//! member uids, so at most one space can exist per couple and either
//! member can recompute it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{SpaceId, Timestamp, Uid};

/// A registered user's profile record.
///
/// Invariant: `sharing_with` and `shared_space_id` are either both set or
/// both absent. The link/unlink operations only ever write them together
/// inside one atomic update.
///
/// `language_preference`, `timezone`, and the lifecycle timestamps are
/// optional on the wire: older records may lack them, and the repair
/// service back-fills defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Auth-provided user id; also the profile's key in the store.
    pub uid: Uid,

    /// The user's login email. Partner resolution scans on this field.
    pub email: String,

    /// Display name.
    pub full_name: String,

    /// Email of the linked partner, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_email: Option<String>,

    /// Id of the shared space this user belongs to, if linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_space_id: Option<SpaceId>,

    /// Uid of the linked partner, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing_with: Option<Uid>,

    /// Preferred UI language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_preference: Option<String>,

    /// IANA timezone name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Creation time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    /// Last-modified time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl UserProfile {
    /// Builds a minimal profile with timestamps set to now.
    pub fn new(uid: Uid, email: impl Into<String>, full_name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            uid,
            email: email.into(),
            full_name: full_name.into(),
            partner_email: None,
            shared_space_id: None,
            sharing_with: None,
            language_preference: None,
            timezone: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// True when this profile is linked to a partner.
    pub fn is_linked(&self) -> bool {
        self.sharing_with.is_some()
    }

    /// Checks the both-or-neither invariant on the link fields.
    pub fn link_fields_consistent(&self) -> bool {
        self.sharing_with.is_some() == self.shared_space_id.is_some()
    }
}

/// Saga marker persisted on the shared-space record.
///
/// Linking is three store calls (create space, cross-reference profiles,
/// copy data) with no cross-call atomicity; the marker records the last
/// completed step so a crashed link can be resumed deterministically
/// instead of leaving a half-linked pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Space root written; profiles not yet cross-referenced.
    Created,
    /// Both profiles reference the space; data not yet copied.
    ProfilesUpdated,
    /// Caller's private data copied in; the link is complete.
    DataMigrated,
}

impl MigrationState {
    /// The wire string for this state.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::ProfilesUpdated => "profiles_updated",
            Self::DataMigrated => "data_migrated",
        }
    }
}

/// The shared-space record.
///
/// The three shared partitions (tasks, shopping list items, inventory
/// items) live under the same subtree as these fields and are read and
/// written separately; unknown siblings are ignored when decoding the
/// root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharedSpace {
    /// Deterministic id: `min(uid_a, uid_b) + "_" + max(uid_a, uid_b)`.
    pub id: SpaceId,

    /// Membership map, uid → true. Always exactly two entries.
    pub members: BTreeMap<String, bool>,

    /// Link-saga progress marker.
    pub migration_state: MigrationState,

    /// Creation time in epoch milliseconds.
    pub created_at: Timestamp,

    /// Last-modified time in epoch milliseconds.
    pub updated_at: Timestamp,
}

impl SharedSpace {
    /// Builds a fresh space record for the given pair, in the
    /// [`MigrationState::Created`] state.
    pub fn new(a: &Uid, b: &Uid) -> Self {
        let now = Timestamp::now();
        let mut members = BTreeMap::new();
        members.insert(a.as_str().to_string(), true);
        members.insert(b.as_str().to_string(), true);
        Self {
            id: SpaceId::for_pair(a, b),
            members,
            migration_state: MigrationState::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when `uid` is one of the two members.
    pub fn has_member(&self, uid: &Uid) -> bool {
        self.members.contains_key(uid.as_str())
    }
}
