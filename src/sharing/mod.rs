//! Shared-space management: linking and unlinking partners.
//!
//! Linking migrates the caller's private data into a jointly visible
//! partition; unlinking copies the shared data back out and dissolves the
//! space. Each transition is a short sequence of store calls with no
//! cross-call atomicity, so the space record carries a persisted
//! [`MigrationState`] marker and a crashed link can be resumed by calling
//! [`SharedSpaceManager::link_partner`] again.
//!
//! # Asymmetry, on purpose
//!
//! Only the *caller's* private data migrates into the space on link, and
//! only the *caller's* partitions are restored on unlink. The partner's
//! pre-existing private data stays in their own namespace until they
//! trigger a migration themselves. This mirrors the product's observed
//! behavior; do not symmetrize it here.

pub mod types;

pub use types::{MigrationState, SharedSpace, UserProfile};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{LinkError, NotFoundError, Result};
use crate::store::{paths, StoreHandle, UpdateMap};
use crate::types::{PartitionKind, SpaceId, Timestamp, Uid};

/// Owns the link/unlink lifecycle for partner pairs.
#[derive(Clone, Debug)]
pub struct SharedSpaceManager {
    store: StoreHandle,
}

impl SharedSpaceManager {
    /// Creates a manager over the given store handle.
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Loads a profile, failing with `NotFound` if absent.
    pub async fn load_profile(&self, uid: &Uid) -> Result<UserProfile> {
        let snap = self.store.read(&paths::user_profile(uid)).await?;
        snap.decode::<UserProfile>()?
            .ok_or_else(|| NotFoundError::profile(uid).into())
    }

    /// Resolves a profile by email with a linear scan over the whole
    /// profile collection.
    ///
    /// The store offers no secondary index, so this is O(users); fine at
    /// household scale, a known limit beyond it. Malformed profile
    /// records are skipped with a warning rather than aborting the scan.
    pub async fn find_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let snap = self.store.read(&paths::users_root()).await?;
        let Some(users) = snap.value().and_then(Value::as_object) else {
            return Ok(None);
        };

        for (uid, subtree) in users {
            let Some(profile_value) = subtree.get("profile") else {
                continue;
            };
            match serde_json::from_value::<UserProfile>(profile_value.clone()) {
                Ok(profile) if profile.email == email => return Ok(Some(profile)),
                Ok(_) => {}
                Err(e) => {
                    warn!(uid = %uid, error = %e, "Skipping malformed profile during email scan");
                }
            }
        }
        Ok(None)
    }

    /// Reads the shared-space record at `space_id`, if any.
    pub async fn shared_space(&self, space_id: &SpaceId) -> Result<Option<SharedSpace>> {
        let snap = self.store.read(&paths::shared_root(space_id)).await?;
        snap.decode::<SharedSpace>()
    }

    /// Links the caller to the user registered under `partner_email`.
    ///
    /// On success the shared space exists with both profiles
    /// cross-referenced and every record from the caller's three private
    /// partitions copied in (ids preserved; copy, not move — the private
    /// originals remain).
    ///
    /// Calling again after a crash resumes the remaining steps from the
    /// persisted marker. Calling again after completion fails with
    /// `AlreadyLinked`.
    ///
    /// # Errors
    ///
    /// - `NotFound` — no profile matches `partner_email`
    /// - `SelfLink` — the email resolves to the caller
    /// - `AlreadyLinked` — the caller already has a completed link
    /// - `SpaceConflict` — the space exists but the caller's profile does
    ///   not reference it (a concurrent attempt won the create)
    #[instrument(skip(self), fields(uid = %self_uid))]
    pub async fn link_partner(&self, self_uid: &Uid, partner_email: &str) -> Result<SpaceId> {
        let me = self.load_profile(self_uid).await?;

        let partner = self
            .find_profile_by_email(partner_email)
            .await?
            .ok_or_else(|| NotFoundError::partner(partner_email))?;

        if partner.uid == *self_uid {
            return Err(LinkError::SelfLink.into());
        }

        let space_id = SpaceId::for_pair(self_uid, &partner.uid);

        if let Some(existing_email) = &me.partner_email {
            if existing_email != partner_email {
                return Err(LinkError::AlreadyLinked(existing_email.clone()).into());
            }
            // Same partner again: either a completed link or our own
            // crashed attempt to finish.
            return match self.shared_space(&space_id).await? {
                Some(space) if space.migration_state == MigrationState::DataMigrated => {
                    Err(LinkError::AlreadyLinked(partner_email.to_string()).into())
                }
                Some(space) => {
                    info!(space = %space_id, state = space.migration_state.as_str(),
                          "Resuming interrupted link");
                    self.complete_link(&me, &partner, &space_id, space.migration_state)
                        .await?;
                    Ok(space_id)
                }
                None => {
                    // Marker fields exist but the space is gone; recreate.
                    self.create_space(self_uid, &partner.uid, &space_id).await?;
                    self.complete_link(&me, &partner, &space_id, MigrationState::Created)
                        .await?;
                    Ok(space_id)
                }
            };
        }

        // Conditional create closes the race where both partners link
        // concurrently: the same deterministic id means the loser sees
        // `false` and fails cleanly instead of overwriting.
        if !self.create_space(self_uid, &partner.uid, &space_id).await? {
            return Err(LinkError::SpaceConflict(space_id.to_string()).into());
        }

        self.complete_link(&me, &partner, &space_id, MigrationState::Created)
            .await?;

        info!(space = %space_id, partner = %partner.uid, "Partner linked");
        Ok(space_id)
    }

    /// Unlinks the caller from their partner.
    ///
    /// Copies the three shared partitions back into only the caller's
    /// private namespace, then clears both profiles' link fields and
    /// deletes the space root in one atomic update. Re-runnable: a crash
    /// between the copy-back and the teardown leaves the space intact and
    /// a second call repeats the (idempotent) copy.
    ///
    /// # Errors
    ///
    /// `NotLinked` when the caller has no partner.
    #[instrument(skip(self), fields(uid = %self_uid))]
    pub async fn unlink_partner(&self, self_uid: &Uid) -> Result<()> {
        let me = self.load_profile(self_uid).await?;
        let partner_uid = me.sharing_with.clone().ok_or(LinkError::NotLinked)?;
        let space_id = me
            .shared_space_id
            .clone()
            .unwrap_or_else(|| SpaceId::for_pair(self_uid, &partner_uid));

        // Whole-subtree read: record fields and partitions together.
        let snap = self.store.read(&paths::shared_root(&space_id)).await?;
        let space_tree = snap.into_value();

        // Copy shared data back into the caller's private partitions.
        if let Some(tree) = &space_tree {
            let mut restore = UpdateMap::new();
            for kind in PartitionKind::SHARED {
                if let Some(items) = tree.get(kind.segment()).and_then(Value::as_object) {
                    for (item_id, record) in items {
                        restore.insert(
                            format!("{}/{}", paths::user_partition(self_uid, kind), item_id),
                            Some(record.clone()),
                        );
                    }
                }
            }
            if !restore.is_empty() {
                debug!(space = %space_id, records = restore.len(), "Restoring shared data");
                self.store.atomic_update(restore).await?;
            }
        } else {
            warn!(space = %space_id, "Unlinking with no shared space present");
        }

        // Teardown: clear link fields on both profiles and drop the space
        // root, all in one atomic call.
        let now = Value::from(Timestamp::now().as_millis());
        let mut teardown = UpdateMap::new();
        for uid in [self_uid, &partner_uid] {
            // The partner's profile may be gone; writing the clears is
            // harmless either way because `None` deletes.
            teardown.insert(paths::user_profile_field(uid, "shared_space_id"), None);
            teardown.insert(paths::user_profile_field(uid, "sharing_with"), None);
            teardown.insert(paths::user_profile_field(uid, "partner_email"), None);
            teardown.insert(
                paths::user_profile_field(uid, "updated_at"),
                Some(now.clone()),
            );
        }
        teardown.insert(paths::shared_root(&space_id), None);
        self.store.atomic_update(teardown).await?;

        info!(space = %space_id, "Partner unlinked");
        Ok(())
    }

    /// Step 1 of the link saga: conditional create of the space root.
    async fn create_space(&self, a: &Uid, b: &Uid, space_id: &SpaceId) -> Result<bool> {
        let space = SharedSpace::new(a, b);
        let value = serde_json::to_value(&space)?;
        self.store
            .write_if_absent(&paths::shared_root(space_id), value)
            .await
    }

    /// Runs the remaining saga steps from `state` onward.
    async fn complete_link(
        &self,
        me: &UserProfile,
        partner: &UserProfile,
        space_id: &SpaceId,
        state: MigrationState,
    ) -> Result<()> {
        if state == MigrationState::Created {
            self.step_update_profiles(me, partner, space_id).await?;
        }
        // Both Created and ProfilesUpdated still need the data copy.
        self.step_copy_data(&me.uid, space_id).await
    }

    /// Step 2: cross-reference both profiles and advance the marker, all
    /// in one atomic update.
    async fn step_update_profiles(
        &self,
        me: &UserProfile,
        partner: &UserProfile,
        space_id: &SpaceId,
    ) -> Result<()> {
        let now = Value::from(Timestamp::now().as_millis());
        let mut updates = UpdateMap::new();

        for (uid, other) in [(&me.uid, partner), (&partner.uid, me)] {
            updates.insert(
                paths::user_profile_field(uid, "shared_space_id"),
                Some(Value::from(space_id.as_str())),
            );
            updates.insert(
                paths::user_profile_field(uid, "sharing_with"),
                Some(Value::from(other.uid.as_str())),
            );
            updates.insert(
                paths::user_profile_field(uid, "partner_email"),
                Some(Value::from(other.email.as_str())),
            );
            updates.insert(
                paths::user_profile_field(uid, "updated_at"),
                Some(now.clone()),
            );
        }

        updates.insert(
            paths::shared_field(space_id, "migration_state"),
            Some(Value::from(MigrationState::ProfilesUpdated.as_str())),
        );
        updates.insert(paths::shared_field(space_id, "updated_at"), Some(now));

        debug!(space = %space_id, "Link step: profiles updated");
        self.store.atomic_update(updates).await
    }

    /// Step 3: copy every record of the caller's three private partitions
    /// into the shared partitions, ids preserved, and advance the marker —
    /// one atomic update.
    ///
    /// Idempotent: a re-run copies the same ids with the same content.
    async fn step_copy_data(&self, self_uid: &Uid, space_id: &SpaceId) -> Result<()> {
        let now = Value::from(Timestamp::now().as_millis());
        let mut updates = UpdateMap::new();
        let mut copied = 0usize;

        for kind in PartitionKind::SHARED {
            let snap = self.store.read(&paths::user_partition(self_uid, kind)).await?;
            if let Some(items) = snap.value().and_then(Value::as_object) {
                for (item_id, record) in items {
                    updates.insert(
                        format!("{}/{}", paths::shared_partition(space_id, kind), item_id),
                        Some(record.clone()),
                    );
                    copied += 1;
                }
            }
        }

        updates.insert(
            paths::shared_field(space_id, "migration_state"),
            Some(Value::from(MigrationState::DataMigrated.as_str())),
        );
        updates.insert(paths::shared_field(space_id, "updated_at"), Some(now));

        debug!(space = %space_id, records = copied, "Link step: data migrated");
        self.store.atomic_update(updates).await
    }
}
