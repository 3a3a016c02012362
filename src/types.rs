//! Core type definitions for Hearthbase identifiers and timestamps.
//!
//! This module defines the fundamental ID types used throughout the engine.
//! User ids come from the auth layer and are opaque strings; item ids are
//! UUID v7 for time-ordered unique identification.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque user identifier.
///
/// Hearthbase doesn't handle authentication - the consumer provides user
/// ids. This allows integration with any auth system (OAuth, API keys, etc.).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uid(pub String);

impl Uid {
    /// Creates a new Uid from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the user id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared-space identifier.
///
/// Derived deterministically from the two member uids: sort the pair
/// lexicographically and join with `_`. Either ordering of the same pair
/// produces the same id, so at most one space can exist per couple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub String);

impl SpaceId {
    /// Computes the space id for an unordered pair of uids.
    ///
    /// # Example
    /// ```
    /// use hearthbase::{SpaceId, Uid};
    ///
    /// let a = Uid::new("u1");
    /// let b = Uid::new("u2");
    /// assert_eq!(SpaceId::for_pair(&a, &b), SpaceId::for_pair(&b, &a));
    /// assert_eq!(SpaceId::for_pair(&a, &b).as_str(), "u1_u2");
    /// ```
    pub fn for_pair(a: &Uid, b: &Uid) -> Self {
        let (lo, hi) = if a.as_str() <= b.as_str() {
            (a, b)
        } else {
            (b, a)
        };
        Self(format!("{}_{}", lo, hi))
    }

    /// Wraps an already-computed space id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the space id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identifier (UUID v7 for time-ordering).
///
/// Keys the records inside a partition (tasks, shopping list items,
/// inventory items, events). Ids are preserved when records migrate
/// between private and shared partitions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    /// Creates a new ItemId with a UUID v7 (time-ordered).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing item id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the item id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
///
/// Using i64 allows representing dates far into the future and past.
/// Millisecond precision matches the backup key format, where the decimal
/// string of the timestamp doubles as the store key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen
    /// in practice), returns a timestamp of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp shifted back by `days` whole days.
    #[inline]
    pub const fn days_ago(&self, days: i64) -> Self {
        Self(self.0 - days * MILLIS_PER_DAY)
    }

    /// Renders the timestamp as its store key: the decimal millisecond
    /// string. For contemporary timestamps the keys are equal width, so
    /// lexical key order equals chronological order.
    pub fn as_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The entity partitions a user's private namespace is divided into.
///
/// The first three also exist under every shared space; `Events` is
/// private-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKind {
    /// Household tasks.
    Tasks,
    /// Shopping list items.
    ShoppingListItems,
    /// Pantry/inventory items.
    InventoryItems,
    /// Calendar events.
    Events,
}

impl PartitionKind {
    /// The three partitions that migrate into and out of a shared space.
    pub const SHARED: [PartitionKind; 3] = [
        PartitionKind::Tasks,
        PartitionKind::ShoppingListItems,
        PartitionKind::InventoryItems,
    ];

    /// Every partition kind, including private-only ones.
    pub const ALL: [PartitionKind; 4] = [
        PartitionKind::Tasks,
        PartitionKind::ShoppingListItems,
        PartitionKind::InventoryItems,
        PartitionKind::Events,
    ];

    /// The path segment for this partition.
    pub const fn segment(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::ShoppingListItems => "shopping_list_items",
            Self::InventoryItems => "inventory_items",
            Self::Events => "events",
        }
    }

    /// The validation rule-table name for records of this partition.
    pub const fn entity_type(&self) -> &'static str {
        match self {
            Self::Tasks => "task",
            Self::ShoppingListItems => "shopping_item",
            Self::InventoryItems => "inventory_item",
            Self::Events => "event",
        }
    }

    /// The fallback timestamp field used by archived-record aging when a
    /// record carries no `archived_date`.
    pub const fn archive_fallback_field(&self) -> &'static str {
        match self {
            Self::Tasks => "completed_date",
            Self::ShoppingListItems => "purchased_date",
            Self::InventoryItems => "updated_date",
            Self::Events => "event_date",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}
