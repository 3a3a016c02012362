//! Error types for Hearthbase.
//!
//! Hearthbase uses a hierarchical error system:
//! - `HearthError` is the top-level error returned by all public APIs
//! - Specific error types (`StoreError`, `ValidationError`, `LinkError`)
//!   provide detail
//!
//! Every public operation returns `Result<T, HearthError>`; maintenance
//! jobs additionally report per-record outcomes through typed report
//! structs carried inside `Ok`, so a single record failure never surfaces
//! as an operation-level error.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use hearthbase::{HearthBase, Config, Result};
//!
//! async fn example(engine: &HearthBase) -> Result<()> {
//!     engine.sharing().link_partner(&uid, "partner@example.com").await?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias for Hearthbase operations.
pub type Result<T> = std::result::Result<T, HearthError>;

/// Top-level error enum for all Hearthbase operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum HearthError {
    /// Store layer error (network, permission, quota, timeout).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Partner linking/unlinking error.
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },
}

impl HearthError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a store error.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is a linking error.
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }

    /// A fixed user-facing message for store failures, suitable for direct
    /// display by callers. Non-store errors return their Display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(StoreError::Unavailable(_)) => {
                "The service is temporarily unavailable. Please try again.".into()
            }
            Self::Store(StoreError::PermissionDenied(_)) => {
                "You don't have permission to perform this action.".into()
            }
            Self::Store(StoreError::QuotaExceeded(_)) => {
                "Storage quota exceeded. Free up space and try again.".into()
            }
            Self::Store(StoreError::Timeout { .. }) => {
                "The request timed out. Check your connection and try again.".into()
            }
            Self::Store(StoreError::Network(_)) => {
                "A network error occurred. Check your connection.".into()
            }
            other => other.to_string(),
        }
    }
}

/// Store-related errors.
///
/// These errors wrap failures reported by the underlying remote store
/// client (network, permission, quota, unavailable) plus the engine's own
/// uniform timeout.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level failure talking to the store.
    #[error("Network failure: {0}")]
    Network(String),

    /// The store rejected the operation for lack of permission.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store's quota for this account is exhausted.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The store is temporarily unavailable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A store call exceeded the engine's uniform timeout.
    #[error("Store call timed out after {millis} ms: {path}")]
    Timeout {
        /// The path the timed-out call addressed.
        path: String,
        /// The configured timeout in milliseconds.
        millis: u64,
    },

    /// A conditional create found the path already occupied.
    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// Serialization/deserialization of a store value failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catch-all for other store client failures.
    #[error("Store failure: {0}")]
    Other(String),
}

impl StoreError {
    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a permission-denied error with the given message.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Creates a quota-exceeded error with the given message.
    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    /// Creates an unavailable error with the given message.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Creates a timeout error for the given path.
    pub fn timeout(path: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            path: path.into(),
            millis,
        }
    }

    /// Creates an already-exists error for the given path.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a catch-all store error with the given message.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for HearthError {
    fn from(err: serde_json::Error) -> Self {
        HearthError::Store(StoreError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller. They
/// are raised before any store write is attempted, so a rejected payload
/// never produces a partial write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No rule table exists for the named entity type.
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    /// The payload violated one or more field rules.
    ///
    /// Carries every violation, not just the first: the rule pass collects
    /// all errors before reporting.
    #[error("Invalid {entity}: {}", .errors.join("; "))]
    Rejected {
        /// The entity type that was validated.
        entity: String,
        /// Human-readable messages, one per violated rule.
        errors: Vec<String>,
    },

    /// A single field has an invalid value (used for config checks).
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },
}

impl ValidationError {
    /// Creates an unknown-type error.
    pub fn unknown_type(entity: impl Into<String>) -> Self {
        Self::UnknownType(entity.into())
    }

    /// Creates a rejection carrying the collected rule violations.
    pub fn rejected(entity: impl Into<String>, errors: Vec<String>) -> Self {
        Self::Rejected {
            entity: entity.into(),
            errors,
        }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Partner linking/unlinking errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The caller tried to link to their own account.
    #[error("Cannot link to your own account")]
    SelfLink,

    /// The caller is already linked to this partner.
    #[error("Already linked to partner: {0}")]
    AlreadyLinked(String),

    /// The caller has no linked partner to unlink from.
    #[error("No linked partner")]
    NotLinked,

    /// A shared space for the pair already exists but the caller's
    /// profile does not reference it: another link attempt (typically the
    /// partner's concurrent one) won the conditional create.
    #[error("Shared space already exists: {0}")]
    SpaceConflict(String),
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No profile exists for the given uid.
    #[error("Profile not found: {0}")]
    Profile(String),

    /// No profile matched the given partner email.
    #[error("No user found with email: {0}")]
    Partner(String),

    /// No shared space exists at the given id.
    #[error("Shared space not found: {0}")]
    SharedSpace(String),

    /// No backup exists for the user at the given timestamp key.
    #[error("Backup not found: {user} @ {key}")]
    Backup {
        /// The user the backup belongs to.
        user: String,
        /// The timestamp key that was requested.
        key: String,
    },
}

impl NotFoundError {
    /// Creates a profile not found error.
    pub fn profile(uid: impl ToString) -> Self {
        Self::Profile(uid.to_string())
    }

    /// Creates a partner not found error.
    pub fn partner(email: impl ToString) -> Self {
        Self::Partner(email.to_string())
    }

    /// Creates a shared space not found error.
    pub fn shared_space(id: impl ToString) -> Self {
        Self::SharedSpace(id.to_string())
    }

    /// Creates a backup not found error.
    pub fn backup(user: impl ToString, key: impl ToString) -> Self {
        Self::Backup {
            user: user.to_string(),
            key: key.to_string(),
        }
    }
}
