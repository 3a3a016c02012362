//! Configuration types for Hearthbase.
//!
//! The [`Config`] struct controls engine behavior including:
//! - The uniform timeout applied to every store call
//! - Backup retention (how many snapshots to keep per user)
//! - Archived-record retention (age cutoff, delete batch size)
//! - Defaults back-filled by the repair service
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use hearthbase::Config;
//!
//! // Use defaults (5 s timeout, keep 10 backups, 60-day archive cutoff)
//! let config = Config::default();
//!
//! // Customize for tests
//! let config = Config {
//!     op_timeout: Duration::from_millis(500),
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use crate::error::ValidationError;

/// Engine configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use hearthbase::Config;
///
/// let config = Config {
///     backup_keep_count: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Uniform timeout applied to every store call.
    ///
    /// No call is fire-and-forget: each read, write, and atomic update is
    /// awaited under this deadline. Default: 5 seconds.
    pub op_timeout: Duration,

    /// Number of backups retained per user by the retention service.
    ///
    /// Older snapshots beyond this count are deleted. Default: 10.
    pub backup_keep_count: usize,

    /// Age in days after which archived records become eligible for
    /// deletion. A record archived exactly this many days ago is retained;
    /// deletion requires strictly older. Default: 60.
    pub archive_retention_days: i64,

    /// Number of deletes issued concurrently per batch by the
    /// archived-record aging job. Default: 10.
    pub retention_delete_batch: usize,

    /// Language code back-filled onto profiles that lack one.
    /// Default: `"en"`.
    pub default_language: String,

    /// Timezone back-filled onto profiles that lack one.
    /// Default: `"UTC"`.
    pub default_timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Matches the history-write timeout used elsewhere in the app
            op_timeout: Duration::from_secs(5),
            backup_keep_count: 10,
            archive_retention_days: 60,
            retention_delete_batch: 10,
            default_language: "en".into(),
            default_timezone: "UTC".into(),
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `HearthBase::new()`. You can also call this
    /// explicitly to check configuration before wiring up the engine.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `op_timeout` is zero
    /// - `backup_keep_count` is 0
    /// - `archive_retention_days` is not positive
    /// - `retention_delete_batch` is 0
    /// - `default_language` is empty
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.op_timeout.is_zero() {
            return Err(ValidationError::invalid_field(
                "op_timeout",
                "must be greater than zero",
            ));
        }

        if self.backup_keep_count == 0 {
            return Err(ValidationError::invalid_field(
                "backup_keep_count",
                "must be greater than 0",
            ));
        }

        if self.archive_retention_days <= 0 {
            return Err(ValidationError::invalid_field(
                "archive_retention_days",
                "must be greater than 0",
            ));
        }

        if self.retention_delete_batch == 0 {
            return Err(ValidationError::invalid_field(
                "retention_delete_batch",
                "must be greater than 0",
            ));
        }

        if self.default_language.is_empty() {
            return Err(ValidationError::invalid_field(
                "default_language",
                "must not be empty",
            ));
        }

        Ok(())
    }
}
