//! Health check and best-effort back-fill of missing required data.
//!
//! Walks every profile in the store and fills in absent lifecycle
//! timestamps and language preference; separately seeds the two fixed
//! metadata datasets when missing. Every per-record failure is isolated:
//! a malformed profile or a failed write is logged and counted, and the
//! scan moves on, so one bad record never blocks repair of the rest.

use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::store::{paths, StoreHandle};
use crate::types::Timestamp;

/// The seeded shopping/item categories dataset.
pub fn default_categories() -> Value {
    json!([
        "produce",
        "dairy",
        "meat",
        "bakery",
        "frozen",
        "pantry",
        "beverages",
        "household",
        "personal_care"
    ])
}

/// The seeded measurement units dataset.
pub fn default_units() -> Value {
    json!(["pcs", "kg", "g", "l", "ml", "pack", "bottle", "can", "box", "dozen"])
}

/// Outcome of a repair pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Distinct repairs performed (field back-fills + datasets seeded).
    pub repairs: usize,
    /// Records or writes that failed and were skipped.
    pub failures: usize,
}

/// Back-fills missing profile fields and seeds metadata datasets.
#[derive(Clone, Debug)]
pub struct RepairService {
    store: StoreHandle,
    default_language: String,
    default_timezone: String,
}

impl RepairService {
    /// Creates a service over the given store handle, taking defaults
    /// from `config`.
    pub fn new(store: StoreHandle, config: &Config) -> Self {
        Self {
            store,
            default_language: config.default_language.clone(),
            default_timezone: config.default_timezone.clone(),
        }
    }

    /// Runs the full repair pass. Returns counts of repairs performed and
    /// per-record failures skipped.
    #[instrument(skip(self))]
    pub async fn repair_all(&self) -> Result<RepairReport> {
        let mut report = RepairReport::default();

        self.repair_profiles(&mut report).await?;
        self.seed_metadata(&mut report).await;

        info!(
            repairs = report.repairs,
            failures = report.failures,
            "Repair pass complete"
        );
        Ok(report)
    }

    async fn repair_profiles(&self, report: &mut RepairReport) -> Result<()> {
        let snap = self.store.read(&paths::users_root()).await?;
        let Some(users) = snap.into_value() else {
            return Ok(());
        };
        let Some(users) = users.as_object() else {
            warn!("Users root is not an object; skipping profile repair");
            report.failures += 1;
            return Ok(());
        };

        for (uid, subtree) in users {
            match self.repair_one_profile(uid, subtree).await {
                Ok(count) => report.repairs += count,
                Err(e) => {
                    // One malformed record must not block the rest.
                    warn!(uid = %uid, error = %e, "Profile repair failed; continuing");
                    report.failures += 1;
                }
            }
        }
        Ok(())
    }

    /// Repairs one profile, returning how many fields were back-filled.
    async fn repair_one_profile(&self, uid: &str, subtree: &Value) -> Result<usize> {
        let Some(profile) = subtree.get("profile") else {
            // A user subtree with no profile record is entity-layer data
            // only; nothing to repair.
            return Ok(0);
        };
        let Some(profile) = profile.as_object() else {
            return Err(crate::error::StoreError::serialization(format!(
                "profile at users/{} is not an object",
                uid
            ))
            .into());
        };

        let now = Value::from(Timestamp::now().as_millis());
        let fills: [(&str, Value); 4] = [
            ("created_at", now.clone()),
            ("updated_at", now),
            (
                "language_preference",
                Value::from(self.default_language.as_str()),
            ),
            ("timezone", Value::from(self.default_timezone.as_str())),
        ];

        let mut repaired = 0usize;
        for (field, value) in fills {
            if profile.get(field).map_or(true, Value::is_null) {
                // Conditional write: only fires when the field is still
                // absent at commit time.
                let path = format!("users/{}/profile/{}", uid, field);
                if self.store.write_if_absent(&path, value).await? {
                    repaired += 1;
                }
            }
        }
        Ok(repaired)
    }

    /// Seeds categories and units when missing or empty. Failures here
    /// are counted, not propagated, like any other per-record failure.
    async fn seed_metadata(&self, report: &mut RepairReport) {
        for (path, dataset) in [
            (paths::metadata_categories(), default_categories()),
            (paths::metadata_units(), default_units()),
        ] {
            match self.seed_one(&path, dataset).await {
                Ok(true) => report.repairs += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path, error = %e, "Metadata seed failed; continuing");
                    report.failures += 1;
                }
            }
        }
    }

    async fn seed_one(&self, path: &str, dataset: Value) -> Result<bool> {
        let snap = self.store.read(path).await?;
        let present = match snap.value() {
            None => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        };
        if present {
            return Ok(false);
        }
        self.store.write(path, dataset).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_datasets_are_non_empty() {
        assert!(!default_categories().as_array().unwrap().is_empty());
        assert!(!default_units().as_array().unwrap().is_empty());
    }

    #[test]
    fn test_report_default_is_zeroed() {
        let report = RepairReport::default();
        assert_eq!(report.repairs, 0);
        assert_eq!(report.failures, 0);
    }
}
