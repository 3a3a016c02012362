//! Input validation for entity payloads.
//!
//! Validates JSON payloads against per-entity-type rule tables before they
//! reach the store. Every write path calls [`ensure_valid`] first, so a
//! rejected payload never produces a partial write.
//!
//! # Validation Layers
//!
//! ```text
//! caller write path
//!     ├── sanitize()            ← strip markup, trim (see sanitize module)
//!     ├── ensure_valid()        ← rule tables, collects ALL violations
//!     └── store.atomic_update() ← only reached if valid
//! ```
//!
//! Unlike a first-failure check, the rule pass runs every applicable rule
//! and reports every violation at once, so a form can surface all field
//! errors in one round trip.

pub mod sanitize;

pub use sanitize::{apply_timestamps, sanitize, sanitize_f64};

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, ValidationError};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time regex"));

/// Expected primitive type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    Text,
    /// JSON number (integer or float).
    Number,
    /// JSON boolean.
    Boolean,
}

impl FieldKind {
    const fn label(&self) -> &'static str {
        match self {
            Self::Text => "a string",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// String format constraints checked against fixed patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    /// `local@domain.tld`
    Email,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM`, 24-hour
    Time,
}

impl TextFormat {
    fn check(&self, s: &str) -> bool {
        match self {
            Self::Email => EMAIL_RE.is_match(s),
            Self::Date => DATE_RE.is_match(s),
            Self::Time => TIME_RE.is_match(s),
        }
    }

    const fn description(&self) -> &'static str {
        match self {
            Self::Email => "a valid email address",
            Self::Date => "a date in YYYY-MM-DD format",
            Self::Time => "a time in HH:MM format",
        }
    }
}

/// One field's rule row in an entity's table.
///
/// Fields absent from a payload that are not `required` skip every check.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    /// Field name in the payload.
    pub field: &'static str,
    /// Missing or empty values are rejected.
    pub required: bool,
    /// Expected primitive type.
    pub kind: Option<FieldKind>,
    /// Minimum string length.
    pub min_length: Option<usize>,
    /// Maximum string length.
    pub max_length: Option<usize>,
    /// Minimum numeric value (inclusive).
    pub min: Option<f64>,
    /// Maximum numeric value (inclusive).
    pub max: Option<f64>,
    /// Closed set of allowed string values.
    pub one_of: Option<&'static [&'static str]>,
    /// Fixed string format.
    pub format: Option<TextFormat>,
}

const RULE: FieldRule = FieldRule {
    field: "",
    required: false,
    kind: None,
    min_length: None,
    max_length: None,
    min: None,
    max: None,
    one_of: None,
    format: None,
};

const TASK_RULES: &[FieldRule] = &[
    FieldRule {
        field: "title",
        required: true,
        kind: Some(FieldKind::Text),
        min_length: Some(1),
        max_length: Some(200),
        ..RULE
    },
    FieldRule {
        field: "description",
        kind: Some(FieldKind::Text),
        max_length: Some(1000),
        ..RULE
    },
    FieldRule {
        field: "priority",
        kind: Some(FieldKind::Text),
        one_of: Some(&["low", "medium", "high"]),
        ..RULE
    },
    FieldRule {
        field: "due_date",
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Date),
        ..RULE
    },
    FieldRule {
        field: "due_time",
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Time),
        ..RULE
    },
    FieldRule {
        field: "completed",
        kind: Some(FieldKind::Boolean),
        ..RULE
    },
];

const SHOPPING_ITEM_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        required: true,
        kind: Some(FieldKind::Text),
        min_length: Some(1),
        max_length: Some(100),
        ..RULE
    },
    FieldRule {
        field: "category",
        required: true,
        kind: Some(FieldKind::Text),
        max_length: Some(50),
        ..RULE
    },
    FieldRule {
        field: "quantity",
        required: true,
        kind: Some(FieldKind::Number),
        min: Some(0.0),
        max: Some(999.0),
        ..RULE
    },
    FieldRule {
        field: "unit",
        required: true,
        kind: Some(FieldKind::Text),
        max_length: Some(20),
        ..RULE
    },
    FieldRule {
        field: "purchased",
        kind: Some(FieldKind::Boolean),
        ..RULE
    },
];

const INVENTORY_ITEM_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        required: true,
        kind: Some(FieldKind::Text),
        min_length: Some(1),
        max_length: Some(100),
        ..RULE
    },
    FieldRule {
        field: "category",
        kind: Some(FieldKind::Text),
        max_length: Some(50),
        ..RULE
    },
    FieldRule {
        field: "quantity",
        required: true,
        kind: Some(FieldKind::Number),
        min: Some(0.0),
        max: Some(9999.0),
        ..RULE
    },
    FieldRule {
        field: "unit",
        kind: Some(FieldKind::Text),
        max_length: Some(20),
        ..RULE
    },
    FieldRule {
        field: "expiry_date",
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Date),
        ..RULE
    },
    FieldRule {
        field: "location",
        kind: Some(FieldKind::Text),
        max_length: Some(100),
        ..RULE
    },
];

const EVENT_RULES: &[FieldRule] = &[
    FieldRule {
        field: "title",
        required: true,
        kind: Some(FieldKind::Text),
        min_length: Some(1),
        max_length: Some(200),
        ..RULE
    },
    FieldRule {
        field: "event_date",
        required: true,
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Date),
        ..RULE
    },
    FieldRule {
        field: "start_time",
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Time),
        ..RULE
    },
    FieldRule {
        field: "end_time",
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Time),
        ..RULE
    },
    FieldRule {
        field: "location",
        kind: Some(FieldKind::Text),
        max_length: Some(200),
        ..RULE
    },
];

const USER_PROFILE_RULES: &[FieldRule] = &[
    FieldRule {
        field: "email",
        required: true,
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Email),
        ..RULE
    },
    FieldRule {
        field: "full_name",
        required: true,
        kind: Some(FieldKind::Text),
        min_length: Some(1),
        max_length: Some(100),
        ..RULE
    },
    FieldRule {
        field: "partner_email",
        kind: Some(FieldKind::Text),
        format: Some(TextFormat::Email),
        ..RULE
    },
    FieldRule {
        field: "language_preference",
        kind: Some(FieldKind::Text),
        max_length: Some(10),
        ..RULE
    },
    FieldRule {
        field: "timezone",
        kind: Some(FieldKind::Text),
        max_length: Some(50),
        ..RULE
    },
];

/// Returns the rule table for an entity type name, if one exists.
pub fn rules_for(entity_type: &str) -> Option<&'static [FieldRule]> {
    match entity_type {
        "task" => Some(TASK_RULES),
        "shopping_item" => Some(SHOPPING_ITEM_RULES),
        "inventory_item" => Some(INVENTORY_ITEM_RULES),
        "event" => Some(EVENT_RULES),
        "user_profile" => Some(USER_PROFILE_RULES),
        _ => None,
    }
}

/// Outcome of a validation pass: all violations, not just the first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when no rule was violated.
    pub valid: bool,
    /// Human-readable messages, one per violated rule.
    pub errors: Vec<String>,
}

/// Validates `data` against the rule table for `entity_type`.
///
/// Every applicable rule runs; violations are collected rather than
/// short-circuited. Fields absent from `data` that are not required are
/// skipped entirely (no type or format check).
///
/// # Errors
///
/// Returns [`ValidationError::UnknownType`] when no rule table exists for
/// `entity_type`. Rule violations are NOT errors at this layer; they are
/// reported in the returned [`ValidationReport`].
pub fn validate(entity_type: &str, data: &Value) -> Result<ValidationReport> {
    let rules =
        rules_for(entity_type).ok_or_else(|| ValidationError::unknown_type(entity_type))?;

    let mut errors = Vec::new();
    for rule in rules {
        check_field(rule, data, &mut errors);
    }

    Ok(ValidationReport {
        valid: errors.is_empty(),
        errors,
    })
}

/// Validates and rejects: the gate every write path calls before touching
/// the store.
///
/// # Errors
///
/// [`ValidationError::UnknownType`] for an unregistered entity type, or
/// [`ValidationError::Rejected`] carrying every violated rule.
pub fn ensure_valid(entity_type: &str, data: &Value) -> Result<()> {
    let report = validate(entity_type, data)?;
    if report.valid {
        Ok(())
    } else {
        Err(ValidationError::rejected(entity_type, report.errors).into())
    }
}

fn check_field(rule: &FieldRule, data: &Value, errors: &mut Vec<String>) {
    // Missing, null, or empty-string all count as "not provided".
    let provided = match data.get(rule.field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(value) => Some(value),
    };

    let Some(value) = provided else {
        if rule.required {
            errors.push(format!("Field '{}' is required", rule.field));
        }
        return;
    };

    if let Some(kind) = rule.kind {
        if !kind.matches(value) {
            errors.push(format!("Field '{}' must be {}", rule.field, kind.label()));
            // Remaining checks assume the right primitive
            return;
        }
    }

    if let Some(s) = value.as_str() {
        let len = s.chars().count();
        if let Some(min) = rule.min_length {
            if len < min {
                errors.push(format!(
                    "Field '{}' must be at least {} characters",
                    rule.field, min
                ));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max {
                errors.push(format!(
                    "Field '{}' must be at most {} characters",
                    rule.field, max
                ));
            }
        }
        if let Some(allowed) = rule.one_of {
            if !allowed.contains(&s) {
                errors.push(format!(
                    "Field '{}' must be one of: {}",
                    rule.field,
                    allowed.join(", ")
                ));
            }
        }
        if let Some(format) = rule.format {
            if !format.check(s) {
                errors.push(format!(
                    "Field '{}' must be {}",
                    rule.field,
                    format.description()
                ));
            }
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.min {
            if n < min {
                errors.push(format!("Field '{}' must be at least {}", rule.field, min));
            }
        }
        if let Some(max) = rule.max {
            if n > max {
                errors.push(format!("Field '{}' must be at most {}", rule.field, max));
            }
        }
    }
}
