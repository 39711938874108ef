// Field-level schema checks for hub JSON records
//
// The hub is loose about its JSON: fields come and go across firmware
// versions and nothing is typed on the wire. Every record is checked here,
// field by field in a fixed order, before serde ever sees it. The first
// violation aborts the check; nothing is aggregated.

use serde_json::{Map, Value};
use strum::Display;
use thiserror::Error;

/// Largest float that still holds every smaller whole number exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Primitive JSON shape expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FieldKind {
    /// Non-negative whole number (identifiers, endpoints). `1.0` counts.
    #[strum(serialize = "an integer")]
    Integer,
    /// Any JSON number (percentages, levels, lifts).
    #[strum(serialize = "a number")]
    Number,
    #[strum(serialize = "a string")]
    String,
    #[strum(serialize = "a boolean")]
    Boolean,
    #[strum(serialize = "an array")]
    Array,
    #[strum(serialize = "an object")]
    Object,
}

impl FieldKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Integer => whole_number(value).is_some(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// `value` as a `u64` if it is a non-negative whole number, written
/// either as an integer or as a float such as `1.0`.
#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= MAX_EXACT_FLOAT).then_some(f as u64)
}

/// Rewrite whole-valued floats among the top-level fields of `json` as
/// integers, so integer fields deserialize. Float fields accept either.
pub(crate) fn normalize_whole_numbers(json: &mut Value) {
    let Value::Object(fields) = json else {
        return;
    };
    for value in fields.values_mut() {
        if value.is_f64() {
            if let Some(n) = whole_number(value) {
                *value = Value::from(n);
            }
        }
    }
}

/// A single schema violation, naming the record kind and the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("failed to load {record}: did not contain required field \"{field}\"")]
    Missing { record: &'static str, field: String },

    #[error("failed to load {record}: field \"{field}\" was not {expected}, was {actual}")]
    WrongType {
        record: &'static str,
        field: String,
        expected: FieldKind,
        actual: String,
    },
}

impl ValidationError {
    pub fn missing(record: &'static str, field: impl Into<String>) -> Self {
        Self::Missing {
            record,
            field: field.into(),
        }
    }

    pub fn wrong_type(
        record: &'static str,
        field: impl Into<String>,
        expected: FieldKind,
        actual: &Value,
    ) -> Self {
        Self::WrongType {
            record,
            field: field.into(),
            expected,
            actual: actual.to_string(),
        }
    }

    /// The record kind being loaded (`"Light"`, `"Device"`, `"WiserHub"`, ...).
    pub fn record(&self) -> &'static str {
        match self {
            Self::Missing { record, .. } | Self::WrongType { record, .. } => record,
        }
    }

    /// The offending field name.
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field, .. } | Self::WrongType { field, .. } => field,
        }
    }
}

/// Borrowed view over one JSON object being validated.
///
/// `record` labels every error raised through this view.
pub struct Fields<'a> {
    record: &'static str,
    json: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Start validating `value` as a `record`. Fails if it is not a JSON object.
    pub fn of(record: &'static str, value: &'a Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(json) => Ok(Self { record, json }),
            other => Err(ValidationError::wrong_type(
                record,
                record,
                FieldKind::Object,
                other,
            )),
        }
    }

    /// The field must be present and of the given kind.
    pub fn require(&self, field: &str, kind: FieldKind) -> Result<&'a Value, ValidationError> {
        let value = self
            .json
            .get(field)
            .ok_or_else(|| ValidationError::missing(self.record, field))?;
        if kind.matches(value) {
            Ok(value)
        } else {
            Err(ValidationError::wrong_type(self.record, field, kind, value))
        }
    }

    /// The field may be absent; when present it must be of the given kind.
    ///
    /// An explicit `null` counts as present.
    pub fn optional(
        &self,
        field: &str,
        kind: FieldKind,
    ) -> Result<Option<&'a Value>, ValidationError> {
        match self.json.get(field) {
            None => Ok(None),
            Some(value) if kind.matches(value) => Ok(Some(value)),
            Some(value) => Err(ValidationError::wrong_type(self.record, field, kind, value)),
        }
    }

    /// Check several required fields of the same kind, in order.
    pub fn require_all(&self, fields: &[&str], kind: FieldKind) -> Result<(), ValidationError> {
        fields
            .iter()
            .try_for_each(|field| self.require(field, kind).map(|_| ()))
    }

    /// Check several optional fields of the same kind, in order.
    pub fn optional_all(&self, fields: &[&str], kind: FieldKind) -> Result<(), ValidationError> {
        fields
            .iter()
            .try_for_each(|field| self.optional(field, kind).map(|_| ()))
    }
}
