// ── Characteristic model ──
//
// A characteristic is one typed property of a device (On, Brightness,
// TargetDoorState, ...). Values are kept as the narrowest JSON number type
// so `1` goes back on the wire as `1`, not `1.0`.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Ordered `characteristic type -> value` map used for edits, writes and
/// snapshots.
pub type FieldMap = BTreeMap<String, CharacteristicValue>;

const STEP_TOLERANCE: f64 = 1e-9;

/// A characteristic value as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl CharacteristicValue {
    /// Build a value from a raw JSON value. Strings, arrays and objects
    /// have no characteristic representation and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            _ => None,
        }
    }

    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Int(i) => serde_json::Value::from(i),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
        }
    }

    /// Numeric view of the value; booleans map to `0.0` / `1.0`.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Integer view, rounding floats. `None` for non-finite floats.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(b)),
            Self::Int(i) => Some(i),
            Self::Float(f) if f.is_finite() => Some(f.round() as i64),
            Self::Float(_) => None,
        }
    }

    /// Truthiness as the server treats it: non-zero numbers are "on".
    pub fn is_truthy(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
            Self::Float(f) => f != 0.0,
        }
    }

    /// A number from a UI control; whole numbers stay integers.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn from_number(n: f64) -> Self {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
            Self::Int(n as i64)
        } else {
            Self::Float(n)
        }
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for CharacteristicValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

// ── Characteristic ───────────────────────────────────────────────────

/// One typed property of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Characteristic type; unique within a device.
    pub kind: String,
    pub value: Option<CharacteristicValue>,
    pub can_read: bool,
    pub can_write: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_step: Option<f64>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub format: Option<String>,
}

impl Characteristic {
    /// A readable, writable characteristic without bounds.
    pub fn new(kind: impl Into<String>, value: impl Into<CharacteristicValue>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
            can_read: true,
            can_write: true,
            min_value: None,
            max_value: None,
            min_step: None,
            description: None,
            unit: None,
            format: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.min_step = Some(step);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.can_write = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.can_read = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human label: the server description, falling back to the type.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.kind)
    }

    /// Check a proposed value against this characteristic's permissions
    /// and bounds.
    pub fn validate(&self, value: CharacteristicValue) -> Result<(), ValidationError> {
        if !self.can_write {
            return Err(ValidationError::ReadOnly {
                field: self.kind.clone(),
            });
        }

        let n = value.as_f64();
        if !n.is_finite() {
            return Err(ValidationError::NotFinite {
                field: self.kind.clone(),
            });
        }

        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if n < min || n > max {
                return Err(ValidationError::OutOfRange {
                    field: self.kind.clone(),
                    value: n,
                    min,
                    max,
                });
            }
        }

        if let Some(step) = self.min_step.filter(|s| *s > 0.0) {
            let base = self.min_value.unwrap_or(0.0);
            let steps = (n - base) / step;
            if (steps - steps.round()).abs() > STEP_TOLERANCE {
                return Err(ValidationError::StepMismatch {
                    field: self.kind.clone(),
                    value: n,
                    step,
                    base,
                });
            }
        }

        Ok(())
    }
}

// ── CharacteristicSet ────────────────────────────────────────────────

/// Insertion-ordered set of characteristics keyed by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacteristicSet(IndexMap<String, Characteristic>);

impl CharacteristicSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the characteristic of the same type.
    pub fn insert(&mut self, characteristic: Characteristic) {
        self.0.insert(characteristic.kind.clone(), characteristic);
    }

    pub fn get(&self, kind: &str) -> Option<&Characteristic> {
        self.0.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Characteristic> {
        self.0.values()
    }

    /// Overwrite the stored value of an existing characteristic. Returns
    /// `true` if the value changed; unknown types are ignored.
    pub fn set_value(&mut self, kind: &str, value: CharacteristicValue) -> bool {
        match self.0.get_mut(kind) {
            Some(c) if c.value != Some(value) => {
                c.value = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Current values of every readable characteristic.
    pub fn values(&self) -> FieldMap {
        self.0
            .values()
            .filter(|c| c.can_read)
            .filter_map(|c| c.value.map(|v| (c.kind.clone(), v)))
            .collect()
    }
}

impl FromIterator<Characteristic> for CharacteristicSet {
    fn from_iter<I: IntoIterator<Item = Characteristic>>(iter: I) -> Self {
        let mut set = Self::new();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CharacteristicSet {
    type Item = &'a Characteristic;
    type IntoIter = indexmap::map::Values<'a, String, Characteristic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}
