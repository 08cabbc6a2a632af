// ── Device descriptor ──

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::characteristic::{Characteristic, CharacteristicSet, FieldMap};
use crate::error::ValidationError;

/// Stable, opaque device identifier assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Everything the engine knows about one device.
///
/// The identifier and type tag are fixed at construction; only
/// characteristic values change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    unique_id: DeviceId,
    device_type: String,
    pub service_name: Option<String>,
    pub human_type: Option<String>,
    characteristics: CharacteristicSet,
}

impl DeviceDescriptor {
    pub fn new(unique_id: impl Into<DeviceId>, device_type: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            device_type: device_type.into(),
            service_name: None,
            human_type: None,
            characteristics: CharacteristicSet::new(),
        }
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.insert(characteristic);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn unique_id(&self) -> &DeviceId {
        &self.unique_id
    }

    /// Type tag used to pick a control binder.
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn characteristics(&self) -> &CharacteristicSet {
        &self.characteristics
    }

    pub fn characteristic(&self, kind: &str) -> Option<&Characteristic> {
        self.characteristics.get(kind)
    }

    pub(crate) fn insert_characteristic(&mut self, characteristic: Characteristic) {
        self.characteristics.insert(characteristic);
    }

    /// Name shown above the device's controls.
    pub fn display_name(&self) -> &str {
        self.service_name
            .as_deref()
            .or(self.human_type.as_deref())
            .unwrap_or(self.unique_id.as_str())
    }

    /// Current readable values.
    pub fn values(&self) -> FieldMap {
        self.characteristics.values()
    }

    /// Validate every field of a proposed edit. The first violation wins.
    pub fn validate_edit(&self, fields: &FieldMap) -> Result<(), ValidationError> {
        for (kind, value) in fields {
            let characteristic =
                self.characteristics
                    .get(kind)
                    .ok_or_else(|| ValidationError::UnknownCharacteristic {
                        field: kind.clone(),
                    })?;
            characteristic.validate(*value)?;
        }
        Ok(())
    }

    /// Overwrite values of known characteristics. Returns the types whose
    /// value actually changed.
    pub fn apply_values(&mut self, fields: &FieldMap) -> Vec<String> {
        fields
            .iter()
            .filter(|(kind, value)| self.characteristics.set_value(kind, **value))
            .map(|(kind, _)| kind.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CharacteristicValue;
    use pretty_assertions::assert_eq;

    fn lamp() -> DeviceDescriptor {
        DeviceDescriptor::new("lamp-1", "Lightbulb")
            .with_characteristic(Characteristic::new("On", 0))
            .with_characteristic(Characteristic::new("Brightness", 40).with_range(0.0, 100.0))
    }

    #[test]
    fn validate_edit_checks_every_field() {
        let d = lamp();
        let mut fields = FieldMap::new();
        fields.insert("On".into(), 1.into());
        fields.insert("Brightness".into(), 150.into());
        assert!(matches!(
            d.validate_edit(&fields),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "Brightness"
        ));
    }

    #[test]
    fn validate_edit_rejects_unknown_type() {
        let mut fields = FieldMap::new();
        fields.insert("Hue".into(), 10.into());
        assert_eq!(
            lamp().validate_edit(&fields),
            Err(ValidationError::UnknownCharacteristic { field: "Hue".into() })
        );
    }

    #[test]
    fn apply_values_reports_only_changes() {
        let mut d = lamp();
        let mut fields = FieldMap::new();
        fields.insert("On".into(), 0.into());
        fields.insert("Brightness".into(), 75.into());
        fields.insert("Unknown".into(), 1.into());
        assert_eq!(d.apply_values(&fields), vec!["Brightness".to_string()]);
        assert_eq!(
            d.characteristic("Brightness").and_then(|c| c.value),
            Some(CharacteristicValue::Int(75))
        );
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(lamp().display_name(), "lamp-1");
        assert_eq!(lamp().with_name("Desk Lamp").display_name(), "Desk Lamp");
    }
}
