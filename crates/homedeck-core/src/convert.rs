// ── API-to-domain type conversions ──
//
// Bridges raw `homedeck_api` wire types into the typed domain model.
// Characteristic values arrive as loose JSON; anything that is not a bool
// or a number is dropped here rather than carried into the engine.

use homedeck_api::models::{
    CharacteristicSummary, DeviceSnapshot, DeviceSummary, Room as WireRoom,
    ServiceCharacteristic,
};
use serde_json::{Map, Value};

use crate::model::{
    Characteristic, CharacteristicValue, DeviceDescriptor, DeviceId, FieldMap, Room,
};

/// Characteristic types that only describe transitions and never get a
/// control of their own.
pub const HIDDEN_CHARACTERISTICS: &[&str] = &[
    "CharacteristicValueActiveTransitionCount",
    "CharacteristicValueTransitionControl",
    "SupportedCharacteristicValueTransitionConfiguration",
];

fn is_hidden(kind: &str) -> bool {
    HIDDEN_CHARACTERISTICS.contains(&kind)
}

// ── Characteristics ──────────────────────────────────────────────────

impl From<ServiceCharacteristic> for Characteristic {
    fn from(c: ServiceCharacteristic) -> Self {
        Self {
            value: c.value.as_ref().and_then(CharacteristicValue::from_json),
            kind: c.kind,
            can_read: c.can_read,
            can_write: c.can_write,
            min_value: c.min_value,
            max_value: c.max_value,
            min_step: c.min_step,
            description: c.description,
            unit: c.unit,
            format: c.format,
        }
    }
}

/// Convert a JSON object of characteristic values into a [`FieldMap`].
pub fn fields_from_json(values: &Map<String, Value>) -> FieldMap {
    values
        .iter()
        .filter(|(kind, _)| !is_hidden(kind))
        .filter_map(|(kind, v)| CharacteristicValue::from_json(v).map(|v| (kind.clone(), v)))
        .collect()
}

/// Convert a [`FieldMap`] into the JSON body of a device write.
pub fn fields_to_json(fields: &FieldMap) -> Map<String, Value> {
    fields
        .iter()
        .map(|(kind, v)| (kind.clone(), v.to_json()))
        .collect()
}

/// Fields confirmed by a write acknowledgement.
pub fn fields_from_summaries(summaries: &[CharacteristicSummary]) -> FieldMap {
    summaries
        .iter()
        .filter(|s| !is_hidden(&s.kind))
        .filter_map(|s| {
            s.value
                .as_ref()
                .and_then(CharacteristicValue::from_json)
                .map(|v| (s.kind.clone(), v))
        })
        .collect()
}

// ── Descriptors ──────────────────────────────────────────────────────

impl From<DeviceSnapshot> for DeviceDescriptor {
    fn from(snap: DeviceSnapshot) -> Self {
        let values = fields_from_json(&snap.values);
        let mut descriptor = DeviceDescriptor::new(snap.unique_id, snap.device_type);
        descriptor.service_name = snap.service_name;
        descriptor.human_type = snap.human_type;

        for wire in snap.service_characteristics {
            if is_hidden(&wire.kind) {
                continue;
            }
            let mut characteristic = Characteristic::from(wire);
            if let Some(v) = values.get(&characteristic.kind) {
                characteristic.value = Some(*v);
            }
            descriptor.insert_characteristic(characteristic);
        }

        // Value-only entries: the server knows the value but sent no metadata.
        for (kind, value) in values {
            if descriptor.characteristic(&kind).is_none() {
                descriptor.insert_characteristic(Characteristic::new(kind, value));
            }
        }

        descriptor
    }
}

impl From<DeviceSummary> for DeviceDescriptor {
    fn from(summary: DeviceSummary) -> Self {
        let mut descriptor = DeviceDescriptor::new(summary.unique_id, summary.device_type);
        descriptor.service_name = summary.service_name;
        for wire in summary.characteristics {
            if !is_hidden(&wire.kind) {
                descriptor.insert_characteristic(wire.into());
            }
        }
        descriptor
    }
}

impl From<WireRoom> for Room {
    fn from(room: WireRoom) -> Self {
        Self {
            name: room.name,
            devices: room
                .services
                .into_iter()
                .map(|s| DeviceId::from(s.unique_id))
                .collect(),
        }
    }
}
