// Wire types for the device registry API.
//
// Field names follow the server's camelCase JSON. Characteristic values are
// kept as raw `serde_json::Value`; `homedeck-core` converts them into its
// typed model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/device/{uniqueId}` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub unique_id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    /// Current values keyed by characteristic type.
    #[serde(default)]
    pub values: serde_json::Map<String, Value>,
    #[serde(default)]
    pub service_characteristics: Vec<ServiceCharacteristic>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub human_type: Option<String>,
}

/// One characteristic of a device service, as reported by the server.
///
/// Also used for the trimmed-down entries of a room device summary, which
/// omit most of the optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCharacteristic {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub perms: Vec<String>,
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub min_step: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

fn default_true() -> bool {
    true
}

/// `POST /api/device/{uniqueId}` success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_characteristics: Vec<CharacteristicSummary>,
}

/// Entry of `updatedCharacteristics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicSummary {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `GET /api/rooms` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    #[serde(default)]
    pub services: Vec<ServiceRef>,
}

/// Reference from a room to one device service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub unique_id: String,
    #[serde(default)]
    pub aid: Option<u64>,
    #[serde(default)]
    pub iid: Option<u64>,
    #[serde(default)]
    pub uuid: Option<String>,
}

/// `GET /api/rooms/{room}/devices` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub unique_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub characteristics: Vec<ServiceCharacteristic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_tolerates_missing_optional_sections() {
        let snap: DeviceSnapshot = serde_json::from_value(json!({
            "uniqueId": "d1",
            "type": "Switch",
            "values": { "On": 1 }
        }))
        .expect("decode");
        assert_eq!(snap.unique_id, "d1");
        assert_eq!(snap.values.get("On"), Some(&json!(1)));
        assert!(snap.service_characteristics.is_empty());
    }

    #[test]
    fn summary_characteristic_defaults_to_readable() {
        let c: ServiceCharacteristic = serde_json::from_value(json!({
            "type": "Brightness",
            "value": 40,
            "canWrite": true,
            "maxValue": 100,
            "minValue": 0,
            "format": "int"
        }))
        .expect("decode");
        assert!(c.can_read);
        assert!(c.can_write);
        assert_eq!(c.max_value, Some(100.0));
        assert!(c.perms.is_empty());
    }
}
