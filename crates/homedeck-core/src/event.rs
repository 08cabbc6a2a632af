// ── Sync events ──
//
// Broadcast to every `Controller::subscribe()` receiver. Slow receivers
// lag and lose events; the engine never waits for them.

use serde::Serialize;

use crate::model::{DeviceId, FieldMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Mounted {
        device: DeviceId,
        device_type: String,
        supported: bool,
    },
    Unmounted {
        device: DeviceId,
    },
    /// A user edit passed validation and joined the pending write.
    EditQueued {
        device: DeviceId,
        fields: FieldMap,
    },
    WriteAcknowledged {
        device: DeviceId,
        fields: FieldMap,
    },
    WriteFailed {
        device: DeviceId,
        fields: FieldMap,
        error: String,
    },
    SnapshotApplied {
        device: DeviceId,
        changed: Vec<String>,
        suppressed: Vec<String>,
    },
}

impl SyncEvent {
    pub fn device(&self) -> &DeviceId {
        match self {
            Self::Mounted { device, .. }
            | Self::Unmounted { device }
            | Self::EditQueued { device, .. }
            | Self::WriteAcknowledged { device, .. }
            | Self::WriteFailed { device, .. }
            | Self::SnapshotApplied { device, .. } => device,
        }
    }
}
