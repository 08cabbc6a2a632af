// homedeck-core: Device state synchronization engine
//
// Keeps control fragments for runtime-discovered devices in step with a
// remote device server: coalesced writes out, periodic snapshots in, with
// in-flight local edits protected from stale reads.

pub mod backend;
pub mod binder;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod event;
pub mod model;
pub mod mount;
pub mod recorder;
pub mod registry;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{DeviceBackend, WriteAck};
pub use binder::{
    Control, ControlBinder, ControlInput, DebugRow, EditSink, Fragment, InputValue, SelectOption,
    Widget,
};
pub use config::{ControllerConfig, RecordingConfig, TlsVerification};
pub use controller::{Controller, MountStatus};
pub use error::{CoreError, ValidationError};
pub use event::SyncEvent;
pub use mount::MountPoint;
pub use registry::{BinderFactory, DeviceTypeRegistry};
pub use sync::ReconcileReport;

// ── Model re-exports ────────────────────────────────────────────────
pub use model::{
    Characteristic, CharacteristicSet, CharacteristicValue, DeviceDescriptor, DeviceId, FieldMap,
    Room,
};
