// ── Domain model ──
//
// Runtime-shaped device model: a device is an identifier, a type tag and
// a set of characteristics discovered from the server.

pub mod characteristic;
pub mod descriptor;
pub mod room;

pub use characteristic::{Characteristic, CharacteristicSet, CharacteristicValue, FieldMap};
pub use descriptor::{DeviceDescriptor, DeviceId};
pub use room::Room;
