// homedeck-api: Async Rust client for the device registry HTTP API

pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod rooms;
pub mod transport;

pub use client::DeviceClient;
pub use error::Error;
pub use models::{
    CharacteristicSummary, DeviceSnapshot, DeviceSummary, Room, ServiceCharacteristic, ServiceRef,
    UpdateResponse,
};
pub use transport::{TlsMode, TransportConfig};
