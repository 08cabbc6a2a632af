use serde::Serialize;

use super::DeviceId;

/// A named group of devices, as organised on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub name: String,
    pub devices: Vec<DeviceId>,
}
