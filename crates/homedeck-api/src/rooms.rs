// Room endpoints
//
// Read-only: rooms are managed server-side and only used to discover
// which devices to mount.

use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;
use crate::models::{DeviceSummary, Room};

impl DeviceClient {
    /// List all rooms and the device services they contain.
    ///
    /// `GET /api/rooms`
    pub async fn list_rooms(&self) -> Result<Vec<Room>, Error> {
        let url = self.api_url(&["rooms"])?;
        debug!("listing rooms");
        self.get_json(url).await
    }

    /// List device summaries for one room. Unknown rooms yield an empty list.
    ///
    /// `GET /api/rooms/{room}/devices`
    pub async fn list_room_devices(&self, room: &str) -> Result<Vec<DeviceSummary>, Error> {
        let url = self.api_url(&["rooms", room, "devices"])?;
        debug!(room, "listing room devices");
        self.get_json(url).await
    }
}
