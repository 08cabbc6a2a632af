// ── Device backend seam ──
//
// The sync engine talks to the server only through `DeviceBackend`, so the
// coalescer and poll scheduler can be driven by an in-memory fake under
// paused tokio time.

use futures_util::future::BoxFuture;
use homedeck_api::DeviceClient;

use crate::convert::{fields_from_summaries, fields_to_json};
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, DeviceId, FieldMap, Room};

/// Result of a successful device write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteAck {
    /// Values the server reports as written (`updatedCharacteristics`).
    pub updated: FieldMap,
    /// Description of each updated characteristic, when reported.
    pub descriptions: Vec<(String, String)>,
}

/// Remote side of the engine: reads and writes device state.
pub trait DeviceBackend: Send + Sync + 'static {
    /// Read the authoritative descriptor of one device.
    fn fetch_device<'a>(
        &'a self,
        id: &'a DeviceId,
    ) -> BoxFuture<'a, Result<DeviceDescriptor, CoreError>>;

    /// Write a merged field map in a single request.
    fn write_device<'a>(
        &'a self,
        id: &'a DeviceId,
        fields: &'a FieldMap,
    ) -> BoxFuture<'a, Result<WriteAck, CoreError>>;

    fn list_rooms(&self) -> BoxFuture<'_, Result<Vec<Room>, CoreError>>;

    fn list_room_devices<'a>(
        &'a self,
        room: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DeviceDescriptor>, CoreError>>;
}

impl DeviceBackend for DeviceClient {
    fn fetch_device<'a>(
        &'a self,
        id: &'a DeviceId,
    ) -> BoxFuture<'a, Result<DeviceDescriptor, CoreError>> {
        Box::pin(async move {
            let snapshot = self.get_device(id.as_str()).await.map_err(|e| {
                if e.is_not_found() {
                    CoreError::DeviceNotFound {
                        identifier: id.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
            Ok(snapshot.into())
        })
    }

    fn write_device<'a>(
        &'a self,
        id: &'a DeviceId,
        fields: &'a FieldMap,
    ) -> BoxFuture<'a, Result<WriteAck, CoreError>> {
        Box::pin(async move {
            let body = fields_to_json(fields);
            let resp = self.update_device(id.as_str(), &body).await?;
            Ok(WriteAck {
                updated: fields_from_summaries(&resp.updated_characteristics),
                descriptions: resp
                    .updated_characteristics
                    .into_iter()
                    .filter_map(|c| c.description.map(|d| (c.kind, d)))
                    .collect(),
            })
        })
    }

    fn list_rooms(&self) -> BoxFuture<'_, Result<Vec<Room>, CoreError>> {
        Box::pin(async move {
            let rooms = DeviceClient::list_rooms(self).await?;
            Ok(rooms.into_iter().map(Room::from).collect())
        })
    }

    fn list_room_devices<'a>(
        &'a self,
        room: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DeviceDescriptor>, CoreError>> {
        Box::pin(async move {
            let devices = DeviceClient::list_room_devices(self, room).await?;
            Ok(devices.into_iter().map(DeviceDescriptor::from).collect())
        })
    }
}
