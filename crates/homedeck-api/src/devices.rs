// Device endpoints

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;
use crate::models::{DeviceSnapshot, UpdateResponse};

impl DeviceClient {
    /// Read the authoritative state of one device.
    ///
    /// `GET /api/device/{uniqueId}`
    pub async fn get_device(&self, unique_id: &str) -> Result<DeviceSnapshot, Error> {
        let url = self.api_url(&["device", unique_id])?;
        debug!(unique_id, "fetching device");
        self.get_json(url).await
    }

    /// Write a set of characteristic values in one request.
    ///
    /// `POST /api/device/{uniqueId}` with `{"<type>": <value>, ...}`
    pub async fn update_device(
        &self,
        unique_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<UpdateResponse, Error> {
        let url = self.api_url(&["device", unique_id])?;
        debug!(unique_id, fields = fields.len(), "updating device");
        self.post_json(url, fields).await
    }
}
