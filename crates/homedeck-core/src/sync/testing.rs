// In-memory backend for exercising the sync engine under paused time.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::time::Instant;

use crate::backend::{DeviceBackend, WriteAck};
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, DeviceId, FieldMap, Room};

#[derive(Default)]
struct State {
    devices: HashMap<DeviceId, DeviceDescriptor>,
    writes: Vec<(DeviceId, FieldMap)>,
    fetches: Vec<(DeviceId, Instant)>,
    fail_writes: bool,
    fail_fetches: bool,
    write_latency: Duration,
    fetch_latency: Duration,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn insert(&self, descriptor: DeviceDescriptor) {
        let mut state = self.state.lock().unwrap();
        state
            .devices
            .insert(descriptor.unique_id().clone(), descriptor);
    }

    /// Change the server-side value of one characteristic.
    pub(crate) fn set_value(&self, id: &str, field: &str, value: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(d) = state.devices.get_mut(id) {
            let mut fields = FieldMap::new();
            fields.insert(field.to_string(), value.into());
            d.apply_values(&fields);
        }
    }

    pub(crate) fn writes(&self) -> Vec<(DeviceId, FieldMap)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub(crate) fn fetches(&self) -> Vec<(DeviceId, Instant)> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub(crate) fn fail_fetches(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetches = fail;
    }

    pub(crate) fn set_write_latency(&self, latency: Duration) {
        self.state.lock().unwrap().write_latency = latency;
    }

    pub(crate) fn set_fetch_latency(&self, latency: Duration) {
        self.state.lock().unwrap().fetch_latency = latency;
    }
}

impl DeviceBackend for FakeBackend {
    fn fetch_device<'a>(
        &'a self,
        id: &'a DeviceId,
    ) -> BoxFuture<'a, Result<DeviceDescriptor, CoreError>> {
        Box::pin(async move {
            let latency = {
                let mut state = self.state.lock().unwrap();
                state.fetches.push((id.clone(), Instant::now()));
                state.fetch_latency
            };
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let state = self.state.lock().unwrap();
            if state.fail_fetches {
                return Err(CoreError::Network {
                    message: "connection refused".into(),
                    status: None,
                });
            }
            state
                .devices
                .get(id)
                .cloned()
                .ok_or_else(|| CoreError::DeviceNotFound {
                    identifier: id.to_string(),
                })
        })
    }

    fn write_device<'a>(
        &'a self,
        id: &'a DeviceId,
        fields: &'a FieldMap,
    ) -> BoxFuture<'a, Result<WriteAck, CoreError>> {
        Box::pin(async move {
            let latency = {
                let mut state = self.state.lock().unwrap();
                state.writes.push((id.clone(), fields.clone()));
                state.write_latency
            };
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(CoreError::Network {
                    message: "HTTP 500: Value 150 for Brightness is out of range.".into(),
                    status: Some(500),
                });
            }
            if let Some(d) = state.devices.get_mut(id) {
                d.apply_values(fields);
            }
            Ok(WriteAck {
                updated: fields.clone(),
                descriptions: fields.keys().map(|k| (k.clone(), k.clone())).collect(),
            })
        })
    }

    fn list_rooms(&self) -> BoxFuture<'_, Result<Vec<Room>, CoreError>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn list_room_devices<'a>(
        &'a self,
        _room: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DeviceDescriptor>, CoreError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state.devices.values().cloned().collect())
        })
    }
}
