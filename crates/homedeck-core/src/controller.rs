// ── Controller facade ──
//
// Owns the sync engine for one device server: the binder registry, the
// write coalescer, the poll scheduler and the reconciler, plus every
// mounted device. UI collaborators only ever talk to this type.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use homedeck_api::DeviceClient;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::{DeviceBackend, WriteAck};
use crate::binder::fallback::UnsupportedBinder;
use crate::binder::{ControlBinder, ControlInput, EditSink, Fragment, debug as debug_table};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::event::SyncEvent;
use crate::model::{DeviceDescriptor, DeviceId, FieldMap, Room};
use crate::mount::{MountPoint, MountedDevice, View};
use crate::recorder::ActionRecorder;
use crate::registry::{BinderFactory, DeviceTypeRegistry};
use crate::sync::coalescer::{AckHandler, FailureHandler, WriteCoalescer, WriteHandlers};
use crate::sync::poller::{PollScheduler, SnapshotCallback};
use crate::sync::reconciler::{Mounts, Reconciler};
use crate::sync::suppression::InFlightRegistry;

const EVENT_CHANNEL_SIZE: usize = 256;

/// How a device ended up after `mount_device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountStatus {
    /// A registered binder drives the device and polling is running.
    Bound,
    /// No binder for the type; a notice was presented instead.
    Unsupported { type_tag: String },
}

// ── Controller ───────────────────────────────────────────────────────

/// Main entry point for keeping control surfaces in sync with a device
/// server.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Mounting and input
/// handling spawn Tokio tasks and must happen inside a runtime.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    backend: Arc<dyn DeviceBackend>,
    registry: DeviceTypeRegistry,
    in_flight: Arc<InFlightRegistry>,
    coalescer: WriteCoalescer,
    poller: PollScheduler,
    reconciler: Reconciler,
    mounts: Mounts,
    event_tx: broadcast::Sender<SyncEvent>,
    recorder: Option<Arc<ActionRecorder>>,
}

impl Controller {
    /// Create a controller talking HTTP to `config.base_url`.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let client = DeviceClient::new(config.base_url.clone(), &config.transport())?;
        Self::with_backend(config, Arc::new(client))
    }

    /// Create a controller on top of an arbitrary backend.
    pub fn with_backend(
        config: ControllerConfig,
        backend: Arc<dyn DeviceBackend>,
    ) -> Result<Self, CoreError> {
        let recorder = config
            .record_action
            .as_ref()
            .map(|r| ActionRecorder::open(r.action.clone(), r.path.clone()))
            .transpose()?
            .map(Arc::new);

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let mounts: Mounts = Arc::new(DashMap::new());
        let in_flight = Arc::new(InFlightRegistry::new(
            config.effective_suppression_timeout(),
        ));

        let handlers = WriteHandlers {
            on_ack: Some(ack_handler(
                Arc::clone(&mounts),
                event_tx.clone(),
                recorder.clone(),
                config.debug,
            )),
            on_failure: Some(failure_handler(Arc::clone(&mounts), event_tx.clone())),
        };
        let coalescer = WriteCoalescer::new(
            Arc::clone(&backend),
            Arc::clone(&in_flight),
            config.debounce,
            handlers,
        );
        let poller = PollScheduler::new(Arc::clone(&backend), config.max_concurrent_polls);
        let reconciler =
            Reconciler::new(Arc::clone(&in_flight), Arc::clone(&mounts), event_tx.clone());

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                backend,
                registry: DeviceTypeRegistry::with_builtin(),
                in_flight,
                coalescer,
                poller,
                reconciler,
                mounts,
                event_tx,
                recorder,
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &DeviceTypeRegistry {
        &self.inner.registry
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.inner.reconciler
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Install (or replace) the binder factory for a device type. Devices
    /// already mounted keep the binder they were mounted with.
    pub fn register_device_type<F>(&self, type_tag: impl Into<String>, factory: F)
    where
        F: Fn(&DeviceDescriptor) -> Box<dyn ControlBinder> + Send + Sync + 'static,
    {
        self.inner.registry.register(type_tag, factory);
    }

    pub fn register_factory(&self, type_tag: impl Into<String>, factory: BinderFactory) {
        self.inner.registry.register_factory(type_tag, factory);
    }

    // ── Remote reads ─────────────────────────────────────────────────

    pub async fn load_device(&self, id: &DeviceId) -> Result<DeviceDescriptor, CoreError> {
        self.inner.backend.fetch_device(id).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, CoreError> {
        self.inner.backend.list_rooms().await
    }

    pub async fn list_room_devices(&self, room: &str) -> Result<Vec<DeviceDescriptor>, CoreError> {
        self.inner.backend.list_room_devices(room).await
    }

    /// Validate `fields` against the device's current descriptor and write
    /// them immediately, bypassing the debounce. For one-shot tools.
    pub async fn write_device(
        &self,
        id: &DeviceId,
        fields: &FieldMap,
    ) -> Result<WriteAck, CoreError> {
        let descriptor = self.load_device(id).await?;
        descriptor.validate_edit(fields)?;
        let ack = self.inner.backend.write_device(id, fields).await?;
        if let Some(recorder) = &self.inner.recorder {
            recorder.record(id, fields)?;
        }
        Ok(ack)
    }

    // ── Mounting ─────────────────────────────────────────────────────

    /// Render `descriptor` onto `mount` and start keeping it in sync.
    ///
    /// Mounting an already-mounted device replaces the previous mount.
    pub fn mount_device(
        &self,
        descriptor: DeviceDescriptor,
        mount: Arc<dyn MountPoint>,
    ) -> Result<MountStatus, CoreError> {
        let id = descriptor.unique_id().clone();
        if let Some((_, previous)) = self.inner.mounts.remove(&id) {
            debug!(device = %id, "remounting device");
            self.detach(&previous);
        }

        let type_tag = descriptor.device_type().to_owned();
        let (mut binder, status): (Box<dyn ControlBinder>, MountStatus) =
            match self.inner.registry.resolve(&type_tag) {
                Ok(factory) => (factory(&descriptor), MountStatus::Bound),
                Err(e) => {
                    warn!(device = %id, error = %e, "no binder, mounting notice");
                    let fallback: Box<dyn ControlBinder> = Box::new(UnsupportedBinder);
                    (
                        fallback,
                        MountStatus::Unsupported {
                            type_tag: type_tag.clone(),
                        },
                    )
                }
            };
        let supported = status == MountStatus::Bound;

        let mut fragment = binder.render(&descriptor);
        if supported && self.inner.config.debug {
            fragment.set_debug_rows(debug_table::rows_for(&descriptor));
        }

        let cell = Arc::new(ArcSwap::from_pointee(descriptor));
        binder.bind(&fragment, &cell.load(), self.edit_sink(&id, Arc::clone(&cell)));

        let device = Arc::new(MountedDevice {
            id: id.clone(),
            descriptor: cell,
            view: Mutex::new(View { binder, fragment }),
            mount,
        });
        self.inner.mounts.insert(id.clone(), Arc::clone(&device));
        device.present();

        if supported {
            self.inner.poller.start(
                &id,
                self.inner.config.poll_interval,
                self.snapshot_callback(&id),
            );
        }

        info!(device = %id, type_tag = %type_tag, supported, "device mounted");
        let _ = self.inner.event_tx.send(SyncEvent::Mounted {
            device: id,
            device_type: type_tag,
            supported,
        });
        Ok(status)
    }

    /// Stop syncing `id`: cancel its poll, send any pending write, and
    /// detach it from its mount point. Returns `false` if it was not
    /// mounted.
    pub async fn unmount_device(&self, id: &DeviceId) -> bool {
        let Some((_, device)) = self.inner.mounts.remove(id) else {
            return false;
        };
        if let Some(flush) = self.detach(&device) {
            if let Err(e) = flush.await {
                warn!(device = %id, error = %e, "final write task failed");
            }
        }
        self.inner.in_flight.remove(id);
        info!(device = %id, "device unmounted");
        true
    }

    fn detach(&self, device: &MountedDevice) -> Option<tokio::task::JoinHandle<()>> {
        self.inner.poller.stop(&device.id);
        let flush = self.inner.coalescer.flush(&device.id);
        device.mount.detach(&device.id);
        let _ = self.inner.event_tx.send(SyncEvent::Unmounted {
            device: device.id.clone(),
        });
        flush
    }

    // ── Interaction ──────────────────────────────────────────────────

    /// Route user input to a mounted device's binder. Rejected edits are
    /// reported on the mount point and returned; accepted edits are
    /// queued for a coalesced write and the fragment is re-presented.
    pub fn handle_input(&self, id: &DeviceId, input: &ControlInput) -> Result<FieldMap, CoreError> {
        let device = self.mounted_device(id)?;
        let result = {
            let mut guard = device.view();
            let view = &mut *guard;
            view.binder.handle_input(&mut view.fragment, input)
        };

        match result {
            Ok(fields) => {
                device.present();
                Ok(fields)
            }
            Err(e) => {
                debug!(device = %id, error = %e, "input rejected");
                device.mount.notice(id, &e.to_string());
                Err(e)
            }
        }
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn fragment(&self, id: &DeviceId) -> Option<Fragment> {
        self.inner.mounts.get(id).map(|d| d.fragment())
    }

    /// Latest known descriptor of a mounted device, including optimistic
    /// local edits.
    pub fn descriptor(&self, id: &DeviceId) -> Option<Arc<DeviceDescriptor>> {
        self.inner.mounts.get(id).map(|d| d.descriptor.load_full())
    }

    pub fn mounted(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.inner.mounts.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn is_polling(&self, id: &DeviceId) -> bool {
        self.inner.poller.is_active(id)
    }

    pub fn pending_write(&self, id: &DeviceId) -> Option<FieldMap> {
        self.inner.coalescer.pending(id)
    }

    pub fn suppressed_fields(&self, id: &DeviceId) -> Vec<String> {
        self.inner.in_flight.active(id)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Unmount everything, sending pending writes, then stop all
    /// background tasks.
    pub async fn shutdown(&self) {
        for id in self.mounted() {
            self.unmount_device(&id).await;
        }
        self.inner.poller.shutdown();
        self.inner.coalescer.shutdown();
        debug!("controller shut down");
    }

    // ── Internals ────────────────────────────────────────────────────

    fn mounted_device(&self, id: &DeviceId) -> Result<Arc<MountedDevice>, CoreError> {
        self.inner
            .mounts
            .get(id)
            .map(|d| Arc::clone(d.value()))
            .ok_or_else(|| CoreError::DeviceNotMounted {
                identifier: id.to_string(),
            })
    }

    /// Sink handed to a binder: validate against the latest descriptor,
    /// apply optimistically, queue for writing.
    fn edit_sink(&self, id: &DeviceId, cell: Arc<ArcSwap<DeviceDescriptor>>) -> EditSink {
        let coalescer = self.inner.coalescer.clone();
        let events = self.inner.event_tx.clone();
        let id = id.clone();
        EditSink::new(move |fields: FieldMap| {
            cell.load().validate_edit(&fields)?;
            cell.rcu(|current| {
                let mut next = DeviceDescriptor::clone(current);
                next.apply_values(&fields);
                next
            });
            coalescer.submit(&id, fields.clone());
            let _ = events.send(SyncEvent::EditQueued {
                device: id.clone(),
                fields,
            });
            Ok(())
        })
    }

    fn snapshot_callback(&self, id: &DeviceId) -> SnapshotCallback {
        let reconciler = self.inner.reconciler.clone();
        let id = id.clone();
        Arc::new(move |snapshot: DeviceDescriptor| {
            if let Err(e) = reconciler.apply(&id, &snapshot.values()) {
                debug!(device = %id, error = %e, "snapshot dropped");
            }
        })
    }
}

// ── Write outcome handlers ───────────────────────────────────────────

fn ack_handler(
    mounts: Mounts,
    events: broadcast::Sender<SyncEvent>,
    recorder: Option<Arc<ActionRecorder>>,
    debug_rows: bool,
) -> AckHandler {
    Arc::new(move |id: &DeviceId, fields: &FieldMap, ack: &WriteAck| {
        let _ = events.send(SyncEvent::WriteAcknowledged {
            device: id.clone(),
            fields: fields.clone(),
        });

        if let Some(recorder) = &recorder {
            if let Err(e) = recorder.record(id, fields) {
                warn!(device = %id, error = %e, "failed to record action step");
            }
        }

        if !debug_rows {
            return;
        }
        let Some(device) = mounts.get(id).map(|d| Arc::clone(d.value())) else {
            return;
        };
        let refreshed = {
            let mut view = device.view();
            let rows = view
                .fragment
                .debug_rows()
                .map(|rows| debug_table::merge_ack(rows, ack));
            rows.map(|rows| view.fragment.set_debug_rows(rows)).is_some()
        };
        if refreshed {
            device.present();
        }
    })
}

fn failure_handler(mounts: Mounts, events: broadcast::Sender<SyncEvent>) -> FailureHandler {
    Arc::new(move |id: &DeviceId, fields: &FieldMap, error: &CoreError| {
        let _ = events.send(SyncEvent::WriteFailed {
            device: id.clone(),
            fields: fields.clone(),
            error: error.to_string(),
        });
        if let Some(device) = mounts.get(id).map(|d| Arc::clone(d.value())) {
            device
                .mount
                .notice(id, &format!("Failed to update device: {error}"));
        }
    })
}
