// ── Reconciler ──
//
// Folds polled snapshots into mounted devices. Fields with an
// unacknowledged local write are skipped, so a read that raced the write
// cannot undo what the user just did.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use super::suppression::InFlightRegistry;
use crate::error::CoreError;
use crate::event::SyncEvent;
use crate::model::{DeviceDescriptor, DeviceId, FieldMap};
use crate::mount::MountedDevice;

/// Outcome of applying one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Fields whose stored value changed.
    pub changed: Vec<String>,
    /// Fields held back by in-flight writes.
    pub suppressed: Vec<String>,
    /// Whether the fragment was re-presented.
    pub presented: bool,
}

pub(crate) type Mounts = Arc<DashMap<DeviceId, Arc<MountedDevice>>>;

#[derive(Clone)]
pub struct Reconciler {
    in_flight: Arc<InFlightRegistry>,
    mounts: Mounts,
    events: broadcast::Sender<SyncEvent>,
}

impl Reconciler {
    pub(crate) fn new(
        in_flight: Arc<InFlightRegistry>,
        mounts: Mounts,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            in_flight,
            mounts,
            events,
        }
    }

    /// Apply `snapshot` to the mounted device `id`.
    pub fn apply(&self, id: &DeviceId, snapshot: &FieldMap) -> Result<ReconcileReport, CoreError> {
        let device = self
            .mounts
            .get(id)
            .map(|d| Arc::clone(d.value()))
            .ok_or_else(|| CoreError::DeviceNotMounted {
                identifier: id.to_string(),
            })?;

        // Partition and apply under the view lock. Edits mark suppression
        // while holding the same lock, so neither can interleave the other.
        let (partition, changed, presented) = {
            let mut guard = device.view();
            let partition = self.in_flight.partition(id, snapshot);
            if !partition.suppressed.is_empty() {
                trace!(
                    device = %id,
                    suppressed = ?partition.suppressed,
                    "holding back in-flight fields"
                );
            }

            let mut changed = Vec::new();
            device.descriptor.rcu(|current| {
                let mut next = DeviceDescriptor::clone(current);
                changed = next.apply_values(&partition.applied);
                next
            });

            let view = &mut *guard;
            let presented = view
                .binder
                .update_from_snapshot(&mut view.fragment, &partition.applied);
            (partition, changed, presented)
        };
        if presented {
            device.present();
        }

        let _ = self.events.send(SyncEvent::SnapshotApplied {
            device: id.clone(),
            changed: changed.clone(),
            suppressed: partition.suppressed.clone(),
        });

        Ok(ReconcileReport {
            changed,
            suppressed: partition.suppressed,
            presented,
        })
    }
}
