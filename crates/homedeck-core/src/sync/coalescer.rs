// ── Write coalescer ──
//
// Debounces bursts of user edits into one write per device. Each device is
// either idle or holds one pending write whose timer task is restarted on
// every submit. When the timer fires, the entry is removed *before* the
// request goes out, so edits made while the write is in flight start a
// fresh pending entry instead of being lost or merged into a sent body.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::suppression::{InFlightRegistry, Tickets};
use crate::backend::{DeviceBackend, WriteAck};
use crate::error::CoreError;
use crate::model::{DeviceId, FieldMap};

/// Called with the fields a write sent and the server acknowledgement.
pub type AckHandler = Arc<dyn Fn(&DeviceId, &FieldMap, &WriteAck) + Send + Sync>;

/// Called with the fields a write tried to send and why it failed.
pub type FailureHandler = Arc<dyn Fn(&DeviceId, &FieldMap, &CoreError) + Send + Sync>;

/// Observer hooks invoked when a dispatched write completes.
#[derive(Clone, Default)]
pub struct WriteHandlers {
    pub on_ack: Option<AckHandler>,
    pub on_failure: Option<FailureHandler>,
}

/// Observable state of one device's write lane.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteState {
    Idle,
    PendingWrite { fields: FieldMap, deadline: Instant },
}

struct PendingWrite {
    fields: FieldMap,
    tickets: Tickets,
    deadline: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner {
    backend: Arc<dyn DeviceBackend>,
    in_flight: Arc<InFlightRegistry>,
    quiet_period: Duration,
    handlers: WriteHandlers,
    lanes: DashMap<DeviceId, PendingWrite>,
    generation: AtomicU64,
    cancel: CancellationToken,
}

/// Per-device debounce of field edits into single merged writes.
#[derive(Clone)]
pub struct WriteCoalescer {
    inner: Arc<Inner>,
}

impl WriteCoalescer {
    pub fn new(
        backend: Arc<dyn DeviceBackend>,
        in_flight: Arc<InFlightRegistry>,
        quiet_period: Duration,
        handlers: WriteHandlers,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                in_flight,
                quiet_period,
                handlers,
                lanes: DashMap::new(),
                generation: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.inner.quiet_period
    }

    /// Merge `fields` into the device's pending write and restart its
    /// quiet-period timer. Never blocks; must be called inside a Tokio
    /// runtime.
    pub fn submit(&self, device: &DeviceId, fields: FieldMap) {
        if fields.is_empty() || self.inner.cancel.is_cancelled() {
            return;
        }

        let tickets = self.inner.in_flight.mark(device, fields.keys());
        let deadline = Instant::now() + self.inner.quiet_period;
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        // Spawned while the lane is locked, so the timer always observes
        // the entry it belongs to.
        let spawn_timer = || {
            tokio::spawn(Inner::fire_at(
                Arc::clone(&self.inner),
                device.clone(),
                generation,
                deadline,
            ))
        };

        match self.inner.lanes.entry(device.clone()) {
            Entry::Occupied(mut slot) => {
                let pending = slot.get_mut();
                trace!(
                    device = %device,
                    merged = fields.len(),
                    pending = pending.fields.len(),
                    "coalescing edit into pending write"
                );
                pending.fields.extend(fields);
                pending.tickets.extend(tickets);
                pending.deadline = deadline;
                pending.generation = generation;
                let previous = std::mem::replace(&mut pending.timer, spawn_timer());
                previous.abort();
            }
            Entry::Vacant(slot) => {
                trace!(device = %device, fields = fields.len(), "new pending write");
                slot.insert(PendingWrite {
                    fields,
                    tickets,
                    deadline,
                    generation,
                    timer: spawn_timer(),
                });
            }
        }
    }

    /// Dispatch the pending write now instead of waiting for its timer.
    /// Returns the dispatch task, or `None` if nothing was pending.
    pub fn flush(&self, device: &DeviceId) -> Option<JoinHandle<()>> {
        let (_, pending) = self.inner.lanes.remove(device)?;
        pending.timer.abort();
        debug!(device = %device, fields = pending.fields.len(), "flushing pending write");
        let inner = Arc::clone(&self.inner);
        let device = device.clone();
        Some(tokio::spawn(async move {
            inner.dispatch(&device, pending.fields, pending.tickets).await;
        }))
    }

    /// Drop the pending write without sending it. Returns the dropped
    /// fields.
    pub fn cancel(&self, device: &DeviceId) -> Option<FieldMap> {
        let (_, pending) = self.inner.lanes.remove(device)?;
        pending.timer.abort();
        self.inner.in_flight.release(device, &pending.tickets);
        debug!(device = %device, "pending write cancelled");
        Some(pending.fields)
    }

    /// Merged fields currently waiting for the quiet period to end.
    pub fn pending(&self, device: &DeviceId) -> Option<FieldMap> {
        self.inner.lanes.get(device).map(|p| p.fields.clone())
    }

    pub fn state(&self, device: &DeviceId) -> WriteState {
        self.inner
            .lanes
            .get(device)
            .map_or(WriteState::Idle, |p| WriteState::PendingWrite {
                fields: p.fields.clone(),
                deadline: p.deadline,
            })
    }

    /// Stop all timers. Pending writes are discarded.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        let devices: Vec<DeviceId> = self.inner.lanes.iter().map(|e| e.key().clone()).collect();
        for device in devices {
            self.cancel(&device);
        }
    }
}

impl Inner {
    async fn fire_at(self: Arc<Self>, device: DeviceId, generation: u64, deadline: Instant) {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return,
            () = sleep_until(deadline) => {}
        }

        // A newer submit may have replaced the timer after this one woke.
        let Some((_, pending)) = self
            .lanes
            .remove_if(&device, |_, p| p.generation == generation)
        else {
            return;
        };

        self.dispatch(&device, pending.fields, pending.tickets).await;
    }

    async fn dispatch(&self, device: &DeviceId, fields: FieldMap, tickets: Tickets) {
        debug!(device = %device, fields = ?fields, "writing device");
        let result = self.backend.write_device(device, &fields).await;
        self.in_flight.release(device, &tickets);

        match result {
            Ok(ack) => {
                debug!(device = %device, updated = ack.updated.len(), "write acknowledged");
                if let Some(handler) = &self.handlers.on_ack {
                    handler(device, &fields, &ack);
                }
            }
            Err(e) => {
                warn!(device = %device, error = %e, "device write failed");
                if let Some(handler) = &self.handlers.on_failure {
                    handler(device, &fields, &e);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sync::testing::FakeBackend;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn fields(pairs: &[(&str, i64)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).into()))
            .collect()
    }

    fn coalescer(backend: &Arc<FakeBackend>, handlers: WriteHandlers) -> WriteCoalescer {
        WriteCoalescer::new(
            Arc::clone(backend) as Arc<dyn DeviceBackend>,
            Arc::new(InFlightRegistry::new(Duration::from_secs(10))),
            Duration::from_millis(200),
            handlers,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_window_produces_one_merged_write() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("On", 1)]));
        tokio::time::sleep(Duration::from_millis(50)).await;
        c.submit(&d1, fields(&[("Brightness", 80)]));

        tokio::time::sleep(Duration::from_millis(1000)).await;

        let writes = backend.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, d1);
        assert_eq!(writes[0].1, fields(&[("On", 1), ("Brightness", 80)]));
        assert_eq!(c.state(&d1), WriteState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn last_value_wins_per_field() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");

        for v in [10, 20, 30] {
            c.submit(&d1, fields(&[("Brightness", v)]));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(backend.writes().len(), 0, "timer keeps being reset");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let writes = backend.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, fields(&[("Brightness", 30)]));
    }

    #[tokio::test(start_paused = true)]
    async fn write_fires_after_quiet_period() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("On", 1)]));
        tokio::time::sleep(Duration::from_millis(199)).await;
        assert!(backend.writes().is_empty());
        assert!(matches!(c.state(&d1), WriteState::PendingWrite { .. }));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(backend.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn devices_are_debounced_independently() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());

        c.submit(&DeviceId::from("d1"), fields(&[("On", 1)]));
        c.submit(&DeviceId::from("d2"), fields(&[("On", 0)]));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut ids: Vec<String> = backend
            .writes()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_and_not_retried() {
        let backend = FakeBackend::new();
        backend.fail_writes(true);
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        let handlers = WriteHandlers {
            on_ack: None,
            on_failure: Some(Arc::new(move |id: &DeviceId, f: &FieldMap, e: &CoreError| {
                sink.lock()
                    .unwrap()
                    .push((id.clone(), f.clone(), e.to_string()));
            })),
        };
        let c = coalescer(&backend, handlers);
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("On", 1)]));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(backend.writes().len(), 1);
        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].1, fields(&[("On", 1)]));
        assert!(!c.inner.in_flight.is_suppressed(&d1, "On"));
    }

    #[tokio::test(start_paused = true)]
    async fn ack_releases_suppression_and_notifies() {
        let backend = FakeBackend::new();
        let acks = Arc::new(Mutex::new(0_usize));
        let counter = Arc::clone(&acks);
        let handlers = WriteHandlers {
            on_ack: Some(Arc::new(move |_: &DeviceId, _: &FieldMap, _: &WriteAck| {
                *counter.lock().unwrap() += 1;
            })),
            on_failure: None,
        };
        let c = coalescer(&backend, handlers);
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("On", 1)]));
        assert!(c.inner.in_flight.is_suppressed(&d1, "On"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*acks.lock().unwrap(), 1);
        assert!(!c.inner.in_flight.is_suppressed(&d1, "On"));
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_in_flight_write_stays_suppressed() {
        let backend = FakeBackend::new();
        backend.set_write_latency(Duration::from_millis(500));
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("Brightness", 10)]));
        tokio::time::sleep(Duration::from_millis(250)).await;
        // First write is now in flight; a second edit starts a new entry.
        c.submit(&d1, fields(&[("Brightness", 20)]));
        assert_eq!(c.pending(&d1), Some(fields(&[("Brightness", 20)])));

        // First write completes at ~700 ms; the second is still in flight.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(c.inner.in_flight.is_suppressed(&d1, "Brightness"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!c.inner.in_flight.is_suppressed(&d1, "Brightness"));
        let writes = backend.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].1, fields(&[("Brightness", 20)]));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_sends_immediately() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("On", 0)]));
        let handle = c.flush(&d1).expect("pending write");
        handle.await.unwrap();

        assert_eq!(backend.writes().len(), 1);
        assert!(c.flush(&d1).is_none());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.writes().len(), 1, "aborted timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_write() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");

        c.submit(&d1, fields(&[("On", 1)]));
        assert_eq!(c.cancel(&d1), Some(fields(&[("On", 1)])));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(backend.writes().is_empty());
        assert!(!c.inner.in_flight.is_suppressed(&d1, "On"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_submit_is_ignored() {
        let backend = FakeBackend::new();
        let c = coalescer(&backend, WriteHandlers::default());
        let d1 = DeviceId::from("d1");
        c.submit(&d1, FieldMap::new());
        assert_eq!(c.state(&d1), WriteState::Idle);
    }
}
