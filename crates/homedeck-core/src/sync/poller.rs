// ── Poll scheduler ──
//
// One background task per subscribed device, re-reading the device every
// interval and handing the descriptor to a callback. Each subscription
// owns a child cancellation token; a cancelled subscription never delivers
// a read, even one that was already in flight. Reads across all devices
// share a semaphore so a large room does not open dozens of connections
// at once.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::DeviceBackend;
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, DeviceId};

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Receives every successfully read descriptor.
pub type SnapshotCallback = Arc<dyn Fn(DeviceDescriptor) + Send + Sync>;

struct Subscription {
    interval: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    backend: Arc<dyn DeviceBackend>,
    permits: Arc<Semaphore>,
    subscriptions: DashMap<DeviceId, Subscription>,
    cancel: CancellationToken,
}

/// Periodic re-reads of device state, one subscription per device.
#[derive(Clone)]
pub struct PollScheduler {
    inner: Arc<Inner>,
}

impl PollScheduler {
    pub fn new(backend: Arc<dyn DeviceBackend>, max_concurrent_polls: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                permits: Arc::new(Semaphore::new(max_concurrent_polls.max(1))),
                subscriptions: DashMap::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Read `device` now and every `interval` after, replacing any existing
    /// subscription for it.
    pub fn start(&self, device: &DeviceId, interval: Duration, on_snapshot: SnapshotCallback) {
        let interval = if interval < MIN_POLL_INTERVAL {
            warn!(
                device = %device,
                requested = ?interval,
                "poll interval too short, clamping"
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.permits),
            device.clone(),
            interval,
            on_snapshot,
            cancel.clone(),
        ));

        let previous = self.inner.subscriptions.insert(
            device.clone(),
            Subscription {
                interval,
                cancel,
                handle,
            },
        );
        if let Some(old) = previous {
            debug!(device = %device, "replacing poll subscription");
            old.cancel.cancel();
            old.handle.abort();
        }
        debug!(device = %device, interval = ?interval, "polling started");
    }

    /// Cancel the subscription for `device`. Idempotent.
    pub fn stop(&self, device: &DeviceId) -> bool {
        let Some((_, sub)) = self.inner.subscriptions.remove(device) else {
            return false;
        };
        sub.cancel.cancel();
        sub.handle.abort();
        debug!(device = %device, "polling stopped");
        true
    }

    pub fn stop_all(&self) {
        let devices: Vec<DeviceId> = self
            .inner
            .subscriptions
            .iter()
            .map(|e| e.key().clone())
            .collect();
        for device in devices {
            self.stop(&device);
        }
    }

    pub fn is_active(&self, device: &DeviceId) -> bool {
        self.inner.subscriptions.contains_key(device)
    }

    pub fn interval(&self, device: &DeviceId) -> Option<Duration> {
        self.inner.subscriptions.get(device).map(|s| s.interval)
    }

    pub fn active_count(&self) -> usize {
        self.inner.subscriptions.len()
    }

    /// Cancel every subscription and refuse new reads.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop_all();
    }
}

async fn poll_loop(
    backend: Arc<dyn DeviceBackend>,
    permits: Arc<Semaphore>,
    device: DeviceId,
    period: Duration,
    on_snapshot: SnapshotCallback,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let read = async {
            let _permit = permits
                .acquire()
                .await
                .map_err(|_| CoreError::Internal("poll semaphore closed".into()))?;
            backend.fetch_device(&device).await
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            r = read => r,
        };

        match result {
            Ok(descriptor) if !cancel.is_cancelled() => on_snapshot(descriptor),
            Ok(_) => break,
            Err(e) => warn!(device = %device, error = %e, "device poll failed"),
        }
    }

    debug!(device = %device, "poll loop exited");
}
